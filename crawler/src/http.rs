//! HTTP access to the PTT web front end.
//!
//! Every request carries the `over18=1` cookie that skips the age gate on
//! adult boards, and a User-Agent picked at random from the configured pool.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{COOKIE, USER_AGENT};
use url::Url;

use crate::error::{CrawlError, ErrorCode};
use crate::resolved::CrawlSettings;
use crate::retry::{RetryConfig, calculate_retry_delay, should_retry};

const AGE_GATE_COOKIE: &str = "over18=1";
const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A response returned regardless of its status code.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub url: Url,
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct PttClient {
    client: reqwest::Client,
    base_url: Url,
    user_agents: Vec<String>,
    timeout: Duration,
    retry: RetryConfig,
}

impl PttClient {
    pub fn new(settings: &CrawlSettings) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| {
                CrawlError::from_code(ErrorCode::Internal, format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            user_agents: settings.user_agents.clone(),
            timeout: settings.timeout,
            retry: settings.retry.clone(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a site-relative path (or absolute URL) against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, CrawlError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(CrawlError::from_code(ErrorCode::NoUrl, "no URL given"));
        }
        self.base_url.join(path).map_err(|e| {
            CrawlError::from_code(ErrorCode::InvalidUrl, format!("invalid URL {path}: {e}"))
                .with_detail("url", path)
        })
    }

    /// Fetch a page body, failing on any status other than 200.
    pub async fn get_page(&self, path: &str) -> Result<String, CrawlError> {
        let url = self.resolve(path)?;
        let response = self.send(&url).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(CrawlError::new(
                ErrorCode::PageNotFound,
                format!("HTTP {} for {url}", status.as_u16()),
                should_retry(status),
            )
            .with_detail("status", status.as_u16().to_string())
            .with_detail("url", url.to_string()));
        }
        read_body(response, &url).await
    }

    /// Fetch a page and return it whatever the status.
    pub async fn get_raw(&self, path: &str) -> Result<RawResponse, CrawlError> {
        let url = self.resolve(path)?;
        let response = self.send(&url).await?;
        let status = response.status().as_u16();
        let body = read_body(response, &url).await?;
        Ok(RawResponse { url, status, body })
    }

    fn pick_user_agent(&self) -> &str {
        if self.user_agents.is_empty() {
            return FALLBACK_USER_AGENT;
        }
        let idx = (rand::random::<u64>() % self.user_agents.len() as u64) as usize;
        &self.user_agents[idx]
    }

    async fn send(&self, url: &Url) -> Result<reqwest::Response, CrawlError> {
        let mut attempt = 0;
        loop {
            let result = self
                .client
                .get(url.clone())
                .header(COOKIE, AGE_GATE_COOKIE)
                .header(USER_AGENT, self.pick_user_agent())
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if attempt < self.retry.max_retries && should_retry(status) {
                        let delay =
                            calculate_retry_delay(attempt, &self.retry, Some(response.headers()));
                        tracing::warn!(
                            %url,
                            status = status.as_u16(),
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            "Retrying request"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(err) => {
                    let error = self.transport_error(&err, url);
                    if attempt < self.retry.max_retries && error.retryable {
                        let delay = calculate_retry_delay(attempt, &self.retry, None);
                        tracing::warn!(
                            %url,
                            attempt,
                            code = error.code.as_str(),
                            "Retrying after transport error: {err}"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(error);
                }
            }
        }
    }

    fn transport_error(&self, err: &reqwest::Error, url: &Url) -> CrawlError {
        if err.is_timeout() {
            CrawlError::from_code(
                ErrorCode::Timeout,
                format!("request timed out after {}s: {url}", self.timeout.as_secs()),
            )
            .with_detail("url", url.to_string())
        } else {
            CrawlError::from_code(ErrorCode::Network, format!("request failed: {err}"))
                .with_detail("url", url.to_string())
        }
    }
}

async fn read_body(response: reqwest::Response, url: &Url) -> Result<String, CrawlError> {
    response.text().await.map_err(|e| {
        let code = if e.is_timeout() {
            ErrorCode::Timeout
        } else {
            ErrorCode::Network
        };
        CrawlError::from_code(code, format!("failed to read body: {e}"))
            .with_detail("url", url.to_string())
    })
}
