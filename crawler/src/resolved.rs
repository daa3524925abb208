use std::path::PathBuf;
use std::time::Duration;

use ptt_config::CrawlerConfig;
use url::Url;

use crate::error::{CrawlError, ErrorCode};
use crate::retry::RetryConfig;

/// User agents rotated through when the config does not name any.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:120.0) Gecko/20100101 Firefox/120.0",
];

/// Concrete crawl settings with every default applied.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub board: String,
    pub base_url: Url,
    pub timeout: Duration,
    /// Fixed pause before each article request.
    pub article_delay: Duration,
    /// Bounds of the random pause between index pages, `min <= max`.
    pub page_delay: (Duration, Duration),
    /// Never empty.
    pub user_agents: Vec<String>,
    pub retry: RetryConfig,
    pub data_dir: PathBuf,
    pub errors_dir: PathBuf,
}

impl CrawlSettings {
    pub fn from_config(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        let raw_base = config.base_url();
        let base_url = Url::parse(raw_base.trim()).map_err(|e| {
            CrawlError::from_code(ErrorCode::InvalidUrl, format!("invalid base_url: {e}"))
                .with_detail("base_url", raw_base.clone())
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(
                CrawlError::from_code(ErrorCode::InvalidUrl, "base_url must be http or https")
                    .with_detail("base_url", raw_base),
            );
        }

        let (min_ms, max_ms) = config.page_delay_ms();
        let page_delay = (
            Duration::from_millis(min_ms.min(max_ms)),
            Duration::from_millis(min_ms.max(max_ms)),
        );

        let mut user_agents = config.user_agents();
        if user_agents.is_empty() {
            user_agents = DEFAULT_USER_AGENTS.iter().map(ToString::to_string).collect();
        }

        Ok(Self {
            board: config.board(),
            base_url,
            timeout: Duration::from_secs(config.timeout_seconds().max(1)),
            article_delay: Duration::from_millis(config.article_delay_ms()),
            page_delay,
            user_agents,
            retry: RetryConfig::with_max_retries(config.max_retries()),
            data_dir: config.data_dir(),
            errors_dir: config.errors_dir(),
        })
    }

    /// Pick a pause in `page_delay` uniformly at random.
    #[must_use]
    pub fn random_page_delay(&self) -> Duration {
        let (min, max) = self.page_delay;
        let span = max.saturating_sub(min);
        min + span.mul_f64(rand::random::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn settings(toml: &str) -> Result<CrawlSettings, CrawlError> {
        let config = CrawlerConfig::parse(toml, Path::new("test.toml")).unwrap();
        CrawlSettings::from_config(&config)
    }

    #[test]
    fn defaults() {
        let settings = settings("").unwrap();
        assert_eq!(settings.board, "Drink");
        assert_eq!(settings.base_url.as_str(), "https://www.ptt.cc/");
        assert_eq!(settings.timeout, Duration::from_secs(1));
        assert_eq!(settings.article_delay, Duration::from_secs(1));
        assert_eq!(
            settings.page_delay,
            (Duration::from_millis(500), Duration::from_millis(1500))
        );
        assert_eq!(settings.user_agents.len(), DEFAULT_USER_AGENTS.len());
        assert_eq!(settings.retry.max_retries, 0);
    }

    #[test]
    fn swapped_page_delay_bounds_are_normalized() {
        let settings =
            settings("[crawler]\npage_delay_min_ms = 900\npage_delay_max_ms = 100\n").unwrap();
        assert_eq!(
            settings.page_delay,
            (Duration::from_millis(100), Duration::from_millis(900))
        );
    }

    #[test]
    fn random_page_delay_within_bounds() {
        let settings = settings("").unwrap();
        for _ in 0..50 {
            let delay = settings.random_page_delay();
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1500));
        }
    }

    #[test]
    fn rejects_bad_base_url() {
        let err = settings("[crawler]\nbase_url = \"not a url\"\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidUrl);

        let err = settings("[crawler]\nbase_url = \"ftp://ptt.cc\"\n").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidUrl);
    }

    #[test]
    fn configured_user_agents_replace_pool() {
        let settings = settings("[crawler]\nuser_agents = [\"only-me\"]\n").unwrap();
        assert_eq!(settings.user_agents, vec!["only-me"]);
    }
}
