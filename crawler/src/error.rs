//! Structured crawl errors.
//!
//! Every failure carries a stable [`ErrorCode`], a human-readable message, a
//! `retryable` hint and free-form key/value details. The client retries
//! only retryable failures, and [`CrawlError::to_json`] is written into the
//! archived error pages, so details favour raw values (status codes, URLs)
//! over prose.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CrawlError {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
    pub details: ErrorDetails,
}

impl CrawlError {
    pub fn new(code: ErrorCode, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code,
            message: message.into(),
            retryable,
            details: ErrorDetails::default(),
        }
    }

    /// Create an error whose retryability follows [`ErrorCode::default_retryable`].
    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message, code.default_retryable())
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.0.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn io(context: &str, err: &std::io::Error) -> Self {
        Self::from_code(ErrorCode::Io, format!("{context}: {err}")).with_detail("error", err.to_string())
    }

    /// Serialize to JSON for archived error pages and logs.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "code": self.code,
            "message": self.message,
            "retryable": self.retryable,
        });

        if !self.details.0.is_empty() {
            let details: serde_json::Map<String, serde_json::Value> = self
                .details
                .0
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            obj["details"] = serde_json::Value::Object(details);
        }

        obj
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A page was requested with an empty URL.
    NoUrl,
    /// URL could not be parsed or joined onto the base URL.
    InvalidUrl,
    /// An index row is missing one of its expected child elements.
    InvalidTag,
    /// Non-200 response.
    PageNotFound,
    /// Attempted to read a deleted article.
    ArticleRemoved,
    /// Request timed out.
    Timeout,
    /// Connection or body transfer failure.
    Network,
    /// Page structure not recognized.
    Parse,
    /// Unknown field in a dump selection.
    UnknownField,
    /// Local filesystem failure.
    Io,
    /// CSV serialization failure.
    Export,
    /// Unexpected internal error.
    Internal,
}

impl ErrorCode {
    #[must_use]
    pub fn default_retryable(&self) -> bool {
        matches!(self, ErrorCode::Timeout | ErrorCode::Network)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoUrl => "no_url",
            Self::InvalidUrl => "invalid_url",
            Self::InvalidTag => "invalid_tag",
            Self::PageNotFound => "page_not_found",
            Self::ArticleRemoved => "article_removed",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Parse => "parse",
            Self::UnknownField => "unknown_field",
            Self::Io => "io",
            Self::Export => "export",
            Self::Internal => "internal",
        }
    }
}

/// Error details as key-value pairs.
#[derive(Debug, Clone, Default)]
pub struct ErrorDetails(pub Vec<(String, String)>);
