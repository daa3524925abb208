//! Configuration loading for the PTT crawler.
//!
//! Every field is optional; accessors fill in defaults that reproduce the
//! crawler's historical behavior (Drink board, 1 s timeout, 1 s between
//! articles, 0.5-1.5 s between pages).
//!
//! ```toml
//! [crawler]
//! board = "Drink"
//! base_url = "https://www.ptt.cc"
//! timeout_seconds = 1
//! article_delay_ms = 1000
//! page_delay_min_ms = 500
//! page_delay_max_ms = 1500
//! max_retries = 0
//! user_agents = ["Mozilla/5.0 ..."]
//!
//! [output]
//! data_dir = "${HOME}/ptt/data"
//! errors_dir = "errors"
//! ```

use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "ptt-crawler.toml";

#[derive(Debug, Default, Deserialize)]
pub struct CrawlerConfig {
    pub crawler: Option<CrawlerSection>,
    pub output: Option<OutputSection>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// `[crawler]` section: what to crawl and how politely.
#[derive(Debug, Default, Deserialize)]
pub struct CrawlerSection {
    /// Board to crawl. Default: `Drink`.
    pub board: Option<String>,
    /// Site root. Default: `https://www.ptt.cc`.
    pub base_url: Option<String>,
    /// Per-request timeout in seconds. Default: 1.
    pub timeout_seconds: Option<u64>,
    /// Fixed pause before each article request. Default: 1000.
    pub article_delay_ms: Option<u64>,
    /// Lower bound of the random pause between pages. Default: 500.
    pub page_delay_min_ms: Option<u64>,
    /// Upper bound of the random pause between pages. Default: 1500.
    pub page_delay_max_ms: Option<u64>,
    /// User-Agent rotation pool. Default: built-in desktop browsers.
    pub user_agents: Option<Vec<String>>,
    /// Retries for 408/429/5xx and transport errors. Default: 0.
    pub max_retries: Option<u32>,
}

/// `[output]` section: where exports and error dumps go.
#[derive(Debug, Default, Deserialize)]
pub struct OutputSection {
    pub data_dir: Option<String>,
    pub errors_dir: Option<String>,
}

impl CrawlerConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://www.ptt.cc";
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 1;
    pub const DEFAULT_ARTICLE_DELAY_MS: u64 = 1000;
    pub const DEFAULT_PAGE_DELAY_MIN_MS: u64 = 500;
    pub const DEFAULT_PAGE_DELAY_MAX_MS: u64 = 1500;
    pub const DEFAULT_MAX_RETRIES: u32 = 0;
    pub const DEFAULT_DATA_DIR: &'static str = "data";
    pub const DEFAULT_ERRORS_DIR: &'static str = "errors";

    /// Parse a config document.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise the first existing file among
    /// [`search_paths`] is used, and `Ok(None)` means none was found.
    pub fn load(explicit: Option<&Path>) -> Result<Option<Self>, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path).map(Some);
        }

        match search_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load_from(&path).map(Some),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        let config = Self::parse(&content, path);
        if let Err(err) = &config {
            tracing::warn!("{err}");
        } else {
            tracing::debug!(path = %path.display(), "Loaded config");
        }
        config
    }

    fn section(&self) -> Option<&CrawlerSection> {
        self.crawler.as_ref()
    }

    #[must_use]
    pub fn board(&self) -> String {
        self.section()
            .and_then(|s| s.board.as_deref())
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(ptt_types::DEFAULT_BOARD)
            .to_string()
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        self.section()
            .and_then(|s| s.base_url.as_deref())
            .map(expand_env_vars)
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string())
    }

    #[must_use]
    pub fn timeout_seconds(&self) -> u64 {
        self.section()
            .and_then(|s| s.timeout_seconds)
            .unwrap_or(Self::DEFAULT_TIMEOUT_SECONDS)
    }

    #[must_use]
    pub fn article_delay_ms(&self) -> u64 {
        self.section()
            .and_then(|s| s.article_delay_ms)
            .unwrap_or(Self::DEFAULT_ARTICLE_DELAY_MS)
    }

    #[must_use]
    pub fn page_delay_ms(&self) -> (u64, u64) {
        let section = self.section();
        let min = section
            .and_then(|s| s.page_delay_min_ms)
            .unwrap_or(Self::DEFAULT_PAGE_DELAY_MIN_MS);
        let max = section
            .and_then(|s| s.page_delay_max_ms)
            .unwrap_or(Self::DEFAULT_PAGE_DELAY_MAX_MS);
        (min, max)
    }

    #[must_use]
    pub fn user_agents(&self) -> Vec<String> {
        self.section()
            .and_then(|s| s.user_agents.clone())
            .unwrap_or_default()
            .into_iter()
            .filter(|ua| !ua.trim().is_empty())
            .collect()
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.section()
            .and_then(|s| s.max_retries)
            .unwrap_or(Self::DEFAULT_MAX_RETRIES)
    }

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.output_dir(|o| o.data_dir.as_deref(), Self::DEFAULT_DATA_DIR)
    }

    #[must_use]
    pub fn errors_dir(&self) -> PathBuf {
        self.output_dir(|o| o.errors_dir.as_deref(), Self::DEFAULT_ERRORS_DIR)
    }

    fn output_dir(
        &self,
        field: impl Fn(&OutputSection) -> Option<&str>,
        default: &str,
    ) -> PathBuf {
        self.output
            .as_ref()
            .and_then(field)
            .map(expand_env_vars)
            .filter(|p| !p.trim().is_empty())
            .map_or_else(|| PathBuf::from(default), PathBuf::from)
    }
}

/// Replace `${VAR}` references with environment values. Unset variables
/// become empty; an unclosed `${` is kept verbatim.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Candidate config files, in lookup order.
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".ptt-crawler").join("config.toml"));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> CrawlerConfig {
        CrawlerConfig::parse(toml_str, Path::new("test.toml")).unwrap()
    }

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("data/out"), "data/out");
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        assert_eq!(
            expand_env_vars("a${PTT_CRAWLER_TEST_DEFINITELY_UNSET}b"),
            "ab"
        );
    }

    #[test]
    fn expand_env_vars_unclosed_brace_preserved() {
        assert_eq!(expand_env_vars("x${HOME"), "x${HOME");
    }

    #[test]
    fn expand_env_vars_empty_var_name_removed() {
        assert_eq!(expand_env_vars("a${}b"), "ab");
    }

    #[test]
    fn expand_env_vars_unicode_content() {
        assert_eq!(expand_env_vars("資料/${}飲料"), "資料/飲料");
    }

    #[test]
    fn parse_empty_config_uses_defaults() {
        let config = parse("");
        assert_eq!(config.board(), "Drink");
        assert_eq!(config.base_url(), "https://www.ptt.cc");
        assert_eq!(config.timeout_seconds(), 1);
        assert_eq!(config.article_delay_ms(), 1000);
        assert_eq!(config.page_delay_ms(), (500, 1500));
        assert_eq!(config.max_retries(), 0);
        assert!(config.user_agents().is_empty());
        assert_eq!(config.data_dir(), PathBuf::from("data"));
        assert_eq!(config.errors_dir(), PathBuf::from("errors"));
    }

    #[test]
    fn parse_full_config() {
        let config = parse(
            r#"
[crawler]
board = "Gossiping"
base_url = "http://localhost:8080"
timeout_seconds = 5
article_delay_ms = 0
page_delay_min_ms = 10
page_delay_max_ms = 20
max_retries = 2
user_agents = ["ua-1", "  ", "ua-2"]

[output]
data_dir = "/tmp/ptt/data"
errors_dir = "/tmp/ptt/errors"
"#,
        );
        assert_eq!(config.board(), "Gossiping");
        assert_eq!(config.base_url(), "http://localhost:8080");
        assert_eq!(config.timeout_seconds(), 5);
        assert_eq!(config.article_delay_ms(), 0);
        assert_eq!(config.page_delay_ms(), (10, 20));
        assert_eq!(config.max_retries(), 2);
        assert_eq!(config.user_agents(), vec!["ua-1", "ua-2"]);
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/ptt/data"));
        assert_eq!(config.errors_dir(), PathBuf::from("/tmp/ptt/errors"));
    }

    #[test]
    fn blank_board_falls_back_to_default() {
        let config = parse("[crawler]\nboard = \"  \"\n");
        assert_eq!(config.board(), "Drink");
    }

    #[test]
    fn parse_error_reports_path() {
        let err = CrawlerConfig::parse("[crawler\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), &PathBuf::from("bad.toml"));
    }

    #[test]
    fn load_explicit_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = CrawlerConfig::load(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ptt.toml");
        fs::write(&path, "[crawler]\nboard = \"Tea\"\n").unwrap();
        let config = CrawlerConfig::load(Some(&path)).unwrap().unwrap();
        assert_eq!(config.board(), "Tea");
    }
}
