//! On-disk record of everything that went wrong during a crawl.
//!
//! ```text
//! errors/
//!   main_errors_<YYYYmmdd>.log
//!   <board>/
//!     page_errors.log
//!     page_error_<index>_<YYYYmmdd_HHMMSS>.html
//!     article_error_<aid>_<YYYYmmdd_HHMMSS>.html
//! ```
//!
//! The HTML dumps are the server's response prefixed with an HTML comment
//! header describing the failure, so they open cleanly in a browser.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use ptt_utils::{AtomicWriteOptions, FileSyncPolicy, ParentDirSyncPolicy, append_line};

use crate::error::CrawlError;
use crate::http::RawResponse;

pub const PAGE_ERRORS_LOG: &str = "page_errors.log";

const FILE_TIMESTAMP: &str = "%Y%m%d_%H%M%S";
const DUMP_WRITE: AtomicWriteOptions = AtomicWriteOptions {
    file_sync: FileSyncPolicy::SkipSync,
    parent_dir_sync: ParentDirSyncPolicy::SkipSync,
};

#[derive(Debug, Clone)]
pub struct ErrorArchive {
    root: PathBuf,
}

impl ErrorArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn board_dir(&self, board: &str) -> PathBuf {
        self.root.join(board)
    }

    /// Dump an index page that failed to load.
    pub fn save_page_error(
        &self,
        board: &str,
        index: u32,
        error: &CrawlError,
        response: &RawResponse,
    ) -> Result<PathBuf, CrawlError> {
        let now = Local::now();
        let path = self.board_dir(board).join(format!(
            "page_error_{index}_{}.html",
            now.format(FILE_TIMESTAMP)
        ));
        let header = [
            format!("Error occurred while loading page: {error}"),
            format!("URL: {}", response.url),
            format!("Status Code: {}", response.status),
            format!("Error Detail: {}", error.to_json()),
        ];
        write_dump(&path, &header, &response.body)?;
        Ok(path)
    }

    /// Dump an article that failed to load or parse.
    pub fn save_article_error(
        &self,
        board: &str,
        aid: &str,
        title: &str,
        error: &CrawlError,
        response: &RawResponse,
    ) -> Result<PathBuf, CrawlError> {
        let now = Local::now();
        let aid = if aid.is_empty() { "unknown" } else { aid };
        let path = self.board_dir(board).join(format!(
            "article_error_{aid}_{}.html",
            now.format(FILE_TIMESTAMP)
        ));
        let header = [
            "Error occurred while processing article".to_string(),
            format!("Article Title: {title}"),
            format!("Article URL: {}", response.url),
            format!("Error Message: {error}"),
            format!("Timestamp: {}", now.to_rfc3339()),
            format!("Status Code: {}", response.status),
            format!("Error Detail: {}", error.to_json()),
        ];
        write_dump(&path, &header, &response.body)?;
        Ok(path)
    }

    /// Append to `<board>/page_errors.log`. `page_number` is 1-based.
    pub fn log_page_error(
        &self,
        board: &str,
        page_number: u32,
        index: u32,
        error: &dyn Display,
    ) -> Result<(), CrawlError> {
        let path = self.board_dir(board).join(PAGE_ERRORS_LOG);
        let line = format!(
            "{} - Page {page_number} (index {index}): {error}",
            iso_now()
        );
        append_line(&path, &line).map_err(|e| CrawlError::io("failed to append page error", &e))
    }

    /// Append to `main_errors_<YYYYmmdd>.log` at the archive root.
    pub fn log_main_error(&self, error: &dyn Display) -> Result<PathBuf, CrawlError> {
        let path = self
            .root
            .join(format!("main_errors_{}.log", Local::now().format("%Y%m%d")));
        let line = format!("{} - Error: {error}", iso_now());
        append_line(&path, &line).map_err(|e| CrawlError::io("failed to append main error", &e))?;
        Ok(path)
    }
}

fn iso_now() -> String {
    iso(&Local::now())
}

fn iso(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// `--` may not appear inside an HTML comment.
fn comment_safe(text: &str) -> String {
    text.replace("--", "- -")
}

fn write_dump(path: &Path, header: &[String], body: &str) -> Result<(), CrawlError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| CrawlError::io("failed to create error directory", &e))?;
    }

    let mut out = String::with_capacity(body.len() + 256);
    for line in header {
        out.push_str(&format!("<!-- {} -->\n", comment_safe(line)));
    }
    out.push_str(body);

    ptt_utils::atomic_write_with_options(path, out.as_bytes(), DUMP_WRITE)
        .map_err(|e| CrawlError::io("failed to write error dump", &e))
}
