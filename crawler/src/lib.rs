//! PTT board crawler.
//!
//! Walks a board's index pages from newest to oldest, parses every live
//! article, and exports the results as CSV.
//!
//! # Pipeline
//!
//! 1. [`PttClient`] fetches pages with the age-gate cookie and a rotating
//!    User-Agent.
//! 2. [`ArticleListPage`] parses an index page into [`ptt_types::ArticleSummary`] rows.
//! 3. [`parse_article`] turns an article page into a [`ptt_types::Article`].
//! 4. [`Crawler::crawl_board`] drives the loop with politeness delays,
//!    archives failures under `errors/` via [`ErrorArchive`], deduplicates,
//!    and writes `data/ptt_<board>_*.csv`.
//!
//! # Example
//!
//! ```no_run
//! use ptt_config::CrawlerConfig;
//! use ptt_crawler::{CrawlMode, CrawlRequest, CrawlSettings, Crawler};
//!
//! # async fn run() -> Result<(), ptt_crawler::CrawlError> {
//! let settings = CrawlSettings::from_config(&CrawlerConfig::default())?;
//! let crawler = Crawler::new(settings)?;
//! let report = crawler
//!     .crawl_board(&CrawlRequest {
//!         board: "Drink".to_string(),
//!         start: None,
//!         mode: CrawlMode::Pages(2),
//!     })
//!     .await?;
//! println!("{} articles", report.final_count);
//! # Ok(())
//! # }
//! ```

mod archive;
mod article_page;
mod crawl;
mod dom;
mod dump;
mod error;
mod export;
mod http;
mod list_page;
mod resolved;
mod retry;
mod stop;

pub use archive::{ErrorArchive, PAGE_ERRORS_LOG};
pub use article_page::{UNKNOWN_IP, article_path, fetch_article, parse_article};
pub use crawl::{CrawlMode, CrawlReport, CrawlRequest, Crawler, PageOutcome};
pub use dump::{DEFAULT_CSV_FIELDS, DEFAULT_JSON_FIELDS, article_view, dump_csv, dump_json};
pub use error::{CrawlError, ErrorCode, ErrorDetails};
pub use export::{ExportPaths, dedup, export_board, to_csv_bytes, write_csv};
pub use http::{PttClient, RawResponse};
pub use list_page::{ArticleListPage, RelatedLinks};
pub use resolved::{CrawlSettings, DEFAULT_USER_AGENTS};
pub use retry::RetryConfig;
pub use stop::{StopHandle, StopSignal, stop_pair};
