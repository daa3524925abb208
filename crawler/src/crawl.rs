//! Board crawl: walk index pages from newest to oldest, read every live
//! article, archive what fails, and export the rest.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use ptt_types::{ArticleRecord, ArticleSummary, display_title};

use crate::archive::ErrorArchive;
use crate::article_page::fetch_article;
use crate::error::{CrawlError, ErrorCode};
use crate::export::{ExportPaths, dedup, export_board};
use crate::http::PttClient;
use crate::list_page::ArticleListPage;
use crate::resolved::CrawlSettings;
use crate::stop::StopSignal;

const PROGRESS_EVERY: u32 = 10;
const TITLE_PREVIEW_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Crawl at most this many pages.
    Pages(u32),
    /// Crawl back to the board's first page.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub board: String,
    /// Index to start from; `None` detects the newest page.
    pub start: Option<u32>,
    pub mode: CrawlMode,
}

/// Result of crawling one index page.
#[derive(Debug, Clone, Default)]
pub struct PageOutcome {
    pub index: u32,
    /// Rows with a non-empty title.
    pub records: Vec<ArticleRecord>,
    pub success: usize,
    pub errors: usize,
    /// Why the index page itself could not be loaded.
    pub load_error: Option<CrawlError>,
    pub interrupted: bool,
}

impl PageOutcome {
    #[must_use]
    pub fn loaded(&self) -> bool {
        self.load_error.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub board: String,
    pub start: u32,
    pub pages_crawled: u32,
    pub page_errors: u32,
    pub articles_succeeded: usize,
    pub duplicates_removed: usize,
    pub final_count: usize,
    pub elapsed: Duration,
    /// `None` when nothing was gathered.
    pub output: Option<ExportPaths>,
    pub interrupted: bool,
    pub errors_dir: PathBuf,
}

pub struct Crawler {
    settings: CrawlSettings,
    client: PttClient,
    archive: ErrorArchive,
    stop: StopSignal,
}

impl Crawler {
    pub fn new(settings: CrawlSettings) -> Result<Self, CrawlError> {
        let client = PttClient::new(&settings)?;
        let archive = ErrorArchive::new(settings.errors_dir.clone());
        Ok(Self {
            settings,
            client,
            archive,
            stop: StopSignal::never(),
        })
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    #[must_use]
    pub fn client(&self) -> &PttClient {
        &self.client
    }

    #[must_use]
    pub fn archive(&self) -> &ErrorArchive {
        &self.archive
    }

    /// Index of the board's newest page.
    pub async fn detect_start(&self, board: &str) -> Result<u32, CrawlError> {
        let newest = ArticleListPage::from_board(&self.client, board, None).await?;
        Ok(newest.index)
    }

    /// Crawl one index page and every live article on it.
    pub async fn crawl_page(&self, board: &str, index: u32) -> PageOutcome {
        let mut stop = self.stop.clone();
        let mut outcome = PageOutcome {
            index,
            ..PageOutcome::default()
        };

        let path = ArticleListPage::path_for(board, Some(index));
        let page = match ArticleListPage::fetch(&self.client, &path).await {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(board, index, code = err.code.as_str(), "Failed to load index page: {err}");
                self.archive_page_error(board, index, &path, &err).await;
                outcome.load_error = Some(err);
                return outcome;
            }
        };
        tracing::info!(board, index, rows = page.len(), "Processing index page");

        for row in page.summaries() {
            let summary = match row {
                Ok(summary) => summary,
                Err(err) => {
                    outcome.errors += 1;
                    tracing::warn!(board, index, "Skipping malformed index row: {err}");
                    continue;
                }
            };
            if summary.is_removed() {
                continue;
            }

            tracing::info!(
                "Fetching {}...",
                display_title(&summary.title, TITLE_PREVIEW_CHARS)
            );
            if stop.sleep(self.settings.article_delay).await {
                outcome.interrupted = true;
                break;
            }

            match self.read_article(summary).await {
                Ok(record) => {
                    outcome.records.push(record);
                    outcome.success += 1;
                }
                Err(err) => {
                    outcome.errors += 1;
                    tracing::warn!(
                        board,
                        aid = %summary.aid,
                        code = err.code.as_str(),
                        "Failed to read article {}: {err}",
                        display_title(&summary.title, 30)
                    );
                    self.archive_article_error(board, summary, &err).await;
                }
            }
        }

        outcome.records.retain(|record| !record.title.is_empty());
        tracing::info!(
            board,
            index,
            success = outcome.success,
            errors = outcome.errors,
            "Index page done"
        );
        outcome
    }

    /// Crawl a board and export the gathered articles.
    ///
    /// Only export failures are returned as errors; page and article
    /// failures are archived and counted in the report.
    pub async fn crawl_board(&self, request: &CrawlRequest) -> Result<CrawlReport, CrawlError> {
        let started = Instant::now();
        let mut stop = self.stop.clone();
        let board = request.board.as_str();

        let start = match request.start {
            Some(start) => start,
            None => match self.detect_start(board).await {
                Ok(start) => {
                    tracing::info!(board, start, "Detected newest index page");
                    start
                }
                Err(err) => {
                    tracing::warn!(board, "Could not detect newest index page, starting at 1: {err}");
                    1
                }
            },
        };

        let max_pages = match request.mode {
            CrawlMode::Pages(pages) => pages,
            CrawlMode::All => start,
        };

        let mut pages_crawled: u32 = 0;
        let mut page_errors: u32 = 0;
        let mut articles_succeeded = 0;
        let mut interrupted = false;
        let mut records = Vec::new();

        while pages_crawled < max_pages {
            if stop.is_stopped() {
                interrupted = true;
                break;
            }
            let Some(index) = start.checked_sub(pages_crawled).filter(|i| *i > 0) else {
                tracing::info!(board, "Reached the oldest index page");
                break;
            };

            tracing::info!(board, page = pages_crawled + 1, index, "Crawling page");
            let outcome = self.crawl_page(board, index).await;

            // A page stopped before yielding anything was never crawled.
            if outcome.interrupted && outcome.records.is_empty() {
                interrupted = true;
                break;
            }
            if let Some(err) = &outcome.load_error {
                self.log_page_error(board, pages_crawled + 1, index, err);
            }
            if outcome.records.is_empty() {
                page_errors += 1;
                if outcome.loaded() {
                    tracing::info!(board, index, "No usable articles on page");
                }
            } else {
                articles_succeeded += outcome.records.len();
                records.extend(outcome.records);
            }
            pages_crawled += 1;

            if outcome.interrupted {
                interrupted = true;
                break;
            }
            if pages_crawled % PROGRESS_EVERY == 0 {
                tracing::info!(board, pages_crawled, "Progress");
            }
            if stop.sleep(self.settings.random_page_delay()).await {
                interrupted = true;
                break;
            }
        }

        if interrupted {
            tracing::warn!(board, pages_crawled, "Crawl interrupted");
        }

        let mut report = CrawlReport {
            board: board.to_string(),
            start,
            pages_crawled,
            page_errors,
            articles_succeeded,
            duplicates_removed: 0,
            final_count: 0,
            elapsed: Duration::ZERO,
            output: None,
            interrupted,
            errors_dir: self.archive.board_dir(board),
        };

        if records.is_empty() {
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        let (records, duplicates) = dedup(records);
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let paths = export_board(&self.settings.data_dir, board, &timestamp, &records)?;

        report.duplicates_removed = duplicates;
        report.final_count = records.len();
        report.output = Some(paths);
        report.elapsed = started.elapsed();
        Ok(report)
    }

    async fn read_article(&self, summary: &ArticleSummary) -> Result<ArticleRecord, CrawlError> {
        if let Some(info) = &summary.remove_info {
            return Err(CrawlError::from_code(ErrorCode::ArticleRemoved, info.clone()));
        }
        let article = fetch_article(&self.client, &summary.url).await?;
        Ok(ArticleRecord::from(&article))
    }

    fn log_page_error(&self, board: &str, page_number: u32, index: u32, error: &CrawlError) {
        if let Err(err) = self.archive.log_page_error(board, page_number, index, error) {
            tracing::warn!(board, "Failed to append page error log: {err}");
        }
    }

    async fn archive_page_error(&self, board: &str, index: u32, path: &str, error: &CrawlError) {
        let response = match self.client.get_raw(path).await {
            Ok(response) => response,
            Err(fetch_err) => {
                tracing::warn!(board, index, "Could not re-fetch failed page for archiving: {fetch_err}");
                return;
            }
        };
        match self.archive.save_page_error(board, index, error, &response) {
            Ok(saved) => tracing::info!(path = %saved.display(), "Saved failed index page"),
            Err(err) => tracing::warn!(board, index, "Could not save failed index page: {err}"),
        }
    }

    async fn archive_article_error(&self, board: &str, summary: &ArticleSummary, error: &CrawlError) {
        if summary.url.is_empty() {
            return;
        }
        let response = match self.client.get_raw(&summary.url).await {
            Ok(response) => response,
            Err(fetch_err) => {
                tracing::warn!(board, aid = %summary.aid, "Could not re-fetch failed article for archiving: {fetch_err}");
                return;
            }
        };
        match self
            .archive
            .save_article_error(board, &summary.aid, &summary.title, error, &response)
        {
            Ok(saved) => tracing::info!(path = %saved.display(), "Saved failed article"),
            Err(err) => tracing::warn!(board, aid = %summary.aid, "Could not save failed article: {err}"),
        }
    }
}
