//! Board index pages (`/bbs/<board>/index<N>.html`).
//!
//! An index page lists up to twenty article rows (`div.r-ent`) plus an action
//! bar linking to the board, its digest, and the oldest, previous, next and
//! newest index pages. Rows are exposed newest first.

use ptt_types::{ArticleSummary, parse_index_number, parse_std_url};
use scraper::{ElementRef, Html, Selector};

use crate::dom::{first_text, selector, text};
use crate::error::{CrawlError, ErrorCode};
use crate::http::PttClient;

/// Links found in an index page's action bar, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelatedLinks {
    pub board: Option<String>,
    pub man: Option<String>,
    pub oldest: Option<String>,
    pub previous: Option<String>,
    pub next: Option<String>,
    pub newest: Option<String>,
}

impl RelatedLinks {
    fn from_hrefs(hrefs: Vec<Option<String>>) -> Self {
        let mut hrefs = hrefs.into_iter();
        let mut take = || hrefs.next().flatten();
        Self {
            board: take(),
            man: take(),
            oldest: take(),
            previous: take(),
            next: take(),
            newest: take(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArticleListPage {
    /// Path the page was requested with.
    pub url: String,
    pub board: String,
    /// Page number; the newest page's number is derived from its previous link.
    pub index: u32,
    pub links: RelatedLinks,
    rows: Vec<Result<ArticleSummary, CrawlError>>,
}

impl ArticleListPage {
    /// Path of a board index page. `None` selects the newest page.
    #[must_use]
    pub fn path_for(board: &str, index: Option<u32>) -> String {
        match index {
            Some(index) => format!("/bbs/{board}/index{index}.html"),
            None => format!("/bbs/{board}/index.html"),
        }
    }

    pub async fn fetch(client: &PttClient, path: &str) -> Result<Self, CrawlError> {
        let html = client.get_page(path).await?;
        Self::parse(path, &html)
    }

    pub async fn from_board(
        client: &PttClient,
        board: &str,
        index: Option<u32>,
    ) -> Result<Self, CrawlError> {
        Self::fetch(client, &Self::path_for(board, index)).await
    }

    pub fn parse(url: &str, html: &str) -> Result<Self, CrawlError> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let row_sel = selector("div.r-ent")?;
        let row_parser = RowParser::new()?;
        let mut rows: Vec<_> = root
            .select(&row_sel)
            .map(|row| row_parser.parse(row, url))
            .collect();
        rows.reverse();

        let bar_sel = selector("div.action-bar")?;
        let link_sel = selector("a")?;
        let bar = root.select(&bar_sel).next().ok_or_else(|| {
            CrawlError::from_code(ErrorCode::Parse, format!("no action bar on index page {url}"))
                .with_detail("url", url)
        })?;
        let hrefs = bar
            .select(&link_sel)
            .map(|a| a.value().attr("href").map(|h| h.trim().to_string()))
            .collect();
        let links = RelatedLinks::from_hrefs(hrefs);

        let std_url = parse_std_url(url);
        let mut board = std_url.board;
        let index = match parse_index_number(&std_url.aid) {
            Some(index) => index,
            None => match links.previous.as_deref() {
                Some(previous) => {
                    let previous_url = parse_std_url(previous);
                    board = previous_url.board;
                    parse_index_number(&previous_url.aid).map_or(1, |n| n + 1)
                }
                // Only one page exists.
                None => 1,
            },
        };

        Ok(Self {
            url: url.to_string(),
            board,
            index,
            links,
            rows,
        })
    }

    /// Rows newest first. A row missing an expected element yields `InvalidTag`.
    pub fn summaries(&self) -> impl Iterator<Item = &Result<ArticleSummary, CrawlError>> {
        self.rows.iter()
    }

    /// Row at `position` in newest-first order.
    #[must_use]
    pub fn summary(&self, position: usize) -> Option<&Result<ArticleSummary, CrawlError>> {
        self.rows.get(position)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub async fn previous(&self, client: &PttClient) -> Result<Self, CrawlError> {
        Self::fetch(client, self.links.previous.as_deref().unwrap_or_default()).await
    }

    pub async fn next(&self, client: &PttClient) -> Result<Self, CrawlError> {
        Self::fetch(client, self.links.next.as_deref().unwrap_or_default()).await
    }

    pub async fn oldest(&self, client: &PttClient) -> Result<Self, CrawlError> {
        Self::fetch(client, self.links.oldest.as_deref().unwrap_or_default()).await
    }

    pub async fn newest(&self, client: &PttClient) -> Result<Self, CrawlError> {
        Self::fetch(client, self.links.newest.as_deref().unwrap_or_default()).await
    }
}

struct RowParser {
    title: Selector,
    link: Selector,
    nrec: Selector,
    date: Selector,
    author: Selector,
    mark: Selector,
}

impl RowParser {
    fn new() -> Result<Self, CrawlError> {
        Ok(Self {
            title: selector("div.title")?,
            link: selector("a")?,
            nrec: selector("div.nrec")?,
            date: selector("div.date")?,
            author: selector("div.author")?,
            mark: selector("div.mark")?,
        })
    }

    fn parse(&self, row: ElementRef<'_>, page_url: &str) -> Result<ArticleSummary, CrawlError> {
        let invalid = |what: &str| {
            CrawlError::from_code(ErrorCode::InvalidTag, format!("index row without {what}"))
                .with_detail("url", page_url)
                .with_detail("row", row.html())
        };

        let title_div = row.select(&self.title).next().ok_or_else(|| invalid("div.title"))?;
        let (Some(date), Some(author), Some(mark)) = (
            first_text(row, &self.date),
            first_text(row, &self.author),
            first_text(row, &self.mark),
        ) else {
            return Err(invalid("date, author or mark"));
        };

        let Some(link) = title_div.select(&self.link).next() else {
            let remove_info = text(title_div).trim().to_string();
            return Ok(ArticleSummary::removed(remove_info, date, author, mark));
        };

        let href = link.value().attr("href").ok_or_else(|| invalid("article href"))?;
        let score = first_text(row, &self.nrec).ok_or_else(|| invalid("div.nrec"))?;

        Ok(ArticleSummary::new(
            text(link).trim().to_string(),
            href.trim().to_string(),
            score,
            date,
            author,
            mark,
            None,
        ))
    }
}
