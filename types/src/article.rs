//! Article, summary, and push comment types.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::parse::{parse_std_url, parse_title};

/// Title shown for a row whose article has been deleted.
pub const REMOVED_TITLE: &str = "本文章已被刪除";

/// Date format used by the `時間` article meta line, e.g. `Sun Jun 18 01:23:45 2023`.
pub const ARTICLE_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// One row of an article index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleSummary {
    pub title: String,
    pub category: Option<String>,
    pub is_reply: bool,
    pub is_forward: bool,

    /// Link to the article, relative to the site root. Empty for removed rows.
    pub url: String,
    pub board: String,
    pub aid: String,

    /// The `nrec` column: push score, `爆`, `X1`, or empty.
    pub score: String,
    pub date: String,
    pub author: String,
    pub mark: String,

    /// Text shown in place of the title when the article was deleted.
    pub remove_info: Option<String>,
}

impl ArticleSummary {
    #[must_use]
    pub fn new(
        title: String,
        url: String,
        score: String,
        date: String,
        author: String,
        mark: String,
        remove_info: Option<String>,
    ) -> Self {
        let info = parse_title(&title);
        let std_url = parse_std_url(&url);
        Self {
            title,
            category: info.category,
            is_reply: info.is_reply,
            is_forward: info.is_forward,
            url,
            board: std_url.board,
            aid: std_url.aid,
            score,
            date,
            author,
            mark,
            remove_info,
        }
    }

    /// Build the placeholder summary for a deleted article.
    #[must_use]
    pub fn removed(remove_info: String, date: String, author: String, mark: String) -> Self {
        Self::new(
            REMOVED_TITLE.to_string(),
            String::new(),
            String::new(),
            date,
            author,
            mark,
            Some(remove_info),
        )
    }

    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.remove_info.is_some()
    }
}

impl std::fmt::Display for ArticleSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// Push comment kind, derived from the `push-tag` span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushKind {
    /// `推`
    Like,
    /// `噓`
    Boo,
    /// `→` or anything unrecognized.
    Neutral,
}

impl PushKind {
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "推" => Self::Like,
            "噓" => Self::Boo,
            _ => Self::Neutral,
        }
    }
}

/// A single push comment.
///
/// Serializes to the `{type, user, content, ipdatetime}` shape used in the
/// exported comment column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Push {
    #[serde(skip)]
    pub kind: PushKind,
    #[serde(rename = "type")]
    pub tag: String,
    pub user: String,
    pub content: String,
    #[serde(rename = "ipdatetime")]
    pub ip_datetime: String,
}

impl Push {
    pub fn new(
        tag: impl Into<String>,
        user: impl Into<String>,
        content: impl Into<String>,
        ip_datetime: impl Into<String>,
    ) -> Self {
        let tag = tag.into();
        Self {
            kind: PushKind::from_tag(&tag),
            tag,
            user: user.into(),
            content: content.into(),
            ip_datetime: ip_datetime.into(),
        }
    }
}

/// Aggregated push statistics for an article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushCounts {
    pub all: u32,
    pub like: u32,
    pub boo: u32,
    pub neutral: u32,
    /// `like - boo`.
    pub score: i64,
}

impl PushCounts {
    #[must_use]
    pub fn tally(pushes: &[Push]) -> Self {
        let mut counts = Self::default();
        for push in pushes {
            match push.kind {
                PushKind::Like => counts.like += 1,
                PushKind::Boo => counts.boo += 1,
                PushKind::Neutral => counts.neutral += 1,
            }
        }
        counts.all = counts.like + counts.boo + counts.neutral;
        counts.score = i64::from(counts.like) - i64::from(counts.boo);
        counts
    }
}

/// A fully parsed article page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    pub aid: String,
    /// URL the article was loaded from, as given by the index page.
    pub url: String,

    pub author: String,
    pub board: String,
    pub title: String,
    /// Raw `時間` meta value.
    pub date: String,
    pub datetime: Option<NaiveDateTime>,

    pub category: Option<String>,
    pub is_reply: bool,
    pub is_forward: bool,

    pub content: String,
    pub signature: String,
    pub ip: String,

    pub pushes: Vec<Push>,
    pub counts: PushCounts,
}

impl std::fmt::Display for Article {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// Parse the `時間` meta value of an article.
#[must_use]
pub fn parse_article_date(date: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(date.trim(), ARTICLE_DATE_FORMAT).ok()
}

/// One exported CSV row. Field names are the column headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
    #[serde(rename = "文章編碼")]
    pub aid: String,
    #[serde(rename = "作者")]
    pub author: String,
    #[serde(rename = "版名")]
    pub board: String,
    #[serde(rename = "分類")]
    pub category: Option<String>,
    #[serde(rename = "標題")]
    pub title: String,
    #[serde(rename = "內文")]
    pub content: String,
    #[serde(rename = "日期")]
    pub date: String,
    #[serde(rename = "IP位置")]
    pub ip: String,
    #[serde(rename = "總留言數")]
    pub all: u32,
    #[serde(rename = "噓")]
    pub boo: u32,
    #[serde(rename = "推")]
    pub like: u32,
    #[serde(rename = "中立")]
    pub neutral: u32,
    #[serde(rename = "文章分數（正-負）")]
    pub score: i64,
    /// JSON array of push comments.
    #[serde(rename = "所有留言")]
    pub comments: String,
}

impl ArticleRecord {
    /// Key used to drop repeated articles across pages.
    #[must_use]
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.title, &self.author)
    }
}

impl From<&Article> for ArticleRecord {
    fn from(article: &Article) -> Self {
        let comments = serde_json::to_string(&article.pushes).unwrap_or_else(|_| "[]".into());
        Self {
            aid: article.aid.clone(),
            author: article.author.clone(),
            board: article.board.clone(),
            category: article.category.clone(),
            title: article.title.clone(),
            content: article.content.clone(),
            date: article.date.clone(),
            ip: article.ip.clone(),
            all: article.counts.all,
            boo: article.counts.boo,
            like: article.counts.like,
            neutral: article.counts.neutral,
            score: article.counts.score,
            comments,
        }
    }
}
