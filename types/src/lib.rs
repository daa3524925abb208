//! Core domain types for the PTT crawler.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies:
//! index rows, parsed articles, push comments, the exported CSV row, and the
//! string parsers that derive boards, ids and categories from scraped text.

mod article;
mod parse;
mod sanitize;

pub use article::{
    ARTICLE_DATE_FORMAT, Article, ArticleRecord, ArticleSummary, Push, PushCounts, PushKind,
    REMOVED_TITLE, parse_article_date,
};
pub use parse::{
    StdUrl, TitleInfo, UsernameError, parse_index_number, parse_std_url, parse_title,
    parse_username,
};
pub use sanitize::{display_title, sanitize_terminal_text};

/// Board crawled when none is configured.
pub const DEFAULT_BOARD: &str = "Drink";
