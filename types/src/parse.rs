//! String parsers for PTT URLs, titles, and user names.
//!
//! These operate on the raw strings scraped from the web front end and never
//! fail on odd input except where noted; a malformed URL simply produces empty
//! components.

use thiserror::Error;

/// Components of a standard PTT URL.
///
/// `https://www.ptt.cc/bbs/Gossiping/M.1512057611.A.16B.html` splits into
/// `bbs = "https://www.ptt.cc/bbs"`, `board = "Gossiping"`,
/// `aid = "M.1512057611.A.16B"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdUrl {
    pub bbs: String,
    pub board: String,
    /// Basename without its extension (`M.…` for articles, `indexN` for lists).
    pub aid: String,
}

/// Split a standard PTT URL into its bbs root, board and article id.
///
/// Works on absolute and relative URLs alike. A basename without a `.`
/// yields an empty `aid`.
#[must_use]
pub fn parse_std_url(url: &str) -> StdUrl {
    let (prefix, basename) = url.rsplit_once('/').unwrap_or(("", url));
    let aid = basename.rsplit_once('.').map_or("", |(stem, _)| stem);
    let (bbs, board) = prefix.rsplit_once('/').unwrap_or(("", prefix));
    StdUrl {
        bbs: bbs.to_string(),
        board: board.to_string(),
        aid: aid.to_string(),
    }
}

/// Information derived from an article title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleInfo {
    /// Text inside the leading `[...]`, e.g. `問卦`.
    pub category: Option<String>,
    pub is_reply: bool,
    pub is_forward: bool,
}

/// Parse an article title such as `Re: [問卦] 睡覺到底可不可以穿襪子`.
///
/// The category runs from the first `[` to the last `]` after it.
#[must_use]
pub fn parse_title(title: &str) -> TitleInfo {
    let after_open = title.split_once('[').map_or("", |(_, rest)| rest);
    let category = after_open.rsplit_once(']').map_or("", |(inner, _)| inner);
    TitleInfo {
        category: (!category.is_empty()).then(|| category.to_string()),
        is_reply: title.contains("Re:"),
        is_forward: title.contains("Fw:"),
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed user name: {0:?}")]
pub struct UsernameError(pub String);

/// Split `seabox (歐陽盒盒)` into the account `seabox` and nickname `歐陽盒盒`.
pub fn parse_username(full_name: &str) -> Result<(String, String), UsernameError> {
    let mut parts = full_name.split(" (");
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(nickname), None) => Ok((
            name.to_string(),
            nickname.trim_end_matches(')').to_string(),
        )),
        _ => Err(UsernameError(full_name.to_string())),
    }
}

/// Extract the page number from an index basename (`index123` -> 123).
///
/// Returns `None` for the bare `index` basename of the newest page.
#[must_use]
pub fn parse_index_number(basename: &str) -> Option<u32> {
    let (_, digits) = basename.split_once("index")?;
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_url_absolute() {
        let parsed = parse_std_url("https://www.ptt.cc/bbs/Gossiping/M.1512057611.A.16B.html");
        assert_eq!(parsed.bbs, "https://www.ptt.cc/bbs");
        assert_eq!(parsed.board, "Gossiping");
        assert_eq!(parsed.aid, "M.1512057611.A.16B");
    }

    #[test]
    fn std_url_relative_index() {
        let parsed = parse_std_url("/bbs/Drink/index5012.html");
        assert_eq!(parsed.bbs, "/bbs");
        assert_eq!(parsed.board, "Drink");
        assert_eq!(parsed.aid, "index5012");
    }

    #[test]
    fn std_url_without_extension_has_empty_aid() {
        let parsed = parse_std_url("/bbs/Drink/index");
        assert_eq!(parsed.board, "Drink");
        assert_eq!(parsed.aid, "");
    }

    #[test]
    fn title_reply_with_category() {
        let info = parse_title("Re: [問卦] 睡覺到底可不可以穿襪子");
        assert_eq!(info.category.as_deref(), Some("問卦"));
        assert!(info.is_reply);
        assert!(!info.is_forward);
    }

    #[test]
    fn title_forward_without_category() {
        let info = parse_title("Fw: 手搖飲推薦");
        assert_eq!(info.category, None);
        assert!(!info.is_reply);
        assert!(info.is_forward);
    }

    #[test]
    fn title_empty_brackets_is_no_category() {
        assert_eq!(parse_title("[] 空分類").category, None);
    }

    #[test]
    fn username_with_nickname() {
        let (name, nick) = parse_username("seabox (歐陽盒盒)").unwrap();
        assert_eq!(name, "seabox");
        assert_eq!(nick, "歐陽盒盒");
    }

    #[test]
    fn username_without_nickname_is_error() {
        assert!(parse_username("seabox").is_err());
    }

    #[test]
    fn index_number() {
        assert_eq!(parse_index_number("index42"), Some(42));
        assert_eq!(parse_index_number("index"), None);
        assert_eq!(parse_index_number("M.1.A.2"), None);
    }
}
