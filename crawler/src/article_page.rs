//! Article pages (`/bbs/<board>/<aid>.html`).
//!
//! The body lives in `div#main-content` mixed with markup that is not part of
//! the post: the four meta lines, push comments, `※` system lines, inline
//! media previews and cross-post notices. Parsing pulls each of those out in
//! turn, then splits what is left into content and signature at the first
//! `--`.

use std::collections::HashMap;
use std::sync::OnceLock;

use ptt_types::{Article, Push, PushCounts, parse_article_date, parse_std_url, parse_title};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::dom::{detach_where, first_text, selector, text};
use crate::error::{CrawlError, ErrorCode};
use crate::http::PttClient;

/// IP recorded when the page carries no origin line.
pub const UNKNOWN_IP: &str = "Unknown";

const ORIGIN_KEY: &str = "發信站";
const QUOTE_KEY: &str = "引述";
const CROSS_POST_MARKER: &str = "轉錄至看板";

fn parenthesized_ip() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\((\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\)").expect("valid parenthesized IP regex")
    })
}

fn bare_ip() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:來自|From):\s*(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})")
            .expect("valid origin IP regex")
    })
}

struct ArticleSelectors {
    main: Selector,
    meta_value: Selector,
    metaline: Selector,
    push: Selector,
    push_tag: Selector,
    push_user: Selector,
    push_content: Selector,
    push_ipdatetime: Selector,
    f2: Selector,
    richcontent: Selector,
}

impl ArticleSelectors {
    fn new() -> Result<Self, CrawlError> {
        Ok(Self {
            main: selector("div#main-content")?,
            meta_value: selector("span.article-meta-value")?,
            metaline: selector("div.article-metaline, div.article-metaline-right")?,
            push: selector("div.push")?,
            push_tag: selector("span.push-tag")?,
            push_user: selector("span.push-userid")?,
            push_content: selector("span.push-content")?,
            push_ipdatetime: selector("span.push-ipdatetime")?,
            f2: selector("span.f2")?,
            richcontent: selector("div.richcontent")?,
        })
    }
}

/// Path of an article page.
#[must_use]
pub fn article_path(board: &str, aid: &str) -> String {
    format!("/bbs/{board}/{aid}.html")
}

pub async fn fetch_article(client: &PttClient, url: &str) -> Result<Article, CrawlError> {
    let html = client.get_page(url).await?;
    parse_article(url, &html)
}

/// Parse an article page. `url` is the path or URL it was loaded from.
pub fn parse_article(url: &str, html: &str) -> Result<Article, CrawlError> {
    let sel = ArticleSelectors::new()?;
    let mut document = Html::parse_document(html);

    let mut article = Article {
        aid: parse_std_url(url).aid,
        url: url.to_string(),
        ..Article::default()
    };

    let pushes = {
        let main = main_content(&document, &sel.main, url)?;
        read_meta(main, &sel, &mut article);
        main.select(&sel.push)
            .filter_map(|tag| parse_push(tag, &sel))
            .collect::<Vec<_>>()
    };
    detach_where(&mut document, &sel.main, &sel.metaline, |_| true);
    detach_where(&mut document, &sel.main, &sel.push, |_| true);
    article.counts = PushCounts::tally(&pushes);
    article.pushes = pushes;

    let system_lines = {
        let main = main_content(&document, &sel.main, url)?;
        collect_system_lines(main, &sel.f2)
    };
    detach_where(&mut document, &sel.main, &sel.f2, |tag| {
        system_line(&text(tag)).is_some_and(|(key, _)| !key.contains(QUOTE_KEY))
    });

    article.ip = {
        let main = main_content(&document, &sel.main, url)?;
        system_lines
            .get(ORIGIN_KEY)
            .and_then(|values| values.first())
            .and_then(|origin| ip_from_origin(origin))
            .or_else(|| ip_fallback(main, &sel.f2))
            .unwrap_or_else(|| {
                tracing::debug!(url, "No origin IP found in article");
                UNKNOWN_IP.to_string()
            })
    };

    detach_where(&mut document, &sel.main, &sel.richcontent, |_| true);
    remove_cross_post_notices(&mut document, &sel);

    let serialized = main_content(&document, &sel.main, url)?.html();
    let (content, signature) = split_signature(&serialized);
    article.content = content;
    article.signature = signature;

    Ok(article)
}

fn main_content<'a>(
    document: &'a Html,
    main_sel: &Selector,
    url: &str,
) -> Result<ElementRef<'a>, CrawlError> {
    document.root_element().select(main_sel).next().ok_or_else(|| {
        CrawlError::from_code(ErrorCode::Parse, format!("no main-content in article page {url}"))
            .with_detail("url", url)
    })
}

/// Author, board, title and date come from the first four meta values. If
/// any is missing or the date does not parse, all stay empty.
fn read_meta(main: ElementRef<'_>, sel: &ArticleSelectors, article: &mut Article) {
    let values: Vec<String> = main
        .select(&sel.meta_value)
        .take(4)
        .map(|tag| text(tag).trim().to_string())
        .collect();
    let [author, board, title, date] = values.as_slice() else {
        return;
    };
    let Some(datetime) = parse_article_date(date) else {
        return;
    };

    let info = parse_title(title);
    article.author.clone_from(author);
    article.board.clone_from(board);
    article.title.clone_from(title);
    article.date.clone_from(date);
    article.datetime = Some(datetime);
    article.category = info.category;
    article.is_reply = info.is_reply;
    article.is_forward = info.is_forward;
}

fn parse_push(tag: ElementRef<'_>, sel: &ArticleSelectors) -> Option<Push> {
    let push_tag = first_text(tag, &sel.push_tag)?;
    let user = first_text(tag, &sel.push_user).unwrap_or_default();
    let ip_datetime = first_text(tag, &sel.push_ipdatetime).unwrap_or_default();

    // Text nodes joined by spaces, minus the leading ':' separator.
    let content = tag
        .select(&sel.push_content)
        .next()
        .map(|span| {
            let joined = span.text().collect::<Vec<_>>().join(" ");
            let mut chars = joined.chars();
            chars.next();
            chars.as_str().trim().to_string()
        })
        .unwrap_or_default();

    Some(Push::new(push_tag, user, content, ip_datetime))
}

/// Split a `※ key: value` line. Returns `None` for text without `※`.
fn system_line(line: &str) -> Option<(String, String)> {
    if !line.contains('※') {
        return None;
    }
    let (key, value) = line.split_once(':').unwrap_or((line, ""));
    let key = key.trim_matches('※').trim().to_string();
    Some((key, value.trim().to_string()))
}

/// `※` lines keyed by their label, quote attributions excluded.
fn collect_system_lines(main: ElementRef<'_>, f2: &Selector) -> HashMap<String, Vec<String>> {
    let mut lines: HashMap<String, Vec<String>> = HashMap::new();
    for tag in main.select(f2) {
        if let Some((key, value)) = system_line(&text(tag))
            && !key.contains(QUOTE_KEY)
        {
            lines.entry(key).or_default().push(value);
        }
    }
    lines
}

/// `批踢踢實業坊(ptt.cc), 來自: 1.2.3.4 (臺灣)` -> `1.2.3.4`. Older pages
/// end the line with the address itself.
fn ip_from_origin(origin: &str) -> Option<String> {
    let token = match origin.split_once("來自:") {
        Some((_, rest)) => rest.split_whitespace().next(),
        None => origin.split_whitespace().last(),
    };
    token.map(ToString::to_string)
}

fn ip_fallback(main: ElementRef<'_>, f2: &Selector) -> Option<String> {
    if let Some(caps) = parenthesized_ip().captures(&text(main)) {
        return Some(caps[1].to_string());
    }
    main.select(f2)
        .map(text)
        .filter(|line| line.contains("來自:") || line.contains("From:"))
        .find_map(|line| {
            parenthesized_ip()
                .captures(&line)
                .or_else(|| bare_ip().captures(&line))
                .map(|caps| caps[1].to_string())
        })
}

/// Drop each cross-post notice together with its neighbouring siblings.
fn remove_cross_post_notices(document: &mut Html, sel: &ArticleSelectors) {
    let ids: Vec<_> = match document.root_element().select(&sel.main).next() {
        Some(main) => main
            .select(&sel.f2)
            .filter(|tag| text(*tag).contains(CROSS_POST_MARKER))
            .flat_map(|tag| {
                let previous = tag.prev_sibling().filter(|node| node.value().is_element());
                let next = tag.next_sibling();
                [Some(tag.id()), previous.map(|n| n.id()), next.map(|n| n.id())]
            })
            .flatten()
            .collect(),
        None => return,
    };
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Content runs up to the first `--`; the signature is the text between the
/// first and second `--`.
fn split_signature(serialized: &str) -> (String, String) {
    let (content, signature) = match serialized.split_once("--") {
        Some((before, after)) => {
            let signature = after.split_once("--").map_or(after, |(sig, _)| sig);
            (before.trim(), signature)
        }
        None => (serialized.trim(), ""),
    };

    let content = content
        .split('\n')
        .filter(|line| !(line.contains("<div") && line.contains("main-content")))
        .collect::<Vec<_>>()
        .join("\n");
    let signature = signature
        .split('\n')
        .filter(|line| !line.contains("</div"))
        .collect::<Vec<_>>()
        .join("\n");
    (content, signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"<html><body>
<div id="main-container">
<div id="main-content" class="bbs-screen bbs-content"><div class="article-metaline"><span class="article-meta-tag">作者</span><span class="article-meta-value">tea (茶)</span></div><div class="article-metaline-right"><span class="article-meta-tag">看板</span><span class="article-meta-value">Drink</span></div><div class="article-metaline"><span class="article-meta-tag">標題</span><span class="article-meta-value">Re: [心得] 春水堂 珍奶</span></div><div class="article-metaline"><span class="article-meta-tag">時間</span><span class="article-meta-value">Sun Jun 18 01:23:45 2023</span></div>
第一行內文
第二行內文
<div class="richcontent"><img src="https://i.imgur.com/x.jpg"></div>
<span class="f2">※ 引述《milk (牛奶)》之銘言：</span>
: 引用內容

--
我的簽名檔
--
<span class="f2">※ 發信站: 批踢踢實業坊(ptt.cc), 來自: 36.231.1.2 (臺灣)
</span><span class="f2">※ 文章網址: https://www.ptt.cc/bbs/Drink/M.1687022625.A.ABC.html
</span><div class="push"><span class="hl push-tag">推 </span><span class="f3 hl push-userid">alice</span><span class="f3 push-content">: 好喝</span><span class="push-ipdatetime"> 06/18 01:30
</span></div><div class="push"><span class="f1 hl push-tag">噓 </span><span class="f3 hl push-userid">bob</span><span class="f3 push-content">: 太甜</span><span class="push-ipdatetime"> 06/18 01:31
</span></div><div class="push"><span class="f1 hl push-tag">→ </span><span class="f3 hl push-userid">carol</span><span class="f3 push-content">: 普通</span><span class="push-ipdatetime"> 06/18 01:32
</span></div><div class="push center warning-box">檔案過大！部分文章無法顯示</div></div>
</div>
</body></html>"#;

    #[test]
    fn parses_meta_and_title_info() {
        let article = parse_article("/bbs/Drink/M.1687022625.A.ABC.html", ARTICLE).unwrap();
        assert_eq!(article.aid, "M.1687022625.A.ABC");
        assert_eq!(article.author, "tea (茶)");
        assert_eq!(article.board, "Drink");
        assert_eq!(article.title, "Re: [心得] 春水堂 珍奶");
        assert_eq!(article.date, "Sun Jun 18 01:23:45 2023");
        assert!(article.datetime.is_some());
        assert_eq!(article.category.as_deref(), Some("心得"));
        assert!(article.is_reply);
        assert!(!article.is_forward);
    }

    #[test]
    fn parses_pushes_and_counts() {
        let article = parse_article("/bbs/Drink/M.1687022625.A.ABC.html", ARTICLE).unwrap();
        assert_eq!(article.pushes.len(), 3);
        assert_eq!(article.pushes[0].tag, "推");
        assert_eq!(article.pushes[0].user, "alice");
        assert_eq!(article.pushes[0].content, "好喝");
        assert_eq!(article.pushes[0].ip_datetime, "06/18 01:30");
        assert_eq!(article.counts.like, 1);
        assert_eq!(article.counts.boo, 1);
        assert_eq!(article.counts.neutral, 1);
        assert_eq!(article.counts.all, 3);
        assert_eq!(article.counts.score, 0);
    }

    #[test]
    fn extracts_origin_ip() {
        let article = parse_article("/bbs/Drink/M.1687022625.A.ABC.html", ARTICLE).unwrap();
        assert_eq!(article.ip, "36.231.1.2");
    }

    #[test]
    fn content_excludes_metadata_and_media() {
        let article = parse_article("/bbs/Drink/M.1687022625.A.ABC.html", ARTICLE).unwrap();
        assert!(article.content.contains("第一行內文\n第二行內文"));
        assert!(article.content.contains("引述《milk (牛奶)》之銘言"));
        assert!(!article.content.contains("article-meta"));
        assert!(!article.content.contains("richcontent"));
        assert!(!article.content.contains("main-content"));
        assert!(!article.content.contains("--"));
        assert_eq!(article.signature.trim(), "我的簽名檔");
    }

    #[test]
    fn system_lines_are_removed_from_body() {
        let article = parse_article("/bbs/Drink/M.1687022625.A.ABC.html", ARTICLE).unwrap();
        assert!(!article.content.contains("發信站"));
        assert!(!article.signature.contains("文章網址"));
        assert!(!article.content.contains("push-tag"));
    }

    #[test]
    fn missing_meta_leaves_fields_empty() {
        let html = r#"<div id="main-content">
只有內文
--
</div>"#;
        let article = parse_article("/bbs/Drink/M.1.A.2.html", html).unwrap();
        assert_eq!(article.author, "");
        assert_eq!(article.title, "");
        assert!(article.datetime.is_none());
        assert_eq!(article.content, "只有內文");
        assert_eq!(article.ip, UNKNOWN_IP);
    }

    #[test]
    fn unparseable_date_clears_all_meta() {
        let html = r#"<div id="main-content"><div class="article-metaline"><span class="article-meta-value">a</span></div><div class="article-metaline-right"><span class="article-meta-value">Drink</span></div><div class="article-metaline"><span class="article-meta-value">t</span></div><div class="article-metaline"><span class="article-meta-value">yesterday</span></div>
body</div>"#;
        let article = parse_article("/bbs/Drink/M.1.A.2.html", html).unwrap();
        assert_eq!(article.author, "");
        assert_eq!(article.board, "");
        assert!(article.datetime.is_none());
    }

    #[test]
    fn ip_fallback_from_parenthesized_address() {
        let html = r#"<div id="main-content">內文
<span class="f2">◆ From: (140.112.1.1)</span>
</div>"#;
        let article = parse_article("/bbs/Drink/M.1.A.2.html", html).unwrap();
        assert_eq!(article.ip, "140.112.1.1");
    }

    #[test]
    fn ip_fallback_from_bare_address() {
        let html = r#"<div id="main-content">內文
<span class="f2">◆ From: 140.112.1.9</span>
</div>"#;
        let article = parse_article("/bbs/Drink/M.1.A.2.html", html).unwrap();
        assert_eq!(article.ip, "140.112.1.9");
    }

    #[test]
    fn legacy_origin_line_uses_last_token() {
        assert_eq!(
            ip_from_origin("批踢踢實業坊(ptt.cc) 114.25.1.1").as_deref(),
            Some("114.25.1.1")
        );
        assert_eq!(
            ip_from_origin("批踢踢實業坊(ptt.cc), 來自: 36.231.1.2 (臺灣)").as_deref(),
            Some("36.231.1.2")
        );
    }

    #[test]
    fn cross_post_notice_removed_with_neighbours() {
        let html = r#"<div id="main-content">
內文
<span class="f2">※ </span><span class="f2">tea:轉錄至看板 Tea</span><span class="f2">06/18 02:00</span>
結尾</div>"#;
        let article = parse_article("/bbs/Drink/M.1.A.2.html", html).unwrap();
        assert!(!article.content.contains("轉錄至看板"));
        assert!(!article.content.contains("06/18 02:00"));
        assert!(article.content.contains("內文"));
        assert!(article.content.contains("結尾"));
    }

    #[test]
    fn page_without_main_content_is_parse_error() {
        let err = parse_article("/bbs/Drink/M.1.A.2.html", "<html><body>404</body></html>")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Parse);
    }

    #[test]
    fn system_line_splits_on_first_colon() {
        assert_eq!(
            system_line("※ 文章網址: https://www.ptt.cc/x.html"),
            Some((
                "文章網址".to_string(),
                "https://www.ptt.cc/x.html".to_string()
            ))
        );
        assert_eq!(system_line("no marker: here"), None);
    }

    #[test]
    fn article_path_joins_board_and_aid() {
        assert_eq!(
            article_path("Drink", "M.1.A.2"),
            "/bbs/Drink/M.1.A.2.html"
        );
    }
}
