//! Field-selected dumps of a parsed article.
//!
//! Fields are dotted paths into the article's JSON view, e.g. `author` or
//! `pushes.count.score`.

use ptt_types::Article;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::{CrawlError, ErrorCode};

const DEFAULT_FIELDS: [&str; 6] = ["board", "aid", "author", "date", "content", "ip"];

/// Fields dumped by [`dump_json`] when none are given.
pub const DEFAULT_JSON_FIELDS: [&str; 8] = [
    DEFAULT_FIELDS[0],
    DEFAULT_FIELDS[1],
    DEFAULT_FIELDS[2],
    DEFAULT_FIELDS[3],
    DEFAULT_FIELDS[4],
    DEFAULT_FIELDS[5],
    "pushes.count",
    "pushes.simple_expression",
];

/// Fields dumped by [`dump_csv`] when none are given.
pub const DEFAULT_CSV_FIELDS: [&str; 7] = [
    DEFAULT_FIELDS[0],
    DEFAULT_FIELDS[1],
    DEFAULT_FIELDS[2],
    DEFAULT_FIELDS[3],
    DEFAULT_FIELDS[4],
    DEFAULT_FIELDS[5],
    "pushes.count.score",
];

/// The article as a JSON tree that field paths resolve against.
#[must_use]
pub fn article_view(article: &Article) -> Value {
    json!({
        "aid": article.aid,
        "url": article.url,
        "author": article.author,
        "board": article.board,
        "title": article.title,
        "date": article.date,
        "datetime": article.datetime.map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        "category": article.category,
        "is_reply": article.is_reply,
        "is_forward": article.is_forward,
        "content": article.content,
        "signature": article.signature,
        "ip": article.ip,
        "pushes": {
            "count": article.counts,
            "simple_expression": article.pushes,
        },
    })
}

fn lookup<'a>(view: &'a Value, field: &str) -> Result<&'a Value, CrawlError> {
    field
        .split('.')
        .try_fold(view, |node, key| node.get(key))
        .ok_or_else(|| {
            CrawlError::from_code(ErrorCode::UnknownField, format!("unknown article field: {field}"))
                .with_detail("field", field)
        })
}

/// Dump the selected fields as a JSON object keyed by field path. Pretty
/// output uses four-space indentation.
pub fn dump_json(article: &Article, fields: &[&str], pretty: bool) -> Result<String, CrawlError> {
    let fields = if fields.is_empty() {
        &DEFAULT_JSON_FIELDS[..]
    } else {
        fields
    };

    let view = article_view(article);
    let mut data = Map::new();
    for field in fields {
        data.insert((*field).to_string(), lookup(&view, field)?.clone());
    }
    let data = Value::Object(data);

    if !pretty {
        return Ok(data.to_string());
    }
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    data.serialize(&mut serializer).map_err(|e| {
        CrawlError::from_code(ErrorCode::Internal, format!("failed to serialize article: {e}"))
    })?;
    String::from_utf8(out).map_err(|e| {
        CrawlError::from_code(ErrorCode::Internal, format!("serialized article is not UTF-8: {e}"))
    })
}

/// Dump the selected fields as one delimited line. Values spanning several
/// lines are rendered escaped and quoted, see [`quote_escaped`].
pub fn dump_csv(article: &Article, fields: &[&str], delimiter: &str) -> Result<String, CrawlError> {
    let fields = if fields.is_empty() {
        &DEFAULT_CSV_FIELDS[..]
    } else {
        fields
    };

    let view = article_view(article);
    let cols = fields
        .iter()
        .map(|field| {
            let col = match lookup(&view, field)? {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            Ok(if col.contains('\n') { quote_escaped(&col) } else { col })
        })
        .collect::<Result<Vec<_>, CrawlError>>()?;
    Ok(cols.join(delimiter))
}

/// Single-quoted literal with escaped line breaks, backslashes and control
/// characters. Double quotes are used instead when the value contains a
/// single quote and no double quote.
fn quote_escaped(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() && u32::from(c) < 0x100 => {
                out.push_str(&format!("\\x{:02x}", u32::from(c)));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use ptt_types::{Push, PushCounts};

    use super::*;

    fn article() -> Article {
        let pushes = vec![
            Push::new("推", "alice", "好喝", "06/18 01:30"),
            Push::new("推", "bob", "推", "06/18 01:31"),
        ];
        Article {
            aid: "M.1.A.2".to_string(),
            author: "tea (茶)".to_string(),
            board: "Drink".to_string(),
            title: "[心得] 珍奶".to_string(),
            date: "Sun Jun 18 01:23:45 2023".to_string(),
            content: "第一行\n第二行".to_string(),
            ip: "36.231.1.2".to_string(),
            counts: PushCounts::tally(&pushes),
            pushes,
            ..Article::default()
        }
    }

    #[test]
    fn json_default_fields() {
        let dumped = dump_json(&article(), &[], false).unwrap();
        let value: Value = serde_json::from_str(&dumped).unwrap();
        assert_eq!(value["board"], "Drink");
        assert_eq!(value["pushes.count"]["like"], 2);
        assert_eq!(value["pushes.count"]["score"], 2);
        assert_eq!(value["pushes.simple_expression"][0]["user"], "alice");
        assert_eq!(value["pushes.simple_expression"][1]["type"], "推");
        assert!(dumped.contains("第一行"), "non-ASCII stays unescaped");
    }

    #[test]
    fn json_pretty_uses_four_spaces() {
        let dumped = dump_json(&article(), &["aid"], true).unwrap();
        assert_eq!(dumped, "{\n    \"aid\": \"M.1.A.2\"\n}");
    }

    #[test]
    fn csv_default_fields_quote_multiline() {
        let dumped = dump_csv(&article(), &[], ",").unwrap();
        assert_eq!(
            dumped,
            "Drink,M.1.A.2,tea (茶),Sun Jun 18 01:23:45 2023,'第一行\\n第二行',36.231.1.2,2"
        );
    }

    #[test]
    fn csv_custom_delimiter_and_fields() {
        let dumped = dump_csv(&article(), &["aid", "pushes.count.all"], "\t").unwrap();
        assert_eq!(dumped, "M.1.A.2\t2");
    }

    #[test]
    fn quoting_follows_literal_rules() {
        assert_eq!(quote_escaped("a\nb"), "'a\\nb'");
        assert_eq!(quote_escaped("it's\n"), "\"it's\\n\"");
        assert_eq!(quote_escaped("it's \"x\"\n"), "'it\\'s \"x\"\\n'");
        assert_eq!(quote_escaped("c:\\tmp\t\u{7}\n"), "'c:\\\\tmp\\t\\x07\\n'");
        assert_eq!(quote_escaped("推\n"), "'推\\n'");
    }

    #[test]
    fn unknown_field_is_error() {
        let err = dump_json(&article(), &["pushes.nope"], false).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownField);
        assert_eq!(err.detail("field"), Some("pushes.nope"));

        let err = dump_csv(&article(), &["nope"], ",").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownField);
    }
}
