//! CSV export of crawled articles.
//!
//! Files are UTF-8 with a byte order mark so spreadsheet applications detect
//! the encoding of the Chinese headers, and are replaced atomically so a
//! crash never leaves a truncated `latest` file behind.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ptt_types::ArticleRecord;

use crate::error::{CrawlError, ErrorCode};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Where an export was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    /// `ptt_<board>_<timestamp>.csv`
    pub main: PathBuf,
    /// `ptt_<board>_latest.csv`, overwritten on every run.
    pub latest: PathBuf,
}

/// Drop repeated `(title, author)` pairs, keeping the first. Returns the
/// kept records and how many were removed.
#[must_use]
pub fn dedup(records: Vec<ArticleRecord>) -> (Vec<ArticleRecord>, usize) {
    let before = records.len();
    let mut seen = HashSet::new();
    let kept: Vec<ArticleRecord> = records
        .into_iter()
        .filter(|record| {
            let (title, author) = record.dedup_key();
            seen.insert((title.to_string(), author.to_string()))
        })
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Serialize records to BOM-prefixed CSV with a header row.
pub fn to_csv_bytes(records: &[ArticleRecord]) -> Result<Vec<u8>, CrawlError> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());
    for record in records {
        writer.serialize(record).map_err(|e| {
            CrawlError::from_code(ErrorCode::Export, format!("failed to serialize row: {e}"))
                .with_detail("aid", record.aid.clone())
        })?;
    }
    writer.into_inner().map_err(|e| {
        CrawlError::from_code(ErrorCode::Export, format!("failed to flush CSV: {}", e.error()))
    })
}

pub fn write_csv(path: &Path, records: &[ArticleRecord]) -> Result<(), CrawlError> {
    let bytes = to_csv_bytes(records)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| CrawlError::io("failed to create data directory", &e))?;
    }
    ptt_utils::atomic_write(path, &bytes).map_err(|e| {
        CrawlError::io("failed to write CSV", &e).with_detail("path", path.display().to_string())
    })
}

/// Write the timestamped export and refresh the board's `latest` copy.
pub fn export_board(
    data_dir: &Path,
    board: &str,
    timestamp: &str,
    records: &[ArticleRecord],
) -> Result<ExportPaths, CrawlError> {
    let paths = ExportPaths {
        main: data_dir.join(format!("ptt_{board}_{timestamp}.csv")),
        latest: data_dir.join(format!("ptt_{board}_latest.csv")),
    };
    write_csv(&paths.main, records)?;
    write_csv(&paths.latest, records)?;
    tracing::info!(
        main = %paths.main.display(),
        rows = records.len(),
        "Exported articles"
    );
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(aid: &str, title: &str, author: &str) -> ArticleRecord {
        ArticleRecord {
            aid: aid.to_string(),
            author: author.to_string(),
            board: "Drink".to_string(),
            category: None,
            title: title.to_string(),
            content: "第一行\n第二行, 有逗號".to_string(),
            date: "Sun Jun 18 01:23:45 2023".to_string(),
            ip: "1.2.3.4".to_string(),
            all: 1,
            boo: 0,
            like: 1,
            neutral: 0,
            score: 1,
            comments: r#"[{"type":"推","user":"a","content":"好","ipdatetime":"06/18"}]"#
                .to_string(),
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let records = vec![
            record("M.1", "[心得] 珍奶", "tea"),
            record("M.2", "[心得] 珍奶", "milk"),
            record("M.3", "[心得] 珍奶", "tea"),
        ];
        let (kept, removed) = dedup(records);
        assert_eq!(removed, 1);
        let aids: Vec<_> = kept.iter().map(|r| r.aid.as_str()).collect();
        assert_eq!(aids, vec!["M.1", "M.2"]);
    }

    #[test]
    fn csv_has_bom_and_header() {
        let bytes = to_csv_bytes(&[record("M.1", "t", "a")]).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "文章編碼,作者,版名,分類,標題,內文,日期,IP位置,總留言數,噓,推,中立,文章分數（正-負）,所有留言"
        );
    }

    #[test]
    fn csv_round_trips_multiline_content() {
        let bytes = to_csv_bytes(&[record("M.1", "t", "a")]).unwrap();
        let mut reader = csv::Reader::from_reader(&bytes[UTF8_BOM.len()..]);
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "M.1");
        assert_eq!(&rows[0][3], "");
        assert_eq!(&rows[0][5], "第一行\n第二行, 有逗號");
        assert_eq!(&rows[0][12], "1");
    }

    #[test]
    fn export_writes_main_and_latest() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let records = vec![record("M.1", "t", "a")];

        let paths = export_board(&data_dir, "Drink", "20240101_120000", &records).unwrap();
        assert_eq!(paths.main, data_dir.join("ptt_Drink_20240101_120000.csv"));
        assert_eq!(paths.latest, data_dir.join("ptt_Drink_latest.csv"));
        assert_eq!(
            std::fs::read(&paths.main).unwrap(),
            std::fs::read(&paths.latest).unwrap()
        );
    }
}
