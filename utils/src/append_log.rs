//! Append-only text logs.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Append `line` plus a newline to `path`, creating the file and its parent
/// directories as needed.
pub fn append_line(path: impl AsRef<Path>, line: &str) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}

#[cfg(test)]
mod tests {
    use super::append_line;

    #[test]
    fn appends_and_creates_parents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("errors").join("Drink").join("page_errors.log");

        append_line(&path, "first").expect("append first");
        append_line(&path, "第二行").expect("append second");

        let content = std::fs::read_to_string(&path).expect("read");
        assert_eq!(content, "first\n第二行\n");
    }
}
