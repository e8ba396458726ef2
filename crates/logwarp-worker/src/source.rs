//! Log sources
//!
//! Jobs name a file directly inside the configured log folder. The file is read once,
//! front to back; invalid UTF-8 is replaced rather than rejected.

use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Check that `name` is a regular file directly inside `root`
///
/// Names with path separators or `..` never match.
pub async fn log_file_exists(root: &Path, name: &str) -> io::Result<bool> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Ok(false);
    }

    let mut entries = tokio::fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_str() != Some(name) {
            continue;
        }
        let file_type = entry.file_type().await?;
        return Ok(!file_type.is_dir());
    }

    Ok(false)
}

/// Sequential line reader over one log file
pub struct LineSource {
    reader: BufReader<File>,
    buf: Vec<u8>,
    line_number: u64,
}

impl LineSource {
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path).await?;

        Ok(Self {
            reader: BufReader::new(file),
            buf: Vec::with_capacity(4096),
            line_number: 0,
        })
    }

    /// Number of lines returned so far
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Next line without its terminator, or `None` at end of input
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        self.line_number += 1;
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_log_file_exists() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("access.log"), "line\n").unwrap();
        std::fs::create_dir(dir.path().join("archive")).unwrap();
        std::fs::write(dir.path().join("archive").join("old.log"), "line\n").unwrap();

        assert!(log_file_exists(dir.path(), "access.log").await.unwrap());
        assert!(!log_file_exists(dir.path(), "missing.log").await.unwrap());
        assert!(!log_file_exists(dir.path(), "archive").await.unwrap());
        assert!(!log_file_exists(dir.path(), "archive/old.log").await.unwrap());
        assert!(!log_file_exists(dir.path(), "../access.log").await.unwrap());
        assert!(!log_file_exists(dir.path(), "").await.unwrap());
    }

    #[tokio::test]
    async fn test_unreadable_root_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(log_file_exists(&missing, "a.log").await.is_err());
    }

    #[tokio::test]
    async fn test_next_line_strips_terminators() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mixed.log");
        std::fs::write(&path, b"first\r\nsecond\n\nbad \xff byte\nlast").unwrap();

        let mut source = LineSource::open(&path).await.unwrap();
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("first"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some(""));
        assert_eq!(
            source.next_line().await.unwrap().as_deref(),
            Some("bad \u{FFFD} byte")
        );
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("last"));
        assert_eq!(source.next_line().await.unwrap(), None);
        assert_eq!(source.line_number(), 5);
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(LineSource::open(dir.path().join("absent.log")).await.is_err());
    }
}
