//! Buffered output sink for generated statements.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{BackupError, Result};

/// Accumulates dump text and writes it to the destination on [`flush`].
///
/// Every emitter appends to the same sink; nothing reaches the destination
/// until a flush, so the buffer is the only place generated text lives.
///
/// [`flush`]: OutputSink::flush
pub struct OutputSink<W> {
    writer: W,
    buffer: String,
    bytes_written: u64,
}

impl<W: AsyncWrite + Unpin + Send> OutputSink<W> {
    /// Wrap a destination stream.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: String::new(),
            bytes_written: 0,
        }
    }

    /// Append text to the buffer.
    pub fn append(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Direct access to the buffer for in-place formatting.
    pub fn buffer_mut(&mut self) -> &mut String {
        &mut self.buffer
    }

    /// Total bytes written to the destination so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Write the buffer to the destination and empty it.
    pub async fn flush(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.writer
                .write_all(self.buffer.as_bytes())
                .await
                .map_err(|e| BackupError::sink("writing dump", e))?;
            self.bytes_written += self.buffer.len() as u64;
            self.buffer.clear();
        }
        self.writer
            .flush()
            .await
            .map_err(|e| BackupError::sink("flushing dump", e))
    }

    /// Flush everything and hand back the destination.
    pub async fn finish(mut self) -> Result<W> {
        self.flush().await?;
        Ok(self.writer)
    }
}

/// `{folder}/{database}_{YYYY-MM-DD_HH-MM-SS}.sql`
pub fn backup_file_path(folder: &Path, database: &str, at: NaiveDateTime) -> PathBuf {
    folder.join(format!("{}_{}.sql", database, at.format("%Y-%m-%d_%H-%M-%S")))
}

/// Create (or truncate) the backup file.
pub async fn create_file(path: &Path) -> Result<OutputSink<tokio::fs::File>> {
    let file = tokio::fs::File::create(path)
        .await
        .map_err(|e| BackupError::sink(format!("opening {}", path.display()), e))?;
    Ok(OutputSink::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_nothing_written_before_flush() {
        let mut sink = OutputSink::new(Vec::new());
        sink.append("SELECT 1;\n");
        assert_eq!(sink.bytes_written(), 0);

        sink.flush().await.unwrap();
        assert_eq!(sink.bytes_written(), 10);

        sink.append("SELECT 2;\n");
        let out = sink.finish().await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "SELECT 1;\nSELECT 2;\n");
    }

    #[test]
    fn test_backup_file_path() {
        let at = NaiveDate::from_ymd_opt(2017, 5, 7)
            .unwrap()
            .and_hms_opt(13, 4, 5)
            .unwrap();
        assert_eq!(
            backup_file_path(Path::new("/backups"), "acme", at),
            PathBuf::from("/backups/acme_2017-05-07_13-04-05.sql")
        );
    }

    #[tokio::test]
    async fn test_create_file_in_missing_folder_is_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("acme.sql");
        let err = create_file(&path).await.err().unwrap();
        assert!(matches!(err, BackupError::Sink { .. }));
    }

    #[tokio::test]
    async fn test_create_file_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acme.sql");
        let mut sink = create_file(&path).await.unwrap();
        sink.append("USE `acme`;\n");
        sink.finish().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "USE `acme`;\n");
    }
}
