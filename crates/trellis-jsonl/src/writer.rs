//! JSONL writing operations.
//!
//! This module provides async functionality for writing data in JSONL format
//! with efficient buffering, plus a single-record append used for
//! append-only creates.

use crate::Result;
use serde::Serialize;
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt, BufWriter};

/// Async writer for JSONL (JSON Lines) data.
///
/// Each value is serialized to a single line followed by a newline character.
///
/// # Examples
///
/// ```no_run
/// use trellis_jsonl::JsonlWriter;
/// use tokio::fs::File;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let file = File::create("output.jsonl").await?;
/// let mut writer = JsonlWriter::new(file);
/// writer.write(&serde_json::json!({"id": "a"})).await?;
/// writer.flush().await?;
/// # Ok(())
/// # }
/// ```
pub struct JsonlWriter<W> {
    /// Buffered writer wrapping the underlying async writer.
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> JsonlWriter<W> {
    /// Creates a new `JsonlWriter` wrapping the given async writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Serializes one value and writes it as a single line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the underlying write fails.
    pub async fn write<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        Ok(())
    }

    /// Writes every value from an iterator, returning how many were written.
    ///
    /// # Errors
    ///
    /// Stops at the first value that fails to serialize or write.
    pub async fn write_all<T, I>(&mut self, values: I) -> Result<usize>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let mut count = 0;
        for value in values {
            self.write(&value).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Flushes buffered data to the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying flush fails.
    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }

    /// Consumes the writer, returning the underlying writer.
    ///
    /// Note: this does not flush the buffer. Call [`flush`](Self::flush)
    /// first.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Appends one value as a new line at the end of a JSONL file.
///
/// The file is created if it does not exist. If the existing file does not
/// end with a newline (for example after a manual edit), one is inserted
/// first so the new record never merges into the previous line.
///
/// The value is serialized before the file is opened, so a serialization
/// failure leaves the file untouched.
///
/// # Errors
///
/// Returns an error if serialization fails or the file cannot be written.
pub async fn append_jsonl<T, P>(path: P, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');

    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .await?;

    let len = file.metadata().await?.len();
    if len > 0 {
        file.seek(SeekFrom::End(-1)).await?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last).await?;
        if last[0] != b'\n' {
            line.insert(0, b'\n');
        }
    }

    file.write_all(&line).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Cursor;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestRecord {
        id: u32,
        name: String,
    }

    #[tokio::test]
    async fn write_produces_one_line_per_value() {
        let mut writer = JsonlWriter::new(Cursor::new(Vec::new()));
        let records = [
            TestRecord {
                id: 1,
                name: "Alice".to_string(),
            },
            TestRecord {
                id: 2,
                name: "Bob".to_string(),
            },
        ];

        let written = writer.write_all(records.iter()).await.unwrap();
        writer.flush().await.unwrap();

        assert_eq!(written, 2);
        let output = String::from_utf8(writer.into_inner().into_inner()).unwrap();
        assert_eq!(
            output,
            "{\"id\":1,\"name\":\"Alice\"}\n{\"id\":2,\"name\":\"Bob\"}\n"
        );
    }

    #[tokio::test]
    async fn append_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.jsonl");

        append_jsonl(
            &path,
            &TestRecord {
                id: 7,
                name: "Seven".to_string(),
            },
        )
        .await
        .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "{\"id\":7,\"name\":\"Seven\"}\n");
    }

    #[tokio::test]
    async fn append_repairs_missing_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edited.jsonl");
        tokio::fs::write(&path, "{\"id\":1,\"name\":\"One\"}")
            .await
            .unwrap();

        append_jsonl(
            &path,
            &TestRecord {
                id: 2,
                name: "Two".to_string(),
            },
        )
        .await
        .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "{\"id\":2,\"name\":\"Two\"}");
    }
}
