//! JSONL reading operations.
//!
//! This module provides async functionality for reading JSONL files line-by-line
//! with line number tracking, so every skipped line can be reported precisely.

use crate::{Result, Warning};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// A value decoded from a JSONL file together with the line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Located<T> {
    /// The 1-based line number of the value in the source.
    pub line_number: usize,
    /// The decoded value.
    pub value: T,
}

/// Async reader for JSONL (JSON Lines) data.
///
/// `JsonlReader` wraps an async reader and provides buffered reading of JSONL
/// formatted data. It tracks line numbers to provide useful context when a
/// line has to be skipped.
///
/// # Examples
///
/// ```no_run
/// use trellis_jsonl::JsonlReader;
/// use tokio::fs::File;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let file = File::open("records.jsonl").await?;
/// let mut reader = JsonlReader::new(file);
/// let (values, warnings) = reader.read_resilient::<serde_json::Value>().await?;
/// # Ok(())
/// # }
/// ```
pub struct JsonlReader<R> {
    /// Buffered reader wrapping the underlying async reader.
    reader: BufReader<R>,
    /// Current line number (1-based counting, 0 before any lines are read).
    line_number: usize,
}

impl<R: AsyncRead + Unpin> JsonlReader<R> {
    /// Creates a new `JsonlReader` wrapping the given async reader.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
        }
    }

    /// Returns the current line number.
    ///
    /// Returns 0 before any lines have been read. After reading, returns the
    /// 1-based line number of the last line read.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Reads the next raw line, without its line terminator.
    ///
    /// Returns `Ok(None)` at end of input. A final line without a trailing
    /// newline is still returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reader fails.
    pub async fn read_line_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = Vec::new();
        let read = self.reader.read_until(b'\n', &mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(Some(buf))
    }

    /// Reads every remaining line, decoding each one as `T`.
    ///
    /// Blank lines are ignored. Lines that are not valid UTF-8 or fail to
    /// decode are skipped and reported as warnings; reading continues with
    /// the next line.
    ///
    /// # Errors
    ///
    /// Returns an error only if the underlying reader fails.
    pub async fn read_resilient<T: DeserializeOwned>(
        &mut self,
    ) -> Result<(Vec<Located<T>>, Vec<Warning>)> {
        let mut values = Vec::new();
        let mut warnings = Vec::new();

        while let Some(bytes) = self.read_line_bytes().await? {
            let line_number = self.line_number;

            let Ok(line) = std::str::from_utf8(&bytes) else {
                warnings.push(Warning::SkippedLine {
                    line_number,
                    reason: "line is not valid UTF-8".to_string(),
                });
                continue;
            };

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<T>(line) {
                Ok(value) => values.push(Located { line_number, value }),
                Err(e) => {
                    tracing::debug!(line_number, error = %e, "Skipping malformed JSONL line");
                    warnings.push(Warning::MalformedJson {
                        line_number,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok((values, warnings))
    }
}

/// Reads a whole JSONL file, skipping lines that cannot be decoded.
///
/// This is the convenience entry point used by stores that want partial
/// recovery from corrupted files: every readable line is returned with its
/// line number, and every unreadable one becomes a [`Warning`].
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read. Per-line decode
/// failures are never errors.
pub async fn read_jsonl_resilient<T, P>(path: P) -> Result<(Vec<Located<T>>, Vec<Warning>)>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref()).await?;
    JsonlReader::new(file).read_resilient().await
}
