//! Per-line problems found while reading a JSONL file.

use thiserror::Error;

/// A line the reader could not use.
///
/// Readers skip the line and keep going; the warning records which line it
/// was and why, so the caller can report it.
///
/// ```
/// use trellis_jsonl::Warning;
///
/// let warning = Warning::MalformedJson {
///     line_number: 5,
///     error: "EOF while parsing an object".to_string(),
/// };
/// assert_eq!(
///     warning.to_string(),
///     "line 5: malformed JSON: EOF while parsing an object"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    /// The line is not valid JSON for the requested type.
    #[error("line {line_number}: malformed JSON: {error}")]
    MalformedJson {
        /// 1-based line number.
        line_number: usize,
        /// The decoder's message.
        error: String,
    },

    /// The line could not be read at all, e.g. it is not UTF-8.
    #[error("line {line_number}: skipped: {reason}")]
    SkippedLine {
        /// 1-based line number.
        line_number: usize,
        /// Why the line was dropped.
        reason: String,
    },
}

impl Warning {
    /// 1-based line number of the offending line.
    #[must_use]
    pub fn line_number(&self) -> usize {
        match self {
            Self::MalformedJson { line_number, .. } | Self::SkippedLine { line_number, .. } => {
                *line_number
            }
        }
    }

    /// Stable snake_case tag, suitable for structured log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedJson { .. } => "malformed_json",
            Self::SkippedLine { .. } => "skipped_line",
        }
    }
}
