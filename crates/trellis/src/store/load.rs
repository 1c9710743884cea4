//! Reading the record file.
//!
//! Every line goes through the same pipeline:
//!
//! 1. parse as raw JSON (`trellis-jsonl`, resilient)
//! 2. per-line migration on the raw value
//! 3. typed decoding into [`Record`]
//! 4. validation
//! 5. duplicate id check, first occurrence wins
//!
//! A line failing any step is skipped with a [`LoadWarning`]. The surviving
//! set then gets the whole-set migration and fresh completion scores.

use crate::completion;
use crate::domain::{Record, RecordId};
use crate::error::Result;
use crate::migration::{self, Change};
use crate::validation;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use trellis_jsonl::{read_jsonl_resilient, Located, Warning as JsonlWarning};

/// Non-fatal problems met while loading.
///
/// The affected line is skipped (or, for [`LoadWarning::Migrated`],
/// repaired) and loading carries on with the rest of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Line is not valid JSON
    MalformedJson {
        /// 1-based line number
        line_number: usize,
        /// Parser message
        error: String,
    },

    /// Line could not be read at all (e.g., invalid UTF-8)
    UnreadableLine {
        /// 1-based line number
        line_number: usize,
        /// Why it was skipped
        reason: String,
    },

    /// Line is JSON but not a valid record
    InvalidRecord {
        /// 1-based line number
        line_number: usize,
        /// Id of the record, when the line had one
        record_id: Option<RecordId>,
        /// Decoding or validation message
        error: String,
    },

    /// Line repeats an id seen earlier in the file
    DuplicateId {
        /// 1-based line number of the skipped copy
        line_number: usize,
        /// The repeated id
        record_id: RecordId,
        /// Line holding the copy that was kept
        first_line: usize,
    },

    /// Record was repaired by migration
    Migrated {
        /// 1-based line number of the record
        line_number: usize,
        /// The repaired record
        record_id: RecordId,
        /// What was changed
        change: Change,
    },
}

impl LoadWarning {
    /// Line the warning refers to.
    #[must_use]
    pub fn line_number(&self) -> usize {
        match self {
            Self::MalformedJson { line_number, .. }
            | Self::UnreadableLine { line_number, .. }
            | Self::InvalidRecord { line_number, .. }
            | Self::DuplicateId { line_number, .. }
            | Self::Migrated { line_number, .. } => *line_number,
        }
    }

    /// Whether the line was dropped rather than repaired.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        !matches!(self, Self::Migrated { .. })
    }
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedJson { line_number, error } => {
                write!(f, "line {line_number}: malformed JSON: {error}")
            }
            Self::UnreadableLine {
                line_number,
                reason,
            } => write!(f, "line {line_number}: skipped: {reason}"),
            Self::InvalidRecord {
                line_number,
                record_id: Some(id),
                error,
            } => write!(f, "line {line_number}: invalid record {id}: {error}"),
            Self::InvalidRecord {
                line_number,
                record_id: None,
                error,
            } => write!(f, "line {line_number}: invalid record: {error}"),
            Self::DuplicateId {
                line_number,
                record_id,
                first_line,
            } => write!(
                f,
                "line {line_number}: duplicate id {record_id} (kept line {first_line})"
            ),
            Self::Migrated {
                line_number,
                record_id,
                change,
            } => write!(f, "line {line_number}: migrated {record_id}: {change}"),
        }
    }
}

impl From<JsonlWarning> for LoadWarning {
    fn from(warning: JsonlWarning) -> Self {
        match warning {
            JsonlWarning::MalformedJson { line_number, error } => {
                Self::MalformedJson { line_number, error }
            }
            JsonlWarning::SkippedLine {
                line_number,
                reason,
            } => Self::UnreadableLine {
                line_number,
                reason,
            },
        }
    }
}

/// Read, repair and score every record in `path`.
///
/// A missing file is an empty store. Warnings come back in line order.
pub(crate) async fn read_records(path: &Path) -> Result<(Vec<Record>, Vec<LoadWarning>)> {
    let (lines, jsonl_warnings) = match read_jsonl_resilient::<Value, _>(path).await {
        Ok(parsed) => parsed,
        Err(trellis_jsonl::Error::Io(e)) if e.kind() == ErrorKind::NotFound => {
            return Ok((vec![], vec![]));
        }
        Err(e) => return Err(e.into()),
    };

    let now = Utc::now();
    let mut warnings: Vec<LoadWarning> = jsonl_warnings.into_iter().map(Into::into).collect();
    let mut records = Vec::with_capacity(lines.len());
    let mut first_line: HashMap<RecordId, usize> = HashMap::new();

    for Located {
        line_number,
        mut value,
    } in lines
    {
        let changes = migration::migrate_line(&mut value, now);
        let id_hint = value.get("id").and_then(Value::as_str).map(RecordId::from);

        let mut record: Record = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                warnings.push(LoadWarning::InvalidRecord {
                    line_number,
                    record_id: id_hint,
                    error: e.to_string(),
                });
                continue;
            }
        };
        record.completion_percentage = None;

        if let Err(e) = validation::validate(&record) {
            warnings.push(LoadWarning::InvalidRecord {
                line_number,
                record_id: Some(record.id),
                error: e.to_string(),
            });
            continue;
        }

        if let Some(&kept) = first_line.get(&record.id) {
            warnings.push(LoadWarning::DuplicateId {
                line_number,
                record_id: record.id,
                first_line: kept,
            });
            continue;
        }
        first_line.insert(record.id.clone(), line_number);

        warnings.extend(changes.into_iter().map(|change| LoadWarning::Migrated {
            line_number,
            record_id: record.id.clone(),
            change,
        }));
        records.push(record);
    }

    for (record_id, change) in migration::dedup_mutual_blocked_by(&mut records, now) {
        warnings.push(LoadWarning::Migrated {
            line_number: first_line.get(&record_id).copied().unwrap_or_default(),
            record_id,
            change,
        });
    }

    completion::annotate(&mut records);
    warnings.sort_by_key(LoadWarning::line_number);
    Ok((records, warnings))
}
