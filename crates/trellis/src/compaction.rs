//! Shrinking long-closed records.
//!
//! Compaction is a pure pass over a record list. It never writes to disk;
//! callers that want the result persisted hand it to
//! [`RecordStore::update`](crate::store::RecordStore::update).

use crate::domain::Record;
use chrono::{DateTime, Duration, Utc};

/// Marker appended to truncated text.
pub const ELLIPSIS: &str = "...";

/// Age threshold used when none is configured.
pub const DEFAULT_AGE_THRESHOLD_DAYS: i64 = 30;

/// Which records to compact and how far to shrink them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionPolicy {
    /// Records closed longer ago than this many days are compacted
    pub age_threshold_days: i64,
    /// Characters of `description` kept before the ellipsis
    pub description_limit: usize,
    /// Characters of `notes` kept before the ellipsis
    pub notes_limit: usize,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            age_threshold_days: DEFAULT_AGE_THRESHOLD_DAYS,
            description_limit: 200,
            notes_limit: 100,
        }
    }
}

impl CompactionPolicy {
    /// Default limits with a custom age threshold.
    #[must_use]
    pub fn older_than_days(age_threshold_days: i64) -> Self {
        Self {
            age_threshold_days,
            ..Self::default()
        }
    }

    /// Whether `record` is closed and its `closed_at` is before the cutoff.
    ///
    /// A threshold reaching past the representable date range makes nothing
    /// stale.
    #[must_use]
    pub fn is_stale(&self, record: &Record, now: DateTime<Utc>) -> bool {
        let Some(cutoff) = Duration::try_days(self.age_threshold_days)
            .and_then(|age| now.checked_sub_signed(age))
        else {
            return false;
        };
        record.is_closed() && record.closed_at.is_some_and(|closed| closed < cutoff)
    }

    /// Compact `records` as of `now`.
    ///
    /// Stale records get `description` and `notes` truncated and their
    /// acceptance criteria dropped. Everything else passes through unchanged,
    /// including `updated_at`.
    #[must_use]
    pub fn compact_at(&self, records: &[Record], now: DateTime<Utc>) -> Vec<Record> {
        records
            .iter()
            .map(|record| {
                if !self.is_stale(record, now) {
                    return record.clone();
                }
                let mut record = record.clone();
                record.description = record
                    .description
                    .map(|text| truncate(text, self.description_limit));
                record.notes = record.notes.map(|text| truncate(text, self.notes_limit));
                record.acceptance_criteria.clear();
                record
            })
            .collect()
    }
}

/// Compact records closed more than `age_threshold_days` ago, with the
/// default truncation limits.
#[must_use]
pub fn compact(records: &[Record], age_threshold_days: i64) -> Vec<Record> {
    CompactionPolicy::older_than_days(age_threshold_days).compact_at(records, Utc::now())
}

/// Keep the first `limit` characters of `text` and append [`ELLIPSIS`].
///
/// Text already within the limit is returned as is.
fn truncate(text: String, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => {
            let mut short = text[..cut].to_string();
            short.push_str(ELLIPSIS);
            short
        }
        None => text,
    }
}
