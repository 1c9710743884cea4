//! Recursive completion scoring.
//!
//! A record's score blends its own acceptance criteria with its subtasks
//! (records holding a `parent-child` edge to it):
//!
//! - no subtasks, some criteria: percentage of criteria completed
//! - no subtasks, no criteria: 100 if closed, else 0
//! - with subtasks: every criterion and every subtask is one unit of work;
//!   a subtask counts as done only when its own score is 100
//!
//! The parent-child graph read from disk may contain cycles, so recursion
//! carries an explicit `visiting` set. A record met again while it is still
//! being scored contributes 0.

use crate::domain::{DependencyKind, Record, RecordId};
use std::collections::{HashMap, HashSet};

/// Records grouped by the parent their `parent-child` edges point at.
///
/// Built once per pass so scoring a whole set does not rescan it for every
/// node.
pub struct ChildIndex<'a> {
    children: HashMap<&'a RecordId, Vec<&'a Record>>,
}

impl<'a> ChildIndex<'a> {
    /// Index every `parent-child` edge in `records`.
    #[must_use]
    pub fn new(records: &'a [Record]) -> Self {
        let mut children: HashMap<&RecordId, Vec<&Record>> = HashMap::new();
        for record in records {
            let mut seen = HashSet::new();
            for parent in record.targets_of_kind(DependencyKind::ParentChild) {
                if seen.insert(parent) {
                    children.entry(parent).or_default().push(record);
                }
            }
        }
        Self { children }
    }

    /// Subtasks of `id`, in record order.
    #[must_use]
    pub fn children_of(&self, id: &RecordId) -> &[&'a Record] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Round `numerator / denominator` as a percentage, halves rounding up.
///
/// Returns 0 for an empty denominator.
#[must_use]
pub fn percent(numerator: usize, denominator: usize) -> u8 {
    if denominator == 0 {
        return 0;
    }
    let scaled = (200 * numerator + denominator) / (2 * denominator);
    u8::try_from(scaled.min(100)).unwrap_or(100)
}

/// Score one record against the full set.
///
/// `visiting` is the cycle guard for this call tree; pass a fresh empty set
/// for each top-level call.
#[must_use]
pub fn score(record: &Record, records: &[Record], visiting: &mut HashSet<RecordId>) -> u8 {
    score_with(&ChildIndex::new(records), record, visiting)
}

/// Score one record using a prebuilt [`ChildIndex`].
#[must_use]
pub fn score_with(index: &ChildIndex<'_>, record: &Record, visiting: &mut HashSet<RecordId>) -> u8 {
    if !visiting.insert(record.id.clone()) {
        return 0;
    }

    let subtasks = index.children_of(&record.id);
    let criteria_total = record.acceptance_criteria.len();
    let criteria_done = record
        .acceptance_criteria
        .iter()
        .filter(|c| c.completed)
        .count();

    let result = if subtasks.is_empty() {
        if criteria_total > 0 {
            percent(criteria_done, criteria_total)
        } else if record.is_closed() {
            100
        } else {
            0
        }
    } else {
        let subtasks_done = subtasks
            .iter()
            .filter(|subtask| score_with(index, subtask, visiting) == 100)
            .count();
        percent(
            criteria_done + subtasks_done,
            criteria_total + subtasks.len(),
        )
    };

    visiting.remove(&record.id);
    result
}

/// Recompute `completion_percentage` for every record in place.
///
/// Any value previously carried by a record is discarded.
pub fn annotate(records: &mut [Record]) {
    let scores: Vec<u8> = {
        let index = ChildIndex::new(records);
        records
            .iter()
            .map(|record| score_with(&index, record, &mut HashSet::new()))
            .collect()
    };

    for (record, pct) in records.iter_mut().zip(scores) {
        record.completion_percentage = Some(pct);
    }
}
