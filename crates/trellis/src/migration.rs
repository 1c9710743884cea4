//! Best-effort upgrade of legacy record data.
//!
//! Runs as part of every load and never writes to disk by itself. It has
//! two steps:
//!
//! - [`migrate_line`] works on one raw JSON object before typed decoding,
//!   so legacy values that the closed enums would reject (status `blocked`,
//!   kind `blocks`, unknown kinds) can still be repaired.
//! - [`dedup_mutual_blocked_by`] works on the decoded set, where pairs of
//!   records blocking each other can be seen.
//!
//! Both steps stamp `updated_at` on every record they change.

use crate::domain::{DependencyKind, Record, RecordId};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// A single change made by migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A legacy status was replaced with `open`
    StatusNormalized {
        /// Status found on disk
        from: String,
    },
    /// A `blocks` edge was renamed to `blocked_by`
    KindFolded {
        /// Target of the edge
        target: String,
    },
    /// A dependency entry was dropped
    EdgePruned {
        /// Target of the entry, if it had one
        target: Option<String>,
        /// Why it was dropped
        reason: String,
    },
    /// The `blocked_by` half of a mutual pair was dropped from this record
    MutualBlockRemoved {
        /// Record that keeps its edge
        kept_on: RecordId,
    },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatusNormalized { from } => write!(f, "status '{from}' normalized to open"),
            Self::KindFolded { target } => {
                write!(f, "dependency on {target}: 'blocks' folded into blocked_by")
            }
            Self::EdgePruned {
                target: Some(target),
                reason,
            } => write!(f, "dependency on {target} dropped: {reason}"),
            Self::EdgePruned {
                target: None,
                reason,
            } => write!(f, "dependency dropped: {reason}"),
            Self::MutualBlockRemoved { kept_on } => {
                write!(f, "mutual blocked_by with {kept_on} resolved in its favor")
            }
        }
    }
}

const LEGACY_BLOCKED_STATUS: &str = "blocked";
const LEGACY_BLOCKS_KIND: &str = "blocks";

/// Repair one raw record object in place.
///
/// Values that are not JSON objects are left alone for typed decoding to
/// reject. Returns the changes made; when there are any, `updated_at` is set
/// to `now`.
pub fn migrate_line(value: &mut Value, now: DateTime<Utc>) -> Vec<Change> {
    let Some(object) = value.as_object_mut() else {
        return vec![];
    };

    let mut changes = Vec::new();

    if object.get("status").and_then(Value::as_str) == Some(LEGACY_BLOCKED_STATUS) {
        object.insert("status".to_string(), Value::from("open"));
        changes.push(Change::StatusNormalized {
            from: LEGACY_BLOCKED_STATUS.to_string(),
        });
    }

    if let Some(Value::Array(deps)) = object.get_mut("dependencies") {
        let mut kept = Vec::with_capacity(deps.len());
        let mut seen = HashSet::new();
        for entry in deps.drain(..) {
            let Some((target, kind, entry)) = migrate_edge(entry, &mut changes) else {
                continue;
            };
            if seen.insert((target.clone(), kind)) {
                kept.push(entry);
            } else {
                changes.push(Change::EdgePruned {
                    target: Some(target),
                    reason: format!("duplicate {kind} edge"),
                });
            }
        }
        *deps = kept;
    }

    if !changes.is_empty() {
        stamp(object, now);
    }
    changes
}

/// Normalize one dependency entry, or drop it.
fn migrate_edge(
    mut entry: Value,
    changes: &mut Vec<Change>,
) -> Option<(String, DependencyKind, Value)> {
    let Some(edge) = entry.as_object_mut() else {
        changes.push(Change::EdgePruned {
            target: None,
            reason: "entry is not an object".to_string(),
        });
        return None;
    };

    let Some(target) = edge.get("target_id").and_then(Value::as_str).map(str::to_string) else {
        changes.push(Change::EdgePruned {
            target: None,
            reason: "missing target_id".to_string(),
        });
        return None;
    };

    let raw_kind = edge.get("kind").and_then(Value::as_str).unwrap_or_default();
    let kind = if raw_kind == LEGACY_BLOCKS_KIND {
        edge.insert(
            "kind".to_string(),
            Value::from(DependencyKind::BlockedBy.as_str()),
        );
        changes.push(Change::KindFolded {
            target: target.clone(),
        });
        DependencyKind::BlockedBy
    } else if let Ok(kind) = raw_kind.parse::<DependencyKind>() {
        kind
    } else {
        changes.push(Change::EdgePruned {
            target: Some(target),
            reason: format!("unknown kind '{raw_kind}'"),
        });
        return None;
    };

    Some((target, kind, entry))
}

fn stamp(object: &mut Map<String, Value>, now: DateTime<Utc>) {
    object.insert("updated_at".to_string(), Value::from(now.to_rfc3339()));
}

/// Break every pair of records blocking each other.
///
/// The edge held by the lexicographically smaller id survives; the larger
/// id loses its `blocked_by` edge and has `updated_at` stamped. Returns the
/// id of each changed record with the change made to it.
pub fn dedup_mutual_blocked_by(
    records: &mut [Record],
    now: DateTime<Utc>,
) -> Vec<(RecordId, Change)> {
    let edges: HashSet<(RecordId, RecordId)> = records
        .iter()
        .flat_map(|r| {
            r.targets_of_kind(DependencyKind::BlockedBy)
                .map(|target| (r.id.clone(), target.clone()))
        })
        .collect();

    let mut changes = Vec::new();
    for record in records.iter_mut() {
        let id = record.id.clone();
        let mut dropped = Vec::new();
        record.dependencies.retain(|dep| {
            let mutual = dep.kind == DependencyKind::BlockedBy
                && dep.target_id < id
                && edges.contains(&(dep.target_id.clone(), id.clone()));
            if mutual {
                dropped.push(dep.target_id.clone());
            }
            !mutual
        });
        if !dropped.is_empty() {
            record.touch(now);
            changes.extend(
                dropped
                    .into_iter()
                    .map(|kept_on| (id.clone(), Change::MutualBlockRemoved { kept_on })),
            );
        }
    }
    changes
}
