//! Dependency graph queries and edits over a record list.
//!
//! Every function here is pure: it takes the full record set, builds
//! whatever view it needs, and returns new data without touching its input
//! or the disk. Edits return a new record vector for the caller to hand to
//! [`RecordStore::try_update`](crate::store::RecordStore::try_update).
//!
//! # Edge Direction
//!
//! Edges point from the record that holds the dependency to its target:
//!
//! - `blocked_by`: blocked record -> blocker
//! - `parent-child`: child -> parent (epic)
//! - `related`, `discovered-from`: informational, never block anything
//!
//! `blocked_by` and `parent-child` edges must stay acyclic; the other kinds
//! may cycle freely.

use crate::completion::{self, ChildIndex};
use crate::domain::{Dependency, DependencyKind, Record, RecordId, Status};
use crate::error::{Error, Result};
use chrono::Utc;
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{EdgeFiltered, EdgeRef};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Reverse edge: `source_id` holds a dependency of `kind` on the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependent {
    /// Record holding the edge
    pub source_id: RecordId,
    /// Kind of the edge
    pub kind: DependencyKind,
}

/// A record together with its back-filled reverse edges.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    /// Copy of the record
    pub record: Record,
    /// Records that depend on this one, in record order
    pub dependents: Vec<Dependent>,
}

/// Progress summary for an epic's subtasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EpicProgress {
    /// Subtasks scoring 100
    pub completed: usize,
    /// Number of subtasks
    pub total: usize,
    /// Rounded mean of subtask scores, 0 without subtasks
    pub percentage: u8,
}

/// Outcome of [`can_close`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloseCheck {
    /// Whether the record may be closed now
    pub can_close: bool,
    /// Why not, when `can_close` is false
    pub reason: Option<String>,
    /// Subtasks that are not closed yet
    pub open_subtasks: Vec<RecordId>,
}

/// Per-call adjacency view over a record list.
///
/// Nodes carry record ids and edges carry their [`DependencyKind`]. Edges
/// whose target is not in the list are left out.
struct Graph {
    graph: DiGraph<RecordId, DependencyKind>,
    node_map: HashMap<RecordId, NodeIndex>,
}

impl Graph {
    fn build(records: &[Record]) -> Self {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::with_capacity(records.len());

        for record in records {
            node_map
                .entry(record.id.clone())
                .or_insert_with(|| graph.add_node(record.id.clone()));
        }
        for record in records {
            let from = node_map[&record.id];
            for dep in &record.dependencies {
                if let Some(&to) = node_map.get(&dep.target_id) {
                    graph.add_edge(from, to, dep.kind);
                }
            }
        }

        Self { graph, node_map }
    }

    /// Whether `to` already reaches `from` over edges of `kind` alone.
    fn reaches(&self, to: &RecordId, from: &RecordId, kind: DependencyKind) -> bool {
        let (Some(&start), Some(&goal)) = (self.node_map.get(to), self.node_map.get(from)) else {
            return false;
        };
        let same_kind = EdgeFiltered::from_fn(&self.graph, |edge| *edge.weight() == kind);
        algo::has_path_connecting(&same_kind, start, goal, None)
    }

    fn dependents_of(&self, id: &RecordId) -> Vec<Dependent> {
        let Some(&node) = self.node_map.get(id) else {
            return vec![];
        };
        let mut dependents: Vec<(NodeIndex, Dependent)> = self
            .graph
            .edges_directed(node, Direction::Incoming)
            .map(|edge| {
                (
                    edge.source(),
                    Dependent {
                        source_id: self.graph[edge.source()].clone(),
                        kind: *edge.weight(),
                    },
                )
            })
            .collect();
        // petgraph walks incoming edges newest first; report them in record order
        dependents.sort_by_key(|(source, _)| *source);
        dependents.into_iter().map(|(_, dep)| dep).collect()
    }
}

fn find<'a>(records: &'a [Record], id: &RecordId) -> Option<&'a Record> {
    records.iter().find(|r| &r.id == id)
}

/// Clone every record and back-fill its `dependents`.
#[must_use]
pub fn build_index(records: &[Record]) -> HashMap<RecordId, RecordView> {
    let graph = Graph::build(records);
    records
        .iter()
        .map(|record| {
            let view = RecordView {
                record: record.clone(),
                dependents: graph.dependents_of(&record.id),
            };
            (record.id.clone(), view)
        })
        .collect()
}

/// `blocked_by` targets of `record` that exist and are not closed.
fn active_blockers<'a>(
    record: &'a Record,
    by_id: &HashMap<&RecordId, &'a Record>,
) -> impl Iterator<Item = &'a Record> {
    record
        .targets_of_kind(DependencyKind::BlockedBy)
        .filter_map(|target| by_id.get(target).copied())
        .filter(|blocker| !blocker.is_closed())
}

fn id_map(records: &[Record]) -> HashMap<&RecordId, &Record> {
    records.iter().map(|r| (&r.id, r)).collect()
}

/// Open records with no outstanding blocker.
///
/// A `blocked_by` edge to a record that is missing from the set does not
/// block.
#[must_use]
pub fn ready_work(records: &[Record]) -> Vec<Record> {
    let by_id = id_map(records);
    records
        .iter()
        .filter(|r| r.status == Status::Open)
        .filter(|r| active_blockers(r, &by_id).next().is_none())
        .cloned()
        .collect()
}

/// Open or in-progress records with at least one outstanding blocker.
#[must_use]
pub fn blocked(records: &[Record]) -> Vec<Record> {
    let by_id = id_map(records);
    records
        .iter()
        .filter(|r| !r.is_closed())
        .filter(|r| active_blockers(r, &by_id).next().is_some())
        .cloned()
        .collect()
}

/// The not-yet-closed records blocking `id`.
#[must_use]
pub fn blockers_of(id: &RecordId, records: &[Record]) -> Vec<Record> {
    let by_id = id_map(records);
    find(records, id)
        .map(|record| active_blockers(record, &by_id).cloned().collect())
        .unwrap_or_default()
}

/// Whether adding `from -> to` of `kind` would close a cycle.
///
/// Always `false` for kinds that may cycle. For `blocked_by` and
/// `parent-child`, a self edge is a cycle, and so is any edge whose target
/// already reaches its source through edges of the same kind.
#[must_use]
pub fn has_cycle(from: &RecordId, to: &RecordId, kind: DependencyKind, records: &[Record]) -> bool {
    if !kind.requires_acyclic() {
        return false;
    }
    from == to || Graph::build(records).reaches(to, from, kind)
}

/// Add an edge `from -> to` of `kind`.
///
/// Adding an edge that already exists returns the set unchanged.
///
/// # Errors
///
/// - `Error::RecordNotFound` if either record is missing
/// - `Error::Cycle` if the edge would close a `blocked_by` or `parent-child`
///   cycle; nothing is modified
pub fn add_dependency(
    from: &RecordId,
    to: &RecordId,
    kind: DependencyKind,
    records: &[Record],
) -> Result<Vec<Record>> {
    let source = find(records, from).ok_or_else(|| Error::RecordNotFound(from.clone()))?;
    if find(records, to).is_none() {
        return Err(Error::RecordNotFound(to.clone()));
    }

    if has_cycle(from, to, kind, records) {
        return Err(Error::Cycle {
            from: from.clone(),
            to: to.clone(),
            kind,
        });
    }

    if source
        .dependencies
        .iter()
        .any(|dep| &dep.target_id == to && dep.kind == kind)
    {
        return Ok(records.to_vec());
    }

    let now = Utc::now();
    Ok(records
        .iter()
        .map(|record| {
            let mut record = record.clone();
            if &record.id == from {
                record.dependencies.push(Dependency::new(to.clone(), kind));
                record.touch(now);
            }
            record
        })
        .collect())
}

/// Remove edges `from -> to`.
///
/// With `kind = None` every edge to `to` is removed whatever its kind; with
/// `Some(kind)` only edges of that kind are. `updated_at` is stamped only
/// when something was removed.
#[must_use]
pub fn remove_dependency(
    from: &RecordId,
    to: &RecordId,
    kind: Option<DependencyKind>,
    records: &[Record],
) -> Vec<Record> {
    let now = Utc::now();
    records
        .iter()
        .map(|record| {
            let mut record = record.clone();
            if &record.id == from {
                let before = record.dependencies.len();
                record.dependencies.retain(|dep| {
                    &dep.target_id != to || kind.is_some_and(|k| dep.kind != k)
                });
                if record.dependencies.len() != before {
                    record.touch(now);
                }
            }
            record
        })
        .collect()
}

/// Records holding a `parent-child` edge to `epic_id`.
#[must_use]
pub fn epic_subtasks(epic_id: &RecordId, records: &[Record]) -> Vec<Record> {
    records
        .iter()
        .filter(|r| r.targets_of_kind(DependencyKind::ParentChild).any(|p| p == epic_id))
        .cloned()
        .collect()
}

/// The first `parent-child` target of `id`, if that record exists.
#[must_use]
pub fn subtask_parent(id: &RecordId, records: &[Record]) -> Option<Record> {
    let parent_id = find(records, id)?.parent_id()?;
    find(records, parent_id).cloned()
}

/// Completion summary over an epic's direct subtasks.
///
/// Uses each subtask's `completion_percentage`, computing it on the spot for
/// records that were never annotated.
#[must_use]
pub fn epic_progress(epic_id: &RecordId, records: &[Record]) -> EpicProgress {
    let subtasks = epic_subtasks(epic_id, records);
    let total = subtasks.len();
    if total == 0 {
        return EpicProgress {
            completed: 0,
            total: 0,
            percentage: 0,
        };
    }

    let index = ChildIndex::new(records);
    let scores: Vec<usize> = subtasks
        .iter()
        .map(|subtask| {
            usize::from(subtask.completion_percentage.unwrap_or_else(|| {
                completion::score_with(&index, subtask, &mut HashSet::new())
            }))
        })
        .collect();

    let completed = scores.iter().filter(|&&pct| pct == 100).count();
    let sum: usize = scores.iter().sum();
    let mean = (2 * sum + total) / (2 * total);

    EpicProgress {
        completed,
        total,
        percentage: u8::try_from(mean.min(100)).unwrap_or(100),
    }
}

/// Whether an epic has subtasks and all of them are closed.
#[must_use]
pub fn should_close_epic(epic_id: &RecordId, records: &[Record]) -> bool {
    let subtasks = epic_subtasks(epic_id, records);
    !subtasks.is_empty() && subtasks.iter().all(Record::is_closed)
}

/// Check whether `id` may be closed.
///
/// In order: an already closed record qualifies; any open subtask refuses;
/// any incomplete acceptance criterion refuses; finally the record's score
/// computed as if it were closed must be 100.
///
/// # Errors
///
/// Returns `Error::RecordNotFound` if `id` is not in the set.
pub fn can_close(id: &RecordId, records: &[Record]) -> Result<CloseCheck> {
    let record = find(records, id).ok_or_else(|| Error::RecordNotFound(id.clone()))?;
    if record.is_closed() {
        return Ok(CloseCheck {
            can_close: true,
            reason: None,
            open_subtasks: vec![],
        });
    }

    let open_subtasks: Vec<RecordId> = epic_subtasks(id, records)
        .into_iter()
        .filter(|r| !r.is_closed())
        .map(|r| r.id)
        .collect();
    if !open_subtasks.is_empty() {
        return Ok(CloseCheck {
            can_close: false,
            reason: Some(format!("{} open subtask(s)", open_subtasks.len())),
            open_subtasks,
        });
    }

    let criteria_total = record.acceptance_criteria.len();
    let incomplete = record
        .acceptance_criteria
        .iter()
        .filter(|c| !c.completed)
        .count();
    if incomplete > 0 {
        return Ok(CloseCheck {
            can_close: false,
            reason: Some(format!(
                "{incomplete} of {criteria_total} acceptance criteria incomplete"
            )),
            open_subtasks: vec![],
        });
    }

    let mut hypothetical = record.clone();
    hypothetical.status = Status::Closed;
    let index = ChildIndex::new(records);
    let pct = completion::score_with(&index, &hypothetical, &mut HashSet::new());
    if pct < 100 {
        return Ok(CloseCheck {
            can_close: false,
            reason: Some(format!("completion would be {pct}%, {}% short", 100 - pct)),
            open_subtasks: vec![],
        });
    }

    Ok(CloseCheck {
        can_close: true,
        reason: None,
        open_subtasks: vec![],
    })
}

/// Records without a parent.
#[must_use]
pub fn top_level(records: &[Record]) -> Vec<Record> {
    records
        .iter()
        .filter(|r| r.parent_id().is_none())
        .cloned()
        .collect()
}
