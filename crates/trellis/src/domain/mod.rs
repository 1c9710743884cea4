//! Domain types for task tracking.
//!
//! This module contains the record type persisted by the store and the
//! closed enums describing its status, priority, type and dependency kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    /// Create a new record ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A task record as stored on disk, one per JSONL line.
///
/// `completion_percentage` is derived data: the store recomputes it on
/// every load and every update, whatever value the file carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, immutable after creation
    pub id: RecordId,

    /// Record title
    pub title: String,

    /// Longer free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Record type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<RecordType>,

    /// Current status
    #[serde(default)]
    pub status: Status,

    /// Priority level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,

    /// Assignee
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    /// Labels, in insertion order
    #[serde(default)]
    pub labels: Vec<String>,

    /// Outgoing edges to other records, in insertion order
    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    /// Additional free-text notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Time the record was last closed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,

    /// Append-only discussion thread
    #[serde(default)]
    pub comments: Vec<Comment>,

    /// Checklist that must be completed before the record is done
    #[serde(default)]
    pub acceptance_criteria: Vec<AcceptanceCriterion>,

    /// Derived 0-100 completion score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_percentage: Option<u8>,
}

impl Record {
    /// Create an open record with the given id and title, stamped now.
    pub fn new(id: impl Into<RecordId>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            record_type: None,
            status: Status::Open,
            priority: None,
            assignee: None,
            labels: vec![],
            dependencies: vec![],
            notes: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
            comments: vec![],
            acceptance_criteria: vec![],
            completion_percentage: None,
        }
    }

    /// Returns `true` if the record is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == Status::Closed
    }

    /// Stamp `updated_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Change status, keeping `closed_at` consistent with it.
    ///
    /// Closing sets `closed_at` unless the record was already closed;
    /// reopening clears it. `updated_at` is stamped when the status changes.
    pub fn set_status(&mut self, status: Status, now: DateTime<Utc>) {
        if self.status == status {
            return;
        }
        self.closed_at = if status == Status::Closed {
            Some(now)
        } else {
            None
        };
        self.status = status;
        self.touch(now);
    }

    /// Iterate over the targets of outgoing edges of one kind.
    pub fn targets_of_kind(&self, kind: DependencyKind) -> impl Iterator<Item = &RecordId> {
        self.dependencies
            .iter()
            .filter(move |dep| dep.kind == kind)
            .map(|dep| &dep.target_id)
    }

    /// The first `parent-child` target, if any.
    #[must_use]
    pub fn parent_id(&self) -> Option<&RecordId> {
        self.targets_of_kind(DependencyKind::ParentChild).next()
    }
}

/// Status of a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Not started
    #[default]
    Open,

    /// Currently being worked on
    InProgress,

    /// Done
    Closed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
        })
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Priority of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait
    Low,

    /// Normal
    Medium,

    /// Should be done soon
    High,

    /// Drop everything
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        })
    }
}

/// Type of record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    /// Parent of a group of subtasks
    Epic,

    /// New feature
    Feature,

    /// General task
    Task,

    /// Bug fix
    Bug,

    /// Maintenance/chore
    Chore,

    /// Documentation
    Docs,

    /// Restructuring without behavior change
    Refactor,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Chore => "chore",
            Self::Docs => "docs",
            Self::Refactor => "refactor",
        })
    }
}

/// Directed edge from the owning record to `target_id`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Record this edge points at
    pub target_id: RecordId,

    /// Kind of relationship
    pub kind: DependencyKind,
}

impl Dependency {
    /// Create a new edge
    pub fn new(target_id: impl Into<RecordId>, kind: DependencyKind) -> Self {
        Self {
            target_id: target_id.into(),
            kind,
        }
    }
}

/// Kind of dependency relationship
///
/// Edges point from the dependent record to the record it depends on, so
/// a child holds the `ParentChild` edge to its parent and a blocked record
/// holds the `BlockedBy` edge to its blocker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    /// Hard blocker - the source cannot proceed until the target closes
    #[serde(rename = "blocked_by")]
    BlockedBy,

    /// Soft link - informational
    #[serde(rename = "related")]
    Related,

    /// Hierarchical - child to parent
    #[serde(rename = "parent-child")]
    ParentChild,

    /// Found while working on the target
    #[serde(rename = "discovered-from")]
    DiscoveredFrom,
}

impl DependencyKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::BlockedBy,
        Self::Related,
        Self::ParentChild,
        Self::DiscoveredFrom,
    ];

    /// The wire name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BlockedBy => "blocked_by",
            Self::Related => "related",
            Self::ParentChild => "parent-child",
            Self::DiscoveredFrom => "discovered-from",
        }
    }

    /// Whether edges of this kind must never form a cycle.
    #[must_use]
    pub fn requires_acyclic(self) -> bool {
        matches!(self, Self::BlockedBy | Self::ParentChild)
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown dependency kind '{s}'"))
    }
}

/// One entry of a record's discussion thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Generated comment id
    pub id: String,

    /// Who wrote it
    pub author: String,

    /// Comment body
    pub content: String,

    /// When it was added
    pub created_at: DateTime<Utc>,
}

/// One checklist item of a record's acceptance criteria
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceCriterion {
    /// What must be true
    pub text: String,

    /// Whether it is satisfied
    #[serde(default)]
    pub completed: bool,
}

impl AcceptanceCriterion {
    /// Create a criterion
    pub fn new(text: impl Into<String>, completed: bool) -> Self {
        Self {
            text: text.into(),
            completed,
        }
    }
}
