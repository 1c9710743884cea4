//! CLI value enums and domain type conversions.

use clap::ValueEnum;

use crate::domain::{DependencyKind, Priority, RecordType, Status};

/// Record status for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusArg {
    /// Not started
    Open,
    /// Currently being worked on
    #[value(name = "in_progress", alias = "in-progress")]
    InProgress,
    /// Done
    Closed,
}

impl From<StatusArg> for Status {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Open => Self::Open,
            StatusArg::InProgress => Self::InProgress,
            StatusArg::Closed => Self::Closed,
        }
    }
}

/// Priority for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityArg {
    /// Can wait
    Low,
    /// Normal
    Medium,
    /// Should be done soon
    High,
    /// Drop everything
    Urgent,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
            PriorityArg::Urgent => Self::Urgent,
        }
    }
}

/// Record type for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTypeArg {
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

impl From<RecordTypeArg> for RecordType {
    fn from(arg: RecordTypeArg) -> Self {
        match arg {
            RecordTypeArg::Epic => Self::Epic,
            RecordTypeArg::Feature => Self::Feature,
            RecordTypeArg::Task => Self::Task,
            RecordTypeArg::Bug => Self::Bug,
            RecordTypeArg::Chore => Self::Chore,
            RecordTypeArg::Docs => Self::Docs,
            RecordTypeArg::Refactor => Self::Refactor,
        }
    }
}

/// Dependency kind for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKindArg {
    /// Hard blocker; the source is not ready until the target closes
    #[value(name = "blocked_by", alias = "blocked-by")]
    BlockedBy,
    /// Informational link
    Related,
    /// Subtask to epic
    #[value(name = "parent-child")]
    ParentChild,
    /// Found while working on the target
    #[value(name = "discovered-from")]
    DiscoveredFrom,
}

impl From<DependencyKindArg> for DependencyKind {
    fn from(arg: DependencyKindArg) -> Self {
        match arg {
            DependencyKindArg::BlockedBy => Self::BlockedBy,
            DependencyKindArg::Related => Self::Related,
            DependencyKindArg::ParentChild => Self::ParentChild,
            DependencyKindArg::DiscoveredFrom => Self::DiscoveredFrom,
        }
    }
}
