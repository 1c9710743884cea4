//! CLI argument structs for all commands.
//!
//! Each command has its own argument struct with clap derive attributes
//! for parsing and validation.

use clap::{Parser, Subcommand};

use super::types::{DependencyKindArg, PriorityArg, RecordTypeArg, StatusArg};
use super::validators::{validate_prefix, validate_record_id, validate_text, validate_title};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Record id prefix (e.g., "proj" for "proj-a1b2")
    ///
    /// Must be 2-20 alphanumeric characters.
    #[arg(short, long, value_parser = validate_prefix)]
    pub prefix: Option<String>,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `create` command
#[derive(Parser, Debug, Clone)]
pub struct CreateArgs {
    /// Record title (prompted interactively when omitted)
    #[arg(long, value_parser = validate_title)]
    pub title: Option<String>,

    /// Detailed description
    #[arg(short = 'D', long, value_parser = validate_text)]
    pub description: Option<String>,

    /// Record type
    #[arg(short = 't', long = "type", value_enum)]
    pub record_type: Option<RecordTypeArg>,

    /// Priority
    #[arg(short, long, value_enum)]
    pub priority: Option<PriorityArg>,

    /// Assignee username
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Labels (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Free-form notes
    #[arg(long, value_parser = validate_text)]
    pub notes: Option<String>,

    /// Acceptance criterion (repeatable)
    #[arg(short = 'c', long = "criterion")]
    pub criteria: Vec<String>,

    /// Epic this record is a subtask of
    #[arg(long, value_parser = validate_record_id)]
    pub parent: Option<String>,

    /// Records that must close before this one is ready (comma-separated)
    #[arg(long, value_delimiter = ',', value_parser = validate_record_id)]
    pub blocked_by: Vec<String>,
}

/// Arguments for the `list` command
#[derive(Parser, Debug, Clone, Default)]
pub struct ListArgs {
    /// Filter by status
    #[arg(short, long, value_enum)]
    pub status: Option<StatusArg>,

    /// Filter by record type
    #[arg(short = 't', long = "type", value_enum)]
    pub record_type: Option<RecordTypeArg>,

    /// Filter by assignee
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Filter by label
    #[arg(short, long)]
    pub label: Option<String>,

    /// Only records that are not a subtask of anything
    #[arg(long)]
    pub top_level: bool,
}

/// Arguments for the `show` command
#[derive(Parser, Debug, Clone)]
pub struct ShowArgs {
    /// Record id to display
    #[arg(value_parser = validate_record_id)]
    pub record_id: String,
}

/// Arguments for the `ready` command
#[derive(Parser, Debug, Clone, Default)]
pub struct ReadyArgs {
    /// Filter by assignee
    #[arg(short, long)]
    pub assignee: Option<String>,

    /// Maximum number of records to display
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

/// Arguments for the `blocked` command
#[derive(Parser, Debug, Clone, Default)]
pub struct BlockedArgs {
    /// Filter by assignee
    #[arg(short, long)]
    pub assignee: Option<String>,
}

/// Arguments for the `status` command
#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {
    /// Record id to change
    #[arg(value_parser = validate_record_id)]
    pub record_id: String,

    /// New status (`closed` goes through the same checks as `close`)
    #[arg(value_enum)]
    pub status: StatusArg,
}

/// Arguments for the `close` command
#[derive(Parser, Debug, Clone)]
pub struct CloseArgs {
    /// Record id to close
    #[arg(value_parser = validate_record_id)]
    pub record_id: String,

    /// Close even with open subtasks or unmet acceptance criteria
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the `comment` command
#[derive(Parser, Debug, Clone)]
pub struct CommentArgs {
    /// Record to comment on
    #[arg(value_parser = validate_record_id)]
    pub record_id: String,

    /// Comment text
    #[arg(value_parser = validate_text)]
    pub content: String,

    /// Comment author (defaults to $USER)
    #[arg(short, long)]
    pub author: Option<String>,
}

/// Arguments for the `dep` command
#[derive(Parser, Debug, Clone)]
pub struct DepArgs {
    /// Dependency subcommand
    #[command(subcommand)]
    pub action: DepAction,
}

/// Dependency management actions
#[derive(Subcommand, Debug, Clone)]
pub enum DepAction {
    /// Add an edge from one record to another
    Add {
        /// Record that owns the edge
        #[arg(value_parser = validate_record_id)]
        from: String,

        /// Record the edge points at
        #[arg(value_parser = validate_record_id)]
        to: String,

        /// Dependency kind
        #[arg(short, long, value_enum, default_value = "blocked_by")]
        kind: DependencyKindArg,
    },

    /// Remove edges from one record to another
    Remove {
        /// Record that owns the edge
        #[arg(value_parser = validate_record_id)]
        from: String,

        /// Record the edge points at
        #[arg(value_parser = validate_record_id)]
        to: String,

        /// Only remove edges of this kind (default: every kind)
        #[arg(short, long, value_enum)]
        kind: Option<DependencyKindArg>,
    },
}

/// Arguments for the `progress` command
#[derive(Parser, Debug, Clone)]
pub struct ProgressArgs {
    /// Epic to report on
    #[arg(value_parser = validate_record_id)]
    pub epic_id: String,
}

/// Arguments for the `compact` command
#[derive(Parser, Debug, Clone, Default)]
pub struct CompactArgs {
    /// Age in days after which closed records are compacted
    /// (defaults to the project setting)
    #[arg(short, long, value_parser = clap::value_parser!(i64).range(0..))]
    pub days: Option<i64>,
}
