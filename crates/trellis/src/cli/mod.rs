//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `init`: Create `.trellis/` in the current directory
//! - `create`: Append a new record
//! - `list`: List records with optional filters
//! - `show`: Show one record with its dependents
//! - `ready` / `blocked`: Split open work by blocker state
//! - `status` / `close`: Move a record through its lifecycle
//! - `comment`: Attach a comment to a record
//! - `dep add|remove`: Edit dependency edges
//! - `progress`: Subtask progress of an epic
//! - `compact`: Preview what compaction would trim
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! trellis create --title "Parse config" --type task --priority high
//! trellis dep add proj-a1b2 proj-c3d4 --kind blocked_by
//! trellis close proj-c3d4
//! ```

mod args;
mod execute;
mod types;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{
    BlockedArgs, CloseArgs, CommentArgs, CompactArgs, CreateArgs, DepAction, DepArgs, InitArgs,
    ListArgs, ProgressArgs, ReadyArgs, ShowArgs, StatusArgs,
};
pub use types::{DependencyKindArg, PriorityArg, RecordTypeArg, StatusArg};
pub use validators::{validate_prefix, validate_record_id, validate_text, validate_title};

/// Trellis - task records with dependencies and completion tracking
///
/// Records live in `.trellis/records.jsonl`, one JSON object per line, and
/// are safe to edit from several processes at once.
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new trellis project
    ///
    /// Creates `.trellis/` with a configuration file and an empty record file.
    Init(InitArgs),

    /// Create a new record
    Create(CreateArgs),

    /// List records with optional filters
    List(ListArgs),

    /// Show detailed information about a record
    Show(ShowArgs),

    /// Show open records with nothing blocking them
    Ready(ReadyArgs),

    /// Show records waiting on an unfinished blocker
    Blocked(BlockedArgs),

    /// Change the status of a record
    Status(StatusArgs),

    /// Close a record
    ///
    /// Refuses while the record has open subtasks or unmet acceptance
    /// criteria, unless `--force` is given.
    Close(CloseArgs),

    /// Add a comment to a record
    Comment(CommentArgs),

    /// Add or remove a dependency between records
    Dep(DepArgs),

    /// Show subtask progress of an epic
    Progress(ProgressArgs),

    /// Preview compaction of old closed records
    ///
    /// Nothing is written; the command lists what would be trimmed.
    Compact(CompactArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    #[must_use]
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    ///
    /// # Errors
    ///
    /// Returns the clap error for invalid arguments.
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    ///
    /// # Errors
    ///
    /// Returns any error from locating the project or running the command.
    pub async fn execute(&self) -> Result<()> {
        use crate::output::OutputMode;

        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        let Some(command) = &self.command else {
            println!("Trellis task tracker");
            println!("Use --help for more information");
            return Ok(());
        };

        match command {
            Commands::Init(args) => execute::execute_init(args, output_mode).await,
            Commands::Create(args) => {
                execute::execute_create(&current_app().await?, args, output_mode).await
            }
            Commands::List(args) => {
                execute::execute_list(&current_app().await?, args, output_mode).await
            }
            Commands::Show(args) => {
                execute::execute_show(&current_app().await?, args, output_mode).await
            }
            Commands::Ready(args) => {
                execute::execute_ready(&current_app().await?, args, output_mode).await
            }
            Commands::Blocked(args) => {
                execute::execute_blocked(&current_app().await?, args, output_mode).await
            }
            Commands::Status(args) => {
                execute::execute_status(&current_app().await?, args, output_mode).await
            }
            Commands::Close(args) => {
                execute::execute_close(&current_app().await?, args, output_mode).await
            }
            Commands::Comment(args) => {
                execute::execute_comment(&current_app().await?, args, output_mode).await
            }
            Commands::Dep(args) => {
                execute::execute_dep(&current_app().await?, args, output_mode).await
            }
            Commands::Progress(args) => {
                execute::execute_progress(&current_app().await?, args, output_mode).await
            }
            Commands::Compact(args) => {
                execute::execute_compact(&current_app().await?, args, output_mode).await
            }
        }
    }
}

/// Open the project enclosing the current directory.
async fn current_app() -> Result<crate::app::App> {
    let app = crate::app::App::from_directory(&std::env::current_dir()?).await?;
    Ok(app)
}
