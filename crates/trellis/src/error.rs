//! Error types for trellis operations.

use crate::domain::{DependencyKind, RecordId};
use crate::id_generation::IdGenerationError;
use crate::validation::ValidationError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The error type for trellis operations.
///
/// Unreadable lines met while loading are not errors; they are reported as
/// [`LoadWarning`](crate::store::LoadWarning)s alongside the records that did
/// load.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more records failed validation. Nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The advisory lock could not be acquired within the retry budget.
    #[error("Lock not acquired: {} still held after {attempts} attempts", path.display())]
    LockTimeout {
        /// Path of the lock file
        path: PathBuf,
        /// Number of acquisition attempts made
        attempts: u32,
    },

    /// Adding the edge would close a cycle among edges of an acyclic kind.
    #[error("Dependency {from} -> {to} ({kind}) would create a cycle")]
    Cycle {
        /// Source of the rejected edge
        from: RecordId,
        /// Target of the rejected edge
        to: RecordId,
        /// Kind of the rejected edge
        kind: DependencyKind,
    },

    /// No record with the given id exists.
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    /// The record may not be closed yet.
    #[error("Cannot close {id}: {reason}")]
    CloseRefused {
        /// Record that stays open
        id: RecordId,
        /// What is still outstanding
        reason: String,
    },

    /// No free id could be generated.
    #[error(transparent)]
    IdGeneration(#[from] IdGenerationError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<trellis_jsonl::Error> for Error {
    fn from(err: trellis_jsonl::Error) -> Self {
        match err {
            trellis_jsonl::Error::Io(e) => Self::Io(e),
            trellis_jsonl::Error::Json(e) => Self::Json(e),
        }
    }
}

/// A specialized Result type for trellis operations.
pub type Result<T> = std::result::Result<T, Error>;
