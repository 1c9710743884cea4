//! Trellis - a task record store with advisory locking, a dependency graph
//! and completion tracking.
//!
//! Records live one per line in a JSONL file. Any number of processes may
//! share that file: every operation holds a side-car lock file for its whole
//! read-modify-write span, and operations within one process queue in FIFO
//! order before touching the lock.
//!
//! The crate is both the library behind the `trellis` binary and a building
//! block for other front ends:
//!
//! - [`store::RecordStore`]: `load`, `create`, `update`, `add_comment`
//! - [`graph`]: pure functions over a record list (ready work, blockers,
//!   cycle-checked edges, epic progress, close checks)
//! - [`completion`]: the completion percentage of a record
//! - [`compaction`]: shrinking long-closed records
//! - [`migration`]: repairs applied to legacy data while loading

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod compaction;
pub mod completion;
pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod id_generation;
pub mod migration;
pub mod store;
pub mod validation;

// Public CLI module (needed by binary)
pub mod cli;

// Command implementations
pub mod commands;

// CLI support
pub mod app;
pub mod output;
