//! JSONL (JSON Lines) plumbing for trellis record files.
//!
//! This library provides line-numbered resilient reading, buffered writing,
//! single-line appends and atomic whole-file rewrites of JSONL data.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod atomic;
pub mod error;
pub mod reader;
pub mod warning;
pub mod writer;

pub use atomic::write_jsonl_atomic;
pub use error::{Error, Result};
pub use reader::{read_jsonl_resilient, JsonlReader, Located};
pub use warning::Warning;
pub use writer::{append_jsonl, JsonlWriter};
