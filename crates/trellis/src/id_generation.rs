//! Hash-based id generation for records and comments.
//!
//! Ids are a SHA-256 digest of the inputs plus a timestamp and nonce,
//! base36 encoded and cut to a short length:
//!
//! - records: `{prefix}-{hash}` (e.g. `proj-a3f8`), 4-6 characters of hash
//!   depending on how many records exist
//! - comments: `c-{hash}`, 6 characters of hash
//!
//! A candidate that collides with a known id is retried with the next
//! nonce; once the nonces run out the hash grows by one character.
//!
//! # Example
//!
//! ```
//! use trellis::id_generation::IdGenerator;
//!
//! let mut generator = IdGenerator::new("proj", 0);
//! let id = generator.record_id("Fix login", "").unwrap();
//! assert!(id.as_str().starts_with("proj-"));
//! ```

use crate::domain::{Record, RecordId};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_NONCE: u32 = 100;

/// Longest hash a u64 can fill in base36.
const MAX_HASH_LENGTH: usize = 12;

/// Hash length used for comment ids.
const COMMENT_HASH_LENGTH: usize = 6;

/// Prefix of every comment id.
pub const COMMENT_PREFIX: &str = "c";

/// Errors that can occur during id generation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdGenerationError {
    /// Every nonce at every length collided
    #[error("Unable to generate unique ID after {attempts} attempts")]
    CollisionExhausted {
        /// Candidates tried
        attempts: u32,
    },
}

/// Collision-aware id generator for one record set.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    prefix: String,
    record_count: usize,
    existing: HashSet<String>,
}

impl IdGenerator {
    /// Create a generator for a store currently holding `record_count`
    /// records. No ids are known yet; see [`IdGenerator::for_records`].
    pub fn new(prefix: impl Into<String>, record_count: usize) -> Self {
        Self {
            prefix: prefix.into(),
            record_count,
            existing: HashSet::new(),
        }
    }

    /// Create a generator that avoids every id already in `records`.
    pub fn for_records(prefix: impl Into<String>, records: &[Record]) -> Self {
        let mut generator = Self::new(prefix, records.len());
        generator
            .existing
            .extend(records.iter().map(|r| r.id.as_str().to_string()));
        generator
    }

    /// Generate a fresh record id.
    ///
    /// # Errors
    ///
    /// Returns [`IdGenerationError::CollisionExhausted`] if no free id was
    /// found.
    pub fn record_id(
        &mut self,
        title: &str,
        description: &str,
    ) -> Result<RecordId, IdGenerationError> {
        let id = unique_id(
            &self.prefix,
            &[title, description],
            self.adaptive_length(),
            &self.existing,
        )?;
        self.existing.insert(id.clone());
        self.record_count += 1;
        Ok(RecordId::new(id))
    }

    /// Hash length for the current record count.
    ///
    /// - 0-500 records: 4 chars
    /// - 501-1,500: 5 chars
    /// - 1,501+: 6 chars
    fn adaptive_length(&self) -> usize {
        match self.record_count {
            0..=500 => 4,
            501..=1500 => 5,
            _ => 6,
        }
    }
}

/// Generate an id for a new comment on `record`, distinct from its existing
/// comment ids.
///
/// # Errors
///
/// Returns [`IdGenerationError::CollisionExhausted`] if no free id was found.
pub fn comment_id(
    record: &Record,
    author: &str,
    content: &str,
) -> Result<String, IdGenerationError> {
    let existing: HashSet<String> = record.comments.iter().map(|c| c.id.clone()).collect();
    unique_id(
        COMMENT_PREFIX,
        &[record.id.as_str(), author, content],
        COMMENT_HASH_LENGTH,
        &existing,
    )
}

fn unique_id(
    prefix: &str,
    parts: &[&str],
    start_length: usize,
    existing: &HashSet<String>,
) -> Result<String, IdGenerationError> {
    let mut attempts = 0;
    for length in start_length..=MAX_HASH_LENGTH {
        for nonce in 0..MAX_NONCE {
            attempts += 1;
            let id = format!("{prefix}-{}", hash_part(parts, nonce, length));
            if !existing.contains(&id) {
                if attempts > 1 {
                    debug!(attempts, length, "Generated unique id after collisions");
                }
                return Ok(id);
            }
        }
    }
    Err(IdGenerationError::CollisionExhausted { attempts })
}

fn hash_part(parts: &[&str], nonce: u32, length: usize) -> String {
    let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"|");
    }
    hasher.update(timestamp.to_le_bytes());
    hasher.update(nonce.to_le_bytes());
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    encode_base36(u64::from_be_bytes(head), length)
}

/// Encode the low digits of `num` in base36, zero padded to `length`.
fn encode_base36(mut num: u64, length: usize) -> String {
    let mut digits = Vec::with_capacity(length);
    while digits.len() < length {
        let digit = usize::try_from(num % 36).unwrap_or_default();
        digits.push(char::from(BASE36_CHARS[digit]));
        num /= 36;
    }
    digits.iter().rev().collect()
}
