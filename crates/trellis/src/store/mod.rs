//! The record store.
//!
//! [`RecordStore`] owns one JSONL record file and its side-car lock file.
//! Every operation runs the same way:
//!
//! 1. wait for its turn in the in-process queue (FIFO)
//! 2. take the cross-process [`FileLock`]
//! 3. reload the file
//! 4. do its work
//! 5. release the lock, whether the work succeeded or not
//!
//! Writes are either a single appended line ([`RecordStore::create`]) or a
//! full rewrite through a temp file and rename ([`RecordStore::update`]).
//!
//! # Example
//!
//! ```no_run
//! use trellis::config::StoreConfig;
//! use trellis::domain::Record;
//! use trellis::store::RecordStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> trellis::error::Result<()> {
//! let store = RecordStore::new(StoreConfig::new(".trellis"));
//! store.create(Record::new("proj-a1", "Write the docs")).await?;
//!
//! let (records, warnings) = store.load().await?;
//! for warning in &warnings {
//!     eprintln!("{warning}");
//! }
//! # Ok(())
//! # }
//! ```

mod load;
mod lock;

pub use load::LoadWarning;
pub use lock::{FileLock, LockBody, LockGuard};

use crate::completion;
use crate::config::StoreConfig;
use crate::domain::{Comment, Record, RecordId};
use crate::error::{Error, Result};
use crate::id_generation;
use crate::validation;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use trellis_jsonl::{append_jsonl, write_jsonl_atomic};

/// File-backed record store with advisory locking.
///
/// Share one instance per process (e.g. behind an `Arc`) so the in-process
/// queue orders its callers; separate instances, like separate processes,
/// are only ordered by the lock file.
#[derive(Debug)]
pub struct RecordStore {
    config: StoreConfig,
    lock: FileLock,
    queue: Mutex<()>,
}

impl RecordStore {
    /// Create a store over the files named by `config`.
    ///
    /// Nothing is touched on disk until the first operation.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        let lock = FileLock::from_config(&config);
        Self {
            config,
            lock,
            queue: Mutex::new(()),
        }
    }

    /// The configuration this store was built with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path of the record file.
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        self.config.data_path()
    }

    /// Path of the lock file.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    /// Load every record.
    ///
    /// Unusable lines are skipped and reported as warnings; see
    /// [`LoadWarning`]. Migration repairs are applied to the returned
    /// records only, never written back.
    ///
    /// # Errors
    ///
    /// Returns `Error::LockTimeout` if the lock stays held, or `Error::Io` if
    /// the file exists but cannot be read.
    pub async fn load(&self) -> Result<(Vec<Record>, Vec<LoadWarning>)> {
        let _turn = self.queue.lock().await;
        let guard = self.lock.acquire().await?;
        let outcome = self.read().await;
        settle(outcome, guard.release().await)
    }

    /// Append a new record.
    ///
    /// If a record with the same id already exists the call succeeds without
    /// writing anything. The returned flag tells whether the record was
    /// written.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` listing every violation; checked before locking
    /// - `Error::LockTimeout` if the lock stays held
    /// - `Error::Io` / `Error::Json` if the file cannot be read or appended
    pub async fn create(&self, record: Record) -> Result<bool> {
        validation::validate(&record)?;

        let _turn = self.queue.lock().await;
        let guard = self.lock.acquire().await?;
        let outcome = self.append_if_absent(record).await;
        settle(outcome, guard.release().await)
    }

    /// Rewrite the file with whatever `mutator` makes of the current records.
    ///
    /// The result is validated as a whole (including id uniqueness) and
    /// rescored before anything is written.
    ///
    /// # Errors
    ///
    /// - `Error::Validation` listing every violation; the file is untouched
    /// - `Error::LockTimeout` if the lock stays held
    /// - `Error::Io` / `Error::Json` if the file cannot be read or rewritten
    pub async fn update<F>(&self, mutator: F) -> Result<()>
    where
        F: FnOnce(Vec<Record>) -> Vec<Record>,
    {
        self.try_update(|records| Ok(mutator(records))).await
    }

    /// Like [`RecordStore::update`] with a mutator that may refuse.
    ///
    /// An error from `mutator` aborts the cycle with nothing written and is
    /// returned as is.
    ///
    /// # Errors
    ///
    /// As [`RecordStore::update`], plus any error from `mutator`.
    pub async fn try_update<F>(&self, mutator: F) -> Result<()>
    where
        F: FnOnce(Vec<Record>) -> Result<Vec<Record>>,
    {
        self.rewrite(|records| mutator(records).map(|records| (records, ())))
            .await
    }

    /// Append a comment to record `id`.
    ///
    /// The comment gets a generated id and the current time, and the record's
    /// `updated_at` is bumped.
    ///
    /// # Errors
    ///
    /// - `Error::RecordNotFound` if no record has `id`
    /// - `Error::Validation` for a blank author or content
    /// - as [`RecordStore::update`] otherwise
    pub async fn add_comment(&self, id: &RecordId, author: &str, content: &str) -> Result<Comment> {
        self.rewrite(|mut records| {
            let record = records
                .iter_mut()
                .find(|r| &r.id == id)
                .ok_or_else(|| Error::RecordNotFound(id.clone()))?;

            let now = Utc::now();
            let comment = Comment {
                id: id_generation::comment_id(record, author, content)?,
                author: author.to_string(),
                content: content.to_string(),
                created_at: now,
            };
            record.comments.push(comment.clone());
            record.touch(now);
            Ok((records, comment))
        })
        .await
    }

    async fn read(&self) -> Result<(Vec<Record>, Vec<LoadWarning>)> {
        let path = self.data_path();
        let (records, warnings) = load::read_records(&path).await?;
        for warning in &warnings {
            warn!(path = %path.display(), "{warning}");
        }
        Ok((records, warnings))
    }

    async fn append_if_absent(&self, mut record: Record) -> Result<bool> {
        let (mut records, _) = self.read().await?;
        if records.iter().any(|r| r.id == record.id) {
            debug!(id = %record.id, "Record already exists, create is a no-op");
            return Ok(false);
        }

        records.push(record.clone());
        completion::annotate(&mut records);
        record.completion_percentage = records.last().and_then(|r| r.completion_percentage);

        append_jsonl(self.data_path(), &record).await?;
        debug!(id = %record.id, "Record created");
        Ok(true)
    }

    async fn rewrite<T, F>(&self, mutator: F) -> Result<T>
    where
        F: FnOnce(Vec<Record>) -> Result<(Vec<Record>, T)>,
    {
        let _turn = self.queue.lock().await;
        let guard = self.lock.acquire().await?;
        let outcome = self.rewrite_locked(mutator).await;
        settle(outcome, guard.release().await)
    }

    async fn rewrite_locked<T, F>(&self, mutator: F) -> Result<T>
    where
        F: FnOnce(Vec<Record>) -> Result<(Vec<Record>, T)>,
    {
        let (records, _) = self.read().await?;
        let (mut records, output) = mutator(records)?;

        for record in &mut records {
            record.completion_percentage = None;
        }
        validation::validate_all(&records)?;
        completion::annotate(&mut records);

        write_jsonl_atomic(self.data_path(), &records).await?;
        debug!(count = records.len(), "Record file rewritten");
        Ok(output)
    }
}

/// Combine an operation's outcome with its lock release.
///
/// The operation's own error wins over a release error.
fn settle<T>(outcome: Result<T>, released: Result<()>) -> Result<T> {
    let value = outcome?;
    released?;
    Ok(value)
}
