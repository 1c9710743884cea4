//! Configuration for the record store and the project directory.
//!
//! [`StoreConfig`] is what [`RecordStore`](crate::store::RecordStore) is
//! built from. [`ProjectConfig`] is its on-disk form, kept as YAML in
//! `.trellis/config.yaml`:
//!
//! ```yaml
//! record-prefix: proj
//! storage:
//!   data-file: records.jsonl
//!   lock-file: records.lock
//!   lock-timeout-ms: 30000
//!   max-retries: 50
//!   retry-delay-ms: 100
//! compaction:
//!   age-threshold-days: 30
//! ```

use crate::compaction::{CompactionPolicy, DEFAULT_AGE_THRESHOLD_DAYS};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Name of the project directory
pub const TRELLIS_DIR_NAME: &str = ".trellis";

/// Name of the configuration file inside the project directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default record id prefix
pub const DEFAULT_PREFIX: &str = "proj";

/// Default name of the record file
pub const DEFAULT_DATA_FILE: &str = "records.jsonl";

/// Default name of the lock file
pub const DEFAULT_LOCK_FILE: &str = "records.lock";

/// Default age after which a lock is considered abandoned
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of lock retries before giving up
pub const DEFAULT_MAX_RETRIES: u32 = 50;

/// Default pause between lock retries
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Everything [`RecordStore`](crate::store::RecordStore) needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding the record and lock files
    pub directory: PathBuf,
    /// Record file name
    pub data_file: String,
    /// Lock file name
    pub lock_file: String,
    /// A lock older than this is removed before acquiring
    pub lock_timeout: Duration,
    /// Retries after the first failed acquisition
    pub max_retries: u32,
    /// Pause between retries
    pub retry_delay: Duration,
}

impl StoreConfig {
    /// Default settings for a store in `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            data_file: DEFAULT_DATA_FILE.to_string(),
            lock_file: DEFAULT_LOCK_FILE.to_string(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Full path of the record file.
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        self.directory.join(&self.data_file)
    }

    /// Full path of the lock file.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.directory.join(&self.lock_file)
    }
}

/// Project configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Record id prefix (e.g., "proj" for "proj-a3f8")
    pub record_prefix: String,

    /// Storage section
    #[serde(default)]
    pub storage: StorageSection,

    /// Compaction section
    #[serde(default)]
    pub compaction: CompactionSection,
}

/// `storage:` section of the project configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct StorageSection {
    /// Record file name, relative to the project directory
    pub data_file: String,
    /// Lock file name, relative to the project directory
    pub lock_file: String,
    /// Lock staleness threshold in milliseconds
    pub lock_timeout_ms: u64,
    /// Lock retries before giving up
    pub max_retries: u32,
    /// Pause between lock retries in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_file: DEFAULT_DATA_FILE.to_string(),
            lock_file: DEFAULT_LOCK_FILE.to_string(),
            lock_timeout_ms: u64::try_from(DEFAULT_LOCK_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: u64::try_from(DEFAULT_RETRY_DELAY.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// `compaction:` section of the project configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct CompactionSection {
    /// Closed records older than this are compacted
    pub age_threshold_days: i64,
}

impl Default for CompactionSection {
    fn default() -> Self {
        Self {
            age_threshold_days: DEFAULT_AGE_THRESHOLD_DAYS,
        }
    }
}

impl ProjectConfig {
    /// Create a configuration with the given prefix and default sections
    pub fn new(prefix: &str) -> Self {
        Self {
            record_prefix: prefix.to_string(),
            storage: StorageSection::default(),
            compaction: CompactionSection::default(),
        }
    }

    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and `Error::Config` if
    /// it is not valid configuration YAML.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.check()?;
        Ok(config)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Store settings for a project whose `.trellis` directory is
    /// `trellis_dir`.
    #[must_use]
    pub fn store_config(&self, trellis_dir: &Path) -> StoreConfig {
        StoreConfig {
            directory: trellis_dir.to_path_buf(),
            data_file: self.storage.data_file.clone(),
            lock_file: self.storage.lock_file.clone(),
            lock_timeout: Duration::from_millis(self.storage.lock_timeout_ms),
            max_retries: self.storage.max_retries,
            retry_delay: Duration::from_millis(self.storage.retry_delay_ms),
        }
    }

    /// Compaction policy with the configured threshold.
    #[must_use]
    pub fn compaction_policy(&self) -> CompactionPolicy {
        CompactionPolicy::older_than_days(self.compaction.age_threshold_days)
    }

    fn check(&self) -> Result<()> {
        if self.storage.data_file.trim().is_empty() || self.storage.lock_file.trim().is_empty() {
            return Err(Error::Config(
                "storage.data-file and storage.lock-file must not be empty".to_string(),
            ));
        }
        if self.storage.data_file == self.storage.lock_file {
            return Err(Error::Config(
                "storage.data-file and storage.lock-file must differ".to_string(),
            ));
        }
        if self.compaction.age_threshold_days < 0 {
            return Err(Error::Config(
                "compaction.age-threshold-days must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}
