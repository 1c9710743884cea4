//! Application context for CLI command execution.
//!
//! [`App`] finds the project, reads its configuration and opens the
//! [`RecordStore`] the commands work against.
//!
//! # Example
//!
//! ```no_run
//! use trellis::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     let (records, _warnings) = app.store().load().await?;
//!     println!("{} records", records.len());
//!     Ok(())
//! }
//! ```

use crate::commands::init::find_trellis_root;
use crate::config::{ProjectConfig, CONFIG_FILE_NAME, TRELLIS_DIR_NAME};
use crate::error::{Error, Result};
use crate::store::RecordStore;
use std::path::{Path, PathBuf};

/// Application context for CLI operations.
#[derive(Debug)]
pub struct App {
    store: RecordStore,
    trellis_dir: PathBuf,
    config: ProjectConfig,
}

impl App {
    /// Create an App from a working directory.
    ///
    /// Searches up the directory tree for `.trellis/` and loads its
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no project is found or the configuration
    /// is invalid, and `Error::Io` if it cannot be read.
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root_dir = find_trellis_root(working_dir).ok_or_else(|| {
            Error::Config(format!(
                "Not a trellis project (or any parent up to the filesystem root). Run 'trellis init' to create {TRELLIS_DIR_NAME}/"
            ))
        })?;

        let trellis_dir = root_dir.join(TRELLIS_DIR_NAME);
        let config = ProjectConfig::load(&trellis_dir.join(CONFIG_FILE_NAME)).await?;
        let store = RecordStore::new(config.store_config(&trellis_dir));

        Ok(Self {
            store,
            trellis_dir,
            config,
        })
    }

    /// The record store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The project configuration.
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Record id prefix.
    pub fn prefix(&self) -> &str {
        &self.config.record_prefix
    }

    /// Path to the `.trellis` directory.
    pub fn trellis_dir(&self) -> &Path {
        &self.trellis_dir
    }
}
