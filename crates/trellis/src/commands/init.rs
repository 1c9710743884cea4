//! Implementation of the `init` command.
//!
//! Creates the `.trellis/` directory with its configuration, an empty record
//! file and a `.gitignore` for the lock and temp files.

use crate::config::{ProjectConfig, CONFIG_FILE_NAME, DEFAULT_PREFIX, TRELLIS_DIR_NAME};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the gitignore file within .trellis
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Minimum prefix length
pub const MIN_PREFIX_LENGTH: usize = 2;

/// Maximum prefix length
pub const MAX_PREFIX_LENGTH: usize = 20;

/// Maximum directory depth to traverse when searching for the project root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created .trellis directory
    pub trellis_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created record file
    pub data_file: PathBuf,
    /// Path to the created gitignore file
    pub gitignore_file: PathBuf,
    /// The prefix used for record ids
    pub prefix: String,
}

/// Validate record id prefix format.
///
/// The prefix must be 2-20 ASCII letters or digits. Expects pre-trimmed
/// input.
///
/// # Errors
///
/// Returns `Error::Config` describing the first rule broken.
pub fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.len() < MIN_PREFIX_LENGTH {
        return Err(Error::Config(format!(
            "Prefix must be at least {MIN_PREFIX_LENGTH} characters"
        )));
    }

    if prefix.len() > MAX_PREFIX_LENGTH {
        return Err(Error::Config(format!(
            "Prefix cannot exceed {MAX_PREFIX_LENGTH} characters"
        )));
    }

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::Config(
            "Prefix must contain only alphanumeric characters".to_string(),
        ));
    }

    Ok(())
}

/// Initialize a new project in `base_dir`.
///
/// # Errors
///
/// Returns an error if:
/// - `.trellis/` already exists
/// - the prefix is invalid
/// - file system operations fail
pub async fn init(base_dir: &Path, prefix: Option<&str>) -> Result<InitResult> {
    let prefix = prefix.unwrap_or(DEFAULT_PREFIX).trim();
    validate_prefix(prefix)?;

    let trellis_dir = base_dir.join(TRELLIS_DIR_NAME);
    if trellis_dir.exists() {
        return Err(Error::Config(format!(
            "Trellis is already initialized in this directory. Found existing '{TRELLIS_DIR_NAME}'"
        )));
    }

    fs::create_dir_all(&trellis_dir).await?;

    let config = ProjectConfig::new(prefix);
    let config_file = trellis_dir.join(CONFIG_FILE_NAME);
    config.save(&config_file).await?;

    let data_file = trellis_dir.join(&config.storage.data_file);
    fs::write(&data_file, "").await?;

    let gitignore_file = trellis_dir.join(GITIGNORE_FILE_NAME);
    let gitignore_content = format!(
        "# Lock and temp files are per-machine; {} is shared\n{}\n*.tmp\n",
        config.storage.data_file, config.storage.lock_file
    );
    fs::write(&gitignore_file, gitignore_content).await?;

    Ok(InitResult {
        trellis_dir,
        config_file,
        data_file,
        gitignore_file,
        prefix: prefix.to_string(),
    })
}

/// Returns `true` if `base_dir` holds a `.trellis/` directory.
pub fn is_initialized(base_dir: &Path) -> bool {
    base_dir.join(TRELLIS_DIR_NAME).exists()
}

/// Find the project root by walking up from `start_dir`.
///
/// Returns the first directory containing `.trellis/`, or `None` once the
/// filesystem root or [`MAX_TRAVERSAL_DEPTH`] is reached.
pub fn find_trellis_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if is_initialized(&current) {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
