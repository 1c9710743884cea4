//! Whole-file rewrites that never leave a half-written file behind.
//!
//! Values go to a sibling `<name>.tmp` file, which is synced and then
//! renamed over the target. Readers see either the old file or the new one.
//! A crash before the rename leaves the target untouched; the stray `.tmp`
//! is overwritten by the next rewrite.

use crate::{JsonlWriter, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};

/// Replace the contents of `path` with one JSON line per value.
///
/// # Errors
///
/// Fails if a value does not serialize or the temp file cannot be written,
/// synced or renamed. The target is unchanged on failure and the temp file
/// is removed when possible.
///
/// ```no_run
/// # async fn example() -> trellis_jsonl::Result<()> {
/// let rows = vec![serde_json::json!({"id": "a"}), serde_json::json!({"id": "b"})];
/// trellis_jsonl::write_jsonl_atomic("records.jsonl", &rows).await?;
/// # Ok(())
/// # }
/// ```
pub async fn write_jsonl_atomic<T, I, P>(path: P, values: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let temp = temp_path(path);

    let written = match write_synced(&temp, values).await {
        Ok(count) => count,
        Err(e) => {
            let _ = fs::remove_file(&temp).await;
            return Err(e);
        }
    };

    fs::rename(&temp, path).await?;
    tracing::trace!(written, path = %path.display(), "Rewrote JSONL file");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

async fn write_synced<T, I>(temp: &Path, values: I) -> Result<usize>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = JsonlWriter::new(File::create(temp).await?);
    let count = writer.write_all(values).await?;
    writer.flush().await?;
    writer.into_inner().sync_all().await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;
    use serde::Serializer;

    #[test]
    fn temp_file_sits_next_to_target() {
        assert_eq!(
            temp_path(Path::new("/data/.trellis/records.jsonl")),
            Path::new("/data/.trellis/records.jsonl.tmp")
        );
        assert_eq!(temp_path(Path::new("records")), Path::new("records.tmp"));
    }

    #[tokio::test]
    async fn replaces_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("records.jsonl");
        fs::write(&target, "stale\n").await.unwrap();

        write_jsonl_atomic(&target, [serde_json::json!({"id": "t-1"})])
            .await
            .unwrap();

        assert_eq!(
            fs::read_to_string(&target).await.unwrap(),
            "{\"id\":\"t-1\"}\n"
        );
        assert!(!dir.path().join("records.jsonl.tmp").exists());
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(S::Error::custom("nope"))
        }
    }

    #[tokio::test]
    async fn failed_rewrite_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("records.jsonl");
        fs::write(&target, "keep\n").await.unwrap();

        let result = write_jsonl_atomic(&target, [Unserializable]).await;

        assert!(matches!(result, Err(crate::Error::Json(_))));
        assert_eq!(fs::read_to_string(&target).await.unwrap(), "keep\n");
        assert!(!dir.path().join("records.jsonl.tmp").exists());
    }
}
