//! Async file helpers
//!
//! Output files are rewritten with a write-then-rename strategy: content goes to
//! a sibling `<name>.injected` file which replaces the original only once it has
//! been written completely. Readers therefore never observe a half-rewritten
//! output, and a failed run leaves the original untouched.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::constants::INJECTED_FILE_SUFFIX;
use crate::core::SviError;

/// Sibling path used as the temporary target while rewriting `path`.
///
/// # Examples
///
/// ```rust
/// use svi_cli::utils::injected_sibling;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(
///     injected_sibling(Path::new("deploy/values.yml")),
///     PathBuf::from("deploy/values.yml.injected")
/// );
/// ```
#[must_use]
pub fn injected_sibling(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(INJECTED_FILE_SUFFIX);
    PathBuf::from(name)
}

/// Read a local source document fully into memory.
pub async fn read_source(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        anyhow::Error::new(e).context(SviError::FileSystemError {
            operation: "read source".to_string(),
            path: path.display().to_string(),
        })
    })
}

/// Atomically replace `target` with `temp`, overwriting the target.
///
/// Both paths must live on the same filesystem; callers guarantee this by
/// using [`injected_sibling`].
pub async fn replace_file(temp: &Path, target: &Path) -> Result<()> {
    tokio::fs::rename(temp, target)
        .await
        .with_context(|| format!("Failed to rename {} to {}", temp.display(), target.display()))
}
