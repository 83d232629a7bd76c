//! Save files on disk.
//!
//! Writes go to a temporary sibling file that is renamed over the target, so
//! an interrupted write never leaves a truncated save behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from reading or writing save files.
#[derive(Error, Debug)]
pub enum SaveStoreError {
    /// Failed to read the save.
    #[error("Failed to read save '{path}': {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Failed to write the save.
    #[error("Failed to write save '{path}': {source}")]
    Write {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `bytes` to `path` atomically.
///
/// Missing parent directories are created.
pub fn write_save(path: &Path, bytes: &[u8]) -> Result<(), SaveStoreError> {
    let fail = |source| SaveStoreError::Write {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(fail)?;
    }

    let tmp = temp_path(path);
    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if let Err(source) = result {
        let _ = fs::remove_file(&tmp);
        return Err(fail(source));
    }

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Save written");
    Ok(())
}

/// Read a save file.
pub fn read_save(path: &Path) -> Result<Vec<u8>, SaveStoreError> {
    fs::read(path).map_err(|source| SaveStoreError::Read {
        path: path.display().to_string(),
        source,
    })
}
