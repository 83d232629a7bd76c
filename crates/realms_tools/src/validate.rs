//! Data validation utilities.

use std::fs;
use std::path::{Path, PathBuf};

use realms_core::data::GameConfig;
use thiserror::Error;

/// Why validation could not pass.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Failed to read a file or directory.
    #[error("IO error reading '{path}': {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The directory holds no `.ron` files.
    #[error("No .ron files found in '{0}'")]
    NoConfigs(String),
    /// At least one file has errors.
    #[error("{failed} of {total} config files failed validation")]
    Failed {
        /// Files with errors.
        failed: usize,
        /// Files checked.
        total: usize,
    },
}

/// Result of checking one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// File checked.
    pub path: PathBuf,
    /// Parse or reference errors; empty when the file is valid.
    pub errors: Vec<String>,
}

impl FileReport {
    /// Whether the file is valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse `path` as a [`GameConfig`] and collect its validation errors.
pub fn validate_file(path: &Path) -> Result<FileReport, ValidationError> {
    let text = fs::read_to_string(path).map_err(|source| ValidationError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let errors = match GameConfig::from_ron_str(&text, &path.display().to_string()) {
        Ok(config) => config.validate(),
        Err(e) => vec![e.to_string()],
    };
    Ok(FileReport {
        path: path.to_path_buf(),
        errors,
    })
}

/// Check a single file, or every `.ron` file in a directory (sorted by name).
pub fn validate_path(path: &Path) -> Result<Vec<FileReport>, ValidationError> {
    if !path.is_dir() {
        return Ok(vec![validate_file(path)?]);
    }

    let io_err = |source| ValidationError::Io {
        path: path.display().to_string(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(io_err)? {
        let file = entry.map_err(io_err)?.path();
        if file.extension().is_some_and(|e| e == "ron") {
            files.push(file);
        }
    }
    if files.is_empty() {
        return Err(ValidationError::NoConfigs(path.display().to_string()));
    }
    files.sort();
    files.iter().map(|f| validate_file(f)).collect()
}

/// Validate all RON data files under `path` and log every problem.
///
/// # Errors
///
/// Returns an error if any data file fails validation.
pub fn validate_data_directory(path: &Path) -> Result<(), ValidationError> {
    let reports = validate_path(path)?;
    let total = reports.len();
    let mut failed = 0;
    for report in &reports {
        if report.is_valid() {
            tracing::info!(path = %report.path.display(), "OK");
            continue;
        }
        failed += 1;
        for error in &report.errors {
            tracing::error!(path = %report.path.display(), "{error}");
        }
    }
    if failed > 0 {
        return Err(ValidationError::Failed { failed, total });
    }
    Ok(())
}
