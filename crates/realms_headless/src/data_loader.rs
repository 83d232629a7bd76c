//! Game config loading for headless runs.
//!
//! Looks for `realms.ron` in a data directory, falling back to the content
//! table compiled into `realms_core` when none is found.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use realms_core::data::GameConfig;
use realms_core::error::GameError;
use thiserror::Error;

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "REALMS_DATA_DIR";

/// File name looked up inside a data directory.
pub const CONFIG_FILE: &str = "realms.ron";

/// Errors that can occur while loading a config.
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// Failed to read file.
    #[error("IO error reading '{path}': {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Parsing or validation failed.
    #[error(transparent)]
    Config(#[from] GameError),
}

/// Find the data directory.
///
/// Checks [`DATA_DIR_ENV`] first, then standard relative locations.
pub fn default_data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        let path = PathBuf::from(dir);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!(path = %path.display(), "{DATA_DIR_ENV} does not exist");
    }

    let candidates = ["assets/data", "../assets/data", "../../assets/data"];
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|path| path.join(CONFIG_FILE).exists())
}

/// Load and validate a config file.
pub fn load_config_file(path: &Path) -> Result<GameConfig, DataLoadError> {
    let text = fs::read_to_string(path).map_err(|source| DataLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config = GameConfig::from_ron_str(&text, &path.display().to_string())?.validated()?;
    tracing::info!(
        path = %path.display(),
        races = config.races.len(),
        buildings = config.buildings.len(),
        "Loaded game config"
    );
    Ok(config)
}

/// Load the config for a run.
///
/// An explicit `path` may name a file or a data directory. Without one, the
/// default data directory is used if it holds a config, else the built-in
/// table.
pub fn load_config(path: Option<&Path>) -> Result<Arc<GameConfig>, DataLoadError> {
    let file = match path {
        Some(p) if p.is_dir() => Some(p.join(CONFIG_FILE)),
        Some(p) => Some(p.to_path_buf()),
        None => default_data_dir()
            .map(|dir| dir.join(CONFIG_FILE))
            .filter(|f| f.exists()),
    };
    let config = match file {
        Some(file) => load_config_file(&file)?,
        None => {
            tracing::info!("Using built-in game config");
            GameConfig::builtin()?
        }
    };
    Ok(Arc::new(config))
}
