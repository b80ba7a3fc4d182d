mod config;
pub mod database;
pub mod presets;

pub use config::{AudioConfig, Config, CueFile, TickClock, TimerConfig};
pub use database::Database;
pub use presets::{PresetStore, PRESETS_KEY, SCHEMA_VERSION, VERSION_KEY};

use std::path::PathBuf;

use crate::error::StorageError;

/// Returns the data directory, creating it if needed.
///
/// `BREATHCOUNT_DATA_DIR` wins outright. Otherwise `~/.config/breathcount[-dev]/`,
/// with the `-dev` suffix when `BREATHCOUNT_ENV=dev`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, StorageError> {
    let dir = match std::env::var_os("BREATHCOUNT_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("BREATHCOUNT_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("breathcount-dev")
            } else {
                base_dir.join("breathcount")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| StorageError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
