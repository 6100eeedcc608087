//! Configuration file management.
//!
//! Settings live in `config.ini` under the platform config directory
//! (`~/.config/fleetmap/config.ini` on Linux):
//!
//! ```ini
//! [server]
//! bind = 127.0.0.1:8080
//!
//! [store]
//! backend = memory        ; memory | postgres | rest
//! database_url =
//! rest_url =
//! rest_key =
//! seed_file =
//!
//! [tiles]
//! max_age_secs = 3600
//! cache_size_mb = 64
//!
//! [map]
//! provider_token =
//! tile_base_url = http://127.0.0.1:8080
//!
//! [logging]
//! directory = ~/.config/fleetmap/logs
//! level = info
//! ```
//!
//! `FLEETMAP_PROVIDER_TOKEN` and `FLEETMAP_DATABASE_URL` override the file.

mod file;
mod keys;

pub use file::{
    ConfigFile, LoggingSettings, MapSettings, ServerSettings, StoreSettings, TileSettings,
    DEFAULT_BIND, DEFAULT_CACHE_SIZE_MB, DEFAULT_LOG_LEVEL, DEFAULT_MAX_AGE_SECS,
    ENV_DATABASE_URL, ENV_PROVIDER_TOKEN,
};
pub use keys::ConfigKey;

use std::path::PathBuf;

use thiserror::Error;

/// Errors loading, saving or editing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// `<platform config dir>/fleetmap`, falling back to `./.fleetmap`.
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("fleetmap"))
        .unwrap_or_else(|| PathBuf::from(".fleetmap"))
}

/// Path of `config.ini`.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_path() {
        let path = config_file_path();
        assert!(path.ends_with("fleetmap/config.ini"));
    }
}
