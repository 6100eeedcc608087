//! Addressable configuration keys for `config get/set`.

use std::path::PathBuf;
use std::str::FromStr;

use super::file::{parse_backend, parse_bind, parse_u64};
use super::{ConfigError, ConfigFile};

/// A `section.key` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ServerBind,
    StoreBackend,
    StoreDatabaseUrl,
    StoreRestUrl,
    StoreRestKey,
    StoreSeedFile,
    TilesMaxAgeSecs,
    TilesCacheSizeMb,
    MapProviderToken,
    MapTileBaseUrl,
    LoggingDirectory,
    LoggingLevel,
}

const ALL_KEYS: [ConfigKey; 12] = [
    ConfigKey::ServerBind,
    ConfigKey::StoreBackend,
    ConfigKey::StoreDatabaseUrl,
    ConfigKey::StoreRestUrl,
    ConfigKey::StoreRestKey,
    ConfigKey::StoreSeedFile,
    ConfigKey::TilesMaxAgeSecs,
    ConfigKey::TilesCacheSizeMb,
    ConfigKey::MapProviderToken,
    ConfigKey::MapTileBaseUrl,
    ConfigKey::LoggingDirectory,
    ConfigKey::LoggingLevel,
];

impl ConfigKey {
    /// Every key, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &ALL_KEYS
    }

    /// Full `section.key` name.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::ServerBind => "server.bind",
            ConfigKey::StoreBackend => "store.backend",
            ConfigKey::StoreDatabaseUrl => "store.database_url",
            ConfigKey::StoreRestUrl => "store.rest_url",
            ConfigKey::StoreRestKey => "store.rest_key",
            ConfigKey::StoreSeedFile => "store.seed_file",
            ConfigKey::TilesMaxAgeSecs => "tiles.max_age_secs",
            ConfigKey::TilesCacheSizeMb => "tiles.cache_size_mb",
            ConfigKey::MapProviderToken => "map.provider_token",
            ConfigKey::MapTileBaseUrl => "map.tile_base_url",
            ConfigKey::LoggingDirectory => "logging.directory",
            ConfigKey::LoggingLevel => "logging.level",
        }
    }

    pub fn section(&self) -> &'static str {
        self.name().split('.').next().unwrap_or_default()
    }

    pub fn key_name(&self) -> &'static str {
        self.name().split('.').nth(1).unwrap_or_default()
    }

    /// Current value as text; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        match self {
            ConfigKey::ServerBind => config.server.bind.to_string(),
            ConfigKey::StoreBackend => config.store.backend.as_str().to_string(),
            ConfigKey::StoreDatabaseUrl => opt(&config.store.database_url),
            ConfigKey::StoreRestUrl => opt(&config.store.rest_url),
            ConfigKey::StoreRestKey => opt(&config.store.rest_key),
            ConfigKey::StoreSeedFile => config
                .store
                .seed_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            ConfigKey::TilesMaxAgeSecs => config.tiles.max_age_secs.to_string(),
            ConfigKey::TilesCacheSizeMb => config.tiles.cache_size_mb.to_string(),
            ConfigKey::MapProviderToken => opt(&config.map.provider_token),
            ConfigKey::MapTileBaseUrl => config.map.tile_base_url.clone(),
            ConfigKey::LoggingDirectory => config.logging.directory.display().to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
        }
    }

    /// Validate and store `value`. An empty value clears optional settings.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let optional = || (!value.is_empty()).then(|| value.to_string());

        match self {
            ConfigKey::ServerBind => config.server.bind = parse_bind(value)?,
            ConfigKey::StoreBackend => config.store.backend = parse_backend(value)?,
            ConfigKey::StoreDatabaseUrl => config.store.database_url = optional(),
            ConfigKey::StoreRestUrl => config.store.rest_url = optional(),
            ConfigKey::StoreRestKey => config.store.rest_key = optional(),
            ConfigKey::StoreSeedFile => config.store.seed_file = optional().map(PathBuf::from),
            ConfigKey::TilesMaxAgeSecs => {
                config.tiles.max_age_secs = parse_u64(self.name(), value)?
            }
            ConfigKey::TilesCacheSizeMb => {
                config.tiles.cache_size_mb = parse_u64(self.name(), value)?
            }
            ConfigKey::MapProviderToken => config.map.provider_token = optional(),
            ConfigKey::MapTileBaseUrl => {
                config.map.tile_base_url = optional().ok_or_else(|| self.required())?
            }
            ConfigKey::LoggingDirectory => {
                config.logging.directory = optional().map(PathBuf::from).ok_or_else(|| self.required())?
            }
            ConfigKey::LoggingLevel => {
                config.logging.level = optional().ok_or_else(|| self.required())?
            }
        }
        Ok(())
    }

    fn required(&self) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name().to_string(),
            value: String::new(),
            reason: "value is required".to_string(),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ALL_KEYS
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_key() {
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
        assert!(matches!(
            "tiles.nope".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_section_and_key_name() {
        assert_eq!(ConfigKey::MapProviderToken.section(), "map");
        assert_eq!(ConfigKey::MapProviderToken.key_name(), "provider_token");
    }

    #[test]
    fn test_set_then_get() {
        let mut config = ConfigFile::default();

        ConfigKey::TilesMaxAgeSecs.set(&mut config, "120").unwrap();
        assert_eq!(ConfigKey::TilesMaxAgeSecs.get(&config), "120");

        ConfigKey::StoreBackend.set(&mut config, "rest").unwrap();
        assert_eq!(ConfigKey::StoreBackend.get(&config), "rest");

        ConfigKey::MapProviderToken.set(&mut config, "pk.abc").unwrap();
        assert_eq!(config.map.provider_token.as_deref(), Some("pk.abc"));

        ConfigKey::MapProviderToken.set(&mut config, "").unwrap();
        assert_eq!(config.map.provider_token, None);
        assert_eq!(ConfigKey::MapProviderToken.get(&config), "");
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::ServerBind.set(&mut config, "not an addr").is_err());
        assert!(ConfigKey::TilesCacheSizeMb.set(&mut config, "-1").is_err());
        assert!(ConfigKey::StoreBackend.set(&mut config, "oracle").is_err());
        assert!(ConfigKey::LoggingLevel.set(&mut config, " ").is_err());
        assert_eq!(config, ConfigFile::default());
    }
}
