//! INI configuration file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;

use crate::store::StoreBackend;
use crate::tile::TileServiceConfig;

use super::{config_directory, config_file_path, ConfigError};

/// Environment variable overriding `map.provider_token`.
pub const ENV_PROVIDER_TOKEN: &str = "FLEETMAP_PROVIDER_TOKEN";
/// Environment variable overriding `store.database_url`.
pub const ENV_DATABASE_URL: &str = "FLEETMAP_DATABASE_URL";

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;
pub const DEFAULT_CACHE_SIZE_MB: u64 = 64;
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub bind: SocketAddr,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub rest_url: Option<String>,
    pub rest_key: Option<String>,
    /// JSON equipment list for the memory backend.
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileSettings {
    pub max_age_secs: u64,
    pub cache_size_mb: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    /// Basemap provider access token; the map view refuses to mount without it.
    pub provider_token: Option<String>,
    /// Public base URL the map view builds tile templates from.
    pub tile_base_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub level: String,
}

/// Parsed `config.ini`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub tiles: TileSettings,
    pub map: MapSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let bind: SocketAddr = DEFAULT_BIND
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 8080)));

        Self {
            server: ServerSettings { bind },
            store: StoreSettings::default(),
            tiles: TileSettings {
                max_age_secs: DEFAULT_MAX_AGE_SECS,
                cache_size_mb: DEFAULT_CACHE_SIZE_MB,
            },
            map: MapSettings {
                provider_token: None,
                tile_base_url: format!("http://{}", bind),
            },
            logging: LoggingSettings {
                directory: config_directory().join("logs"),
                level: DEFAULT_LOG_LEVEL.to_string(),
            },
        }
    }
}

fn ini_get<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.section(Some(section)).and_then(|s| s.get(key))
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(super) fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: "expected a non-negative integer".to_string(),
    })
}

pub(super) fn parse_bind(value: &str) -> Result<SocketAddr, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: "server.bind".to_string(),
        value: value.to_string(),
        reason: "expected host:port".to_string(),
    })
}

pub(super) fn parse_backend(value: &str) -> Result<StoreBackend, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: "store.backend".to_string(),
        value: value.to_string(),
        reason: "expected memory, postgres or rest".to_string(),
    })
}

impl ConfigFile {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Build from parsed INI; absent keys keep their defaults.
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |section: &str, key: &str| ini_get(ini, section, key);

        if let Some(v) = get("server", "bind") {
            config.server.bind = parse_bind(v)?;
            config.map.tile_base_url = format!("http://{}", config.server.bind);
        }

        if let Some(v) = get("store", "backend") {
            config.store.backend = parse_backend(v)?;
        }
        config.store.database_url = get("store", "database_url").and_then(non_empty);
        config.store.rest_url = get("store", "rest_url").and_then(non_empty);
        config.store.rest_key = get("store", "rest_key").and_then(non_empty);
        config.store.seed_file = get("store", "seed_file")
            .and_then(non_empty)
            .map(PathBuf::from);

        if let Some(v) = get("tiles", "max_age_secs") {
            config.tiles.max_age_secs = parse_u64("tiles.max_age_secs", v)?;
        }
        if let Some(v) = get("tiles", "cache_size_mb") {
            config.tiles.cache_size_mb = parse_u64("tiles.cache_size_mb", v)?;
        }

        config.map.provider_token = get("map", "provider_token").and_then(non_empty);
        if let Some(v) = get("map", "tile_base_url").and_then(non_empty) {
            config.map.tile_base_url = v;
        }

        if let Some(v) = get("logging", "directory").and_then(non_empty) {
            config.logging.directory = PathBuf::from(v);
        }
        if let Some(v) = get("logging", "level").and_then(non_empty) {
            config.logging.level = v;
        }

        Ok(config)
    }

    /// Serialize every setting, writing unset optionals as empty values.
    pub fn to_ini(&self) -> Ini {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let mut ini = Ini::new();

        ini.with_section(Some("server"))
            .set("bind", self.server.bind.to_string());
        ini.with_section(Some("store"))
            .set("backend", self.store.backend.as_str())
            .set("database_url", opt(&self.store.database_url))
            .set("rest_url", opt(&self.store.rest_url))
            .set("rest_key", opt(&self.store.rest_key))
            .set(
                "seed_file",
                self.store
                    .seed_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
            );
        ini.with_section(Some("tiles"))
            .set("max_age_secs", self.tiles.max_age_secs.to_string())
            .set("cache_size_mb", self.tiles.cache_size_mb.to_string());
        ini.with_section(Some("map"))
            .set("provider_token", opt(&self.map.provider_token))
            .set("tile_base_url", self.map.tile_base_url.clone());
        ini.with_section(Some("logging"))
            .set("directory", self.logging.directory.display().to_string())
            .set("level", self.logging.level.clone());

        ini
    }

    /// Save to the default location, creating the directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_ini().write_to_file(path)?;
        Ok(())
    }

    /// Apply environment overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup(ENV_PROVIDER_TOKEN).as_deref().and_then(non_empty) {
            self.map.provider_token = Some(token);
        }
        if let Some(url) = lookup(ENV_DATABASE_URL).as_deref().and_then(non_empty) {
            self.store.database_url = Some(url);
        }
        self
    }

    pub fn tile_service_config(&self) -> TileServiceConfig {
        TileServiceConfig {
            max_age: Duration::from_secs(self.tiles.max_age_secs),
            cache_size_bytes: self.tiles.cache_size_mb * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("config.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.tiles.max_age_secs, 3600);
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.store.backend = StoreBackend::Postgres;
        config.store.database_url = Some("postgres://localhost/fleet".to_string());
        config.tiles.max_age_secs = 60;
        config.map.provider_token = Some("pk.test".to_string());
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[tiles]\ncache_size_mb = 8\n\n[map]\nprovider_token =\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.tiles.cache_size_mb, 8);
        assert_eq!(config.tiles.max_age_secs, DEFAULT_MAX_AGE_SECS);
        assert_eq!(config.map.provider_token, None);
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[tiles]\nmax_age_secs = soon\n").unwrap();

        let result = ConfigFile::load_from(&path);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let config = ConfigFile::default().with_overrides_from(|name| match name {
            ENV_PROVIDER_TOKEN => Some("pk.env".to_string()),
            ENV_DATABASE_URL => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(config.map.provider_token.as_deref(), Some("pk.env"));
        assert_eq!(config.store.database_url, None);
    }

    #[test]
    fn test_tile_service_config() {
        let mut config = ConfigFile::default();
        config.tiles.max_age_secs = 120;
        config.tiles.cache_size_mb = 2;

        let service = config.tile_service_config();
        assert_eq!(service.max_age, Duration::from_secs(120));
        assert_eq!(service.cache_size_bytes, 2 * 1024 * 1024);
    }
}
