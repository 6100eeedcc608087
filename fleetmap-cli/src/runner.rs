//! Shared command setup: configuration and logging.

use fleetmap::config::ConfigFile;
use fleetmap::logging::{init_logging, LoggingGuard};

use crate::error::CliError;

/// Loaded configuration plus the logging guard for one command run.
pub struct CliRunner {
    config: ConfigFile,
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Load `config.ini` with environment overrides and install logging.
    ///
    /// `console` mirrors log output to stderr.
    pub fn new(console: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?.with_env_overrides();
        let logging = init_logging(&config.logging.directory, &config.logging.level, console)?;
        Ok(Self {
            config,
            _logging: logging,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigFile {
        &mut self.config
    }

    pub fn log_startup(&self, command: &str) {
        tracing::info!(
            command,
            version = fleetmap::VERSION,
            backend = self.config.store.backend.as_str(),
            "fleetmap starting"
        );
    }
}
