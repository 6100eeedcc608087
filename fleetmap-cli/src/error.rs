//! CLI error type.

use std::fmt;

use fleetmap::client::ClientError;
use fleetmap::config::ConfigError;
use fleetmap::coord::CoordError;
use fleetmap::logging::LoggingError;
use fleetmap::server::ServerError;
use fleetmap::store::StoreError;

/// Errors surfaced to the user; every variant exits with status 1.
#[derive(Debug)]
pub enum CliError {
    /// Missing or invalid configuration.
    Config(String),
    /// Logging could not be installed.
    Logging(String),
    /// Store connection or seed failure.
    Store(String),
    /// Server failed to start or crashed.
    Serve(String),
    /// Tile request failed.
    Tile(String),
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(msg) => write!(f, "Logging error: {}", msg),
            CliError::Store(msg) => write!(f, "Store error: {}", msg),
            CliError::Serve(msg) => write!(f, "Server error: {}", msg),
            CliError::Tile(msg) => write!(f, "Tile error: {}", msg),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        CliError::Store(e.to_string())
    }
}

impl From<ServerError> for CliError {
    fn from(e: ServerError) -> Self {
        CliError::Serve(e.to_string())
    }
}

impl From<ClientError> for CliError {
    fn from(e: ClientError) -> Self {
        CliError::Tile(e.to_string())
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::Tile(e.to_string())
    }
}
