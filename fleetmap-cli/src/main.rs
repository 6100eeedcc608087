//! Fleetmap CLI - equipment map tile server and tooling.
//!
//! ```text
//! fleetmap serve [--bind ADDR] [--backend memory|postgres|rest] [--seed FILE]
//! fleetmap tile <Z> <X> <Y> [--status S] [--type T] [--region R] [--warehouse W] [--server URL]
//! fleetmap config get|set|list|path
//! ```

mod commands;
mod error;
mod runner;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::common::BackendArg;
use commands::config::ConfigCommands;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "fleetmap", version, about = "Equipment map tile server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve vector tiles and map actions over HTTP
    Serve {
        /// Address to listen on (default from config, 127.0.0.1:8080)
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Spatial store backend (default from config)
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,

        /// JSON equipment list for the memory backend
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Fetch one tile from a running server and report its size
    #[command(allow_negative_numbers = true)]
    Tile {
        /// Zoom level (0-20)
        z: i64,
        /// Tile column
        x: i64,
        /// Tile row
        y: i64,

        /// Only equipment with this status
        #[arg(long)]
        status: Option<String>,

        /// Only equipment of this type
        #[arg(long = "type")]
        kind: Option<String>,

        /// Only equipment in this region
        #[arg(long)]
        region: Option<String>,

        /// Only equipment assigned to this warehouse
        #[arg(long)]
        warehouse: Option<String>,

        /// Server base URL (default: map.tile_base_url)
        #[arg(long)]
        server: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Serve {
            bind,
            backend,
            seed,
        } => commands::serve::run(commands::serve::ServeArgs {
            bind,
            backend,
            seed,
        }),
        Commands::Tile {
            z,
            x,
            y,
            status,
            kind,
            region,
            warehouse,
            server,
            timeout,
        } => commands::tile::run(commands::tile::TileArgs {
            z,
            x,
            y,
            status,
            kind,
            region,
            warehouse,
            server,
            timeout,
        }),
        Commands::Config { command } => commands::config::run(command),
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tile_with_filters() {
        let cli = Cli::try_parse_from([
            "fleetmap", "tile", "6", "19", "38", "--status", "A", "--type", "freezer",
        ])
        .unwrap();

        match cli.command {
            Commands::Tile {
                z, status, kind, ..
            } => {
                assert_eq!(z, 6);
                assert_eq!(status.as_deref(), Some("A"));
                assert_eq!(kind.as_deref(), Some("freezer"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_backend() {
        let cli = Cli::try_parse_from(["fleetmap", "serve", "--backend", "postgres"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Serve {
                backend: Some(BackendArg::Postgres),
                ..
            }
        ));
    }
}
