//! Serve command - run the tile and map-action HTTP server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use fleetmap::server::{self, AppState};
use fleetmap::tile::TileService;

use super::common::{check_provider_token, open_store, resolve_backend, BackendArg};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the serve command.
pub struct ServeArgs {
    pub bind: Option<SocketAddr>,
    pub backend: Option<BackendArg>,
    pub seed: Option<PathBuf>,
}

/// Run the serve command until Ctrl+C.
pub fn run(args: ServeArgs) -> Result<(), CliError> {
    let mut runner = CliRunner::new(true)?;
    runner.log_startup("serve");

    if let Some(seed) = args.seed {
        runner.config_mut().store.seed_file = Some(seed);
    }
    let config = runner.config();
    let bind = args.bind.unwrap_or(config.server.bind);
    let backend = resolve_backend(args.backend, config);
    let service_config = config.tile_service_config();

    println!("Fleetmap Tile Server v{}", fleetmap::VERSION);
    println!("==========================");
    println!();
    println!("Backend:    {}", backend.as_str());
    println!("Listening:  http://{}", bind);
    println!(
        "Tile cache: {}",
        if service_config.cache_size_bytes == 0 {
            "disabled".to_string()
        } else {
            format!(
                "{} MB, max-age {}s",
                service_config.cache_size_bytes / (1024 * 1024),
                service_config.max_age.as_secs()
            )
        }
    );
    if let Err(e) = check_provider_token(config) {
        tracing::warn!(error = %e, "Serving without a map provider token");
        println!("Map token:  not set, map views will not mount");
        println!("            {}", e);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    // Set up signal handler for graceful shutdown
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::unbounded_channel::<()>();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, stopping server...");
        let _ = shutdown_tx.send(());
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let metrics = runtime.block_on(async {
        let store = open_store(backend, config).await?;
        let service = Arc::new(TileService::new(store, service_config));
        let metrics = service.metrics();

        println!();
        println!("Press Ctrl+C to stop");
        println!();

        let shutdown = async move {
            shutdown_rx.recv().await;
        };
        server::serve(bind, AppState::new(service), shutdown).await?;
        Ok::<_, CliError>(metrics)
    })?;

    let snapshot = metrics.snapshot();
    if snapshot.requests > 0 {
        println!();
        println!("Session Summary");
        println!("───────────────");
        println!("  {}", snapshot);
    }

    println!();
    println!("Server stopped.");
    Ok(())
}
