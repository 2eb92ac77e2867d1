use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use boxoffice_api::{build_router, config, telemetry, worker, AppState};
use boxoffice_inventory::Catalog;
use boxoffice_types::constants::{ENGINE_NAME, VERSION};
use boxoffice_types::{AppConfig, BoxofficeError, Result};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{ENGINE_NAME}: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = config::from_env()?;
    telemetry::init(&config.server)?;
    tracing::info!(version = VERSION, "starting {ENGINE_NAME}");

    let catalog = load_catalog(&config)?;
    let (state, events) = AppState::new(&config, catalog);
    let providers: Vec<_> = state.orchestrator.providers().names().collect();
    if providers.is_empty() {
        tracing::warn!("no payment providers configured; payments cannot be initialized");
    }

    let settlement_worker = tokio::spawn(worker::run_settlement_worker(
        Arc::clone(&state.settlement),
        events,
    ));
    let sweeper = tokio::spawn(worker::run_expiry_sweeper(
        Arc::clone(&state.orchestrator),
        Duration::from_secs(config.checkout.sweep_interval_secs.max(1)),
    ));

    let listener = tokio::net::TcpListener::bind(config.server.listen_addr).await?;
    tracing::info!(addr = %config.server.listen_addr, providers = ?providers, "listening");

    // The router holds the only queue sender; once it is dropped after
    // shutdown, the worker drains what is queued and exits.
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    if let Err(err) = settlement_worker.await {
        tracing::warn!(error = %err, "settlement worker ended abnormally");
    }
    tracing::info!("shutdown complete");
    Ok(())
}

fn load_catalog(config: &AppConfig) -> Result<Catalog> {
    let Some(path) = &config.catalog_path else {
        tracing::warn!("BOXOFFICE_CATALOG_PATH not set; starting with an empty catalog");
        return Ok(Catalog::default());
    };
    let catalog = Catalog::load(path)
        .map_err(|e| BoxofficeError::Configuration(format!("catalog {path}: {e}")))?;
    tracing::info!(
        path = %path,
        ticket_types = catalog.ticket_types().count(),
        seatmaps = catalog.seatmaps().count(),
        "catalog loaded"
    );
    Ok(catalog)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl-C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
