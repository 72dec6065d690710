//! Startup helpers for the Synapse server.

use std::process::ExitCode;

use crate::common::config::AppConfig;
use crate::server::{self, AppState};

/// Run the server until Ctrl-C (used by the `synapse-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();

    tracing::info!("Starting Synapse mediator v{}", env!("CARGO_PKG_VERSION"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };
    tracing::info!(
        endpoint = %config.mediator.base_url,
        primary = %config.mediator.primary_model,
        "Mediator configured"
    );

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let result = rt.block_on(async {
        let state = AppState::from_config(&config).await?;
        server::run_server_with_shutdown(state, config.server.port, shutdown_signal()).await?;
        anyhow::Ok(())
    });

    if let Err(e) = result {
        tracing::error!("Server error: {e:#}");
        return ExitCode::from(1);
    }

    tracing::info!("Synapse server stopped");
    ExitCode::SUCCESS
}

/// Install the global `tracing` subscriber, honouring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
