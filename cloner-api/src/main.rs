use anyhow::{Context, Result};
use clap::Parser;
use cloner_api::{create_app, AppState, Cli, Config};
use cloner_core::{is_tool_installed, CancellationToken};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = cloner_logging::init_subscriber();

    info!("Starting cloner-api service...");

    let mut config = Config::from_env()?;
    Cli::parse().apply(&mut config);
    info!(
        "Configuration loaded: bind_addr={}, workspace_root={}, source_repo={}, progress_mode={:?}",
        config.bind_addr,
        config.workspace_root.display(),
        config.source_repo,
        config.progress_mode
    );

    for tool in [&config.git_program, &config.editor_program] {
        if !is_tool_installed(tool) {
            warn!("'{}' was not found on PATH; requests that need it will fail", tool);
        }
    }

    let shutdown = CancellationToken::new();
    let state = AppState::from_config(&config, shutdown.clone());
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested, cancelling running clones");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
