//! mycert - Main entry point
//!
//! Issues locally-trusted development certificates over HTTP using mkcert.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mycert_config::Config;
use mycert_server::{
    ensure_root_ca, prepare_directories, router, AppState, ArtifactSweeper, Cli, LogFormat,
    MkcertTool, RootCaState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_format, cli.verbose);

    let config = cli.to_config().context("Invalid configuration")?;

    if cli.test {
        return test_config(&config);
    }

    run_server(config).await
}

/// Initialize logging; `RUST_LOG` overrides the level selected by `--verbose`
fn init_logging(format: LogFormat, verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// Report the effective configuration and exit
fn test_config(config: &Config) -> Result<()> {
    info!("Configuration test successful:");
    info!("  - listen: {}", config.listen);
    info!("  - cert dir: {}", config.cert_dir.display());
    info!("  - mkcert: {}", config.tool_path.display());
    info!("  - CA root: {}", config.ca_root.display());
    info!("  - retention: {}", config.retention);

    if !config.tool_path.is_file() {
        warn!(
            "mkcert binary '{}' does not exist",
            config.tool_path.display()
        );
    }

    println!("mycert: configuration test is successful");
    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        listen = %config.listen,
        cert_dir = %config.cert_dir.display(),
        ca_root = %config.ca_root.display(),
        mkcert = %config.tool_path.display(),
        retention = %config.retention,
        "Starting mycert"
    );

    prepare_directories(&config).context("Failed to prepare directories")?;

    let tool = Arc::new(MkcertTool::new(&config));
    match ensure_root_ca(&config, tool.as_ref())
        .await
        .context("Failed to install the root CA")?
    {
        RootCaState::AlreadyPresent => info!("Using existing root CA"),
        RootCaState::Installed => info!("Root CA installed"),
    }

    if let Some(max_age) = config.sweep_after {
        tokio::spawn(ArtifactSweeper::new(config.cert_dir.clone(), max_age).run());
    }

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    info!(addr = %config.listen, "Listening");

    let app = router(AppState::new(config, tool));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal, initiating graceful shutdown");
}
