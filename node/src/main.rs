//! # VowLock Node
//!
//! Entry point for the `vowlock-node` binary: the thin process that serves
//! the registry frontend its static page and configuration bundle. Parses
//! CLI arguments, initializes logging, and runs the HTTP server until a
//! shutdown signal arrives.

mod api;
mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use cli::{Commands, ServeArgs, VowlockNodeCli};
use logging::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = VowlockNodeCli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the HTTP server on the configured port.
async fn serve(args: ServeArgs) -> Result<()> {
    logging::init_logging(
        "vowlock_node=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    let registry_address = args.registry_address.unwrap_or_default();
    if registry_address.is_empty() {
        tracing::warn!("no registry address configured; /config will serve an empty field");
    }

    let state = api::AppState {
        registry_address,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let router = api::create_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", addr))?;
    tracing::info!("vowlock-node listening on {}", addr);

    tokio::select! {
        res = axum::serve(listener, router) => {
            if let Err(e) = res {
                tracing::error!("server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("vowlock-node stopped");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("vowlock-node {}", env!("CARGO_PKG_VERSION"));
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
