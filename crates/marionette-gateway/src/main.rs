use clap::Parser;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::info;

use marionette_gateway::app;

#[derive(Parser, Debug)]
#[command(name = "marionette-gateway", about = "Character control plane gateway")]
struct Args {
    /// Path to marionette.toml (defaults to ./marionette.toml).
    #[arg(long)]
    config: Option<String>,

    /// Override the bind address from config.
    #[arg(long)]
    bind: Option<String>,

    /// Override the port from config.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marionette_gateway=info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();
    let mut config = marionette_core::config::MarionetteConfig::load(args.config.as_deref())
        .unwrap_or_else(|e| {
            tracing::warn!("config load failed ({}), using defaults", e);
            Default::default()
        });
    if let Some(bind) = args.bind {
        config.gateway.bind = bind;
    }
    if let Some(port) = args.port {
        config.gateway.port = port;
    }

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let cancel = CancellationToken::new();
    let state = app::AppState::build(config, app::Engines::default(), cancel.clone())?;
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("marionette gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    Ok(())
}

/// Resolves on Ctrl-C and stops the scheduler/ingest tasks with it.
async fn shutdown_signal(cancel: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
    cancel.cancel();
}
