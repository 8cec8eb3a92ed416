//! Turtle Soup Back binary entrypoint wiring REST, SSE, storage and the
//! oracle client together.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dto;
mod error;
mod oracle;
mod routes;
mod sanitize;
mod services;
mod state;
mod store;

use config::AppConfig;
use oracle::HttpOracle;
use services::game_service;
use state::AppState;
use store::{KvBackend, StoreAdapter, file::FileKvBackend, memory::MemoryKvBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load().context("loading configuration")?;

    let backend: Arc<dyn KvBackend> = match &config.store.data_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "using file-backed storage");
            Arc::new(
                FileKvBackend::open(dir.clone(), config.store.quota_bytes)
                    .await
                    .context("opening data directory")?,
            )
        }
        None => {
            info!("no data directory configured; state is kept in memory");
            Arc::new(MemoryKvBackend::new(config.store.quota_bytes))
        }
    };

    let oracle = HttpOracle::new(&config.oracle).context("building oracle client")?;
    let app_state = AppState::new(StoreAdapter::new(backend), Arc::new(oracle));

    // Pick up where an interrupted session left off, if a fresh snapshot
    // exists.
    game_service::restore_session(&app_state).await;

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: state::SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
