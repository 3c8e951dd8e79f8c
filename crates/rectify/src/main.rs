//! Portal backend for one-time schedule rectification.

mod config;
mod db;
mod planner;
mod server;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::RectifyConfig;
use crate::db::RequestStore;
use crate::planner::SisClient;
use crate::types::{AppState, StubVerifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let config = RectifyConfig::from_env();
    info!(
        bind_addr = %config.bind_addr,
        sis = %config.sis_base_url,
        "starting rectification portal backend"
    );

    let store = RequestStore::new(&config.db_path)
        .with_context(|| format!("failed to open request store at {}", config.db_path))?;
    let client =
        SisClient::with_config(config.sis_config()).context("failed to build SIS client")?;

    let state = Arc::new(AppState::new(
        config.clone(),
        client,
        store,
        Box::new(StubVerifier),
    ));
    let router = server::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!("listening on {}", config.bind_addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    info!("shutdown signal received");
}
