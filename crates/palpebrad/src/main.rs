use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod agent;
mod api;
mod config;
mod datalake;
mod pool;
mod worker;

use api::AppState;
use config::Config;
use pool::AgentPool;

#[actix_web::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    // DEBUG selects the default verbosity; RUST_LOG still wins.
    let default_filter = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    tracing::info!(debug = config.debug, "palpebrad starting");

    let pool = Arc::new(AgentPool::new());
    let worker = worker::spawn_worker(&config, pool.clone())
        .context("failed to start the analytics worker")?;

    let listen_addr = config.listen_addr.clone();
    let state = web::Data::new(AppState {
        pool,
        jobs: Arc::new(worker),
        config: Arc::new(config),
    });

    tracing::info!(addr = %listen_addr, "palpebrad listening");
    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::configure))
        .bind(listen_addr.as_str())?
        .run()
        .await?;

    tracing::info!("palpebrad shutting down");
    Ok(())
}
