mod api;
mod badge;
mod config;
mod db;
mod error;
mod export;
mod stats;
mod types;
mod validator;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::badge::LogBadgeHook;
use crate::config::Config;
use crate::db::{Db, ListingStore};
use crate::error::Result;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let db = Arc::new(Db::open(&cfg.db_path));
    // The handle opens lazily, but warming it here surfaces migration
    // problems at startup instead of on the first request.
    db.pool().await?;

    let state = ApiState {
        store: ListingStore::new(Arc::clone(&db)),
        db,
        badge: Arc::new(LogBadgeHook),
    };
    let app = router(state);

    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
