mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use grove_api::mailer::LogMailer;
use grove_api::{AppState, AppStateInner};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grove=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and repair any counter drift from earlier runs
    let db = grove_db::Database::open(&config.db_path)?;
    db.reconcile_story_counters()?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        mailer: Arc::new(LogMailer),
        public_url: config.public_url.clone(),
        notification_retention_days: config.notification_retention_days,
    });

    let app = grove_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("SupportGrove server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
