//! # Huddle API Server
//!
//! HTTP backend for Huddle: accounts, profiles, the follow graph, events and
//! RSVPs, and the activity feed.
//!
//! ## Startup
//!
//! 1. Initialize tracing (`RUST_LOG`, `LOG_FORMAT`)
//! 2. Load configuration from the environment
//! 3. Connect to PostgreSQL and run migrations
//! 4. Pick a mailer (SendGrid when `SENDGRID_API_KEY` is set, else log only)
//! 5. Serve until Ctrl-C, then close the pool
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p huddle-api
//! ```

use huddle_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat},
};
use huddle_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
        postgres::PgStore,
    },
    mail::{LogMailer, Mailer, SendGridMailer},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!("Huddle API Server v{} starting...", huddle_shared::VERSION);

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    let mailer: Arc<dyn Mailer> = match &config.mail.sendgrid_api_key {
        Some(key) => Arc::new(SendGridMailer::new(key.clone(), config.mail.from.clone())?),
        None => {
            tracing::warn!("SENDGRID_API_KEY not set, outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    };

    let addr = config.bind_address();
    let state = AppState::new(Arc::new(PgStore::new(pool.clone())), mailer, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "huddle_api=debug,huddle_shared=debug,tower_http=debug".into());

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
