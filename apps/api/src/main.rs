mod admin;
mod alerts;
mod assessment;
mod auth;
mod clock;
mod config;
mod db;
mod errors;
mod mail;
mod models;
mod report;
mod retry;
mod routes;
mod state;
mod store;
mod tokens;
mod tracking;

#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::alerts::AlertGate;
use crate::assessment::scoring::ScoringTable;
use crate::auth::{AuthClient, IdentityProvider, UnconfiguredIdentity};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::create_pool;
use crate::mail::{DisabledMailer, Mailer, SmtpMailer};
use crate::report::engine::HeadlessChrome;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{PgStore, Store, UnconfiguredStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CCPM360 API v{}", env!("CARGO_PKG_VERSION"));

    // Backend store; degrade to 503s rather than refusing to start
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(PgStore::new(
            create_pool(url, config.run_migrations).await?,
        )),
        None => {
            warn!("DATABASE_URL not set; data endpoints will answer 503");
            Arc::new(UnconfiguredStore)
        }
    };

    let scoring = match &config.scoring_table_path {
        Some(path) => {
            let table = ScoringTable::from_file(path)?;
            info!("Scoring table loaded from {}", path.display());
            table
        }
        None => ScoringTable::default().validated()?,
    };

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            info!("SMTP mailer initialized (host: {})", smtp.host);
            Arc::new(SmtpMailer::new(smtp.clone()))
        }
        None => {
            warn!("SMTP_HOST not set; report emails will not be delivered");
            Arc::new(DisabledMailer)
        }
    };

    let identity: Arc<dyn IdentityProvider> = match &config.auth {
        Some(auth) => Arc::new(AuthClient::new(auth.clone())),
        None => {
            warn!("AUTH_URL not set; admin endpoints will answer 503");
            Arc::new(UnconfiguredIdentity)
        }
    };

    let pdf = Arc::new(HeadlessChrome::new(&config.render));
    info!(
        "Report renderer: {} ({} launch)",
        config.render.chrome_path, config.render.mode
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Build app state
    let state = AppState {
        store,
        pdf,
        mailer,
        identity,
        clock: clock.clone(),
        alerts: Arc::new(AlertGate::new(clock)),
        scoring: Arc::new(scoring),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
