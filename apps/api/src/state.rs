use std::sync::Arc;

use crate::alerts::AlertGate;
use crate::assessment::scoring::ScoringTable;
use crate::auth::IdentityProvider;
use crate::clock::Clock;
use crate::config::Config;
use crate::mail::Mailer;
use crate::report::engine::PdfEngine;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// `PgStore`, or `UnconfiguredStore` when no database is configured.
    pub store: Arc<dyn Store>,
    pub pdf: Arc<dyn PdfEngine>,
    pub mailer: Arc<dyn Mailer>,
    /// Resolves admin bearer tokens against the auth provider.
    pub identity: Arc<dyn IdentityProvider>,
    pub clock: Arc<dyn Clock>,
    pub alerts: Arc<AlertGate>,
    pub scoring: Arc<ScoringTable>,
    pub config: Config,
}
