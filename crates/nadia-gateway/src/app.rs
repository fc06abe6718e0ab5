use std::sync::Arc;

use axum::Router;
use nadia_core::{CognitiveRouter, NadiaConfig};
use nadia_identity::EntityResolver;
use nadia_store_kv::KvStore;
use nadia_tracker::ActivityTracker;

use crate::transport::LoggingTransport;

/// Central shared state handed to every Axum handler, collapsing the
/// pipeline's cyclic-looking dependency graph (tracker feeds the
/// orchestrator, the orchestrator's review queue feeds the sender, the
/// sender needs the resolver) into one explicit struct built once at boot.
pub struct AppState {
    pub config: NadiaConfig,
    pub router: CognitiveRouter,
    pub tracker: Arc<ActivityTracker>,
    pub resolver: Arc<EntityResolver<LoggingTransport>>,
    pub transport: Arc<LoggingTransport>,
    pub kv: KvStore,
}

/// Assembles the dashboard's JSON HTTP surface (from `nadia-review`) plus
/// the inbound webhook and health endpoints this binary owns directly.
pub fn build_router(state: Arc<AppState>, dashboard: Router) -> Router {
    Router::new()
        .merge(crate::http::inbound::router())
        .route("/health", axum::routing::get(crate::http::health::health_handler))
        .with_state(state)
        .merge(dashboard)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
