//! Router assembly.

pub mod common;
pub mod ranger;

pub use common::common_routes;
pub use ranger::ranger_routes;

use crate::config::Settings;
use crate::state::AppState;
use axum::Router;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// The full application: every route plus CORS, body limit and request tracing.
pub fn app(state: AppState, settings: &Settings) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(ranger_routes(state))
        .layer(RequestBodyLimitLayer::new(settings.body_limit))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
}
