//! Route modules for the DocReader server

pub mod convert;
pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
///
/// `/convert` lives under the configured base URL; `/health` always sits at
/// the root.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let conversion = Router::new().route("/convert", post(convert::convert_document));
    let base_url = state.config().server.base_url.clone();
    let conversion = if base_url.is_empty() {
        conversion
    } else {
        Router::new().nest(&base_url, conversion)
    };

    Router::new()
        .route("/health", get(health::health_check))
        .merge(conversion)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
