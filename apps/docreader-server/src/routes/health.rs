//! Health check endpoint

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Whether a Unicode font family was found
    pub unicode_fonts: bool,
    pub font_family: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let chain = state.fonts().resolve();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        unicode_fonts: !chain.is_degraded(),
        font_family: chain.family_name().to_string(),
    })
}
