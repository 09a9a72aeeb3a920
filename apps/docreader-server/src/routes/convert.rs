//! Conversion endpoint
//!
//! `POST /convert` with `{ "path": "..." }` answers with the transport
//! envelope: `{ success: true, pdf_data, filename }` or a failure body whose
//! status code follows the error classification.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::envelope::{ConversionRequest, ConversionSuccess};
use crate::error::{ConversionError, Result};
use crate::state::AppState;

pub async fn convert_document(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ConversionRequest>, JsonRejection>,
) -> Result<Json<ConversionSuccess>> {
    let Json(request) = payload.map_err(|rejection| {
        ConversionError::InvalidRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    let success = state
        .service()
        .convert(&request.path, request.media_type.as_deref())
        .await?;
    Ok(Json(success))
}
