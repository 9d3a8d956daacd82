// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Quote persistence endpoint.

use crate::error::ApiError;
use crate::types::{SaveRequest, SaveResponse};
use crate::AppState;
use axum::{body::Bytes, extract::State, Json};
use chrono::{SecondsFormat, Utc};
use cotizador_core::QuoteRecord;

/// POST /api/save - Persist a reviewed quote.
///
/// The body is parsed by hand so malformed JSON gets the same error shape
/// as every other failure.
pub async fn save(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SaveResponse>, ApiError> {
    let request: SaveRequest = if body.is_empty() {
        SaveRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };
    let project = request.project.ok_or(ApiError::MissingProject)?;

    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let record = QuoteRecord::from_project(&project, timestamp)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize pieces: {e}")))?;

    let receipt = state.quotes.save(&record).await?;

    Ok(Json(SaveResponse {
        success: true,
        sheet: receipt.sheet,
        range: receipt.range,
    }))
}
