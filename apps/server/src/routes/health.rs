// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Health check endpoint.

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub model_configured: bool,
    pub sheets_configured: bool,
}

/// API information response.
#[derive(Debug, Serialize)]
pub struct ApiInfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub endpoints: Vec<EndpointInfo>,
}

/// Endpoint information.
#[derive(Debug, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

/// GET /api/health - Health check endpoint.
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "cotizador-server",
        model_configured: state.config.model.api_key.is_some(),
        sheets_configured: state.config.sheets.is_configured(),
    })
}

/// GET / - API information endpoint.
pub async fn info() -> Json<ApiInfoResponse> {
    Json(ApiInfoResponse {
        service: "cotizador-server",
        version: env!("CARGO_PKG_VERSION"),
        description: "Furniture photo and measurements to a tentative cut list",
        endpoints: vec![
            EndpointInfo {
                method: "GET",
                path: "/api/health",
                description: "Health check endpoint",
            },
            EndpointInfo {
                method: "POST",
                path: "/api/analyze",
                description: "Generate a despiece from an image and measurements (multipart)",
            },
            EndpointInfo {
                method: "POST",
                path: "/api/save",
                description: "Save a quote to Google Sheets",
            },
        ],
    })
}
