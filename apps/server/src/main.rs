// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cotizador Server - furniture photo to cut list.
//!
//! An internal user uploads a furniture photo with its dimensions and
//! material; a vision-capable model proposes a tentative cut list
//! ("despiece"), which can then be saved as a quote in Google Sheets.
//!
//! Every request is independent: no queueing, no background jobs and no
//! state shared between requests beyond read-only configuration.
//!
//! # Endpoints
//!
//! - `GET /` - API information
//! - `GET /api/health` - Health check
//! - `POST /api/analyze` - Multipart image + measurements to despiece
//! - `POST /api/save` - Persist a quote (also `/api/save-to-sheets`)

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

mod config;
mod error;
mod routes;
mod services;
mod types;

use config::Config;
use services::{quote_store, Analyzer, GoogleSheetsClient, OpenAiVisionClient, QuoteStore};

/// Room for the text fields and multipart framing around the image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub analyzer: Arc<Analyzer>,
    pub quotes: Arc<dyn QuoteStore>,
}

/// Builds the router with all routes and middleware.
fn app(state: AppState) -> Router {
    let body_limit = state.config.max_file_size_bytes() + FORM_OVERHEAD_BYTES;
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        // Root endpoint - API information
        .route("/", get(routes::health::info))
        // Health check
        .route("/api/health", get(routes::health::check))
        // Despiece generation
        .route("/api/analyze", post(routes::analyze::analyze))
        // Quote persistence
        .route("/api/save", post(routes::save::save))
        .route("/api/save-to-sheets", post(routes::save::save))
        // Middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,cotizador_server=debug".into()),
        )
        .pretty()
        .init();

    if let Ok(path) = &dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let config = Config::from_env();

    tracing::info!(
        port = config.port,
        upload_dir = %config.upload_dir,
        max_file_size_mb = config.max_file_size_mb,
        model = %config.model.model,
        model_configured = config.model.api_key.is_some(),
        sheets_configured = config.sheets.is_configured(),
        sheets_write_mode = ?config.sheets.write_mode,
        "Starting Cotizador Server"
    );

    let model = Arc::new(OpenAiVisionClient::new(&config.model));
    let sheets = Arc::new(GoogleSheetsClient::new(&config.sheets));

    let state = AppState {
        analyzer: Arc::new(Analyzer::new(model)),
        quotes: quote_store(&config.sheets, sheets),
        config: Arc::new(config),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app(state))
        .await
        .context("Server error")?;
    Ok(())
}
