//! Defines routes for the streaming relay.
//!
//! ## Structure
//! - `GET /`                 — index page naming the showcase object
//! - `GET /download/{*key}`  — conditional streaming download
//! - `GET /healthz`          — liveness
//! - `GET /readyz`           — readiness (sqlite + disk probes)
//!
//! The wildcard `*key` allows nested keys like `photos/2025/img.jpg`.

use crate::handlers::{
    AppState,
    download_handlers::download_object,
    health_handlers::{healthz, readyz},
    index_handlers::show_index_page,
};
use axum::{Router, routing::get};

/// Build and return the router for all relay routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // demo surface
        .route("/", get(show_index_page))
        .route("/download/{*key}", get(download_object))
}
