//! PDF Inspector Server Library
//!
//! Exposes the router and the PDF layers for the binary, tests and benchmarks.
//!
//! # Modules
//!
//! - `pdf`: Object model access, content streams, fonts and layout
//! - `document`: Cached documents, reference resolution and decoding dispatch
//! - `routes`: HTTP handlers

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod document;
pub mod error;
pub mod pdf;
pub mod routes;
pub mod state;

#[cfg(test)]
mod testing;

use state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::router(state.config().server.max_upload_bytes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
