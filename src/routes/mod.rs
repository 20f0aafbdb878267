//! Route modules for the PDF inspector server
//!
//! Routers use full paths and are merged rather than nested, so
//! `/files/:name` and its children live side by side.

use axum::http::Uri;
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

pub mod files;
pub mod objects;
pub mod pages;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(files::router(max_upload_bytes))
        .merge(pages::router())
        .merge(objects::router())
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No resource at: {uri}"))
}
