//! Page routes
//!
//! Page numbers in paths are 1-based; the resolver translates them.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use crate::document::resolver::parse_page_number;
use crate::document::{self, DocumentError};
use crate::error::Result;
use crate::pdf::json::dictionary_to_json;
use crate::pdf::{Canvas, Rect};
use crate::state::AppState;

/// A rendered page. `canvas` is null when layout failed.
#[derive(Debug, Serialize)]
pub struct PageView {
    #[serde(rename = "MediaBox")]
    pub media_box: Rect,
    pub canvas: Option<Canvas>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PageContents {
    #[serde(rename = "Contents")]
    pub contents: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/files/:name/pages", get(list_pages))
        .route("/files/:name/pages/:page", get(get_page))
        .route("/files/:name/pages/:page/contents", get(get_page_contents))
}

/// Raw page dictionaries in page order
async fn list_pages(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Value>>> {
    let context = state.resolver().document(&name).await?;
    let pages = context
        .document
        .pages()
        .map(|page| Ok(dictionary_to_json(page.dictionary()?)))
        .collect::<std::result::Result<Vec<_>, DocumentError>>()?;
    Ok(Json(pages))
}

async fn get_page(
    State(state): State<AppState>,
    Path((name, page)): Path<(String, String)>,
) -> Result<Json<PageView>> {
    let resolver = state.resolver();
    let context = resolver.document(&name).await?;
    let page = resolver.page(&context, parse_page_number(&page)?)?;

    let view = document::blocking(move || -> document::Result<PageView> {
        let handle = page.handle()?;
        let media_box = handle.media_box()?;
        Ok(match handle.render() {
            Ok(canvas) => PageView {
                media_box,
                canvas: Some(canvas),
                error: None,
            },
            Err(e) => {
                tracing::warn!(
                    document = %page.document.id,
                    page = page.number(),
                    error = %e,
                    "Page layout failed"
                );
                PageView {
                    media_box,
                    canvas: None,
                    error: Some(e.to_string()),
                }
            }
        })
    })
    .await??;
    Ok(Json(view))
}

/// The page's content streams, decoded and joined with newlines
async fn get_page_contents(
    State(state): State<AppState>,
    Path((name, page)): Path<(String, String)>,
) -> Result<Json<PageContents>> {
    let resolver = state.resolver();
    let context = resolver.document(&name).await?;
    let page = resolver.page(&context, parse_page_number(&page)?)?;
    let contents = page
        .handle()?
        .join_contents("\n")
        .map_err(DocumentError::from)?;
    Ok(Json(PageContents { contents }))
}
