//! File routes
//!
//! Lists and accepts uploaded documents, and serves document-level views:
//! the trailer/xref summary and the text spans of every page.

use std::path::Path as FsPath;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::document::{self, DocumentId};
use crate::error::{AppError, Result};
use crate::pdf::graphics::font_size_quartiles;
use crate::pdf::json::dictionary_without;
use crate::pdf::{CrossReference, TextSpan};
use crate::state::AppState;

/// Entry of the uploads listing
#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
}

/// Upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(rename = "lastModifiedDate")]
    pub last_modified_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub name: String,
    pub size: u64,
    /// Trailer without its `ID` entry
    pub trailer: Value,
    pub cross_references: Vec<CrossReference>,
}

#[derive(Debug, Serialize)]
pub struct DocumentText {
    pub spans: Vec<TextSpan>,
    #[serde(rename = "fontSize_quartiles")]
    pub font_size_quartiles: Vec<f64>,
}

/// Create the files router
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/files", get(list_files).post(upload_file))
        .route("/files/:name", get(get_summary))
        .route("/files/:name/document", get(get_document_text))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// List the documents in the uploads directory
async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileEntry>>> {
    let root = state.cache().root();
    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(root).await?;
    while let Some(entry) = dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let metadata = entry.metadata().await?;
        if metadata.is_file() {
            entries.push(FileEntry {
                name,
                size: metadata.len(),
            });
        }
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(entries))
}

/// Store a multipart upload under the uploads directory
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    tracing::debug!("Starting upload processing");

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read upload: {e}"))
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != "file" && field_name != "pdf" {
            tracing::debug!("Skipping multipart field '{}'", field_name);
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Uploaded file has no file name".to_string()))?;
        let id = DocumentId::parse(&filename)?;
        let data = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read file data: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {e}"))
        })?;

        let path = state.cache().root().join(id.as_str());
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    AppError::Conflict(format!("File already exists: {id}"))
                }
                _ => AppError::Io(e),
            })?;
        write_or_discard(file, &path, &data).await?;

        let response = upload_response(&id, &path).await?;
        tracing::info!("Stored upload '{}' ({} bytes)", id, response.size);
        return Ok((StatusCode::CREATED, Json(response)));
    }

    tracing::warn!("No file field found in multipart upload");
    Err(AppError::BadRequest(
        "No file provided. Use field name 'file' or 'pdf'".to_string(),
    ))
}

/// Write the upload, removing the partly written file if any write fails
/// so the name can be uploaded again
async fn write_or_discard(
    mut file: tokio::fs::File,
    path: &FsPath,
    data: &[u8],
) -> std::io::Result<()> {
    let written = match file.write_all(data).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        drop(file);
        if let Err(remove) = tokio::fs::remove_file(path).await {
            tracing::error!("Failed to remove partial upload {}: {}", path.display(), remove);
        }
        return Err(e);
    }
    Ok(())
}

async fn upload_response(id: &DocumentId, path: &FsPath) -> Result<UploadResponse> {
    let metadata = tokio::fs::metadata(path).await?;
    Ok(UploadResponse {
        name: id.to_string(),
        size: metadata.len(),
        content_type: mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
        last_modified_date: metadata.modified().ok().map(DateTime::<Utc>::from),
    })
}

/// Size, trailer and cross-reference table of a document
async fn get_summary(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DocumentSummary>> {
    let context = state.resolver().document(&name).await?;
    let document = &context.document;
    Ok(Json(DocumentSummary {
        name: context.id.to_string(),
        size: document.size(),
        trailer: dictionary_without(document.trailer(), &[b"ID"]),
        cross_references: document.cross_references().to_vec(),
    }))
}

/// Text spans of all pages plus font size quartiles
async fn get_document_text(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DocumentText>> {
    let context = state.resolver().document(&name).await?;
    let text = document::blocking(move || {
        let mut spans = Vec::new();
        for page in context.document.pages() {
            match page.render() {
                Ok(canvas) => spans.extend(canvas.spans),
                Err(e) => tracing::warn!(
                    document = %context.id,
                    page = page.index() + 1,
                    error = %e,
                    "Skipping page that failed to render"
                ),
            }
        }
        let font_size_quartiles = font_size_quartiles(&spans);
        DocumentText {
            spans,
            font_size_quartiles,
        }
    })
    .await?;
    Ok(Json(text))
}
