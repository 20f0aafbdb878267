//! Document session cache
//!
//! Maps a `DocumentId` to the single parsed `PdfDocument` for that file and
//! hands out shared handles to it. Entries are never evicted or replaced.
//!
//! # Concurrency
//!
//! Each identifier owns a `OnceCell` slot. The map lock is only held long
//! enough to find or create the slot, so parsing one document never blocks
//! requests for another. Concurrent first requests for the same identifier
//! wait on the same initialization and receive the same `Arc`. A failed
//! open leaves the slot empty and the next request tries again. The
//! initialization runs on its own task, so it completes even when the
//! request that started it is dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::OnceCell;

use super::error::{DocumentError, Result};
use super::types::DocumentId;
use crate::pdf::{PdfDocument, PdfError};

type Slot = Arc<OnceCell<Arc<PdfDocument>>>;

#[derive(Clone)]
pub struct DocumentCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    /// Directory the identifiers are resolved against
    root: PathBuf,
    slots: RwLock<HashMap<DocumentId, Slot>>,
    /// Parses started (file existed)
    attempts: AtomicUsize,
    /// Parses that produced a document
    parses: AtomicUsize,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Documents currently held
    pub documents: usize,
    pub attempts: usize,
    pub parses: usize,
}

impl DocumentCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                root: root.into(),
                slots: RwLock::new(HashMap::new()),
                attempts: AtomicUsize::new(0),
                parses: AtomicUsize::new(0),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Shared handle to the parsed document, parsing it on first use
    pub async fn open(&self, id: &DocumentId) -> Result<Arc<PdfDocument>> {
        let slot = self.slot(id);
        if let Some(document) = slot.get() {
            return Ok(Arc::clone(document));
        }

        // Detached, so the slot is filled even if this caller is dropped
        let cache = self.clone();
        let id = id.clone();
        tokio::spawn(async move {
            let document = slot.get_or_try_init(|| cache.parse(&id)).await?;
            Ok::<_, DocumentError>(Arc::clone(document))
        })
        .await?
    }

    /// Whether `id` has a parsed document
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.inner
            .slots
            .read()
            .get(id)
            .is_some_and(|slot| slot.initialized())
    }

    pub fn stats(&self) -> CacheStats {
        let documents = self
            .inner
            .slots
            .read()
            .values()
            .filter(|slot| slot.initialized())
            .count();
        CacheStats {
            documents,
            attempts: self.inner.attempts.load(Ordering::Relaxed),
            parses: self.inner.parses.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, id: &DocumentId) -> Slot {
        if let Some(slot) = self.inner.slots.read().get(id) {
            return Arc::clone(slot);
        }
        let mut slots = self.inner.slots.write();
        Arc::clone(slots.entry(id.clone()).or_default())
    }

    async fn parse(&self, id: &DocumentId) -> Result<Arc<PdfDocument>> {
        let path = self.inner.root.join(id.as_str());
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(DocumentError::NotFound(id.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocumentError::NotFound(id.to_string()))
            }
            Err(e) => return Err(DocumentError::Io(e)),
        }

        self.inner.attempts.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let parsed = tokio::task::spawn_blocking(move || PdfDocument::open(path)).await?;
        let document = match parsed {
            Ok(document) => document,
            Err(PdfError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DocumentError::NotFound(id.to_string()))
            }
            Err(source) => {
                tracing::warn!(document = %id, error = %source, "Failed to parse document");
                return Err(DocumentError::Parse {
                    id: id.to_string(),
                    source,
                });
            }
        };

        self.inner.parses.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            document = %id,
            pages = document.page_count(),
            size = document.size(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Opened document"
        );
        Ok(Arc::new(document))
    }
}
