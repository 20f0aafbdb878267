//! Resource resolver
//!
//! Turns request coordinates into typed contexts, one stage at a time:
//! identifier -> document, then page or indirect object. Each stage either
//! produces its context or stops with a typed error.

use std::sync::Arc;

use lopdf::{Object, ObjectId};

use super::cache::DocumentCache;
use super::error::{DocumentError, Result};
use super::types::DocumentId;
use crate::pdf::{PageHandle, PdfDocument, PdfError};

/// A resolved document
#[derive(Debug, Clone)]
pub struct DocumentContext {
    pub id: DocumentId,
    pub document: Arc<PdfDocument>,
}

/// A resolved page, held by its 0-based index
#[derive(Debug, Clone)]
pub struct PageContext {
    pub document: DocumentContext,
    pub index: usize,
}

impl PageContext {
    /// 1-based page number as the client sent it
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn handle(&self) -> Result<PageHandle<'_>> {
        self.document
            .document
            .page(self.index)
            .map_err(|e| match e {
                PdfError::PageOutOfRange { count, .. } => DocumentError::PageNotFound {
                    page: self.number() as i64,
                    count,
                },
                other => DocumentError::Decode(other),
            })
    }
}

/// A resolved indirect object. `object` is a copy; the document's own
/// object is never handed out.
#[derive(Debug, Clone)]
pub struct ObjectContext {
    pub document: DocumentContext,
    pub id: ObjectId,
    pub object: Object,
}

#[derive(Clone)]
pub struct Resolver {
    cache: DocumentCache,
}

impl Resolver {
    pub fn new(cache: DocumentCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    pub async fn document(&self, raw_id: &str) -> Result<DocumentContext> {
        let id = DocumentId::parse(raw_id)?;
        let document = self.cache.open(&id).await?;
        Ok(DocumentContext { id, document })
    }

    /// Translate a 1-based page number into the page at `page - 1`.
    /// Numbers outside `[1, page_count]` are rejected, never clamped.
    pub fn page(&self, document: &DocumentContext, page: i64) -> Result<PageContext> {
        let count = document.document.page_count();
        let index = usize::try_from(page)
            .ok()
            .and_then(|page| page.checked_sub(1))
            .filter(|&index| index < count)
            .ok_or(DocumentError::PageNotFound { page, count })?;
        tracing::debug!(document = %document.id, page, index, "Resolved page");
        Ok(PageContext {
            document: document.clone(),
            index,
        })
    }

    /// Look up `number generation R`, generation defaulting to 0
    pub fn object(
        &self,
        document: &DocumentContext,
        number: u32,
        generation: Option<&str>,
    ) -> Result<ObjectContext> {
        let generation = parse_generation(generation)?;
        let not_found = || DocumentError::ObjectNotFound { number, generation };
        let stored = u16::try_from(generation).map_err(|_| not_found())?;
        let object = document
            .document
            .get_object(number, stored)
            .map_err(|_| not_found())?
            .clone();
        tracing::debug!(document = %document.id, number, generation, "Resolved object");
        Ok(ObjectContext {
            document: document.clone(),
            id: (number, stored),
            object,
        })
    }
}

/// `generation` query value: absent means 0, otherwise a non-negative integer
pub fn parse_generation(raw: Option<&str>) -> Result<u64> {
    match raw {
        None => Ok(0),
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            DocumentError::InvalidRequest(format!(
                "generation must be a non-negative integer, got {raw:?}"
            ))
        }),
    }
}

/// Object number path segment
pub fn parse_object_number(raw: &str) -> Result<u32> {
    raw.parse::<u32>().map_err(|_| {
        DocumentError::InvalidRequest(format!("object number must be an integer, got {raw:?}"))
    })
}

/// Page number path segment. Any integer is accepted here; range checks
/// belong to `Resolver::page`.
pub fn parse_page_number(raw: &str) -> Result<i64> {
    raw.parse::<i64>().map_err(|_| {
        DocumentError::InvalidRequest(format!("page must be an integer, got {raw:?}"))
    })
}
