//! Document session cache and resource resolution
//!
//! # Architecture
//!
//! ```text
//! request path
//!      │
//!      ▼
//! ┌──────────────┐   open(id)   ┌───────────────────────────┐
//! │   Resolver   │ ───────────▶ │      DocumentCache        │
//! │ doc/page/obj │ ◀─────────── │ id -> Arc<PdfDocument>    │
//! └──────────────┘              └───────────────────────────┘
//!      │ ObjectContext (cloned object)
//!      ▼
//! ┌──────────────┐
//! │   dispatch   │  classify -> decode(kind, subview) -> DecodedView
//! └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use pdf_inspector_server::document::{dispatch, DocumentCache, Resolver, Subview};
//!
//! let resolver = Resolver::new(DocumentCache::new("./uploads"));
//! let document = resolver.document("report.pdf").await?;
//! let object = resolver.object(&document, 12, None)?;
//! let view = dispatch::decode(
//!     &document.document,
//!     object.id,
//!     dispatch::classify(object.object),
//!     Subview::Object,
//! );
//! ```

mod cache;
pub mod dispatch;
mod error;
pub mod resolver;
mod types;

pub use cache::{CacheStats, DocumentCache};
pub use dispatch::{DecodedView, ObjectKind, Subview};
pub use error::{DocumentError, ErrorKind, Result};
pub use resolver::{DocumentContext, ObjectContext, PageContext, Resolver};
pub use types::DocumentId;

/// Run CPU-bound engine work on the blocking pool
pub async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await?)
}
