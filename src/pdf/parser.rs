//! PDF document handle backed by lopdf
//!
//! `PdfDocument` is the immutable, shareable result of opening a file. It owns
//! the lopdf object graph and exposes the pieces the resolver consumes: size,
//! trailer, cross-reference table, ordered pages and object lookup by
//! (number, generation).

use std::path::Path;

use lopdf::xref::XrefEntry;
use lopdf::{Dictionary, Object, ObjectId, Stream};
use thiserror::Error;

use super::content::ContentError;
use super::graphics::Canvas;
use super::types::{CrossReference, Rect, DEFAULT_MEDIA_BOX};

/// PDF engine errors
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed PDF: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("Object {number} {generation} R not found")]
    ObjectNotFound { number: u32, generation: u16 },
    #[error("Page index {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),
    #[error("Failed to decode stream: {0}")]
    Filter(String),
    #[error("Content stream error: {0}")]
    Content(#[from] ContentError),
    #[error("Render error: {0}")]
    Render(String),
}

/// A parsed PDF file
pub struct PdfDocument {
    inner: lopdf::Document,
    size: u64,
    pages: Vec<ObjectId>,
    cross_references: Vec<CrossReference>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("size", &self.size)
            .field("page_count", &self.pages.len())
            .finish_non_exhaustive()
    }
}

impl PdfDocument {
    /// Parse the file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PdfError> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)?.len();
        let inner = lopdf::Document::load(path)?;
        Ok(Self::from_document(inner, size))
    }

    /// Wrap an already loaded lopdf document
    pub fn from_document(inner: lopdf::Document, size: u64) -> Self {
        // get_pages is keyed by 1-based page number, so values come out in page order
        let pages = inner.get_pages().into_values().collect();
        let cross_references = collect_cross_references(&inner);
        Self {
            inner,
            size,
            pages,
            cross_references,
        }
    }

    pub fn inner(&self) -> &lopdf::Document {
        &self.inner
    }

    /// File size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.inner.trailer
    }

    pub fn cross_references(&self) -> &[CrossReference] {
        &self.cross_references
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page handle at a 0-based index
    pub fn page(&self, index: usize) -> Result<PageHandle<'_>, PdfError> {
        let id = *self.pages.get(index).ok_or(PdfError::PageOutOfRange {
            index,
            count: self.pages.len(),
        })?;
        Ok(PageHandle {
            document: self,
            id,
            index,
        })
    }

    pub fn pages(&self) -> impl Iterator<Item = PageHandle<'_>> + '_ {
        self.pages
            .iter()
            .enumerate()
            .map(move |(index, &id)| PageHandle {
                document: self,
                id,
                index,
            })
    }

    /// Identifiers of every object held by the document, in ascending order
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.inner.objects.keys().copied()
    }

    /// Look up an indirect object by number and generation.
    ///
    /// The returned object is owned by the document; callers that attach
    /// derived data must clone it first.
    pub fn get_object(&self, number: u32, generation: u16) -> Result<&Object, PdfError> {
        self.inner
            .objects
            .get(&(number, generation))
            .ok_or(PdfError::ObjectNotFound { number, generation })
    }

    /// Follow a reference to its target, or return the object itself
    pub fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        resolve(&self.inner, object)
    }
}

fn collect_cross_references(document: &lopdf::Document) -> Vec<CrossReference> {
    document
        .reference_table
        .entries
        .iter()
        .map(|(&object_number, entry)| match *entry {
            XrefEntry::Normal { offset, generation } => CrossReference {
                object_number,
                generation_number: generation,
                in_use: true,
                offset: Some(offset),
                object_stream: None,
                index: None,
            },
            XrefEntry::Compressed { container, index } => CrossReference {
                object_number,
                generation_number: 0,
                in_use: true,
                offset: None,
                object_stream: Some(container),
                index: Some(index),
            },
            XrefEntry::Free | XrefEntry::UnusableFree => CrossReference {
                object_number,
                generation_number: 0,
                in_use: false,
                offset: None,
                object_stream: None,
                index: None,
            },
        })
        .collect()
}

/// A page of a `PdfDocument`
#[derive(Clone, Copy)]
pub struct PageHandle<'a> {
    document: &'a PdfDocument,
    id: ObjectId,
    index: usize,
}

impl<'a> PageHandle<'a> {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// 0-based position in the page list
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn dictionary(&self) -> Result<&'a Dictionary, PdfError> {
        match self.document.inner.get_object(self.id)? {
            Object::Dictionary(dict) => Ok(dict),
            _ => Err(PdfError::InvalidStructure(format!(
                "page {} {} R is not a dictionary",
                self.id.0, self.id.1
            ))),
        }
    }

    /// Look up a key on the page, walking up the page tree via /Parent
    pub fn inherited(&self, key: &[u8]) -> Result<Option<&'a Object>, PdfError> {
        let doc = &self.document.inner;
        let mut dict = self.dictionary()?;
        // Bounded walk; a cyclic /Parent chain must not hang the request
        for _ in 0..64 {
            if let Ok(value) = dict.get(key) {
                return Ok(Some(resolve(doc, value)));
            }
            match dict.get(b"Parent") {
                Ok(parent) => match resolve(doc, parent) {
                    Object::Dictionary(parent) => dict = parent,
                    _ => return Ok(None),
                },
                Err(_) => return Ok(None),
            }
        }
        Ok(None)
    }

    pub fn media_box(&self) -> Result<Rect, PdfError> {
        let media_box = self
            .inherited(b"MediaBox")?
            .and_then(|object| rect_from_object(&self.document.inner, object));
        Ok(media_box.unwrap_or(DEFAULT_MEDIA_BOX))
    }

    pub fn resources(&self) -> Result<Dictionary, PdfError> {
        match self.inherited(b"Resources")? {
            Some(Object::Dictionary(dict)) => Ok(dict.clone()),
            _ => Ok(Dictionary::new()),
        }
    }

    /// Decoded bytes of every content stream of the page, in order
    pub fn content_streams(&self) -> Result<Vec<Vec<u8>>, PdfError> {
        let doc = &self.document.inner;
        let contents = match self.dictionary()?.get(b"Contents") {
            Ok(contents) => resolve(doc, contents),
            Err(_) => return Ok(Vec::new()),
        };
        let streams: Vec<&Object> = match contents {
            Object::Array(items) => items.iter().map(|item| resolve(doc, item)).collect(),
            other => vec![other],
        };
        streams
            .into_iter()
            .map(|object| match object {
                Object::Stream(stream) => decoded_content(stream),
                _ => Err(PdfError::InvalidStructure(
                    "page Contents entry is not a stream".to_string(),
                )),
            })
            .collect()
    }

    /// Concatenate the page's content streams with `separator`
    pub fn join_contents(&self, separator: &str) -> Result<String, PdfError> {
        let parts: Vec<String> = self
            .content_streams()?
            .iter()
            .map(|bytes| latin1(bytes))
            .collect();
        Ok(parts.join(separator))
    }

    /// Lay out the page's text on a canvas sized from its MediaBox
    pub fn render(&self) -> Result<Canvas, PdfError> {
        let mut content = Vec::new();
        for (i, stream) in self.content_streams()?.into_iter().enumerate() {
            if i > 0 {
                content.push(b'\n');
            }
            content.extend(stream);
        }
        let resources = self.resources()?;
        let mut canvas = Canvas::new(self.media_box()?);
        canvas.render(&self.document.inner, &content, &resources)?;
        Ok(canvas)
    }
}

/// Follow a reference to its target, or return the object itself
pub fn resolve<'a>(doc: &'a lopdf::Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

/// Numeric value of an Integer or Real
pub fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(*value as f64),
        _ => None,
    }
}

pub fn name(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

/// Value of a name entry in `dict`, following a reference if needed
pub fn dict_name<'a>(doc: &'a lopdf::Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    dict.get(key).ok().and_then(|value| name(resolve(doc, value)))
}

pub fn rect_from_object(doc: &lopdf::Document, object: &Object) -> Option<Rect> {
    match resolve(doc, object) {
        Object::Array(items) => {
            let values: Option<Vec<f64>> = items
                .iter()
                .map(|item| number(resolve(doc, item)))
                .collect();
            Rect::from_numbers(&values?)
        }
        _ => None,
    }
}

/// Stream payload with its filters applied. Unfiltered streams are returned as-is.
pub fn decoded_content(stream: &Stream) -> Result<Vec<u8>, PdfError> {
    if !stream.dict.has(b"Filter") {
        return Ok(stream.content.clone());
    }
    stream
        .decompressed_content()
        .map_err(|e| PdfError::Filter(e.to_string()))
}

/// Map bytes one-to-one onto U+0000..U+00FF
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
