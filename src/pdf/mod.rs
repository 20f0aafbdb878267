//! PDF engine module
//!
//! Wraps `lopdf` for file parsing, cross-reference reading and stream
//! filters. Adds a strict content-stream parser, a text layout renderer and
//! font/encoding views on top.

pub mod content;
pub mod encoding;
pub mod font;
pub mod graphics;
pub mod json;
mod parser;
mod types;

pub use graphics::Canvas;
pub use parser::{
    decoded_content, dict_name, latin1, name, number, rect_from_object, resolve, PageHandle,
    PdfDocument, PdfError,
};
pub use types::{CrossReference, Glyph, Mapping, Rect, TextSpan, DEFAULT_MEDIA_BOX};
