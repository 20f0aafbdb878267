//! PDF data types
//!
//! Serializable shapes shared by the engine views: rectangles, cross-reference
//! entries, glyph mappings and positioned text spans.

use std::collections::BTreeMap;

use serde::Serialize;

/// Axis-aligned rectangle in PDF user space, stored as `[x0, y0, x1, y1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(into = "[f64; 4]")]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Build from a 4-number PDF array, normalizing corner order
    pub fn from_numbers(values: &[f64]) -> Option<Self> {
        match values {
            [a, b, c, d] => Some(Self::new(a.min(*c), b.min(*d), a.max(*c), b.max(*d))),
            _ => None,
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

impl From<Rect> for [f64; 4] {
    fn from(rect: Rect) -> Self {
        [rect.x0, rect.y0, rect.x1, rect.y1]
    }
}

/// US Letter, used when a page carries no usable MediaBox
pub const DEFAULT_MEDIA_BOX: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// One entry of the cross-reference table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossReference {
    pub object_number: u32,
    pub generation_number: u16,
    pub in_use: bool,
    /// Byte offset of an uncompressed object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Object stream holding a compressed object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_stream: Option<u32>,
    /// Index inside the object stream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u16>,
}

/// What a font or encoding knows about one character code
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Glyph {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Advance width in glyph space (1/1000 text space units)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
}

/// Character code -> glyph
pub type Mapping = BTreeMap<u32, Glyph>;

/// A run of text placed on a canvas
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSpan {
    pub string: String,
    pub font_name: Option<String>,
    pub font_size: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_normalizes_corners() {
        let rect = Rect::from_numbers(&[100.0, 50.0, 0.0, 0.0]).unwrap();
        assert_eq!(rect, Rect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(rect.width(), 100.0);
        assert_eq!(rect.height(), 50.0);
    }

    #[test]
    fn test_rect_requires_four_numbers() {
        assert!(Rect::from_numbers(&[0.0, 0.0, 1.0]).is_none());
    }

    #[test]
    fn test_rect_serializes_as_array() {
        let value = serde_json::to_value(DEFAULT_MEDIA_BOX).unwrap();
        assert_eq!(value, serde_json::json!([0.0, 0.0, 612.0, 792.0]));
    }

    #[test]
    fn test_glyph_skips_missing_fields() {
        let glyph = Glyph {
            name: None,
            width: Some(500.0),
        };
        assert_eq!(
            serde_json::to_value(glyph).unwrap(),
            serde_json::json!({ "width": 500.0 })
        );
    }
}
