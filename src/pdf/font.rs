//! Font views
//!
//! A `Font` wraps a font dictionary and answers the questions text layout
//! needs: how string bytes split into character codes, how wide each code
//! is, and what Unicode text it stands for. The code -> glyph `Mapping` is
//! built once when the view is created.

use lopdf::{Dictionary, Object};

use super::encoding::{BaseEncoding, Encoding};
use super::parser::{dict_name, latin1, number, resolve, PdfError};
use super::types::{Glyph, Mapping};

/// CIDFonts without a DW entry
const DEFAULT_CID_WIDTH: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    Type0,
    Type1,
    TrueType,
    /// Type3 and MMType1: handled as simple fonts
    OtherSimple,
}

#[derive(Debug, Clone)]
pub struct Font {
    kind: FontKind,
    base_font: Option<String>,
    encoding: Option<Encoding>,
    mapping: Mapping,
    /// Width of codes the mapping has no width for
    default_width: f64,
}

impl Font {
    pub fn from_dictionary(doc: &lopdf::Document, dict: &Dictionary) -> Result<Self, PdfError> {
        let subtype = dict_name(doc, dict, b"Subtype").ok_or_else(|| {
            PdfError::InvalidStructure("font dictionary has no Subtype".to_string())
        })?;
        let base_font = dict_name(doc, dict, b"BaseFont").map(latin1);
        match subtype {
            b"Type0" => Self::composite(doc, dict, base_font),
            b"Type1" => Self::simple(doc, dict, FontKind::Type1, base_font),
            b"TrueType" => Self::simple(doc, dict, FontKind::TrueType, base_font),
            b"Type3" | b"MMType1" => Self::simple(doc, dict, FontKind::OtherSimple, base_font),
            other => Err(PdfError::InvalidStructure(format!(
                "unsupported font subtype {}",
                latin1(other)
            ))),
        }
    }

    fn simple(
        doc: &lopdf::Document,
        dict: &Dictionary,
        kind: FontKind,
        base_font: Option<String>,
    ) -> Result<Self, PdfError> {
        let encoding = match dict.get(b"Encoding") {
            Ok(object) => Some(Encoding::from_object(doc, object)?),
            Err(_) if kind == FontKind::Type1 => Some(Encoding::from_base(BaseEncoding::Standard)),
            Err(_) => None,
        };

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|object| number(resolve(doc, object)))
            .unwrap_or(0.0) as u32;
        let widths = match dict.get(b"Widths").map(|object| resolve(doc, object)) {
            Ok(Object::Array(items)) => items
                .iter()
                .map(|item| number(resolve(doc, item)))
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(|| {
                    PdfError::InvalidStructure("Widths must contain numbers".to_string())
                })?,
            Ok(_) => {
                return Err(PdfError::InvalidStructure(
                    "Widths must be an array".to_string(),
                ))
            }
            Err(_) => Vec::new(),
        };
        let missing_width = descriptor_number(doc, dict, b"MissingWidth").unwrap_or(0.0);

        let mut mapping = Mapping::new();
        for code in 0..=u8::MAX {
            let code = u32::from(code);
            let width = code
                .checked_sub(first_char)
                .and_then(|offset| widths.get(offset as usize).copied());
            let name = encoding
                .as_ref()
                .and_then(|encoding| encoding.glyph_name(code as u8))
                .map(str::to_string);
            if name.is_some() || width.is_some() {
                mapping.insert(code, Glyph { name, width });
            }
        }

        Ok(Self {
            kind,
            base_font,
            encoding,
            mapping,
            default_width: missing_width,
        })
    }

    fn composite(
        doc: &lopdf::Document,
        dict: &Dictionary,
        base_font: Option<String>,
    ) -> Result<Self, PdfError> {
        let descendant = match dict.get(b"DescendantFonts").map(|object| resolve(doc, object)) {
            Ok(Object::Array(items)) => items.first().map(|item| resolve(doc, item)),
            _ => None,
        };
        let descendant = match descendant {
            Some(Object::Dictionary(descendant)) => descendant,
            _ => {
                return Err(PdfError::InvalidStructure(
                    "Type0 font needs a DescendantFonts dictionary".to_string(),
                ))
            }
        };
        if let Some(encoding) = dict_name(doc, dict, b"Encoding") {
            if encoding != b"Identity-H" && encoding != b"Identity-V" {
                tracing::debug!(
                    encoding = %latin1(encoding),
                    "Treating predefined CMap as two-byte identity"
                );
            }
        }

        let default_width = descendant
            .get(b"DW")
            .ok()
            .and_then(|object| number(resolve(doc, object)))
            .unwrap_or(DEFAULT_CID_WIDTH);
        let mapping = match descendant.get(b"W").map(|object| resolve(doc, object)) {
            Ok(Object::Array(items)) => cid_widths(doc, items)?,
            Ok(_) => {
                return Err(PdfError::InvalidStructure("W must be an array".to_string()))
            }
            Err(_) => Mapping::new(),
        };

        Ok(Self {
            kind: FontKind::Type0,
            base_font,
            encoding: None,
            mapping,
            default_width,
        })
    }

    pub fn kind(&self) -> FontKind {
        self.kind
    }

    pub fn base_font(&self) -> Option<&str> {
        self.base_font.as_deref()
    }

    pub fn encoding(&self) -> Option<&Encoding> {
        self.encoding.as_ref()
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn default_width(&self) -> f64 {
        self.default_width
    }

    /// Split string bytes into character codes. Composite fonts use
    /// two-byte codes; a trailing odd byte is dropped.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        match self.kind {
            FontKind::Type0 => bytes
                .chunks_exact(2)
                .map(|pair| (u32::from(pair[0]) << 8) | u32::from(pair[1]))
                .collect(),
            _ => bytes.iter().map(|&b| u32::from(b)).collect(),
        }
    }

    /// Advance width of `code` in glyph space (1/1000 of text space)
    pub fn width(&self, code: u32) -> f64 {
        self.mapping
            .get(&code)
            .and_then(|glyph| glyph.width)
            .unwrap_or(self.default_width)
    }

    /// Word spacing only applies to the single-byte code 32
    pub fn is_word_space(&self, code: u32) -> bool {
        self.kind != FontKind::Type0 && code == 32
    }

    pub fn decode_text(&self, bytes: &[u8]) -> String {
        match self.kind {
            FontKind::Type0 => self
                .codes(bytes)
                .into_iter()
                .map(|code| char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect(),
            _ => latin1(bytes),
        }
    }
}

/// A number from the font's FontDescriptor
fn descriptor_number(doc: &lopdf::Document, dict: &Dictionary, key: &[u8]) -> Option<f64> {
    let descriptor = match resolve(doc, dict.get(b"FontDescriptor").ok()?) {
        Object::Dictionary(descriptor) => descriptor,
        _ => return None,
    };
    number(resolve(doc, descriptor.get(key).ok()?))
}

/// Largest CID a CIDFont can address
const MAX_CID: u32 = u16::MAX as u32;

/// Parse a CIDFont `W` array: `c [w1 w2 ...]` and `c_first c_last w` runs
fn cid_widths(doc: &lopdf::Document, items: &[Object]) -> Result<Mapping, PdfError> {
    let malformed = || PdfError::InvalidStructure("malformed W array".to_string());
    let cid = |object: &Object| {
        number(resolve(doc, object))
            .filter(|value| (0.0..=f64::from(MAX_CID)).contains(value))
            .map(|value| value as u32)
            .ok_or_else(malformed)
    };
    let mut mapping = Mapping::new();
    let mut i = 0;
    while i < items.len() {
        let first = cid(&items[i])?;
        match items.get(i + 1).map(|item| resolve(doc, item)) {
            Some(Object::Array(widths)) => {
                for (offset, width) in widths.iter().enumerate() {
                    let width = number(resolve(doc, width)).ok_or_else(malformed)?;
                    let code = u32::try_from(offset)
                        .ok()
                        .and_then(|offset| first.checked_add(offset))
                        .filter(|&code| code <= MAX_CID)
                        .ok_or_else(malformed)?;
                    mapping.insert(
                        code,
                        Glyph {
                            name: None,
                            width: Some(width),
                        },
                    );
                }
                i += 2;
            }
            Some(last) => {
                let last = cid(last)?;
                let width = items
                    .get(i + 2)
                    .and_then(|item| number(resolve(doc, item)))
                    .ok_or_else(malformed)?;
                if last < first {
                    return Err(malformed());
                }
                for code in first..=last {
                    mapping.insert(
                        code,
                        Glyph {
                            name: None,
                            width: Some(width),
                        },
                    );
                }
                i += 3;
            }
            None => return Err(malformed()),
        }
    }
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use lopdf::dictionary;

    fn fixture_font(number: u32) -> Font {
        let document = testing::document();
        let dict = match document.get_object(number, 0).unwrap() {
            Object::Dictionary(dict) => dict.clone(),
            other => panic!("fixture object {number} is not a dictionary: {other:?}"),
        };
        Font::from_dictionary(document.inner(), &dict).unwrap()
    }

    #[test]
    fn test_simple_font_widths_and_differences() {
        let font = fixture_font(testing::HELVETICA_FONT);

        assert_eq!(font.kind(), FontKind::Type1);
        assert_eq!(font.base_font(), Some("Helvetica"));
        assert_eq!(
            font.mapping()[&65],
            Glyph {
                name: Some("Alpha".to_string()),
                width: Some(722.0)
            }
        );
        assert_eq!(font.mapping()[&67].name.as_deref(), Some("C"));
        assert_eq!(font.width(66), 667.0);
        // No Widths entry and no MissingWidth
        assert_eq!(font.width(32), 0.0);
        assert_eq!(font.mapping()[&32].width, None);
    }

    #[test]
    fn test_true_type_with_named_encoding() {
        let font = fixture_font(testing::ARIAL_FONT);

        assert_eq!(font.kind(), FontKind::TrueType);
        assert_eq!(font.encoding().and_then(Encoding::base), Some(BaseEncoding::WinAnsi));
        assert_eq!(font.width(32), 278.0);
        assert!(font.is_word_space(32));
    }

    #[test]
    fn test_type0_widths_from_descendant() {
        let font = fixture_font(testing::TYPE0_FONT);

        assert_eq!(font.kind(), FontKind::Type0);
        assert_eq!(font.codes(&[0x00, 0x41, 0x00, 0x42]), vec![65, 66]);
        assert_eq!(font.width(65), 600.0);
        assert_eq!(font.width(66), 700.0);
        // Falls back to DW
        assert_eq!(font.width(67), 500.0);
        assert_eq!(font.decode_text(&[0x00, 0x41, 0x00, 0x42]), "AB");
        assert!(!font.is_word_space(32));
    }

    #[test]
    fn test_cid_width_ranges() {
        let doc = lopdf::Document::with_version("1.5");
        let items = vec![
            1.into(),
            Object::Array(vec![250.into(), 300.into()]),
            10.into(),
            12.into(),
            400.into(),
        ];

        let mapping = cid_widths(&doc, &items).unwrap();

        assert_eq!(mapping.len(), 5);
        assert_eq!(mapping[&2].width, Some(300.0));
        assert_eq!(mapping[&11].width, Some(400.0));
    }

    #[test]
    fn test_cid_widths_reject_codes_beyond_16_bits() {
        let doc = lopdf::Document::with_version("1.5");
        let run = |first: i64| {
            vec![
                Object::Integer(first),
                Object::Array(vec![500.into(), 500.into()]),
            ]
        };

        assert!(cid_widths(&doc, &run(4_294_967_295)).is_err());
        assert!(cid_widths(&doc, &run(65_535)).is_err());
        assert!(cid_widths(&doc, &run(-1)).is_err());
        assert!(cid_widths(&doc, &[1.into(), 70_000.into(), 500.into()]).is_err());
        assert_eq!(cid_widths(&doc, &run(65_534)).unwrap().len(), 2);
    }

    #[test]
    fn test_type0_font_with_overflowing_w_is_an_error() {
        let mut doc = lopdf::Document::with_version("1.5");
        let descendant = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "W" => vec![
                Object::Integer(4_294_967_295),
                Object::Array(vec![500.into(), 500.into()]),
            ],
        });
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(descendant)],
        };

        assert!(matches!(
            Font::from_dictionary(&doc, &dict),
            Err(PdfError::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_cid_widths_reject_truncated_run() {
        let doc = lopdf::Document::with_version("1.5");
        assert!(cid_widths(&doc, &[1.into(), 5.into()]).is_err());
    }

    #[test]
    fn test_missing_width_from_descriptor() {
        let doc = lopdf::Document::with_version("1.5");
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "FirstChar" => 65,
            "Widths" => vec![500.into()],
            "FontDescriptor" => dictionary! { "MissingWidth" => 250 },
        };

        let font = Font::from_dictionary(&doc, &dict).unwrap();

        assert_eq!(font.width(65), 500.0);
        assert_eq!(font.width(66), 250.0);
        assert!(font.encoding().is_none());
    }

    #[test]
    fn test_unknown_subtype_is_rejected() {
        let doc = lopdf::Document::with_version("1.5");
        let dict = dictionary! { "Type" => "Font", "Subtype" => "CIDFontType0" };
        assert!(Font::from_dictionary(&doc, &dict).is_err());
    }
}
