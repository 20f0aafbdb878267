//! Simple-font encodings
//!
//! An `Encoding` maps single-byte character codes to glyph names: a named
//! base encoding with an optional `Differences` array applied on top.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Object};

use super::parser::{dict_name, latin1, resolve, PdfError};
use super::types::{Glyph, Mapping};

/// Named base encodings a PDF may refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseEncoding {
    Standard,
    WinAnsi,
    MacRoman,
}

/// Glyph names for codes 32..=126 shared by the Latin base encodings.
/// Index 0 is code 32.
const ASCII_GLYPHS: [&str; 95] = [
    "space", "exclam", "quotedbl", "numbersign", "dollar", "percent", "ampersand",
    "quotesingle", "parenleft", "parenright", "asterisk", "plus", "comma", "hyphen", "period",
    "slash", "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
    "colon", "semicolon", "less", "equal", "greater", "question", "at", "A", "B", "C", "D", "E",
    "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T", "U", "V", "W",
    "X", "Y", "Z", "bracketleft", "backslash", "bracketright", "asciicircum", "underscore",
    "grave", "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q",
    "r", "s", "t", "u", "v", "w", "x", "y", "z", "braceleft", "bar", "braceright", "asciitilde",
];

/// WinAnsiEncoding codes 128..=255. Index 0 is code 128.
const WIN_ANSI_HIGH: [Option<&str>; 128] = [
    Some("Euro"), None, Some("quotesinglbase"), Some("florin"), Some("quotedblbase"),
    Some("ellipsis"), Some("dagger"), Some("daggerdbl"), Some("circumflex"),
    Some("perthousand"), Some("Scaron"), Some("guilsinglleft"), Some("OE"), None,
    Some("Zcaron"), None, None, Some("quoteleft"), Some("quoteright"), Some("quotedblleft"),
    Some("quotedblright"), Some("bullet"), Some("endash"), Some("emdash"), Some("tilde"),
    Some("trademark"), Some("scaron"), Some("guilsinglright"), Some("oe"), None,
    Some("zcaron"), Some("Ydieresis"), Some("space"), Some("exclamdown"), Some("cent"),
    Some("sterling"), Some("currency"), Some("yen"), Some("brokenbar"), Some("section"),
    Some("dieresis"), Some("copyright"), Some("ordfeminine"), Some("guillemotleft"),
    Some("logicalnot"), Some("hyphen"), Some("registered"), Some("macron"), Some("degree"),
    Some("plusminus"), Some("twosuperior"), Some("threesuperior"), Some("acute"), Some("mu"),
    Some("paragraph"), Some("periodcentered"), Some("cedilla"), Some("onesuperior"),
    Some("ordmasculine"), Some("guillemotright"), Some("onequarter"), Some("onehalf"),
    Some("threequarters"), Some("questiondown"), Some("Agrave"), Some("Aacute"),
    Some("Acircumflex"), Some("Atilde"), Some("Adieresis"), Some("Aring"), Some("AE"),
    Some("Ccedilla"), Some("Egrave"), Some("Eacute"), Some("Ecircumflex"), Some("Edieresis"),
    Some("Igrave"), Some("Iacute"), Some("Icircumflex"), Some("Idieresis"), Some("Eth"),
    Some("Ntilde"), Some("Ograve"), Some("Oacute"), Some("Ocircumflex"), Some("Otilde"),
    Some("Odieresis"), Some("multiply"), Some("Oslash"), Some("Ugrave"), Some("Uacute"),
    Some("Ucircumflex"), Some("Udieresis"), Some("Yacute"), Some("Thorn"), Some("germandbls"),
    Some("agrave"), Some("aacute"), Some("acircumflex"), Some("atilde"), Some("adieresis"),
    Some("aring"), Some("ae"), Some("ccedilla"), Some("egrave"), Some("eacute"),
    Some("ecircumflex"), Some("edieresis"), Some("igrave"), Some("iacute"), Some("icircumflex"),
    Some("idieresis"), Some("eth"), Some("ntilde"), Some("ograve"), Some("oacute"),
    Some("ocircumflex"), Some("otilde"), Some("odieresis"), Some("divide"), Some("oslash"),
    Some("ugrave"), Some("uacute"), Some("ucircumflex"), Some("udieresis"), Some("yacute"),
    Some("thorn"), Some("ydieresis"),
];

/// MacRomanEncoding codes 128..=255. Index 0 is code 128. Symbol glyphs the
/// Mac character set carries (notequal, infinity, pi, ...) are not part of it.
const MAC_ROMAN_HIGH: [Option<&str>; 128] = [
    Some("Adieresis"), Some("Aring"), Some("Ccedilla"), Some("Eacute"), Some("Ntilde"),
    Some("Odieresis"), Some("Udieresis"), Some("aacute"), Some("agrave"), Some("acircumflex"),
    Some("adieresis"), Some("atilde"), Some("aring"), Some("ccedilla"), Some("eacute"),
    Some("egrave"), Some("ecircumflex"), Some("edieresis"), Some("iacute"), Some("igrave"),
    Some("icircumflex"), Some("idieresis"), Some("ntilde"), Some("oacute"), Some("ograve"),
    Some("ocircumflex"), Some("odieresis"), Some("otilde"), Some("uacute"), Some("ugrave"),
    Some("ucircumflex"), Some("udieresis"), Some("dagger"), Some("degree"), Some("cent"),
    Some("sterling"), Some("section"), Some("bullet"), Some("paragraph"), Some("germandbls"),
    Some("registered"), Some("copyright"), Some("trademark"), Some("acute"), Some("dieresis"),
    None, Some("AE"), Some("Oslash"), None, Some("plusminus"), None, None, Some("yen"),
    Some("mu"), None, None, None, None, None, Some("ordfeminine"), Some("ordmasculine"), None,
    Some("ae"), Some("oslash"), Some("questiondown"), Some("exclamdown"), Some("logicalnot"),
    None, Some("florin"), None, None, Some("guillemotleft"), Some("guillemotright"),
    Some("ellipsis"), Some("space"), Some("Agrave"), Some("Atilde"), Some("Otilde"), Some("OE"),
    Some("oe"), Some("endash"), Some("emdash"), Some("quotedblleft"), Some("quotedblright"),
    Some("quoteleft"), Some("quoteright"), Some("divide"), None, Some("ydieresis"),
    Some("Ydieresis"), Some("fraction"), Some("currency"), Some("guilsinglleft"),
    Some("guilsinglright"), Some("fi"), Some("fl"), Some("daggerdbl"), Some("periodcentered"),
    Some("quotesinglbase"), Some("quotedblbase"), Some("perthousand"), Some("Acircumflex"),
    Some("Ecircumflex"), Some("Aacute"), Some("Edieresis"), Some("Egrave"), Some("Iacute"),
    Some("Icircumflex"), Some("Idieresis"), Some("Igrave"), Some("Oacute"), Some("Ocircumflex"),
    None, Some("Ograve"), Some("Uacute"), Some("Ucircumflex"), Some("Ugrave"), Some("dotlessi"),
    Some("circumflex"), Some("tilde"), Some("macron"), Some("breve"), Some("dotaccent"),
    Some("ring"), Some("cedilla"), Some("hungarumlaut"), Some("ogonek"), Some("caron"),
];

impl BaseEncoding {
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"StandardEncoding" => Some(Self::Standard),
            b"WinAnsiEncoding" => Some(Self::WinAnsi),
            b"MacRomanEncoding" => Some(Self::MacRoman),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Standard => "StandardEncoding",
            Self::WinAnsi => "WinAnsiEncoding",
            Self::MacRoman => "MacRomanEncoding",
        }
    }

    pub fn glyph_name(self, code: u8) -> Option<&'static str> {
        match (self, code) {
            (Self::Standard, 39) => Some("quoteright"),
            (Self::Standard, 96) => Some("quoteleft"),
            (_, 32..=126) => Some(ASCII_GLYPHS[usize::from(code - 32)]),
            (Self::Standard, 128..=255) => standard_high(code),
            (Self::WinAnsi, 128..=255) => WIN_ANSI_HIGH[usize::from(code - 128)],
            (Self::MacRoman, 128..=255) => MAC_ROMAN_HIGH[usize::from(code - 128)],
            _ => None,
        }
    }
}

/// StandardEncoding codes 128..=255; the upper half is sparse
fn standard_high(code: u8) -> Option<&'static str> {
    let name = match code {
        161 => "exclamdown",
        162 => "cent",
        163 => "sterling",
        164 => "fraction",
        165 => "yen",
        166 => "florin",
        167 => "section",
        168 => "currency",
        169 => "quotesingle",
        170 => "quotedblleft",
        171 => "guillemotleft",
        172 => "guilsinglleft",
        173 => "guilsinglright",
        174 => "fi",
        175 => "fl",
        177 => "endash",
        178 => "dagger",
        179 => "daggerdbl",
        180 => "periodcentered",
        182 => "paragraph",
        183 => "bullet",
        184 => "quotesinglbase",
        185 => "quotedblbase",
        186 => "quotedblright",
        187 => "guillemotright",
        188 => "ellipsis",
        189 => "perthousand",
        191 => "questiondown",
        193 => "grave",
        194 => "acute",
        195 => "circumflex",
        196 => "tilde",
        197 => "macron",
        198 => "breve",
        199 => "dotaccent",
        200 => "dieresis",
        202 => "ring",
        203 => "cedilla",
        205 => "hungarumlaut",
        206 => "ogonek",
        207 => "caron",
        208 => "emdash",
        225 => "AE",
        227 => "ordfeminine",
        232 => "Lslash",
        233 => "Oslash",
        234 => "OE",
        235 => "ordmasculine",
        241 => "ae",
        245 => "dotlessi",
        248 => "lslash",
        249 => "oslash",
        250 => "oe",
        251 => "germandbls",
        _ => return None,
    };
    Some(name)
}

/// A resolved single-byte encoding
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    base: Option<BaseEncoding>,
    differences: BTreeMap<u8, String>,
}

impl Encoding {
    pub fn from_base(base: BaseEncoding) -> Self {
        Self {
            base: Some(base),
            differences: BTreeMap::new(),
        }
    }

    /// Build from a font's `/Encoding` value: a base encoding name or an
    /// encoding dictionary.
    pub fn from_object(doc: &lopdf::Document, object: &Object) -> Result<Self, PdfError> {
        match resolve(doc, object) {
            Object::Name(name) => BaseEncoding::from_name(name)
                .map(Self::from_base)
                .ok_or_else(|| {
                    PdfError::InvalidStructure(format!("unknown encoding {}", latin1(name)))
                }),
            Object::Dictionary(dict) => Self::from_dictionary(doc, dict),
            _ => Err(PdfError::InvalidStructure(
                "Encoding must be a name or a dictionary".to_string(),
            )),
        }
    }

    /// Build from an encoding dictionary. Without `BaseEncoding` the
    /// differences apply over StandardEncoding.
    pub fn from_dictionary(doc: &lopdf::Document, dict: &Dictionary) -> Result<Self, PdfError> {
        let base = match dict_name(doc, dict, b"BaseEncoding") {
            Some(name) => Some(BaseEncoding::from_name(name).ok_or_else(|| {
                PdfError::InvalidStructure(format!("unknown base encoding {}", latin1(name)))
            })?),
            None => Some(BaseEncoding::Standard),
        };
        let differences = match dict.get(b"Differences") {
            Ok(differences) => match resolve(doc, differences) {
                Object::Array(items) => parse_differences(doc, items)?,
                _ => {
                    return Err(PdfError::InvalidStructure(
                        "Differences must be an array".to_string(),
                    ))
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Ok(Self { base, differences })
    }

    pub fn base(&self) -> Option<BaseEncoding> {
        self.base
    }

    pub fn glyph_name(&self, code: u8) -> Option<&str> {
        self.differences
            .get(&code)
            .map(String::as_str)
            .or_else(|| self.base.and_then(|base| base.glyph_name(code)))
    }

    /// Code -> glyph name for every code the encoding names
    pub fn mapping(&self) -> Mapping {
        (0..=u8::MAX)
            .filter_map(|code| {
                self.glyph_name(code).map(|name| {
                    (
                        u32::from(code),
                        Glyph {
                            name: Some(name.to_string()),
                            width: None,
                        },
                    )
                })
            })
            .collect()
    }
}

/// `[code name name ... code name ...]`: each integer restarts numbering,
/// each name takes the next code.
fn parse_differences(
    doc: &lopdf::Document,
    items: &[Object],
) -> Result<BTreeMap<u8, String>, PdfError> {
    let mut differences = BTreeMap::new();
    let mut code: i64 = 0;
    for item in items {
        match resolve(doc, item) {
            Object::Integer(start) => code = *start,
            Object::Name(name) => {
                if let Ok(byte) = u8::try_from(code) {
                    differences.insert(byte, latin1(name));
                } else {
                    tracing::warn!(code, "Ignoring Differences entry outside 0..=255");
                }
                code += 1;
            }
            _ => {
                return Err(PdfError::InvalidStructure(
                    "Differences entries must be integers or names".to_string(),
                ))
            }
        }
    }
    Ok(differences)
}
