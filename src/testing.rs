//! Test fixtures
//!
//! A small two-page PDF built with lopdf, covering every object kind the
//! dispatcher knows about. Object numbers are fixed so tests can address
//! them directly.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use tempfile::TempDir;

use crate::config::Config;
use crate::pdf::PdfDocument;
use crate::state::AppState;

pub const FIXTURE_NAME: &str = "fixture.pdf";

pub const CATALOG: u32 = 1;
pub const PAGE_TREE: u32 = 2;
pub const PAGE_ONE: u32 = 3;
pub const PAGE_TWO: u32 = 4;
/// Flate-compressed
pub const PAGE_ONE_CONTENTS: u32 = 5;
pub const SHARED_RESOURCES: u32 = 6;
pub const PAGE_TWO_CONTENTS: u32 = 7;
pub const HELVETICA_FONT: u32 = 8;
pub const CUSTOM_ENCODING: u32 = 9;
pub const FORM: u32 = 10;
pub const BROKEN_STREAM: u32 = 11;
pub const TYPE0_FONT: u32 = 12;
pub const CID_FONT: u32 = 13;
pub const ARIAL_FONT: u32 = 14;
/// Stored under generation 2
pub const OLD_GENERATION_NOTE: u32 = 15;

pub const PAGE_ONE_CONTENT: &str = "BT /F1 12 Tf 72 720 Td (ABC) Tj ET";
pub const PAGE_TWO_CONTENT: &str =
    "q 1 0 0 1 50 50 cm /Fm1 Do Q BT /F2 10 Tf 10 10 Td <00410042> Tj ET";
pub const FORM_CONTENT: &str = "BT /F1 9 Tf 5 5 Td (Form) Tj ET";
pub const BROKEN_CONTENT: &str = "BT /F1 12 Tf (unterminated Tj ET";

fn reference(number: u32) -> Object {
    Object::Reference((number, 0))
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Build the fixture document in memory
pub fn build() -> Document {
    let mut doc = Document::with_version("1.5");
    let mut insert = |number: u32, object: Object| {
        doc.objects.insert((number, 0), object);
    };

    insert(
        CATALOG,
        dictionary! { "Type" => "Catalog", "Pages" => reference(PAGE_TREE) }.into(),
    );
    insert(
        PAGE_TREE,
        dictionary! {
            "Type" => "Pages",
            "Kids" => vec![reference(PAGE_ONE), reference(PAGE_TWO)],
            "Count" => 2,
            "Resources" => reference(SHARED_RESOURCES),
        }
        .into(),
    );
    insert(
        PAGE_ONE,
        dictionary! {
            "Type" => "Page",
            "Parent" => reference(PAGE_TREE),
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => reference(PAGE_ONE_CONTENTS),
            "Resources" => reference(SHARED_RESOURCES),
        }
        .into(),
    );
    insert(
        PAGE_TWO,
        dictionary! {
            "Type" => "Page",
            "Parent" => reference(PAGE_TREE),
            "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
            "Contents" => reference(PAGE_TWO_CONTENTS),
        }
        .into(),
    );
    insert(
        PAGE_ONE_CONTENTS,
        Object::Stream(Stream::new(
            dictionary! { "Filter" => "FlateDecode" },
            deflate(PAGE_ONE_CONTENT.as_bytes()),
        )),
    );
    insert(
        SHARED_RESOURCES,
        dictionary! {
            "Font" => dictionary! {
                "F1" => reference(HELVETICA_FONT),
                "F2" => reference(TYPE0_FONT),
            },
            "XObject" => dictionary! { "Fm1" => reference(FORM) },
        }
        .into(),
    );
    insert(
        PAGE_TWO_CONTENTS,
        Object::Stream(Stream::new(
            Dictionary::new(),
            PAGE_TWO_CONTENT.as_bytes().to_vec(),
        )),
    );
    insert(
        HELVETICA_FONT,
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 65,
            "Widths" => vec![722.into(), 667.into(), 722.into()],
            "Encoding" => reference(CUSTOM_ENCODING),
        }
        .into(),
    );
    insert(
        CUSTOM_ENCODING,
        dictionary! {
            "Type" => "Encoding",
            "BaseEncoding" => "WinAnsiEncoding",
            "Differences" => vec![65.into(), "Alpha".into(), "Beta".into()],
        }
        .into(),
    );
    insert(
        FORM,
        Object::Stream(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 100.into(), 50.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => reference(HELVETICA_FONT) },
                },
            },
            FORM_CONTENT.as_bytes().to_vec(),
        )),
    );
    insert(
        BROKEN_STREAM,
        Object::Stream(Stream::new(
            Dictionary::new(),
            BROKEN_CONTENT.as_bytes().to_vec(),
        )),
    );
    insert(
        TYPE0_FONT,
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "NotoSansCJK",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![reference(CID_FONT)],
        }
        .into(),
    );
    insert(
        CID_FONT,
        dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => "NotoSansCJK",
            "DW" => 500,
            "W" => vec![65.into(), Object::Array(vec![600.into(), 700.into()])],
        }
        .into(),
    );
    insert(
        ARIAL_FONT,
        dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => "Arial",
            "FirstChar" => 32,
            "Widths" => vec![278.into()],
            "Encoding" => "WinAnsiEncoding",
        }
        .into(),
    );

    doc.objects.insert(
        (OLD_GENERATION_NOTE, 2),
        dictionary! {
            "Note" => Object::String(b"revised twice".to_vec(), StringFormat::Literal),
        }
        .into(),
    );

    doc.max_id = OLD_GENERATION_NOTE;
    doc.trailer.set("Root", reference(CATALOG));
    let id = Object::String(b"0123456789abcdef".to_vec(), StringFormat::Hexadecimal);
    doc.trailer.set("ID", vec![id.clone(), id]);
    doc
}

/// Serialized fixture bytes
pub fn bytes() -> Vec<u8> {
    let mut doc = build();
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// The fixture parsed back, as the cache would hold it
pub fn document() -> PdfDocument {
    let bytes = bytes();
    let inner = Document::load_mem(&bytes).unwrap();
    PdfDocument::from_document(inner, bytes.len() as u64)
}

/// A temp uploads directory holding the fixture as `FIXTURE_NAME`
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(FIXTURE_NAME), bytes()).unwrap();
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join(FIXTURE_NAME)
    }

    /// Add another file next to the fixture
    pub fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}

/// The full router serving `fixture`'s directory
pub fn app(fixture: &Fixture) -> axum::Router {
    let mut config = Config::default();
    config.storage.uploads = fixture.dir().to_path_buf();
    crate::app(AppState::new(config))
}
