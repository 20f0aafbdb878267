//! Object kind dispatch
//!
//! `classify` sorts a resolved object into a closed set of kinds by looking
//! at its `Type`, `Subtype` and whether it is a stream. `decode` runs the
//! derivation step for that kind and builds the JSON view.
//!
//! Decoding only ever reads the resolver's copy of the object. Engine
//! failures inside a derivation do not fail the request: the view is
//! returned with whatever could be built and an `error` message.

use lopdf::{Dictionary, Object, ObjectId, Stream};
use serde::Serialize;
use serde_json::Value;

use crate::pdf::content;
use crate::pdf::encoding::Encoding;
use crate::pdf::font::Font;
use crate::pdf::json::{dictionary_to_json, object_to_json, stream_to_json};
use crate::pdf::{
    decoded_content, latin1, name, rect_from_object, resolve, Canvas, Mapping, PdfDocument,
    PdfError, Rect, DEFAULT_MEDIA_BOX,
};

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Plain(Object),
    ContentStream(Stream),
    Type0Font(Dictionary),
    Type1Font(Dictionary),
    TrueTypeFont(Dictionary),
    Encoding(Dictionary),
    FormXObject(Stream),
}

impl ObjectKind {
    pub fn label(&self) -> &'static str {
        match self {
            ObjectKind::Plain(_) => "Plain",
            ObjectKind::ContentStream(_) => "ContentStream",
            ObjectKind::Type0Font(_) => "Type0Font",
            ObjectKind::Type1Font(_) => "Type1Font",
            ObjectKind::TrueTypeFont(_) => "TrueTypeFont",
            ObjectKind::Encoding(_) => "Encoding",
            ObjectKind::FormXObject(_) => "FormXObject",
        }
    }
}

/// Which derived view a request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subview {
    Object,
    ContentStream,
    Graphics,
    Font,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecodedView {
    pub object: Value,
    #[serde(rename = "Mapping", skip_serializing_if = "Option::is_none")]
    pub mapping: Option<Mapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canvas: Option<Canvas>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecodedView {
    fn new(object: Value) -> Self {
        Self {
            object,
            mapping: None,
            canvas: None,
            operations: None,
            error: None,
        }
    }

    fn fail(&mut self, error: impl std::fmt::Display) {
        tracing::warn!(error = %error, "Recovered decode failure");
        self.error = Some(error.to_string());
    }
}

fn entry_name<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a [u8]> {
    dict.get(key).ok().and_then(name)
}

pub fn classify(object: Object) -> ObjectKind {
    match object {
        Object::Stream(stream) => {
            let subtype = entry_name(&stream.dict, b"Subtype");
            let kind = entry_name(&stream.dict, b"Type");
            if subtype == Some(b"Form".as_slice()) && matches!(kind, None | Some(b"XObject")) {
                ObjectKind::FormXObject(stream)
            } else {
                ObjectKind::ContentStream(stream)
            }
        }
        Object::Dictionary(dict) => {
            let build: fn(Dictionary) -> ObjectKind =
                match (entry_name(&dict, b"Type"), entry_name(&dict, b"Subtype")) {
                    (Some(b"Font"), Some(b"Type0")) => ObjectKind::Type0Font,
                    (Some(b"Font"), Some(b"Type1")) => ObjectKind::Type1Font,
                    (Some(b"Font"), Some(b"TrueType")) => ObjectKind::TrueTypeFont,
                    (Some(b"Encoding"), _) => ObjectKind::Encoding,
                    _ => |dict| ObjectKind::Plain(Object::Dictionary(dict)),
                };
            build(dict)
        }
        other => ObjectKind::Plain(other),
    }
}

/// Build the view of object `id` for `subview`
pub fn decode(document: &PdfDocument, id: ObjectId, kind: ObjectKind, subview: Subview) -> DecodedView {
    tracing::debug!(object = ?id, kind = kind.label(), ?subview, "Decoding object");
    match subview {
        Subview::Object => decode_object(document, kind),
        Subview::ContentStream => decode_operations(kind),
        Subview::Graphics => decode_graphics(document, id, kind),
        Subview::Font => match kind {
            ObjectKind::Type0Font(_)
            | ObjectKind::Type1Font(_)
            | ObjectKind::TrueTypeFont(_)
            | ObjectKind::Encoding(_) => decode_object(document, kind),
            other => {
                let mut view = DecodedView::new(raw_json(&other));
                view.fail(format!("object is a {}, not a font or encoding", other.label()));
                view
            }
        },
    }
}

fn raw_json(kind: &ObjectKind) -> Value {
    match kind {
        ObjectKind::Plain(object) => object_to_json(object),
        ObjectKind::ContentStream(stream) | ObjectKind::FormXObject(stream) => stream_to_json(stream),
        ObjectKind::Type0Font(dict)
        | ObjectKind::Type1Font(dict)
        | ObjectKind::TrueTypeFont(dict)
        | ObjectKind::Encoding(dict) => dictionary_to_json(dict),
    }
}

fn decode_object(document: &PdfDocument, kind: ObjectKind) -> DecodedView {
    let doc = document.inner();
    match kind {
        ObjectKind::Plain(object) => DecodedView::new(object_to_json(&object)),
        ObjectKind::ContentStream(stream) => decoded_stream(&stream).0,
        ObjectKind::FormXObject(stream) => {
            let (mut view, content) = decoded_stream(&stream);
            if let Some(content) = content {
                let resources = form_resources(doc, &stream);
                match render(doc, form_bounds(doc, &stream), &content, &resources) {
                    Ok(canvas) => view.canvas = Some(canvas),
                    Err(e) => view.fail(e),
                }
            }
            view
        }
        ObjectKind::Type0Font(dict) | ObjectKind::Type1Font(dict) | ObjectKind::TrueTypeFont(dict) => {
            let mut view = DecodedView::new(dictionary_to_json(&dict));
            match Font::from_dictionary(doc, &dict) {
                Ok(font) => view.mapping = Some(font.mapping().clone()),
                Err(e) => view.fail(e),
            }
            view
        }
        ObjectKind::Encoding(dict) => {
            let mut view = DecodedView::new(dictionary_to_json(&dict));
            match Encoding::from_dictionary(doc, &dict) {
                Ok(encoding) => view.mapping = Some(encoding.mapping()),
                Err(e) => view.fail(e),
            }
            view
        }
    }
}

/// The stream with its decoded buffer in place of the raw one. When the
/// filters cannot be applied the raw buffer is kept and `error` is set.
fn decoded_stream(stream: &Stream) -> (DecodedView, Option<Vec<u8>>) {
    match decoded_content(stream) {
        Ok(content) => {
            let object = serde_json::json!({
                "dictionary": dictionary_to_json(&stream.dict),
                "buffer": latin1(&content),
            });
            (DecodedView::new(object), Some(content))
        }
        Err(e) => {
            let mut view = DecodedView::new(stream_to_json(stream));
            view.fail(e);
            (view, None)
        }
    }
}

fn stream_of(kind: ObjectKind) -> Result<Stream, DecodedView> {
    match kind {
        ObjectKind::ContentStream(stream) | ObjectKind::FormXObject(stream) => Ok(stream),
        other => {
            let mut view = DecodedView::new(raw_json(&other));
            view.fail(format!("object is a {}, not a stream", other.label()));
            Err(view)
        }
    }
}

fn decode_operations(kind: ObjectKind) -> DecodedView {
    let stream = match stream_of(kind) {
        Ok(stream) => stream,
        Err(view) => return view,
    };
    let (mut view, content) = decoded_stream(&stream);
    if let Some(content) = content {
        match content::parse(&content) {
            Ok(operations) => view.operations = Some(content::operations_to_json(&operations)),
            Err(e) => view.fail(PdfError::from(e)),
        }
    }
    view
}

fn decode_graphics(document: &PdfDocument, id: ObjectId, kind: ObjectKind) -> DecodedView {
    let doc = document.inner();
    let is_form = matches!(kind, ObjectKind::FormXObject(_));
    let stream = match stream_of(kind) {
        Ok(stream) => stream,
        Err(view) => return view,
    };
    let (mut view, content) = decoded_stream(&stream);
    let Some(content) = content else {
        return view;
    };

    let placement = if is_form {
        Ok((
            form_bounds(doc, &stream),
            form_resources(doc, &stream),
        ))
    } else {
        page_placement(document, id)
    };
    match placement.and_then(|(bounds, resources)| render(doc, bounds, &content, &resources)) {
        Ok(canvas) => view.canvas = Some(canvas),
        Err(e) => view.fail(e),
    }
    view
}

fn render(
    doc: &lopdf::Document,
    bounds: Rect,
    content: &[u8],
    resources: &Dictionary,
) -> Result<Canvas, PdfError> {
    let mut canvas = Canvas::new(bounds);
    canvas.render(doc, content, resources)?;
    Ok(canvas)
}

fn form_bounds(doc: &lopdf::Document, stream: &Stream) -> Rect {
    stream
        .dict
        .get(b"BBox")
        .ok()
        .and_then(|bbox| rect_from_object(doc, bbox))
        .unwrap_or(DEFAULT_MEDIA_BOX)
}

fn form_resources(doc: &lopdf::Document, stream: &Stream) -> Dictionary {
    match stream.dict.get(b"Resources").map(|object| resolve(doc, object)) {
        Ok(Object::Dictionary(resources)) => resources.clone(),
        _ => Dictionary::new(),
    }
}

/// MediaBox and resources of the page drawing content stream `id`. A stream
/// no page refers to is laid out on a default page without resources.
fn page_placement(document: &PdfDocument, id: ObjectId) -> Result<(Rect, Dictionary), PdfError> {
    for page in document.pages() {
        let refers = match page.dictionary()?.get(b"Contents") {
            Ok(Object::Reference(contents)) => *contents == id,
            Ok(Object::Array(items)) => items
                .iter()
                .any(|item| matches!(item, Object::Reference(contents) if *contents == id)),
            _ => false,
        };
        if refers {
            return Ok((page.media_box()?, page.resources()?));
        }
    }
    Ok((DEFAULT_MEDIA_BOX, Dictionary::new()))
}
