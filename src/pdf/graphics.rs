//! Text layout renderer
//!
//! Interprets a content stream against its resources and records where each
//! piece of text lands in user space. Only the state that affects text
//! placement is tracked: the CTM, the text state and the text matrices.
//! Paths, colors and images are ignored.

use std::collections::HashMap;
use std::rc::Rc;

use lopdf::content::Operation;
use lopdf::{Dictionary, Object, Stream};
use serde::Serialize;

use super::content;
use super::font::Font;
use super::parser::{decoded_content, dict_name, latin1, number, resolve, PdfError};
use super::types::{Rect, TextSpan};

/// Form XObjects may nest this deep before rendering gives up
pub const MAX_FORM_DEPTH: usize = 8;

/// Operations one render may execute, counted across every form it draws
pub const MAX_OPERATIONS: usize = 1_000_000;

/// A bounded surface collecting positioned text spans
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Canvas {
    pub bounds: Rect,
    pub spans: Vec<TextSpan>,
}

impl Canvas {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            spans: Vec::new(),
        }
    }

    /// Lay out the text of `content`, resolving fonts and forms in `resources`
    pub fn render(
        &mut self,
        doc: &lopdf::Document,
        content: &[u8],
        resources: &Dictionary,
    ) -> Result<(), PdfError> {
        let mut interpreter = Interpreter {
            doc,
            spans: &mut self.spans,
            operations: 0,
        };
        interpreter.run(content, resources, Matrix::IDENTITY, 0)
    }
}

/// Affine transform `[a b c d e f]`, applied to row vectors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    fn from_numbers(values: &[f64]) -> Option<Self> {
        match values {
            [a, b, c, d, e, f] => Some(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }

    /// `self × other`: apply `self` first, then `other`
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Length of a vector after the linear part of the transform
    fn scale_length(&self, x: f64, y: f64) -> f64 {
        (x * self.a + y * self.c).hypot(x * self.b + y * self.d)
    }
}

#[derive(Clone)]
struct SelectedFont {
    resource_name: String,
    font: Rc<Font>,
}

#[derive(Clone)]
struct TextState {
    font: Option<SelectedFont>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// Tz / 100
    horizontal_scaling: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Clone)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

struct Interpreter<'a> {
    doc: &'a lopdf::Document,
    spans: &'a mut Vec<TextSpan>,
    /// Operations executed so far
    operations: usize,
}

impl Interpreter<'_> {
    fn run(
        &mut self,
        content: &[u8],
        resources: &Dictionary,
        ctm: Matrix,
        depth: usize,
    ) -> Result<(), PdfError> {
        if depth > MAX_FORM_DEPTH {
            return Err(PdfError::Render(format!(
                "Form XObjects nested deeper than {MAX_FORM_DEPTH}"
            )));
        }
        let operations = content::parse(content)?;

        let mut state = GraphicsState {
            ctm,
            text: TextState::default(),
        };
        let mut saved: Vec<GraphicsState> = Vec::new();
        let mut fonts: HashMap<Vec<u8>, Rc<Font>> = HashMap::new();
        let mut text_matrix = Matrix::IDENTITY;
        let mut line_matrix = Matrix::IDENTITY;

        for operation in &operations {
            self.operations += 1;
            if self.operations > MAX_OPERATIONS {
                return Err(PdfError::Render(format!(
                    "content exceeds {MAX_OPERATIONS} operations"
                )));
            }
            match operation.operator.as_str() {
                "q" => saved.push(state.clone()),
                "Q" => match saved.pop() {
                    Some(previous) => state = previous,
                    None => tracing::debug!("Ignoring Q without matching q"),
                },
                "cm" => {
                    let matrix = matrix_operand(operation)?;
                    state.ctm = matrix.multiply(&state.ctm);
                }
                "BT" => {
                    text_matrix = Matrix::IDENTITY;
                    line_matrix = Matrix::IDENTITY;
                }
                "ET" => {}
                "Tf" => {
                    let name = name_operand(operation, 0)?;
                    state.text.size = single_number(operation)?;
                    state.text.font = self.select_font(&mut fonts, resources, name)?;
                }
                "Tc" => state.text.char_spacing = single_number(operation)?,
                "Tw" => state.text.word_spacing = single_number(operation)?,
                "Tz" => {
                    state.text.horizontal_scaling = single_number(operation)? / 100.0;
                }
                "TL" => state.text.leading = single_number(operation)?,
                "Ts" => state.text.rise = single_number(operation)?,
                "Td" => {
                    let [tx, ty] = numbers::<2>(operation)?;
                    line_matrix = Matrix::translation(tx, ty).multiply(&line_matrix);
                    text_matrix = line_matrix;
                }
                "TD" => {
                    let [tx, ty] = numbers::<2>(operation)?;
                    state.text.leading = -ty;
                    line_matrix = Matrix::translation(tx, ty).multiply(&line_matrix);
                    text_matrix = line_matrix;
                }
                "Tm" => {
                    line_matrix = matrix_operand(operation)?;
                    text_matrix = line_matrix;
                }
                "T*" => {
                    line_matrix =
                        Matrix::translation(0.0, -state.text.leading).multiply(&line_matrix);
                    text_matrix = line_matrix;
                }
                "Tj" => {
                    let text = last_operand(operation)?;
                    self.show(&state, &mut text_matrix, std::slice::from_ref(text))?;
                }
                "TJ" => match last_operand(operation)? {
                    Object::Array(items) => self.show(&state, &mut text_matrix, items)?,
                    _ => return Err(operand_error(operation, "an array")),
                },
                "'" => {
                    line_matrix =
                        Matrix::translation(0.0, -state.text.leading).multiply(&line_matrix);
                    text_matrix = line_matrix;
                    let text = last_operand(operation)?;
                    self.show(&state, &mut text_matrix, std::slice::from_ref(text))?;
                }
                "\"" => {
                    let [word_spacing, char_spacing] = leading_numbers::<2>(operation)?;
                    state.text.word_spacing = word_spacing;
                    state.text.char_spacing = char_spacing;
                    line_matrix =
                        Matrix::translation(0.0, -state.text.leading).multiply(&line_matrix);
                    text_matrix = line_matrix;
                    let text = last_operand(operation)?;
                    self.show(&state, &mut text_matrix, std::slice::from_ref(text))?;
                }
                "Do" => {
                    let name = name_operand(operation, 0)?;
                    self.draw_xobject(resources, name, state.ctm, depth)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn select_font(
        &self,
        fonts: &mut HashMap<Vec<u8>, Rc<Font>>,
        resources: &Dictionary,
        name: &[u8],
    ) -> Result<Option<SelectedFont>, PdfError> {
        let resource_name = latin1(name);
        if let Some(font) = fonts.get(name) {
            return Ok(Some(SelectedFont {
                resource_name,
                font: Rc::clone(font),
            }));
        }
        let Some(dict) = resource_entry(self.doc, resources, b"Font", name) else {
            tracing::warn!(font = %resource_name, "Font not found in resources");
            return Ok(None);
        };
        let dict = match dict {
            Object::Dictionary(dict) => dict,
            _ => {
                return Err(PdfError::Render(format!(
                    "font /{resource_name} is not a dictionary"
                )))
            }
        };
        let font = Rc::new(Font::from_dictionary(self.doc, dict)?);
        fonts.insert(name.to_vec(), Rc::clone(&font));
        Ok(Some(SelectedFont {
            resource_name,
            font,
        }))
    }

    /// Emit one span for a Tj string or a whole TJ array
    fn show(
        &mut self,
        state: &GraphicsState,
        text_matrix: &mut Matrix,
        items: &[Object],
    ) -> Result<(), PdfError> {
        let text = &state.text;
        let selected = text.font.as_ref().ok_or_else(|| {
            PdfError::Render("text shown before a font was selected".to_string())
        })?;
        let font = &selected.font;

        let mut string = String::new();
        let mut advance = 0.0;
        for item in items {
            match item {
                Object::String(bytes, _) => {
                    string.push_str(&font.decode_text(bytes));
                    for code in font.codes(bytes) {
                        let mut glyph = font.width(code) / 1000.0 * text.size + text.char_spacing;
                        if font.is_word_space(code) {
                            glyph += text.word_spacing;
                        }
                        advance += glyph * text.horizontal_scaling;
                    }
                }
                other => match number(other) {
                    Some(adjustment) => {
                        advance -= adjustment / 1000.0 * text.size * text.horizontal_scaling
                    }
                    None => {
                        return Err(PdfError::Render(
                            "text arrays may only hold strings and numbers".to_string(),
                        ))
                    }
                },
            }
        }

        let rendering = text_matrix.multiply(&state.ctm);
        let (x, y) = rendering.apply(0.0, text.rise);
        let (end_x, end_y) = rendering.apply(advance, text.rise);
        let height = rendering.scale_length(0.0, text.size);
        self.spans.push(TextSpan {
            string,
            font_name: Some(
                font.base_font()
                    .map(str::to_string)
                    .unwrap_or_else(|| selected.resource_name.clone()),
            ),
            font_size: height,
            x,
            y,
            width: (end_x - x).hypot(end_y - y),
            height,
        });

        *text_matrix = Matrix::translation(advance, 0.0).multiply(text_matrix);
        Ok(())
    }

    fn draw_xobject(
        &mut self,
        resources: &Dictionary,
        name: &[u8],
        ctm: Matrix,
        depth: usize,
    ) -> Result<(), PdfError> {
        let stream = match resource_entry(self.doc, resources, b"XObject", name) {
            Some(Object::Stream(stream)) => stream,
            Some(_) => {
                return Err(PdfError::Render(format!(
                    "XObject /{} is not a stream",
                    latin1(name)
                )))
            }
            None => {
                tracing::warn!(xobject = %latin1(name), "XObject not found in resources");
                return Ok(());
            }
        };
        if dict_name(self.doc, &stream.dict, b"Subtype") != Some(b"Form".as_slice()) {
            return Ok(());
        }

        let matrix = form_matrix(self.doc, stream);
        let content = decoded_content(stream)?;
        match stream.dict.get(b"Resources").map(|object| resolve(self.doc, object)) {
            Ok(Object::Dictionary(form_resources)) => {
                self.run(&content, form_resources, matrix.multiply(&ctm), depth + 1)
            }
            _ => self.run(&content, resources, matrix.multiply(&ctm), depth + 1),
        }
    }
}

/// `/Matrix` of a form XObject, identity when absent
pub fn form_matrix(doc: &lopdf::Document, stream: &Stream) -> Matrix {
    let values = match stream.dict.get(b"Matrix").map(|object| resolve(doc, object)) {
        Ok(Object::Array(items)) => items
            .iter()
            .map(|item| number(resolve(doc, item)))
            .collect::<Option<Vec<f64>>>(),
        _ => None,
    };
    values
        .as_deref()
        .and_then(Matrix::from_numbers)
        .unwrap_or(Matrix::IDENTITY)
}

/// `resources[category][name]`, following references
fn resource_entry<'a>(
    doc: &'a lopdf::Document,
    resources: &'a Dictionary,
    category: &[u8],
    name: &[u8],
) -> Option<&'a Object> {
    match resolve(doc, resources.get(category).ok()?) {
        Object::Dictionary(entries) => Some(resolve(doc, entries.get(name).ok()?)),
        _ => None,
    }
}

fn operand_error(operation: &Operation, expected: &str) -> PdfError {
    PdfError::Render(format!(
        "operator {} expects {expected}",
        operation.operator
    ))
}

fn last_operand(operation: &Operation) -> Result<&Object, PdfError> {
    operation
        .operands
        .last()
        .ok_or_else(|| operand_error(operation, "an operand"))
}

fn name_operand(operation: &Operation, index: usize) -> Result<&[u8], PdfError> {
    match operation.operands.get(index) {
        Some(Object::Name(name)) => Ok(name),
        _ => Err(operand_error(operation, "a name")),
    }
}

/// The last `N` operands as numbers
fn numbers<const N: usize>(operation: &Operation) -> Result<[f64; N], PdfError> {
    let operands = &operation.operands;
    let start = operands
        .len()
        .checked_sub(N)
        .ok_or_else(|| operand_error(operation, &format!("{N} numbers")))?;
    collect_numbers(operation, &operands[start..])
}

fn single_number(operation: &Operation) -> Result<f64, PdfError> {
    let [value] = numbers::<1>(operation)?;
    Ok(value)
}

/// The first `N` operands as numbers
fn leading_numbers<const N: usize>(operation: &Operation) -> Result<[f64; N], PdfError> {
    let operands = operation
        .operands
        .get(..N)
        .ok_or_else(|| operand_error(operation, &format!("{N} numbers")))?;
    collect_numbers(operation, operands)
}

fn collect_numbers<const N: usize>(
    operation: &Operation,
    operands: &[Object],
) -> Result<[f64; N], PdfError> {
    let mut values = [0.0; N];
    for (value, operand) in values.iter_mut().zip(operands) {
        *value = number(operand).ok_or_else(|| operand_error(operation, &format!("{N} numbers")))?;
    }
    Ok(values)
}

fn matrix_operand(operation: &Operation) -> Result<Matrix, PdfError> {
    let [a, b, c, d, e, f] = numbers::<6>(operation)?;
    Ok(Matrix::new(a, b, c, d, e, f))
}

/// Font size quartiles over all spans: values at `min(n-1, floor(i*n/4))`
/// of the sorted sizes for `i = 0..=4`
pub fn font_size_quartiles(spans: &[TextSpan]) -> Vec<f64> {
    let mut sizes: Vec<f64> = spans.iter().map(|span| span.font_size).collect();
    if sizes.is_empty() {
        return Vec::new();
    }
    sizes.sort_by(f64::total_cmp);
    let n = sizes.len();
    (0..=4).map(|i| sizes[(i * n / 4).min(n - 1)]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use lopdf::dictionary;

    fn approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    fn span(size: f64) -> TextSpan {
        TextSpan {
            string: String::new(),
            font_name: None,
            font_size: size,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: size,
        }
    }

    #[test]
    fn test_matrix_multiply_order() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translation(10.0, 5.0);

        assert_eq!(scale.multiply(&shift).apply(1.0, 1.0), (12.0, 7.0));
        assert_eq!(shift.multiply(&scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn test_page_one_span_position_and_width() {
        let document = testing::document();
        let canvas = document.page(0).unwrap().render().unwrap();

        assert_eq!(canvas.bounds, Rect::new(0.0, 0.0, 612.0, 792.0));
        assert_eq!(canvas.spans.len(), 1);
        let span = &canvas.spans[0];
        assert_eq!(span.string, "ABC");
        assert_eq!(span.font_name.as_deref(), Some("Helvetica"));
        approx(span.x, 72.0);
        approx(span.y, 720.0);
        approx(span.font_size, 12.0);
        // (722 + 667 + 722) / 1000 * 12
        approx(span.width, 25.332);
    }

    #[test]
    fn test_form_xobject_and_composite_font() {
        let document = testing::document();
        let canvas = document.page(1).unwrap().render().unwrap();

        assert_eq!(canvas.spans.len(), 2);
        let form = &canvas.spans[0];
        assert_eq!(form.string, "Form");
        // Form text sits at 5 5 inside a 50 50 translation
        approx(form.x, 55.0);
        approx(form.y, 55.0);
        approx(form.font_size, 9.0);

        let composite = &canvas.spans[1];
        assert_eq!(composite.string, "AB");
        approx(composite.x, 10.0);
        approx(composite.y, 10.0);
        // (600 + 700) / 1000 * 10
        approx(composite.width, 13.0);
    }

    #[test]
    fn test_text_without_font_is_error() {
        let doc = lopdf::Document::with_version("1.5");
        let mut canvas = Canvas::new(Rect::new(0.0, 0.0, 100.0, 100.0));

        let result = canvas.render(&doc, b"BT (orphan) Tj ET", &Dictionary::new());

        assert!(matches!(result, Err(PdfError::Render(_))));
    }

    #[test]
    fn test_syntax_error_surfaces_as_content_error() {
        let doc = lopdf::Document::with_version("1.5");
        let mut canvas = Canvas::new(Rect::new(0.0, 0.0, 100.0, 100.0));

        let result = canvas.render(&doc, b"BT /F1 12 Tf (unterminated Tj ET", &Dictionary::new());

        assert!(matches!(result, Err(PdfError::Content(_))));
    }

    #[test]
    fn test_tj_kerning_and_leading() {
        let document = testing::document();
        let resources = document.page(0).unwrap().resources().unwrap();
        let mut canvas = Canvas::new(Rect::new(0.0, 0.0, 612.0, 792.0));

        canvas
            .render(
                document.inner(),
                b"BT /F1 10 Tf 14 TL 0 100 Td [(A) -1000 (B)] TJ T* (C) Tj ET",
                &resources,
            )
            .unwrap();

        assert_eq!(canvas.spans.len(), 2);
        assert_eq!(canvas.spans[0].string, "AB");
        // 7.22 + 10 (kerning) + 6.67
        approx(canvas.spans[0].width, 23.89);
        approx(canvas.spans[1].x, 0.0);
        approx(canvas.spans[1].y, 86.0);
    }

    #[test]
    fn test_fan_out_forms_hit_operation_budget() {
        // Eight nested forms, each drawing the next twenty times, stay within
        // the depth limit but would run 20^8 operations
        let mut doc = lopdf::Document::with_version("1.5");
        let ids: Vec<_> = (0..MAX_FORM_DEPTH).map(|_| doc.new_object_id()).collect();
        let calls = |id| {
            lopdf::dictionary! {
                "XObject" => lopdf::dictionary! { "Next" => Object::Reference(id) },
            }
        };
        for (level, &id) in ids.iter().enumerate() {
            let (resources, content) = match ids.get(level + 1) {
                Some(&next) => (calls(next), b"/Next Do ".repeat(20)),
                None => (Dictionary::new(), b"q Q".to_vec()),
            };
            doc.objects.insert(
                id,
                Object::Stream(Stream::new(
                    lopdf::dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Form",
                        "BBox" => vec![0.into(), 0.into(), 10.into(), 10.into()],
                        "Resources" => resources,
                    },
                    content,
                )),
            );
        }
        let mut canvas = Canvas::new(Rect::new(0.0, 0.0, 10.0, 10.0));

        let result = canvas.render(&doc, b"/Next Do", &calls(ids[0]));

        match result {
            Err(PdfError::Render(message)) => assert!(message.contains("operations"), "{message}"),
            other => panic!("expected operation budget error, got {other:?}"),
        }
    }

    #[test]
    fn test_unbalanced_restore_is_ignored() {
        let doc = lopdf::Document::with_version("1.5");
        let mut canvas = Canvas::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(canvas.render(&doc, b"Q q Q", &Dictionary::new()).is_ok());
    }

    #[test]
    fn test_quartiles() {
        let spans: Vec<TextSpan> = [12.0, 8.0, 10.0, 24.0].into_iter().map(span).collect();
        assert_eq!(font_size_quartiles(&spans), vec![8.0, 10.0, 12.0, 24.0, 24.0]);
        assert!(font_size_quartiles(&[]).is_empty());
        assert_eq!(font_size_quartiles(&[span(9.0)]), vec![9.0; 5]);
    }
}
