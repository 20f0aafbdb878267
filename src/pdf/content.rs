//! Content stream lexer and parser
//!
//! Turns decoded content-stream bytes into an ordered list of
//! `lopdf::content::Operation`s. Unlike lopdf's own decoder, which stops
//! quietly at the first token it cannot read, this parser reports malformed
//! syntax as a `ContentError` carrying the byte offset, so callers can surface
//! it next to whatever else they managed to decode.

use lopdf::content::Operation;
use lopdf::{Dictionary, Object, StringFormat};
use serde_json::{json, Value};
use thiserror::Error;

use super::json::object_to_json;

/// Maximum nesting of arrays and dictionaries inside one operand
const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {offset}")]
pub struct ContentError {
    pub offset: usize,
    pub message: String,
}

impl ContentError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Parse a whole content stream
pub fn parse(input: &[u8]) -> Result<Vec<Operation>, ContentError> {
    Lexer::new(input).operations()
}

pub fn operations_to_json(operations: &[Operation]) -> Value {
    Value::Array(
        operations
            .iter()
            .map(|operation| {
                json!({
                    "operator": operation.operator,
                    "operands": operation.operands.iter().map(object_to_json).collect::<Vec<_>>(),
                })
            })
            .collect(),
    )
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// A bare token: either an operand keyword or an operator
enum Token {
    Operand(Object),
    Keyword(String),
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn error(&self, message: impl Into<String>) -> ContentError {
        ContentError::new(self.pos, message)
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(b) = self.peek() {
                    if b == b'\n' || b == b'\r' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn operations(mut self) -> Result<Vec<Operation>, ContentError> {
        let mut operations = Vec::new();
        let mut operands = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                break;
            }
            match self.token(0)? {
                Token::Operand(object) => operands.push(object),
                Token::Keyword(keyword) if keyword == "BI" => {
                    if !operands.is_empty() {
                        return Err(self.error("operands before inline image"));
                    }
                    operations.push(self.inline_image()?);
                }
                Token::Keyword(keyword) => {
                    operations.push(Operation::new(&keyword, std::mem::take(&mut operands)));
                }
            }
        }
        if !operands.is_empty() {
            return Err(self.error(format!(
                "{} operand(s) without an operator at end of stream",
                operands.len()
            )));
        }
        Ok(operations)
    }

    fn token(&mut self, depth: usize) -> Result<Token, ContentError> {
        if depth > MAX_NESTING {
            return Err(self.error("operand nesting too deep"));
        }
        let b = self
            .peek()
            .ok_or_else(|| self.error("unexpected end of stream"))?;
        let object = match b {
            b'/' => self.name()?,
            b'(' => self.literal_string()?,
            b'<' if self.peek_at(1) == Some(b'<') => self.dictionary(depth)?,
            b'<' => self.hex_string()?,
            b'[' => self.array(depth)?,
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.number()?,
            b')' | b'>' | b']' | b'{' | b'}' => {
                return Err(self.error(format!("unexpected '{}'", char::from(b))));
            }
            _ => {
                let start = self.pos;
                while self.peek().is_some_and(is_regular) {
                    self.pos += 1;
                }
                let word = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
                return Ok(match word.as_str() {
                    "true" => Token::Operand(Object::Boolean(true)),
                    "false" => Token::Operand(Object::Boolean(false)),
                    "null" => Token::Operand(Object::Null),
                    _ => Token::Keyword(word),
                });
            }
        };
        Ok(Token::Operand(object))
    }

    /// A value nested in an array or dictionary; operators are not allowed there
    fn operand(&mut self, depth: usize) -> Result<Object, ContentError> {
        let start = self.pos;
        match self.token(depth)? {
            Token::Operand(object) => Ok(object),
            Token::Keyword(keyword) => Err(ContentError::new(
                start,
                format!("operator '{}' inside an operand", keyword),
            )),
        }
    }

    fn number(&mut self) -> Result<Object, ContentError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| matches!(b, b'+' | b'-' | b'.' | b'0'..=b'9'))
        {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| ContentError::new(start, "malformed number"))?;
        if text.contains('.') {
            text.parse::<f64>()
                .map(|value| Object::Real(value as _))
                .map_err(|_| ContentError::new(start, format!("malformed number '{}'", text)))
        } else {
            text.parse::<i64>()
                .map(Object::Integer)
                .map_err(|_| ContentError::new(start, format!("malformed number '{}'", text)))
        }
    }

    fn name(&mut self) -> Result<Object, ContentError> {
        Ok(Object::Name(self.name_bytes()))
    }

    fn name_bytes(&mut self) -> Vec<u8> {
        self.pos += 1;
        let mut name = Vec::new();
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            if b == b'#' {
                let escaped = self
                    .peek_at(1)
                    .and_then(hex_value)
                    .zip(self.peek_at(2).and_then(hex_value));
                if let Some((hi, lo)) = escaped {
                    name.push(hi << 4 | lo);
                    self.pos += 3;
                    continue;
                }
            }
            name.push(b);
            self.pos += 1;
        }
        name
    }

    fn literal_string(&mut self) -> Result<Object, ContentError> {
        let start = self.pos;
        self.pos += 1;
        let mut depth = 1usize;
        let mut bytes = Vec::new();
        loop {
            let b = self
                .peek()
                .ok_or_else(|| ContentError::new(start, "unterminated string"))?;
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    bytes.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    bytes.push(b);
                }
                b'\\' => self.escape(start, &mut bytes)?,
                _ => bytes.push(b),
            }
        }
        Ok(Object::String(bytes, StringFormat::Literal))
    }

    fn escape(&mut self, start: usize, bytes: &mut Vec<u8>) -> Result<(), ContentError> {
        let b = self
            .peek()
            .ok_or_else(|| ContentError::new(start, "unterminated string"))?;
        self.pos += 1;
        match b {
            b'n' => bytes.push(b'\n'),
            b'r' => bytes.push(b'\r'),
            b't' => bytes.push(b'\t'),
            b'b' => bytes.push(0x08),
            b'f' => bytes.push(0x0C),
            b'0'..=b'7' => {
                let mut value = u32::from(b - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                bytes.push((value & 0xFF) as u8);
            }
            // Line continuation
            b'\r' => {
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            b'\n' => {}
            other => bytes.push(other),
        }
        Ok(())
    }

    fn hex_string(&mut self) -> Result<Object, ContentError> {
        let start = self.pos;
        self.pos += 1;
        let mut digits = Vec::new();
        loop {
            let b = self
                .peek()
                .ok_or_else(|| ContentError::new(start, "unterminated hex string"))?;
            self.pos += 1;
            match b {
                b'>' => break,
                b if is_whitespace(b) => {}
                b => digits.push(hex_value(b).ok_or_else(|| {
                    ContentError::new(self.pos - 1, format!("invalid hex digit '{}'", char::from(b)))
                })?),
            }
        }
        if digits.len() % 2 == 1 {
            digits.push(0);
        }
        let bytes = digits.chunks(2).map(|pair| pair[0] << 4 | pair[1]).collect();
        Ok(Object::String(bytes, StringFormat::Hexadecimal))
    }

    fn array(&mut self, depth: usize) -> Result<Object, ContentError> {
        let start = self.pos;
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ContentError::new(start, "unterminated array")),
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => items.push(self.operand(depth + 1)?),
            }
        }
        Ok(Object::Array(items))
    }

    fn dictionary(&mut self, depth: usize) -> Result<Object, ContentError> {
        let start = self.pos;
        self.pos += 2;
        let mut dict = Dictionary::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ContentError::new(start, "unterminated dictionary")),
                Some(b'>') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    break;
                }
                Some(b'/') => {
                    let key = self.name_bytes();
                    self.skip_whitespace();
                    if self.peek().is_none() {
                        return Err(ContentError::new(start, "unterminated dictionary"));
                    }
                    let value = self.operand(depth + 1)?;
                    dict.set(key, value);
                }
                Some(_) => return Err(self.error("dictionary key must be a name")),
            }
        }
        Ok(Object::Dictionary(dict))
    }

    /// `BI <key value>* ID <data> EI`, returned as one `BI` operation whose
    /// operands are the parameter dictionary and the raw image data
    fn inline_image(&mut self) -> Result<Operation, ContentError> {
        let start = self.pos;
        let mut params = Dictionary::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ContentError::new(start, "unterminated inline image")),
                Some(b'/') => {
                    let key = self.name_bytes();
                    self.skip_whitespace();
                    let value = self.operand(1)?;
                    params.set(key, value);
                }
                Some(_) => {
                    let at = self.pos;
                    match self.token(1)? {
                        Token::Keyword(keyword) if keyword == "ID" => break,
                        _ => {
                            return Err(ContentError::new(
                                at,
                                "expected a name or ID in inline image",
                            ))
                        }
                    }
                }
            }
        }
        // Exactly one whitespace byte separates ID from the data
        if self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
        let data_start = self.pos;
        let data_end = self.find_inline_image_end().ok_or_else(|| {
            ContentError::new(data_start, "inline image data without EI")
        })?;
        let data = self.input[data_start..data_end].to_vec();
        Ok(Operation::new(
            "BI",
            vec![
                Object::Dictionary(params),
                Object::String(data, StringFormat::Hexadecimal),
            ],
        ))
    }

    /// Position of the whitespace before `EI`; leaves the cursor after `EI`
    fn find_inline_image_end(&mut self) -> Option<usize> {
        let mut i = self.pos;
        while i + 3 <= self.input.len() {
            let window = &self.input[i..];
            if is_whitespace(window[0])
                && &window[1..3] == b"EI"
                && window.get(3).map_or(true, |&b| !is_regular(b))
            {
                self.pos = i + 3;
                return Some(i);
            }
            i += 1;
        }
        None
    }
}
