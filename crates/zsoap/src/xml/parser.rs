//! XML parser implementation

use indexmap::IndexMap;
use std::sync::Arc;

use crate::error::{Error, ErrorKind, Result, Span};
use crate::xml::cursor::Cursor;
use crate::xml::model::{Element, QName};
use crate::xml::namespace::Namespaces;

/// Configuration for the XML parser
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum element nesting depth (0 means unlimited)
    pub max_depth: u16,
    /// Maximum input size in bytes (0 means unlimited)
    pub max_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 128,
            max_size: 10 * 1024 * 1024, // 10 MB default
        }
    }
}

impl Config {
    /// Create a new config with unlimited depth and size
    pub const fn unlimited() -> Self {
        Self {
            max_depth: 0,
            max_size: 0,
        }
    }

    /// Create a new config with specific limits
    pub const fn new(max_depth: u16, max_size: usize) -> Self {
        Self {
            max_depth,
            max_size,
        }
    }
}

/// XML parser producing an [`Element`] tree
#[derive(Debug)]
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    config: Config,
    depth: u16,
}

impl<'a> Parser<'a> {
    /// Create a new XML parser with default limits
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, Config::default())
    }

    /// Create a new XML parser with custom limits
    pub const fn with_config(input: &'a [u8], config: Config) -> Self {
        Self {
            cursor: Cursor::new(input),
            config,
            depth: 0,
        }
    }

    /// Parse a document and return its root element
    pub fn parse(&mut self) -> Result<Element> {
        if self.config.max_size > 0 && self.cursor.rest().len() > self.config.max_size {
            return Err(Error::new(
                ErrorKind::MaxSizeExceeded {
                    max: self.config.max_size,
                },
                Span::empty(),
            ));
        }

        self.skip_misc()?;
        if self.cursor.is_eof() {
            return Err(self.error_here(ErrorKind::UnexpectedEof, "no root element"));
        }
        let root = self.parse_element(&Arc::new(Namespaces::new()))?;
        self.skip_misc()?;

        if !self.cursor.is_eof() {
            return Err(self.error_here(ErrorKind::InvalidToken, "content after root element"));
        }

        Ok(root)
    }

    fn parse_element(&mut self, inherited: &Arc<Namespaces>) -> Result<Element> {
        self.expect_byte(b'<')?;

        if self.cursor.peek() == Some(b'/') {
            return Err(self.error_here(ErrorKind::InvalidToken, "unexpected closing tag"));
        }

        self.depth = self.depth.saturating_add(1);
        if self.config.max_depth > 0 && self.depth > self.config.max_depth {
            return Err(self.error_here(
                ErrorKind::MaxDepthExceeded {
                    max: self.config.max_depth,
                },
                "element nesting too deep",
            ));
        }

        let name = self.parse_name()?;
        let attributes = self.parse_attributes()?;
        let mut element = Element::from_parts(QName::parse(&name), attributes, inherited);

        if self.cursor.eat_byte(b'/') {
            self.expect_byte(b'>')?;
            self.depth = self.depth.saturating_sub(1);
            return Ok(element);
        }

        self.expect_byte(b'>')?;
        let scope = Arc::clone(&element.scope);

        loop {
            if self.cursor.eat(b"</") {
                let close_name = self.parse_name()?;
                if close_name != name {
                    return Err(self.error_here(
                        ErrorKind::MismatchedTag {
                            expected: name,
                            found: close_name,
                        },
                        "mismatched closing tag",
                    ));
                }
                self.cursor.skip_blanks();
                self.expect_byte(b'>')?;
                break;
            }

            if self.cursor.eat(b"<!--") {
                self.take_until(b"-->")?;
            } else if self.cursor.eat(b"<![CDATA[") {
                let raw = self.take_until(b"]]>")?;
                let text = self.utf8(raw)?.to_string();
                element.append_text(text);
            } else if self.cursor.eat(b"<?") {
                self.take_until(b"?>")?;
            } else if self.cursor.peek() == Some(b'<') {
                let child = self.parse_element(&scope)?;
                element.push_element(child);
            } else if self.cursor.is_eof() {
                return Err(self.error_here(ErrorKind::UnexpectedEof, "unterminated element"));
            } else {
                let text = self.parse_text()?;
                element.append_text(text);
            }
        }

        // indentation between elements carries no data
        element.drop_layout_text();
        self.depth = self.depth.saturating_sub(1);
        Ok(element)
    }

    fn parse_attributes(&mut self) -> Result<IndexMap<String, String>> {
        let mut attrs = IndexMap::new();

        loop {
            self.cursor.skip_blanks();
            match self.cursor.peek() {
                Some(b'/' | b'>') => break,
                Some(_) => {}
                None => return Err(self.error_here(ErrorKind::UnexpectedEof, "unterminated tag")),
            }

            let name = self.parse_name()?;
            self.cursor.skip_blanks();
            self.expect_byte(b'=')?;
            self.cursor.skip_blanks();
            let value = self.parse_attribute_value()?;

            if attrs.contains_key(&name) {
                return Err(self.error_here(
                    ErrorKind::DuplicateAttribute { name },
                    "duplicate attribute",
                ));
            }
            attrs.insert(name, value);
        }

        Ok(attrs)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => {
                return Err(
                    self.error_here(ErrorKind::InvalidToken, "expected quoted attribute value")
                )
            }
        };
        self.cursor.bump();

        let raw = self.cursor.take_while(|b| b != quote && b != b'<');
        match self.cursor.peek() {
            Some(b'<') => Err(self.error_here(ErrorKind::InvalidToken, "'<' in attribute value")),
            None => Err(self.error_here(ErrorKind::UnexpectedEof, "unterminated attribute value")),
            Some(_) => {
                self.cursor.bump();
                self.decode(raw)
            }
        }
    }

    fn parse_text(&mut self) -> Result<String> {
        let raw = self.cursor.take_while(|b| b != b'<');
        self.decode(raw)
    }

    fn parse_name(&mut self) -> Result<String> {
        match self.cursor.peek() {
            Some(first) if is_name_start(first) => {}
            Some(_) => return Err(self.error_here(ErrorKind::InvalidToken, "expected name")),
            None => return Err(self.error_here(ErrorKind::UnexpectedEof, "expected name")),
        }
        let raw = self.cursor.take_while(is_name_char);
        self.utf8(raw).map(str::to_string)
    }

    /// Skip the prolog/epilog: whitespace, declaration, comments, PIs, DOCTYPE
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_blanks();
            if self.cursor.eat(b"<?") {
                self.take_until(b"?>")?;
            } else if self.cursor.eat(b"<!--") {
                self.take_until(b"-->")?;
            } else if self.cursor.eat(b"<!DOCTYPE") {
                self.skip_doctype()?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_doctype(&mut self) -> Result<()> {
        let mut in_subset = false;
        while let Some(b) = self.cursor.bump() {
            match b {
                b'[' => in_subset = true,
                b']' => in_subset = false,
                b'>' if !in_subset => return Ok(()),
                _ => {}
            }
        }
        Err(self.error_here(ErrorKind::UnexpectedEof, "unterminated DOCTYPE"))
    }

    fn take_until(&mut self, terminator: &[u8]) -> Result<&'a [u8]> {
        match self.cursor.take_until(terminator) {
            Some(raw) => Ok(raw),
            None => Err(self.error_here(ErrorKind::UnexpectedEof, "unterminated markup")),
        }
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.eat_byte(expected) {
            Ok(())
        } else if self.cursor.is_eof() {
            Err(self.error_here(ErrorKind::UnexpectedEof, "unexpected end of input"))
        } else {
            Err(self.error_here(ErrorKind::InvalidToken, "unexpected token"))
        }
    }

    fn utf8<'b>(&self, bytes: &'b [u8]) -> Result<&'b str> {
        std::str::from_utf8(bytes)
            .map_err(|_| self.error_here(ErrorKind::InvalidUtf8, "invalid utf-8"))
    }

    fn decode(&self, raw: &[u8]) -> Result<String> {
        let text = self.utf8(raw)?;
        decode_entities(text).map_err(|entity| {
            self.error_here(ErrorKind::InvalidEntity { entity }, "invalid xml entity")
        })
    }

    fn error_here(&self, kind: ErrorKind, message: &str) -> Error {
        let pos = self.cursor.position();
        let message = format!("{message}: {kind}");
        Error::with_message(kind, Span::at(pos), message)
    }
}

/// Parse `input` with default limits
pub fn parse(input: &str) -> Result<Element> {
    Parser::new(input.as_bytes()).parse()
}

/// Parse raw bytes with default limits
pub fn parse_bytes(input: &[u8]) -> Result<Element> {
    Parser::new(input).parse()
}

impl Element {
    /// Parse an element tree from XML text
    pub fn parse(input: &str) -> Result<Self> {
        parse(input)
    }
}

fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

/// Decode predefined and numeric entities; the error carries the bad entity
fn decode_entities(input: &str) -> std::result::Result<String, String> {
    if !input.contains('&') {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        let (before, after) = rest.split_at(amp);
        result.push_str(before);
        let after = after.get(1..).unwrap_or_default();
        let Some(semi) = after.find(';') else {
            return Err(after.to_string());
        };
        let (entity, tail) = after.split_at(semi);

        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => decode_numeric_entity(entity),
        };
        match decoded {
            Some(ch) => result.push(ch),
            None => return Err(entity.to_string()),
        }
        rest = tail.get(1..).unwrap_or_default();
    }
    result.push_str(rest);

    Ok(result)
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        None
    }
}
