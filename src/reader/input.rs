//! Low-level input handling for the fragment reader.
//!
//! [`FragmentInput`] holds the raw bytes of a fragment, tracks the line,
//! column and byte offset, and provides the lexical primitives the reader is
//! built from: peeking, advancing, names, references and quoted attribute
//! values. [`NamespaceResolver`] keeps the prefix bindings in scope.
//!
//! Only the five built-in entities and character references are resolved.
//! No DTD is read and nothing external is loaded.

use crate::error::{ParseError, SourceLocation};

/// Maximum length (in bytes) of an element or attribute name.
const MAX_NAME_LENGTH: usize = 50_000;

/// Returns `true` if `c` is a valid `Char` per XML 1.0 §2.2.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x0001_0000..=0x0010_FFFF
    )
}

/// Returns `true` if `c` is a valid `NameStartChar` per XML 1.0 §2.3.
pub(crate) fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' |
        '\u{10000}'..='\u{EFFFF}'
    )
}

/// Returns `true` if `c` is a valid `NameChar` per XML 1.0 §2.3.
pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

/// Cursor over a fragment's bytes.
pub(crate) struct FragmentInput<'a> {
    input: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    depth: u32,
    max_depth: u32,
}

impl<'a> FragmentInput<'a> {
    /// Creates a cursor at the start of `input`.
    pub fn new(input: &'a str, max_depth: u32) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            depth: 0,
            max_depth,
        }
    }

    // -- Depth tracking --

    /// Enters an element. Fails once the nesting limit is exceeded.
    pub fn increment_depth(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(self.fatal(format!(
                "maximum nesting depth exceeded ({})",
                self.max_depth
            )));
        }
        Ok(())
    }

    /// Leaves an element.
    pub fn decrement_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // -- Position --

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            byte_offset: self.pos,
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    // -- Peek --

    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    pub fn peek_char(&self) -> Option<char> {
        let remaining = self.input.get(self.pos..)?;
        let len = remaining.len().min(4);
        // A char is at most 4 bytes; trim the window back to a boundary.
        (1..=len)
            .rev()
            .find_map(|n| std::str::from_utf8(&remaining[..n]).ok())
            .and_then(|s| s.chars().next())
    }

    pub fn looking_at(&self, s: &[u8]) -> bool {
        self.input[self.pos.min(self.input.len())..].starts_with(s)
    }

    // -- Advance --

    /// Advances by `count` bytes, updating line and column.
    pub fn advance(&mut self, count: usize) {
        for _ in 0..count {
            if let Some(&b) = self.input.get(self.pos) {
                if b == b'\n' {
                    self.line += 1;
                    self.column = 1;
                } else if b & 0xC0 != 0x80 {
                    self.column += 1;
                }
                self.pos += 1;
            }
        }
    }

    fn advance_char(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += ch.len_utf8();
    }

    /// Consumes the next character, folding `\r\n` and lone `\r` into `\n`.
    pub fn next_char(&mut self) -> Result<char, ParseError> {
        let ch = self
            .peek_char()
            .ok_or_else(|| self.fatal("unexpected end of input"))?;
        self.advance_char(ch);
        if ch == '\r' {
            if self.peek() == Some(b'\n') {
                self.advance(1);
            }
            return Ok('\n');
        }
        if !is_xml_char(ch) {
            return Err(self.fatal(format!("invalid XML character: U+{:04X}", ch as u32)));
        }
        Ok(ch)
    }

    pub fn expect_byte(&mut self, expected: u8) -> Result<(), ParseError> {
        match self.peek() {
            Some(b) if b == expected => {
                self.advance(1);
                Ok(())
            }
            Some(b) => Err(self.fatal(format!(
                "expected '{}', found '{}'",
                expected as char, b as char
            ))),
            None => Err(self.fatal(format!(
                "expected '{}', found end of input",
                expected as char
            ))),
        }
    }

    /// Skips whitespace. Returns `true` if any was skipped.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.advance(1);
        }
        self.pos > start
    }

    /// Skips input up to and including `terminator`.
    pub fn skip_past(&mut self, terminator: &[u8], what: &str) -> Result<(), ParseError> {
        while !self.looking_at(terminator) {
            if self.at_end() {
                return Err(self.fatal(format!("unexpected end of input in {what}")));
            }
            self.advance(1);
        }
        self.advance(terminator.len());
        Ok(())
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.advance(1);
        }
        // Only ASCII bytes are accepted by the callers' predicates.
        std::str::from_utf8(&self.input[start..self.pos]).unwrap_or_default()
    }

    // -- Names (XML 1.0 §2.3) --

    /// Parses an XML `Name`, prefix included.
    pub fn parse_name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let first = self
            .peek_char()
            .ok_or_else(|| self.fatal("expected name, found end of input"))?;
        if !is_name_start_char(first) {
            return Err(self.fatal(format!("invalid name start character: '{first}'")));
        }
        self.advance_char(first);
        while let Some(ch) = self.peek_char().filter(|&c| is_name_char(c)) {
            self.advance_char(ch);
        }

        let len = self.pos - start;
        if len > MAX_NAME_LENGTH {
            return Err(self.fatal(format!(
                "name length ({len}) exceeds maximum ({MAX_NAME_LENGTH})"
            )));
        }
        std::str::from_utf8(&self.input[start..self.pos])
            .map(str::to_string)
            .map_err(|_| self.fatal("invalid UTF-8 in name"))
    }

    // -- References (XML 1.0 §4.1) --

    /// Parses a built-in entity or character reference (`&...;`).
    pub fn parse_reference(&mut self) -> Result<char, ParseError> {
        self.expect_byte(b'&')?;

        if self.peek() == Some(b'#') {
            self.advance(1);
            let value = if self.peek() == Some(b'x') {
                self.advance(1);
                let hex = self.take_while(|b| b.is_ascii_hexdigit());
                u32::from_str_radix(hex, 16)
                    .map_err(|_| self.fatal("invalid hex character reference"))?
            } else {
                let dec = self.take_while(|b| b.is_ascii_digit());
                dec.parse::<u32>()
                    .map_err(|_| self.fatal("invalid decimal character reference"))?
            };
            self.expect_byte(b';')?;
            return char::from_u32(value)
                .filter(|&c| is_xml_char(c))
                .ok_or_else(|| self.fatal(format!("invalid character reference: U+{value:04X}")));
        }

        let name = self.parse_name()?;
        self.expect_byte(b';')?;
        match name.as_str() {
            "amp" => Ok('&'),
            "lt" => Ok('<'),
            "gt" => Ok('>'),
            "apos" => Ok('\''),
            "quot" => Ok('"'),
            _ => Err(self.fatal(format!("unknown entity reference: &{name};"))),
        }
    }

    // -- Attribute values (XML 1.0 §3.3.3) --

    /// Parses a quoted attribute value, resolving references and normalizing
    /// literal whitespace to spaces.
    pub fn parse_attribute_value(&mut self) -> Result<String, ParseError> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.fatal("attribute value must be quoted")),
        };
        self.advance(1);

        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.fatal("unexpected end of input in attribute value")),
                Some(b) if b == quote => {
                    self.advance(1);
                    return Ok(value);
                }
                Some(b'&') => value.push(self.parse_reference()?),
                Some(b'<') => return Err(self.fatal("'<' not allowed in attribute values")),
                Some(_) => match self.next_char()? {
                    '\n' | '\t' => value.push(' '),
                    ch => value.push(ch),
                },
            }
        }
    }

    // -- Markup --

    /// Consumes a CDATA section and returns its content.
    pub fn parse_cdata(&mut self) -> Result<String, ParseError> {
        self.advance(b"<![CDATA[".len());
        let mut content = String::new();
        while !self.looking_at(b"]]>") {
            if self.at_end() {
                return Err(self.fatal("unexpected end of input in CDATA section"));
            }
            content.push(self.next_char()?);
        }
        self.advance(3);
        Ok(content)
    }

    /// Creates a `ParseError` at the current location.
    pub fn fatal(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            location: self.location(),
        }
    }
}

/// The well-known XML namespace URI, pre-bound to the `xml` prefix.
pub(crate) const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Stack of namespace binding frames mirroring element nesting.
///
/// The empty prefix is the default namespace. Binding the default
/// namespace to `""` undeclares it.
pub(crate) struct NamespaceResolver {
    stack: Vec<Vec<(String, String)>>,
}

impl NamespaceResolver {
    /// Creates a resolver with the `xml` prefix pre-bound.
    pub fn new() -> Self {
        Self {
            stack: vec![vec![("xml".to_string(), XML_NAMESPACE.to_string())]],
        }
    }

    pub fn push_scope(&mut self) {
        self.stack.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        self.stack.pop();
    }

    /// Binds `prefix` to `uri` in the innermost scope.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        if let Some(frame) = self.stack.last_mut() {
            frame.push((prefix.to_string(), uri.to_string()));
        }
    }

    /// Resolves `prefix` to its URI, innermost binding first.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.stack
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }
}
