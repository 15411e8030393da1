//! Byte-level tokenizer and object reader.
//!
//! The lexer works directly on the input slice with a cursor; it never
//! copies the buffer. Every failure carries the byte offset at which it
//! was detected.

use crate::error::{PdfSpliceError, Result};
use crate::object::{Dictionary, Object, ObjectId, Stream, StringFormat};

/// Deepest array/dictionary nesting accepted before the input is rejected.
const MAX_NESTING: usize = 256;

pub(crate) fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

pub(crate) fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

pub(crate) fn is_regular(byte: u8) -> bool {
    !is_whitespace(byte) && !is_delimiter(byte)
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Find `needle` in `haystack` at or after `from`.
pub(crate) fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Find the last occurrence of `needle` in `haystack`.
pub(crate) fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

pub(crate) struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self {
            bytes,
            pos: pos.min(bytes.len()),
            depth: 0,
        }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.bytes.len());
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn truncated(&self, context: &str) -> PdfSpliceError {
        PdfSpliceError::truncated(self.pos, context)
    }

    fn malformed(&self, details: impl Into<String>) -> PdfSpliceError {
        PdfSpliceError::malformed(self.pos, details)
    }

    /// Skip whitespace and `%` comments.
    pub(crate) fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek() {
            if is_whitespace(byte) {
                self.pos += 1;
            } else if byte == b'%' {
                while let Some(byte) = self.peek() {
                    if byte == b'\r' || byte == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Read a run of regular characters without skipping whitespace first.
    fn read_regular(&mut self) -> &'a [u8] {
        let start = self.pos;
        while self.peek().is_some_and(is_regular) {
            self.pos += 1;
        }
        &self.bytes[start..self.pos]
    }

    /// Whether the next token is exactly `keyword`. Does not consume it.
    pub(crate) fn next_is_keyword(&mut self, keyword: &[u8]) -> bool {
        self.skip_whitespace();
        let end = self.pos + keyword.len();
        self.bytes.get(self.pos..end) == Some(keyword)
            && self.bytes.get(end).is_none_or(|byte| !is_regular(*byte))
    }

    /// Consume `keyword` or fail.
    pub(crate) fn expect_keyword(&mut self, keyword: &[u8]) -> Result<()> {
        if self.next_is_keyword(keyword) {
            self.pos += keyword.len();
            Ok(())
        } else if self.at_end() {
            Err(self.truncated(&format!("'{}'", String::from_utf8_lossy(keyword))))
        } else {
            Err(self.malformed(format!(
                "expected '{}'",
                String::from_utf8_lossy(keyword)
            )))
        }
    }

    /// Read an unsigned decimal integer token.
    pub(crate) fn read_unsigned(&mut self) -> Option<u64> {
        self.skip_whitespace();
        let start = self.pos;
        let mut value: u64 = 0;
        while let Some(byte @ b'0'..=b'9') = self.peek() {
            value = value.checked_mul(10)?.checked_add(u64::from(byte - b'0'))?;
            self.pos += 1;
        }
        if self.pos == start || self.peek().is_some_and(is_regular) {
            self.pos = start;
            return None;
        }
        Some(value)
    }

    /// Read `N G obj`, restoring the cursor if the header is absent.
    pub(crate) fn read_object_header(&mut self) -> Option<ObjectId> {
        let start = self.pos;
        let header = (|| {
            let number = u32::try_from(self.read_unsigned()?).ok()?;
            let generation = u16::try_from(self.read_unsigned()?).ok()?;
            self.next_is_keyword(b"obj").then(|| {
                self.pos += 3;
                (number, generation)
            })
        })();
        if header.is_none() {
            self.pos = start;
        }
        header
    }

    /// Read one direct object.
    pub(crate) fn read_object(&mut self) -> Result<Object> {
        self.skip_whitespace();
        let Some(byte) = self.peek() else {
            return Err(self.truncated("object"));
        };
        match byte {
            b'/' => {
                self.pos += 1;
                Ok(Object::Name(self.read_name_body()))
            }
            b'(' => {
                self.pos += 1;
                Ok(Object::String(
                    self.read_literal_string()?,
                    StringFormat::Literal,
                ))
            }
            b'<' if self.peek_at(1) == Some(b'<') => {
                self.pos += 2;
                Ok(Object::Dictionary(self.read_dictionary_body()?))
            }
            b'<' => {
                self.pos += 1;
                Ok(Object::String(
                    self.read_hex_string()?,
                    StringFormat::Hexadecimal,
                ))
            }
            b'[' => {
                self.pos += 1;
                self.read_array_body()
            }
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.read_number_or_reference(),
            _ => {
                let start = self.pos;
                match self.read_regular() {
                    b"true" => Ok(Object::Boolean(true)),
                    b"false" => Ok(Object::Boolean(false)),
                    b"null" => Ok(Object::Null),
                    b"" => Err(self.malformed(format!(
                        "unexpected delimiter '{}'",
                        char::from(byte)
                    ))),
                    other => Err(PdfSpliceError::malformed(
                        start,
                        format!("unexpected token '{}'", String::from_utf8_lossy(other)),
                    )),
                }
            }
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.malformed(format!("nesting deeper than {MAX_NESTING} levels")));
        }
        Ok(())
    }

    fn read_array_body(&mut self) -> Result<Object> {
        self.enter()?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.truncated("array")),
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => items.push(self.read_object()?),
            }
        }
        self.depth -= 1;
        Ok(Object::Array(items))
    }

    fn read_dictionary_body(&mut self) -> Result<Dictionary> {
        self.enter()?;
        let mut dict = Dictionary::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.truncated("dictionary")),
                Some(b'>') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    break;
                }
                Some(b'>') if self.peek_at(1).is_none() => {
                    return Err(self.truncated("dictionary"));
                }
                Some(b'/') => {
                    self.pos += 1;
                    let key = self.read_name_body();
                    self.skip_whitespace();
                    if self.peek() == Some(b'>') && self.peek_at(1) == Some(b'>') {
                        // A key with no value reads as null.
                        dict.set(key, Object::Null);
                        continue;
                    }
                    let value = self.read_object()?;
                    dict.set(key, value);
                }
                Some(_) => return Err(self.malformed("dictionary key is not a name")),
            }
        }
        self.depth -= 1;
        Ok(dict)
    }

    fn read_name_body(&mut self) -> Vec<u8> {
        let raw = self.read_regular();
        let mut name = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#' && i + 2 < raw.len() {
                if let (Some(hi), Some(lo)) = (hex_value(raw[i + 1]), hex_value(raw[i + 2])) {
                    name.push(hi << 4 | lo);
                    i += 3;
                    continue;
                }
            }
            name.push(raw[i]);
            i += 1;
        }
        name
    }

    fn read_literal_string(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut open = 1usize;
        loop {
            let Some(byte) = self.peek() else {
                return Err(self.truncated("string"));
            };
            self.pos += 1;
            match byte {
                b'(' => {
                    open += 1;
                    out.push(byte);
                }
                b')' => {
                    open -= 1;
                    if open == 0 {
                        return Ok(out);
                    }
                    out.push(byte);
                }
                b'\\' => self.read_escape(&mut out)?,
                b'\r' => {
                    if self.peek() == Some(b'\n') {
                        self.pos += 1;
                    }
                    out.push(b'\n');
                }
                _ => out.push(byte),
            }
        }
    }

    fn read_escape(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let Some(byte) = self.peek() else {
            return Err(self.truncated("string escape"));
        };
        self.pos += 1;
        match byte {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(b'\x08'),
            b'f' => out.push(b'\x0C'),
            b'0'..=b'7' => {
                let mut value = u32::from(byte - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(digit @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(digit - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            }
            // Line continuation.
            b'\r' => {
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            b'\n' => {}
            other => out.push(other),
        }
        Ok(())
    }

    fn read_hex_string(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut pending: Option<u8> = None;
        loop {
            let Some(byte) = self.peek() else {
                return Err(self.truncated("hex string"));
            };
            self.pos += 1;
            if byte == b'>' {
                break;
            }
            if is_whitespace(byte) {
                continue;
            }
            let Some(value) = hex_value(byte) else {
                return Err(PdfSpliceError::malformed(
                    self.pos - 1,
                    format!("invalid hex digit '{}'", char::from(byte)),
                ));
            };
            match pending.take() {
                Some(high) => out.push(high << 4 | value),
                None => pending = Some(value),
            }
        }
        if let Some(high) = pending {
            out.push(high << 4);
        }
        Ok(out)
    }

    fn read_number_or_reference(&mut self) -> Result<Object> {
        let start = self.pos;

        // `N G R` is only possible when the first token is an unsigned integer.
        if let Some(number) = self.read_unsigned() {
            let after_number = self.pos;
            if let Some(generation) = self.read_unsigned() {
                self.skip_whitespace();
                if self.peek() == Some(b'R') && self.peek_at(1).is_none_or(|b| !is_regular(b)) {
                    self.pos += 1;
                    if let (Ok(number), Ok(generation)) =
                        (u32::try_from(number), u16::try_from(generation))
                    {
                        return Ok(Object::Reference((number, generation)));
                    }
                    return Err(PdfSpliceError::malformed(start, "object number out of range"));
                }
            }
            self.pos = after_number;
            return i64::try_from(number)
                .map(Object::Integer)
                .map_err(|_| PdfSpliceError::malformed(start, "integer out of range"));
        }

        let token = self.read_regular();
        parse_number(token)
            .ok_or_else(|| {
                PdfSpliceError::malformed(
                    start,
                    format!("invalid number '{}'", String::from_utf8_lossy(token)),
                )
            })
    }

    /// Read `N G obj <object> [stream ... endstream] endobj` at the cursor.
    ///
    /// `length_of` resolves an indirect `/Length`; when it yields nothing, or
    /// the declared length does not land on `endstream`, the payload end is
    /// found by searching for the keyword instead.
    pub(crate) fn read_indirect_object(
        &mut self,
        length_of: &dyn Fn(ObjectId) -> Option<usize>,
    ) -> Result<(ObjectId, Object)> {
        self.skip_whitespace();
        let header_at = self.pos;
        let Some(id) = self.read_object_header() else {
            if self.at_end() {
                return Err(self.truncated("indirect object header"));
            }
            return Err(PdfSpliceError::malformed(
                header_at,
                "expected an indirect object header 'N G obj'",
            ));
        };

        let object = self.read_object()?;
        let object = match object {
            Object::Dictionary(dict) if self.next_is_keyword(b"stream") => {
                self.pos += b"stream".len();
                let content = self.read_stream_payload(&dict, length_of)?;
                Object::Stream(Stream::new(dict, content))
            }
            other => other,
        };

        // A missing `endobj` is common in damaged files and harmless here.
        if self.next_is_keyword(b"endobj") {
            self.pos += b"endobj".len();
        }
        Ok((id, object))
    }

    fn read_stream_payload(
        &mut self,
        dict: &Dictionary,
        length_of: &dyn Fn(ObjectId) -> Option<usize>,
    ) -> Result<Vec<u8>> {
        // The keyword is followed by CRLF or LF; a lone CR is tolerated.
        match (self.peek(), self.peek_at(1)) {
            (Some(b'\r'), Some(b'\n')) => self.pos += 2,
            (Some(b'\r' | b'\n'), _) => self.pos += 1,
            _ => {}
        }
        let data_start = self.pos;

        let declared = match dict.get(b"Length") {
            Some(Object::Integer(length)) => usize::try_from(*length).ok(),
            Some(Object::Reference(id)) => length_of(*id),
            _ => None,
        };

        if let Some(length) = declared {
            if let Some(data_end) = data_start.checked_add(length) {
                if data_end <= self.bytes.len() {
                    let mut probe = Lexer::new(self.bytes, data_end);
                    if probe.next_is_keyword(b"endstream") {
                        self.pos = probe.pos + b"endstream".len();
                        return Ok(self.bytes[data_start..data_end].to_vec());
                    }
                }
            }
        }

        let Some(keyword_at) = find(self.bytes, b"endstream", data_start) else {
            self.pos = self.bytes.len();
            return Err(PdfSpliceError::truncated(data_start, "stream data"));
        };
        let mut data_end = keyword_at;
        if data_end > data_start && self.bytes[data_end - 1] == b'\n' {
            data_end -= 1;
        }
        if data_end > data_start && self.bytes[data_end - 1] == b'\r' {
            data_end -= 1;
        }
        self.pos = keyword_at + b"endstream".len();
        Ok(self.bytes[data_start..data_end].to_vec())
    }
}

fn parse_number(token: &[u8]) -> Option<Object> {
    let text = std::str::from_utf8(token).ok()?;
    if text.is_empty() {
        return None;
    }
    if !text.contains('.') {
        return text.parse::<i64>().ok().map(Object::Integer);
    }
    // Forms like "-.5" and "4." are valid PDF reals.
    let (sign, digits) = match text.as_bytes()[0] {
        b'-' => (-1.0, &text[1..]),
        b'+' => (1.0, &text[1..]),
        _ => (1.0, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    if digits.bytes().filter(|b| *b == b'.').count() > 1 {
        return None;
    }
    let normalized = if digits.starts_with('.') {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let normalized = normalized.trim_end_matches('.');
    let value: f64 = if normalized.is_empty() {
        0.0
    } else {
        normalized.parse().ok()?
    };
    Some(Object::Real(sign * value))
}
