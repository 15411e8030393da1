//! PDF serialization.
//!
//! Output is deterministic: the same document always produces the same
//! bytes. Objects are written in ascending id order followed by a classic
//! cross-reference table; nothing is compressed and no object streams are
//! emitted.

use std::io::{self, Write};

use log::{debug, warn};

use crate::document::Document;
use crate::error::Result;
use crate::object::{Dictionary, Object, ObjectId, Stream, StringFormat};

/// Second header line; bytes above 127 mark the file as binary.
const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

/// Decimal places kept when writing real numbers.
const REAL_PRECISION: usize = 6;

/// Serialize `doc` into a fresh byte vector.
///
/// # Errors
///
/// Fails only when an object of a strictly parsed document cannot be
/// loaded; in tolerant mode such objects are written as `null`.
pub fn serialize_document(doc: &Document) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_document(doc, &mut out)?;
    Ok(out)
}

/// Serialize `doc` into `sink`.
///
/// # Errors
///
/// [`PdfSpliceError::Write`](crate::PdfSpliceError::Write) when the sink
/// fails, plus the load errors described on [`serialize_document`].
pub fn write_document(doc: &Document, sink: impl Write) -> Result<()> {
    let mut out = CountingWriter::new(sink);
    writeln!(out, "%PDF-{}", doc.version())?;
    out.write_all(BINARY_MARKER)?;

    let mut offsets: Vec<(u32, u16, u64)> = Vec::with_capacity(doc.object_count());
    for id in doc.object_ids() {
        if offsets.last().is_some_and(|last| last.0 == id.0) {
            warn!(
                "Object {} {} shares its number with an earlier generation; skipped",
                id.0, id.1
            );
            continue;
        }
        let object = match doc.get(id) {
            Ok(object) => object,
            Err(err) if doc.is_tolerant() => {
                warn!("Object {} {} is unreadable ({err}); writing null", id.0, id.1);
                &Object::Null
            }
            Err(err) => return Err(err),
        };
        if is_layout_stream(object) {
            continue;
        }
        offsets.push((id.0, id.1, out.written));
        write_indirect(&mut out, id, object)?;
    }

    let xref_offset = out.written;
    write_xref(&mut out, &offsets)?;

    let size = offsets.last().map_or(0, |last| last.0) + 1;
    let mut trailer = Dictionary::new();
    trailer.set("Size", i64::from(size));
    for key in [&b"Root"[..], b"Info"] {
        if let Some(value) = doc.trailer().get(key) {
            trailer.set(key, value.clone());
        }
    }
    out.write_all(b"trailer\n")?;
    write_dictionary(&mut out, &trailer)?;
    writeln!(out, "\nstartxref\n{xref_offset}\n%%EOF")?;
    out.flush()?;

    debug!(
        "Serialized {} object(s), {} bytes",
        offsets.len(),
        out.written
    );
    Ok(())
}

/// Cross-reference and object streams describe a source file's layout and
/// are never written.
fn is_layout_stream(object: &Object) -> bool {
    object
        .as_stream()
        .is_some_and(|stream| stream.dict.has_type(b"XRef") || stream.dict.has_type(b"ObjStm"))
}

fn write_indirect(out: &mut impl Write, id: ObjectId, object: &Object) -> io::Result<()> {
    writeln!(out, "{} {} obj", id.0, id.1)?;
    write_object(out, object)?;
    out.write_all(b"\nendobj\n")
}

/// Subsections group consecutive object numbers; object 0 heads the free list.
fn write_xref(out: &mut impl Write, offsets: &[(u32, u16, u64)]) -> io::Result<()> {
    out.write_all(b"xref\n")?;

    let mut entries: Vec<(u32, Option<(u16, u64)>)> = Vec::with_capacity(offsets.len() + 1);
    entries.push((0, None));
    entries.extend(offsets.iter().map(|&(number, generation, offset)| (number, Some((generation, offset)))));

    let mut start = 0;
    while start < entries.len() {
        let mut end = start + 1;
        while end < entries.len() && entries[end].0 == entries[end - 1].0 + 1 {
            end += 1;
        }
        writeln!(out, "{} {}", entries[start].0, end - start)?;
        for (_, entry) in &entries[start..end] {
            match entry {
                None => out.write_all(b"0000000000 65535 f\r\n")?,
                Some((generation, offset)) => write!(out, "{offset:010} {generation:05} n\r\n")?,
            }
        }
        start = end;
    }
    Ok(())
}

fn write_object(out: &mut impl Write, object: &Object) -> io::Result<()> {
    match object {
        Object::Null => out.write_all(b"null"),
        Object::Boolean(value) => write!(out, "{value}"),
        Object::Integer(value) => write!(out, "{value}"),
        Object::Real(value) => out.write_all(format_real(*value).as_bytes()),
        Object::String(bytes, StringFormat::Literal) => write_literal_string(out, bytes),
        Object::String(bytes, StringFormat::Hexadecimal) => {
            out.write_all(b"<")?;
            for byte in bytes {
                write!(out, "{byte:02X}")?;
            }
            out.write_all(b">")
        }
        Object::Name(name) => write_name(out, name),
        Object::Array(items) => {
            out.write_all(b"[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_all(b" ")?;
                }
                write_object(out, item)?;
            }
            out.write_all(b"]")
        }
        Object::Dictionary(dict) => write_dictionary(out, dict),
        Object::Stream(stream) => write_stream(out, stream),
        Object::Reference((number, generation)) => write!(out, "{number} {generation} R"),
    }
}

fn write_dictionary(out: &mut impl Write, dict: &Dictionary) -> io::Result<()> {
    out.write_all(b"<<")?;
    for (key, value) in dict.iter() {
        out.write_all(b" ")?;
        write_name(out, key)?;
        out.write_all(b" ")?;
        write_object(out, value)?;
    }
    out.write_all(b" >>")
}

fn write_stream(out: &mut impl Write, stream: &Stream) -> io::Result<()> {
    let mut dict = stream.dict.clone();
    dict.set("Length", stream.content.len());
    write_dictionary(out, &dict)?;
    out.write_all(b"\nstream\n")?;
    out.write_all(&stream.content)?;
    out.write_all(b"\nendstream")
}

fn write_name(out: &mut impl Write, name: &[u8]) -> io::Result<()> {
    out.write_all(b"/")?;
    for &byte in name {
        let plain = (0x21..=0x7e).contains(&byte)
            && !matches!(
                byte,
                b'#' | b'/' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'%'
            );
        if plain {
            out.write_all(&[byte])?;
        } else {
            write!(out, "#{byte:02X}")?;
        }
    }
    Ok(())
}

fn write_literal_string(out: &mut impl Write, bytes: &[u8]) -> io::Result<()> {
    out.write_all(b"(")?;
    for &byte in bytes {
        match byte {
            b'\\' => out.write_all(b"\\\\")?,
            b'(' => out.write_all(b"\\(")?,
            b')' => out.write_all(b"\\)")?,
            b'\r' => out.write_all(b"\\r")?,
            _ => out.write_all(&[byte])?,
        }
    }
    out.write_all(b")")
}

/// Fixed-point notation, trailing zeros trimmed. Non-finite values have
/// no PDF representation and are written as 0.
fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let text = format!("{:.*}", REAL_PRECISION, value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "" | "-" | "-0" => "0".to_string(),
        _ => text.to_string(),
    }
}

/// Tracks the byte offset of everything written so far.
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
