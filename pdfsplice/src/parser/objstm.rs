//! Object streams (`/Type /ObjStm`).
//!
//! The decoded payload starts with `N` pairs of integers (object number,
//! offset relative to `/First`) followed by the member objects themselves.

use crate::error::{PdfSpliceError, Result};
use crate::object::{Object, Stream};

use super::filters::decode_stream;
use super::lexer::Lexer;

/// Decode an object stream and return its members in stream order.
///
/// Members are always generation 0. A member that fails to parse is
/// returned as `Err` in its slot so one bad member does not hide the rest.
/// The payload may decode to at most `max_decoded` bytes.
pub(crate) fn parse_object_stream(
    stream: &Stream,
    max_decoded: usize,
) -> Result<Vec<(u32, Result<Object>)>> {
    if !stream.dict.has_type(b"ObjStm") {
        return Err(PdfSpliceError::malformed(0, "container is not an object stream"));
    }
    let count = header_value(stream, b"N")?;
    let first = header_value(stream, b"First")?;
    let data = decode_stream(stream, max_decoded)?;

    let mut header = Lexer::new(&data, 0);
    let mut entries = Vec::with_capacity(count.min(data.len()));
    for _ in 0..count {
        let (Some(number), Some(offset)) = (header.read_unsigned(), header.read_unsigned()) else {
            return Err(PdfSpliceError::malformed(
                header.pos(),
                "object stream header is shorter than /N",
            ));
        };
        let number = u32::try_from(number)
            .map_err(|_| PdfSpliceError::malformed(header.pos(), "object number out of range"))?;
        entries.push((number, offset as usize));
    }

    let members = entries
        .into_iter()
        .map(|(number, offset)| {
            let object = first
                .checked_add(offset)
                .filter(|start| *start < data.len())
                .ok_or_else(|| {
                    PdfSpliceError::truncated(offset, format!("object stream member {number}"))
                })
                .and_then(|start| Lexer::new(&data, start).read_object());
            (number, object)
        })
        .collect();
    Ok(members)
}

fn header_value(stream: &Stream, key: &[u8]) -> Result<usize> {
    stream
        .dict
        .get(key)
        .and_then(Object::as_i64)
        .and_then(|value| usize::try_from(value).ok())
        .ok_or_else(|| {
            PdfSpliceError::malformed(
                0,
                format!(
                    "object stream lacks a valid /{}",
                    String::from_utf8_lossy(key)
                ),
            )
        })
}
