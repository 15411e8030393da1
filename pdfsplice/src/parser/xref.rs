//! Cross-reference discovery: `startxref`, classic tables, xref streams and
//! the `/Prev` chain of incremental updates.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::error::{PdfSpliceError, Result};
use crate::object::{Dictionary, Object};

use super::filters::decode_stream;
use super::lexer::{Lexer, rfind};

/// Longest `/Prev` chain followed before the file is considered broken.
const MAX_XREF_SECTIONS: usize = 64;

/// How far from the end of the file `startxref` is searched for.
const STARTXREF_WINDOW: usize = 4096;

/// One cross-reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum XrefEntry {
    /// Deleted object; masks definitions in older sections.
    Free,
    /// Object stored at a byte offset.
    InUse { offset: usize, generation: u16 },
    /// Object stored inside an object stream.
    Compressed { container: u32, index: u32 },
}

/// Merged view of every cross-reference section in a file.
#[derive(Debug, Default)]
pub(crate) struct XrefTable {
    pub entries: BTreeMap<u32, XrefEntry>,
    pub trailer: Dictionary,
}

impl XrefTable {
    /// Entries from newer sections win, so only unseen numbers are added.
    fn add(&mut self, number: u32, entry: XrefEntry) {
        self.entries.entry(number).or_insert(entry);
    }

    /// Trailer keys from newer sections win as well.
    fn merge_trailer(&mut self, trailer: &Dictionary) {
        for (key, value) in trailer.iter() {
            if !self.trailer.has(key) {
                self.trailer.set(key.clone(), value.clone());
            }
        }
    }
}

/// Locate the offset named by the last `startxref` keyword.
pub(crate) fn find_startxref(bytes: &[u8]) -> Result<usize> {
    let window_start = bytes.len().saturating_sub(STARTXREF_WINDOW);
    let keyword_at = rfind(&bytes[window_start..], b"startxref")
        .map(|pos| pos + window_start)
        .or_else(|| rfind(bytes, b"startxref"))
        .ok_or_else(|| PdfSpliceError::malformed(bytes.len(), "no 'startxref' keyword found"))?;

    let mut lexer = Lexer::new(bytes, keyword_at + b"startxref".len());
    let offset = lexer
        .read_unsigned()
        .and_then(|offset| usize::try_from(offset).ok())
        .ok_or_else(|| PdfSpliceError::malformed(lexer.pos(), "'startxref' is not followed by an offset"))?;
    if offset >= bytes.len() {
        return Err(PdfSpliceError::malformed(
            keyword_at,
            format!("startxref offset {offset} is past the end of the file"),
        ));
    }
    Ok(offset)
}

/// Read the section at `start` and every older section it links to.
///
/// Xref streams may decode to at most `max_decoded` bytes each.
pub(crate) fn load_xref_chain(
    bytes: &[u8],
    start: usize,
    max_decoded: usize,
) -> Result<XrefTable> {
    let mut table = XrefTable::default();
    let mut visited = BTreeSet::new();
    let mut next = Some(start);

    while let Some(offset) = next.take() {
        if !visited.insert(offset) {
            return Err(PdfSpliceError::malformed(
                offset,
                "cross-reference chain revisits an earlier section",
            ));
        }
        if visited.len() > MAX_XREF_SECTIONS {
            return Err(PdfSpliceError::malformed(
                offset,
                format!("more than {MAX_XREF_SECTIONS} cross-reference sections"),
            ));
        }

        let trailer = read_section(bytes, offset, max_decoded, &mut table)?;

        // Hybrid files: the stream named by /XRefStm sits between this
        // table and the one /Prev points at.
        if let Some(stream_offset) = offset_entry(&trailer, b"XRefStm") {
            if visited.insert(stream_offset) {
                let stream_trailer = read_section(bytes, stream_offset, max_decoded, &mut table)?;
                debug!(
                    "Read hybrid xref stream at {stream_offset} ({} trailer keys)",
                    stream_trailer.len()
                );
            }
        }

        table.merge_trailer(&trailer);
        next = offset_entry(&trailer, b"Prev");
    }

    debug!(
        "Cross-reference chain: {} section(s), {} entries",
        visited.len(),
        table.entries.len()
    );
    Ok(table)
}

fn offset_entry(trailer: &Dictionary, key: &[u8]) -> Option<usize> {
    trailer
        .get(key)
        .and_then(Object::as_i64)
        .and_then(|value| usize::try_from(value).ok())
}

/// Parse one section, add its entries and return its trailer.
fn read_section(
    bytes: &[u8],
    offset: usize,
    max_decoded: usize,
    table: &mut XrefTable,
) -> Result<Dictionary> {
    if offset >= bytes.len() {
        return Err(PdfSpliceError::malformed(
            offset,
            "cross-reference offset is past the end of the file",
        ));
    }
    let mut lexer = Lexer::new(bytes, offset);
    if lexer.next_is_keyword(b"xref") {
        debug!("Classic xref table at {offset}");
        read_table(&mut lexer, table)
    } else {
        debug!("Expecting xref stream at {offset}");
        read_stream(&mut lexer, max_decoded, table)
    }
}

fn read_table(lexer: &mut Lexer<'_>, table: &mut XrefTable) -> Result<Dictionary> {
    lexer.expect_keyword(b"xref")?;
    loop {
        if lexer.next_is_keyword(b"trailer") {
            lexer.expect_keyword(b"trailer")?;
            break;
        }
        let at = lexer.pos();
        let (Some(first), Some(count)) = (lexer.read_unsigned(), lexer.read_unsigned()) else {
            if lexer.at_end() {
                return Err(PdfSpliceError::truncated(at, "cross-reference table"));
            }
            return Err(PdfSpliceError::malformed(
                at,
                "expected a subsection header or 'trailer'",
            ));
        };
        for number in first..first.saturating_add(count) {
            let at = lexer.pos();
            let (Some(offset), Some(generation)) = (lexer.read_unsigned(), lexer.read_unsigned())
            else {
                if lexer.at_end() {
                    return Err(PdfSpliceError::truncated(at, "cross-reference entry"));
                }
                return Err(PdfSpliceError::malformed(at, "invalid cross-reference entry"));
            };
            let in_use = if lexer.next_is_keyword(b"n") {
                lexer.expect_keyword(b"n")?;
                true
            } else if lexer.next_is_keyword(b"f") {
                lexer.expect_keyword(b"f")?;
                false
            } else {
                return Err(PdfSpliceError::malformed(
                    lexer.pos(),
                    "cross-reference entry type must be 'n' or 'f'",
                ));
            };
            let Ok(number) = u32::try_from(number) else {
                return Err(PdfSpliceError::malformed(at, "object number out of range"));
            };
            let entry = match (in_use, usize::try_from(offset), u16::try_from(generation)) {
                // Offset 0 cannot hold an object; writers use it for unused slots.
                (true, Ok(offset), Ok(generation)) if offset > 0 => {
                    XrefEntry::InUse { offset, generation }
                }
                _ => XrefEntry::Free,
            };
            if number != 0 {
                table.add(number, entry);
            }
        }
    }

    match lexer.read_object()? {
        Object::Dictionary(trailer) => Ok(trailer),
        other => Err(PdfSpliceError::malformed(
            lexer.pos(),
            format!("trailer is a {}, not a dictionary", other.type_label()),
        )),
    }
}

fn read_stream(
    lexer: &mut Lexer<'_>,
    max_decoded: usize,
    table: &mut XrefTable,
) -> Result<Dictionary> {
    let at = lexer.pos();
    // Cross-reference streams must carry a direct /Length.
    let (_, object) = lexer.read_indirect_object(&|_| None)?;
    let Object::Stream(stream) = object else {
        return Err(PdfSpliceError::malformed(
            at,
            "startxref points at neither 'xref' nor an xref stream",
        ));
    };
    if !stream.dict.has_type(b"XRef") {
        return Err(PdfSpliceError::malformed(at, "stream is not of /Type /XRef"));
    }

    let widths: Vec<usize> = stream
        .dict
        .get(b"W")
        .and_then(Object::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|w| w.as_i64().and_then(|w| usize::try_from(w).ok()))
                .collect()
        })
        .unwrap_or_default();
    if widths.len() != 3 || widths.iter().any(|w| *w > 8) {
        return Err(PdfSpliceError::malformed(at, "xref stream has an invalid /W array"));
    }
    let row = widths.iter().sum::<usize>();
    if row == 0 {
        return Err(PdfSpliceError::malformed(at, "xref stream /W widths are all zero"));
    }

    let size = stream.dict.get(b"Size").and_then(Object::as_i64).unwrap_or(0);
    let subsections: Vec<(u64, u64)> = match stream.dict.get(b"Index").and_then(Object::as_array) {
        Some(index) => index
            .chunks(2)
            .filter_map(|pair| match pair {
                [first, count] => Some((
                    u64::try_from(first.as_i64()?).ok()?,
                    u64::try_from(count.as_i64()?).ok()?,
                )),
                _ => None,
            })
            .collect(),
        None => vec![(0, u64::try_from(size).unwrap_or(0))],
    };

    let data = decode_stream(&stream, max_decoded)?;
    let mut rows = data.chunks_exact(row);
    for (first, count) in subsections {
        for number in first..first.saturating_add(count) {
            let Some(fields) = rows.next() else {
                return Err(PdfSpliceError::truncated(at, "xref stream entries"));
            };
            let (type_field, rest) = fields.split_at(widths[0]);
            let (second, third) = rest.split_at(widths[1]);
            // A zero-width type field defaults to 1.
            let kind = if widths[0] == 0 { 1 } else { read_be(type_field) };
            let second = read_be(second);
            let third = read_be(third);

            let Ok(number) = u32::try_from(number) else {
                continue;
            };
            let entry = match kind {
                0 => XrefEntry::Free,
                1 => match (usize::try_from(second), u16::try_from(third)) {
                    (Ok(offset), Ok(generation)) if offset > 0 => {
                        XrefEntry::InUse { offset, generation }
                    }
                    _ => XrefEntry::Free,
                },
                2 => match (u32::try_from(second), u32::try_from(third)) {
                    (Ok(container), Ok(index)) => XrefEntry::Compressed { container, index },
                    _ => XrefEntry::Free,
                },
                // Unknown entry types are to be read as null references.
                _ => XrefEntry::Free,
            };
            if number != 0 {
                table.add(number, entry);
            }
        }
    }

    Ok(stream.dict)
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}
