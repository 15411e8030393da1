//! Shared helpers for the integration tests.
//!
//! Test files are built in memory rather than read from fixtures, so every
//! byte offset in them is known.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use pdfsplice::Document;

/// Writes a PDF body object by object, then finishes it with either a
/// classic cross-reference table or a compressed xref stream.
#[derive(Debug, Clone)]
pub struct PdfBuilder {
    version: String,
    objects: BTreeMap<u32, Vec<u8>>,
    trailer_extra: String,
}

impl PdfBuilder {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            objects: BTreeMap::new(),
            trailer_extra: String::new(),
        }
    }

    /// Add object `id` (generation 0) with `body` as its source text.
    pub fn object(mut self, id: u32, body: &str) -> Self {
        self.objects.insert(id, body.as_bytes().to_vec());
        self
    }

    /// Add a stream object. `entries` are extra dictionary entries.
    pub fn stream(mut self, id: u32, entries: &str, data: &[u8]) -> Self {
        let mut body = format!("<< {entries} /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.objects.insert(id, body);
        self
    }

    /// Add `/Info id 0 R` to the trailer.
    pub fn info(self, id: u32) -> Self {
        self.trailer_entry("Info", &format!("{id} 0 R"))
    }

    /// Add an arbitrary trailer entry.
    pub fn trailer_entry(mut self, key: &str, value: &str) -> Self {
        self.trailer_extra.push_str(&format!(" /{key} {value}"));
        self
    }

    fn header(&self) -> Vec<u8> {
        let mut out = format!("%PDF-{}\n", self.version).into_bytes();
        out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        out
    }

    fn max_id(&self) -> u32 {
        self.objects.keys().next_back().copied().unwrap_or(0)
    }

    /// Finish with a classic `xref` table.
    pub fn build(&self, root: u32) -> Vec<u8> {
        let mut out = self.header();
        let mut offsets = BTreeMap::new();
        for (id, body) in &self.objects {
            offsets.insert(*id, out.len());
            push_object(&mut out, *id, body);
        }

        let size = self.max_id() + 1;
        let xref_at = out.len();
        out.extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());
        for id in 1..size {
            let line = match offsets.get(&id) {
                Some(offset) => format!("{offset:010} 00000 n \n"),
                None => "0000000000 00000 f \n".to_string(),
            };
            out.extend_from_slice(line.as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {size} /Root {root} 0 R{} >>\nstartxref\n{xref_at}\n%%EOF\n",
                self.trailer_extra
            )
            .as_bytes(),
        );
        out
    }

    /// Finish with an object stream holding the `compressed` objects and a
    /// FlateDecode cross-reference stream in place of the table.
    pub fn build_compressed(&self, root: u32, compressed: &[u32]) -> Vec<u8> {
        let objstm_id = self.max_id() + 1;
        let xref_id = objstm_id + 1;

        let mut header = String::new();
        let mut members = Vec::new();
        let mut member_index = BTreeMap::new();
        for (index, id) in compressed.iter().enumerate() {
            let body = &self.objects[id];
            header.push_str(&format!("{id} {} ", members.len()));
            members.extend_from_slice(body);
            members.push(b'\n');
            member_index.insert(*id, index);
        }
        let mut objstm_data = header.clone().into_bytes();
        objstm_data.extend_from_slice(&members);
        let objstm_data = deflate(&objstm_data);

        let mut out = self.header();
        let mut offsets = BTreeMap::new();
        for (id, body) in &self.objects {
            if member_index.contains_key(id) {
                continue;
            }
            offsets.insert(*id, out.len());
            push_object(&mut out, *id, body);
        }

        offsets.insert(objstm_id, out.len());
        let mut objstm = format!(
            "<< /Type /ObjStm /N {} /First {} /Filter /FlateDecode /Length {} >>\nstream\n",
            compressed.len(),
            header.len(),
            objstm_data.len()
        )
        .into_bytes();
        objstm.extend_from_slice(&objstm_data);
        objstm.extend_from_slice(b"\nendstream");
        push_object(&mut out, objstm_id, &objstm);

        let xref_at = out.len();
        let size = xref_id + 1;
        let mut rows = Vec::new();
        for id in 0..size {
            let (kind, second, third): (u8, u32, u16) = if id == xref_id {
                (1, xref_at as u32, 0)
            } else if let Some(index) = member_index.get(&id) {
                (2, objstm_id, *index as u16)
            } else if let Some(offset) = offsets.get(&id) {
                (1, *offset as u32, 0)
            } else {
                (0, 0, if id == 0 { 0xFFFF } else { 0 })
            };
            rows.push(kind);
            rows.extend_from_slice(&second.to_be_bytes());
            rows.extend_from_slice(&third.to_be_bytes());
        }
        let rows = deflate(&rows);

        let mut xref = format!(
            "<< /Type /XRef /Size {size} /W [1 4 2] /Root {root} 0 R{} /Filter /FlateDecode /Length {} >>\nstream\n",
            self.trailer_extra,
            rows.len()
        )
        .into_bytes();
        xref.extend_from_slice(&rows);
        xref.extend_from_slice(b"\nendstream");
        push_object(&mut out, xref_id, &xref);

        out.extend_from_slice(format!("startxref\n{xref_at}\n%%EOF\n").as_bytes());
        out
    }
}

fn push_object(out: &mut Vec<u8>, id: u32, body: &[u8]) {
    out.extend_from_slice(format!("{id} 0 obj\n").as_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(b"\nendobj\n");
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Catalog 1, page tree 2, Info 3, then page `i` at `4 + 2i` with its
/// content stream at `5 + 2i`.
pub fn document_builder(version: &str, title: &str, contents: &[&str]) -> PdfBuilder {
    let kids: Vec<String> = (0..contents.len())
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect();
    let mut builder = PdfBuilder::new(version)
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            &format!(
                "<< /Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 612 792] >>",
                kids.join(" "),
                contents.len()
            ),
        )
        .object(3, &format!("<< /Title ({title}) /Author (Tests) >>"))
        .info(3);
    for (i, content) in contents.iter().enumerate() {
        let page = 4 + 2 * i as u32;
        builder = builder
            .object(
                page,
                &format!("<< /Type /Page /Parent 2 0 R /Contents {} 0 R >>", page + 1),
            )
            .stream(page + 1, "", content.as_bytes());
    }
    builder
}

/// A version 1.4 file with a classic cross-reference table.
pub fn classic_pdf(title: &str, contents: &[&str]) -> Vec<u8> {
    document_builder("1.4", title, contents).build(1)
}

/// A version 1.5 file whose catalog, page tree, Info and page dictionaries
/// live in an object stream indexed by an xref stream.
pub fn compressed_pdf(title: &str, contents: &[&str]) -> Vec<u8> {
    let mut compressed = vec![1, 2, 3];
    compressed.extend((0..contents.len() as u32).map(|i| 4 + 2 * i));
    document_builder("1.5", title, contents).build_compressed(1, &compressed)
}

/// `count` pages reading `page 1`, `page 2`, ...
pub fn numbered_pages(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("page {n}")).collect()
}

/// Replace the classic xref table of `bytes` with a FlateDecode xref
/// stream whose payload inflates to `rows`. `extra` is spliced into the
/// stream dictionary.
pub fn replace_xref_with_stream(mut bytes: Vec<u8>, extra: &str, rows: &[u8]) -> Vec<u8> {
    let at = bytes
        .windows(b"\nxref\n".len())
        .rposition(|window| window == b"\nxref\n")
        .unwrap()
        + 1;
    bytes.truncate(at);
    let data = deflate(rows);
    let mut xref = format!(
        "<< /Type /XRef /Size 100 /W [1 4 2] /Root 1 0 R {extra} /Filter /FlateDecode /Length {} >>\nstream\n",
        data.len()
    )
    .into_bytes();
    xref.extend_from_slice(&data);
    xref.extend_from_slice(b"\nendstream");
    push_object(&mut bytes, 99, &xref);
    bytes.extend_from_slice(format!("startxref\n{at}\n%%EOF\n").as_bytes());
    bytes
}

/// Point `startxref` past the end of the file.
pub fn damage_startxref(mut bytes: Vec<u8>) -> Vec<u8> {
    let at = bytes
        .windows(b"startxref".len())
        .rposition(|window| window == b"startxref")
        .unwrap();
    bytes.truncate(at);
    bytes.extend_from_slice(b"startxref\n99999999\n%%EOF\n");
    bytes
}

/// Content stream text of every page, in order.
pub fn page_texts(doc: &Document) -> Vec<String> {
    (0..doc.page_count())
        .map(|index| String::from_utf8(doc.page_contents(index).unwrap()).unwrap())
        .collect()
}

/// Create a temporary output path for test results.
pub fn temp_output_path() -> tempfile::TempPath {
    tempfile::Builder::new()
        .suffix(".pdf")
        .tempfile()
        .unwrap()
        .into_temp_path()
}
