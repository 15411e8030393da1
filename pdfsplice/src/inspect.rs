//! Document summaries for `pdfsplice info`.

use serde::Serialize;

use crate::document::Document;
use crate::object::Object;

/// What `pdfsplice info` reports about a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    /// Number of pages.
    pub page_count: usize,
    /// Header version, e.g. `"1.7"`.
    pub version: String,
    /// Number of indexed objects.
    pub object_count: usize,
    /// `/Title` from the Info dictionary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// `/Author`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// `/Subject`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// `/Keywords`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    /// `/Creator`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    /// `/Producer`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    /// Size of the source file in bytes, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Whether the index was rebuilt by scanning.
    pub repaired: bool,
}

impl DocumentInfo {
    /// Summarize `doc`.
    pub fn from_document(doc: &Document, file_size: Option<u64>) -> Self {
        let field = |key: &[u8]| {
            let info = doc.info()?;
            let value = doc.resolve_key(info, key)?;
            value.as_str_bytes().map(decode_text)
        };

        Self {
            page_count: doc.page_count(),
            version: doc.version().to_string(),
            object_count: doc.object_count(),
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
            keywords: field(b"Keywords"),
            creator: field(b"Creator"),
            producer: field(b"Producer"),
            file_size,
            repaired: doc.was_repaired(),
        }
    }

    /// Info fields that are set, as `(label, value)` pairs.
    pub fn metadata_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("Title", &self.title),
            ("Author", &self.author),
            ("Subject", &self.subject),
            ("Keywords", &self.keywords),
            ("Creator", &self.creator),
            ("Producer", &self.producer),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_deref().map(|value| (label, value)))
        .collect()
    }
}

/// Decode a PDF text string: UTF-16BE or UTF-8 when marked by a byte
/// order mark, otherwise one byte per character.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Text value of `object` if it is a string.
pub fn text_value(object: &Object) -> Option<String> {
    object.as_str_bytes().map(decode_text)
}
