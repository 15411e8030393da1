//! Fixtures shared by unit tests.

use std::collections::BTreeMap;

use crate::dictionary;
use crate::document::Document;
use crate::object::{Dictionary, Object, ObjectId, Stream};
use crate::writer::serialize_document;

/// A version 1.4 document with `pages` pages whose content streams read
/// `page N`, and an Info dictionary titled `Sample`.
pub(crate) fn sample_document(pages: usize) -> Document {
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut kids = Vec::new();
    for page in 0..pages as u32 {
        let page_id = (4 + page * 2, 0);
        let content_id = (5 + page * 2, 0);
        objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => (2, 0),
                "Contents" => content_id,
            }),
        );
        objects.insert(
            content_id,
            Object::Stream(Stream::new(
                Dictionary::new(),
                format!("page {}", page + 1).into_bytes(),
            )),
        );
        kids.push(Object::Reference(page_id));
    }
    objects.insert(
        (1, 0),
        Object::Dictionary(dictionary! { "Type" => "Catalog", "Pages" => (2, 0) }),
    );
    objects.insert(
        (2, 0),
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len(),
            "Kids" => kids,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
        }),
    );
    objects.insert(
        (3, 0),
        Object::Dictionary(dictionary! { "Title" => Object::string_literal("Sample") }),
    );
    let trailer = dictionary! { "Root" => (1, 0), "Info" => (3, 0) };
    Document::from_objects("1.4", objects, trailer).expect("sample document is valid")
}

/// [`sample_document`] serialized.
pub(crate) fn sample_pdf(pages: usize) -> Vec<u8> {
    serialize_document(&sample_document(pages)).expect("sample document serializes")
}

/// Point `startxref` past the end of the file.
pub(crate) fn damage_startxref(mut bytes: Vec<u8>) -> Vec<u8> {
    let at = bytes
        .windows(b"startxref".len())
        .rposition(|window| window == b"startxref")
        .expect("file has startxref");
    bytes.truncate(at);
    bytes.extend_from_slice(b"startxref\n99999999\n%%EOF\n");
    bytes
}
