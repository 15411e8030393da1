//! Serialized output checked against an independent reader.

use pdfsplice::{merge_documents, parse_document, parse_range_spec, serialize_document, split_document};

use crate::common::{classic_pdf, compressed_pdf};

#[test]
fn test_serialization_is_deterministic() {
    let a = parse_document(&classic_pdf("First", &["a1", "a2"])).unwrap();
    let b = parse_document(&compressed_pdf("Second", &["b1"])).unwrap();

    let first = serialize_document(&merge_documents(&[a.clone(), b.clone()]).unwrap()).unwrap();
    let second = serialize_document(&merge_documents(&[a, b]).unwrap()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_reserialization_is_a_fixed_point() {
    let a = parse_document(&compressed_pdf("First", &["a1", "a2"])).unwrap();
    let bytes = serialize_document(&merge_documents(&[a]).unwrap()).unwrap();

    let again = serialize_document(&parse_document(&bytes).unwrap()).unwrap();

    assert_eq!(bytes, again);
}

#[test]
fn test_merged_output_readable_by_lopdf() {
    let a = parse_document(&classic_pdf("First", &["a1", "a2"])).unwrap();
    let b = parse_document(&compressed_pdf("Second", &["b1", "b2"])).unwrap();
    let bytes = serialize_document(&merge_documents(&[a, b]).unwrap()).unwrap();

    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 4);

    let contents: Vec<Vec<u8>> = pages
        .values()
        .map(|id| doc.get_page_content(*id).unwrap())
        .collect();
    assert_eq!(
        contents,
        vec![b"a1".to_vec(), b"a2".to_vec(), b"b1".to_vec(), b"b2".to_vec()]
    );
}

#[test]
fn test_split_outputs_readable_by_lopdf() {
    let doc = parse_document(&compressed_pdf("Report", &["p1", "p2", "p3"])).unwrap();
    let ranges = parse_range_spec("1,2-3", doc.page_count()).unwrap();

    for (part, expected) in split_document(&doc, &ranges).unwrap().iter().zip([1, 2]) {
        let bytes = serialize_document(part).unwrap();
        let loaded = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(loaded.get_pages().len(), expected);
        assert!(loaded.trailer.get(b"Info").is_ok());
    }
}

#[test]
fn test_output_has_no_layout_streams() {
    let doc = parse_document(&compressed_pdf("Report", &["p1", "p2"])).unwrap();
    let bytes = serialize_document(&merge_documents(&[doc]).unwrap()).unwrap();
    let text = String::from_utf8_lossy(&bytes);

    assert!(text.starts_with("%PDF-1.5\n"));
    assert!(!text.contains("/ObjStm"));
    assert!(!text.contains("/XRef"));
    assert!(text.contains("\nxref\n0 "));
    assert!(text.ends_with("%%EOF\n"));
}
