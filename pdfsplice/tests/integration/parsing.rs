//! Parsing, repair and structural errors.

use pdfsplice::error::PdfSpliceError;
use pdfsplice::{Limits, Merger, ParseOptions, Parser, parse_document};
use rstest::rstest;

use crate::common::{
    PdfBuilder, classic_pdf, compressed_pdf, damage_startxref, page_texts,
    replace_xref_with_stream,
};

fn strict(bytes: &[u8]) -> pdfsplice::Result<pdfsplice::Document> {
    Parser::new(ParseOptions::strict()).parse(bytes)
}

#[rstest]
#[case::classic(classic_pdf("Doc", &["one", "two", "three"]), "1.4")]
#[case::object_streams(compressed_pdf("Doc", &["one", "two", "three"]), "1.5")]
fn test_parse_both_xref_flavors(#[case] bytes: Vec<u8>, #[case] version: &str) {
    let doc = strict(&bytes).unwrap();

    assert_eq!(doc.version(), version);
    assert_eq!(doc.page_count(), 3);
    assert_eq!(page_texts(&doc), vec!["one", "two", "three"]);
    assert!(!doc.was_repaired());
    assert!(doc.info().is_some());
}

#[test]
fn test_damaged_xref_strict_vs_tolerant() {
    let bytes = damage_startxref(classic_pdf("Doc", &["one", "two"]));

    assert!(matches!(
        strict(&bytes),
        Err(PdfSpliceError::MalformedInput { .. })
    ));

    let doc = parse_document(&bytes).unwrap();
    assert!(doc.was_repaired());
    assert_eq!(page_texts(&doc), vec!["one", "two"]);
}

#[rstest]
#[case::empty(b"".to_vec())]
#[case::not_a_pdf(b"hello world, this is not a PDF".to_vec())]
#[case::bad_version(b"%PDF-x\n".to_vec())]
fn test_rejects_non_pdf(#[case] bytes: Vec<u8>) {
    assert!(matches!(
        parse_document(&bytes),
        Err(PdfSpliceError::MalformedInput { .. })
    ));
}

#[test]
fn test_cyclic_page_tree() {
    let bytes = PdfBuilder::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Pages /Parent 2 0 R /Kids [2 0 R] /Count 1 >>")
        .build(1);

    assert!(matches!(
        strict(&bytes),
        Err(PdfSpliceError::CyclicPageTree { .. })
    ));
    assert!(matches!(
        parse_document(&bytes),
        Err(PdfSpliceError::CyclicPageTree { .. })
    ));
}

#[test]
fn test_encrypted_input_rejected() {
    let bytes = PdfBuilder::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R >>")
        .trailer_entry("Encrypt", "<< /Filter /Standard /V 1 >>")
        .build(1);

    assert!(matches!(
        parse_document(&bytes),
        Err(PdfSpliceError::UnsupportedFeature { .. })
    ));
}

#[test]
fn test_dangling_reference_strict_vs_tolerant() {
    let bytes = PdfBuilder::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(3, "<< /Type /Page /Parent 2 0 R /Resources 50 0 R /Contents 4 0 R >>")
        .stream(4, "", b"dangling")
        .build(1);

    let strict_doc = strict(&bytes).unwrap();
    assert!(matches!(
        Merger::new().merge(&[strict_doc]),
        Err(PdfSpliceError::MissingObject { id: (50, 0) })
    ));

    let tolerant_doc = parse_document(&bytes).unwrap();
    let (merged, stats) = Merger::new()
        .merge_with_statistics(&[tolerant_doc])
        .unwrap();
    assert_eq!(stats.dangling_references, 1);
    assert_eq!(page_texts(&merged), vec!["dangling"]);
}

#[test]
fn test_nested_page_tree_inherits_attributes() {
    let bytes = PdfBuilder::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            "<< /Type /Pages /Kids [3 0 R 6 0 R] /Count 3 /MediaBox [0 0 300 300] >>",
        )
        .object(3, "<< /Type /Pages /Parent 2 0 R /Kids [4 0 R 5 0 R] /Count 2 /Rotate 90 >>")
        .object(4, "<< /Type /Page /Parent 3 0 R /Contents 7 0 R >>")
        .object(5, "<< /Type /Page /Parent 3 0 R /Contents 8 0 R >>")
        .object(6, "<< /Type /Page /Parent 2 0 R /Contents 9 0 R >>")
        .stream(7, "", b"first")
        .stream(8, "", b"second")
        .stream(9, "", b"third")
        .build(1);

    let doc = strict(&bytes).unwrap();
    assert_eq!(page_texts(&doc), vec!["first", "second", "third"]);

    let merged = pdfsplice::merge_documents(&[doc]).unwrap();
    let first = merged.get(merged.page_ids()[0]).unwrap();
    let first = first.as_dict().unwrap();
    assert!(first.has(b"MediaBox"));
    assert_eq!(first.get(b"Rotate").and_then(pdfsplice::Object::as_i64), Some(90));
    let third = merged.get(merged.page_ids()[2]).unwrap().as_dict().unwrap();
    assert!(!third.has(b"Rotate"));
}

#[test]
fn test_hostile_predictor_parameters() {
    let bytes = replace_xref_with_stream(
        classic_pdf("Doc", &["one"]),
        "/DecodeParms << /Predictor 12 /Colors 4611686018427387904 /Columns 4 >>",
        &[2, 0, 0, 0, 0, 0, 0, 0],
    );

    assert!(matches!(
        strict(&bytes),
        Err(PdfSpliceError::MalformedInput { .. })
    ));

    let doc = parse_document(&bytes).unwrap();
    assert!(doc.was_repaired());
    assert_eq!(page_texts(&doc), vec!["one"]);
}

#[test]
fn test_xref_stream_inflating_past_byte_limit() {
    let bytes = replace_xref_with_stream(classic_pdf("Doc", &["one"]), "", &vec![0u8; 1 << 20]);
    let limits = Limits {
        max_input_bytes: 64 * 1024,
        ..Limits::default()
    };
    assert!(bytes.len() < limits.max_input_bytes);

    let options = ParseOptions {
        tolerant: true,
        limits,
    };
    let err = Parser::new(options).parse(&bytes).unwrap_err();

    assert!(matches!(
        err,
        PdfSpliceError::PageLimitExceeded {
            what: "bytes",
            limit: 65536,
            ..
        }
    ));
}
