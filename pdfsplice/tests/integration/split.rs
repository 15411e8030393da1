//! Splitting into page ranges.

use pdfsplice::error::PdfSpliceError;
use pdfsplice::ranges::with_remaining;
use pdfsplice::{
    DocumentInfo, PageRange, merge_documents, parse_document, parse_range_spec,
    serialize_document, split_document,
};

use crate::common::{compressed_pdf, page_texts};

const SIX: [&str; 6] = ["p1", "p2", "p3", "p4", "p5", "p6"];

#[test]
fn test_split_explicit_ranges() {
    let doc = parse_document(&compressed_pdf("Report", &SIX)).unwrap();
    let ranges = parse_range_spec("1-2, 5", doc.page_count()).unwrap();

    let parts = split_document(&doc, &ranges).unwrap();

    assert_eq!(parts.len(), 2);
    assert_eq!(page_texts(&parts[0]), vec!["p1", "p2"]);
    assert_eq!(page_texts(&parts[1]), vec!["p5"]);
}

#[test]
fn test_split_with_remaining_pages() {
    let doc = parse_document(&compressed_pdf("Report", &SIX)).unwrap();
    let explicit = parse_range_spec("2-3", doc.page_count()).unwrap();
    let ranges = with_remaining(&explicit, doc.page_count());

    let parts = split_document(&doc, &ranges).unwrap();

    let texts: Vec<Vec<String>> = parts.iter().map(page_texts).collect();
    assert_eq!(
        texts,
        vec![
            vec!["p2".to_string(), "p3".to_string()],
            vec!["p1".to_string()],
            vec!["p4".to_string(), "p5".to_string(), "p6".to_string()],
        ]
    );
}

#[test]
fn test_split_every_page() {
    let doc = parse_document(&compressed_pdf("Report", &SIX)).unwrap();
    let ranges = parse_range_spec("", doc.page_count()).unwrap();

    let parts = split_document(&doc, &ranges).unwrap();

    assert_eq!(parts.len(), 6);
    assert!(parts.iter().all(|part| part.page_count() == 1));
}

#[test]
fn test_split_then_merge_restores_pages() {
    let doc = parse_document(&compressed_pdf("Report", &SIX)).unwrap();
    let ranges = parse_range_spec("1-3,4-6", doc.page_count()).unwrap();

    let parts = split_document(&doc, &ranges).unwrap();
    let rejoined = merge_documents(&parts).unwrap();

    assert_eq!(page_texts(&rejoined), page_texts(&doc));
}

#[test]
fn test_split_parts_keep_info() {
    let doc = parse_document(&compressed_pdf("Report", &SIX)).unwrap();
    let parts = split_document(&doc, &vec![PageRange::new(3, 4)]).unwrap();

    let reparsed = parse_document(&serialize_document(&parts[0]).unwrap()).unwrap();
    let info = DocumentInfo::from_document(&reparsed, None);
    assert_eq!(info.title.as_deref(), Some("Report"));
    assert_eq!(info.producer.as_deref(), Some("pdfsplice"));
    assert_eq!(page_texts(&reparsed), vec!["p3", "p4"]);
}

#[test]
fn test_split_out_of_bounds() {
    let doc = parse_document(&compressed_pdf("Report", &SIX)).unwrap();

    let err = split_document(&doc, &vec![PageRange::new(5, 9)]).unwrap_err();

    assert!(matches!(
        err,
        PdfSpliceError::RangeOutOfBounds {
            start: 5,
            end: 9,
            total: 6
        }
    ));
}

#[test]
fn test_range_spec_rejects_pages_past_end() {
    let doc = parse_document(&compressed_pdf("Report", &SIX)).unwrap();
    assert!(parse_range_spec("5-7", doc.page_count()).is_err());
}
