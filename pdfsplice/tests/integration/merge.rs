//! Merging files built with both cross-reference flavors.

use pdfsplice::error::PdfSpliceError;
use pdfsplice::{
    DocumentInfo, Limits, Merger, Metadata, merge_documents, parse_document, serialize_document,
};

use crate::common::{classic_pdf, compressed_pdf, page_texts};

#[test]
fn test_merge_classic_and_compressed() {
    let a = parse_document(&classic_pdf("First", &["a1", "a2"])).unwrap();
    let b = parse_document(&compressed_pdf("Second", &["b1", "b2", "b3"])).unwrap();

    let merged = merge_documents(&[a, b]).unwrap();

    assert_eq!(merged.page_count(), 5);
    assert_eq!(page_texts(&merged), vec!["a1", "a2", "b1", "b2", "b3"]);
    assert_eq!(merged.version(), "1.5");
}

#[test]
fn test_merge_same_document_twice() {
    let doc = parse_document(&classic_pdf("Twice", &["x", "y"])).unwrap();

    let merged = merge_documents(&[doc.clone(), doc]).unwrap();

    assert_eq!(page_texts(&merged), vec!["x", "y", "x", "y"]);
    let pages = merged.page_ids();
    let mut unique = pages.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), pages.len());
}

#[test]
fn test_merged_output_survives_strict_reparse() {
    let a = parse_document(&compressed_pdf("First", &["a1"])).unwrap();
    let b = parse_document(&classic_pdf("Second", &["b1", "b2"])).unwrap();
    let bytes = serialize_document(&merge_documents(&[a, b]).unwrap()).unwrap();

    let reparsed = pdfsplice::Parser::new(pdfsplice::ParseOptions::strict())
        .parse(&bytes)
        .unwrap();
    assert!(!reparsed.was_repaired());
    assert_eq!(page_texts(&reparsed), vec!["a1", "b1", "b2"]);
}

#[test]
fn test_metadata_inherited_and_overridden() {
    let a = parse_document(&classic_pdf("First", &["a1"])).unwrap();
    let b = parse_document(&classic_pdf("Second", &["b1"])).unwrap();

    let merged = merge_documents(&[a.clone(), b.clone()]).unwrap();
    let info = DocumentInfo::from_document(&merged, None);
    assert_eq!(info.title.as_deref(), Some("First"));
    assert_eq!(info.author.as_deref(), Some("Tests"));
    assert_eq!(info.producer.as_deref(), Some("pdfsplice"));

    let metadata = Metadata::new(Some("Résumé".to_string()), None, Some("Q3".to_string()), None);
    let merged = Merger::new().with_metadata(metadata).merge(&[a, b]).unwrap();
    let reparsed = parse_document(&serialize_document(&merged).unwrap()).unwrap();
    let info = DocumentInfo::from_document(&reparsed, None);
    assert_eq!(info.title.as_deref(), Some("Résumé"));
    assert_eq!(info.author.as_deref(), Some("Tests"));
    assert_eq!(info.subject.as_deref(), Some("Q3"));
}

#[test]
fn test_merge_statistics() {
    let a = parse_document(&classic_pdf("First", &["a1", "a2"])).unwrap();
    let b = parse_document(&classic_pdf("Second", &["b1"])).unwrap();

    let (_, stats) = Merger::new().merge_with_statistics(&[a, b]).unwrap();

    assert_eq!(stats.files_merged, 2);
    assert_eq!(stats.total_pages, 3);
    assert_eq!(stats.dangling_references, 0);
}

#[test]
fn test_merge_rejects_empty_input() {
    assert!(matches!(merge_documents(&[]), Err(PdfSpliceError::EmptyInput)));
}

#[test]
fn test_merge_page_limit() {
    let a = parse_document(&classic_pdf("First", &["a1", "a2"])).unwrap();
    let b = parse_document(&classic_pdf("Second", &["b1", "b2"])).unwrap();
    let limits = Limits {
        max_pages: 3,
        ..Limits::default()
    };

    let err = Merger::new().with_limits(limits).merge(&[a, b]).unwrap_err();

    assert!(matches!(
        err,
        PdfSpliceError::PageLimitExceeded {
            limit: 3,
            requested: 4,
            ..
        }
    ));
}
