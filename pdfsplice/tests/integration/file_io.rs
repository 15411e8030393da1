//! The async file pipeline: load, merge, save, reload.

use pdfsplice::error::PdfSpliceError;
use pdfsplice::io::{PdfReader, PdfWriter};
use pdfsplice::{Merger, ParseOptions, parse_range_spec, split_document};
use std::path::PathBuf;
use tempfile::TempDir;

use crate::common::{classic_pdf, compressed_pdf, damage_startxref, page_texts, temp_output_path};

fn write_inputs(dir: &TempDir, files: &[(&str, Vec<u8>)]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|(name, bytes)| {
            let path = dir.path().join(name);
            std::fs::write(&path, bytes).unwrap();
            path
        })
        .collect()
}

#[tokio::test]
async fn test_load_merge_save_reload() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(
        &dir,
        &[
            ("a.pdf", classic_pdf("A", &["a1"])),
            ("b.pdf", compressed_pdf("B", &["b1", "b2"])),
            ("c.pdf", classic_pdf("C", &["c1"])),
        ],
    );

    let reader = PdfReader::new();
    let (results, stats) = reader.load_all(&inputs, 2).await;
    assert_eq!(stats.success_count, 3);
    assert_eq!(stats.total_pages, 4);

    let documents: Vec<_> = results.into_iter().map(|r| r.unwrap().document).collect();
    let merged = Merger::new().merge(&documents).unwrap();

    let output = temp_output_path();
    let written = PdfWriter::new().save_with_stats(&merged, &output).await.unwrap();
    assert!(written.file_size > 0);

    let reloaded = reader.load(&output).await.unwrap();
    assert_eq!(page_texts(&reloaded.document), vec!["a1", "b1", "b2", "c1"]);
}

#[tokio::test]
async fn test_missing_input_reported() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.pdf");

    let err = PdfReader::new().load(&missing).await.unwrap_err();

    assert!(matches!(err, PdfSpliceError::FileNotFound { .. }));
}

#[tokio::test]
async fn test_strict_reader_rejects_damage() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(
        &dir,
        &[("damaged.pdf", damage_startxref(classic_pdf("D", &["d1"])))],
    );

    let strict = PdfReader::with_options(ParseOptions::strict());
    assert!(strict.load(&inputs[0]).await.is_err());

    let loaded = PdfReader::new().load(&inputs[0]).await.unwrap();
    assert!(loaded.document.was_repaired());
}

#[tokio::test]
async fn test_split_files_written() {
    let dir = TempDir::new().unwrap();
    let inputs = write_inputs(&dir, &[("in.pdf", compressed_pdf("In", &["p1", "p2", "p3"]))]);

    let loaded = PdfReader::new().load(&inputs[0]).await.unwrap();
    let ranges = parse_range_spec("1-2,3", loaded.page_count).unwrap();
    let parts = split_document(&loaded.document, &ranges).unwrap();

    let outputs: Vec<_> = parts
        .into_iter()
        .zip(["first.pdf", "second.pdf"])
        .map(|(doc, name)| (doc, dir.path().join(name)))
        .collect();
    let written = PdfWriter::new().save_all(&outputs).await.unwrap();
    assert_eq!(written.len(), 2);

    let second = PdfReader::new().load(&dir.path().join("second.pdf")).await.unwrap();
    assert_eq!(page_texts(&second.document), vec!["p3"]);
}
