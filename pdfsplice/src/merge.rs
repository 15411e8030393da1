//! Document concatenation.
//!
//! Every page of every source is copied, in source order, under one flat
//! page root. Each source gets its own two-pass copy so nothing is shared
//! between inputs and output.

use std::time::{Duration, Instant};

use log::info;

use crate::cancel::Cancellation;
use crate::config::{Limits, Metadata};
use crate::copy::{DocumentBuilder, detach_dictionary};
use crate::document::Document;
use crate::error::{PdfSpliceError, Result};
use crate::object::{Dictionary, Object};

/// Info keys carried over from the first source document.
const INHERITED_INFO_KEYS: [&[u8]; 5] = [b"Title", b"Author", b"Subject", b"Keywords", b"Creator"];

/// Value written to `/Producer` in every output.
pub const PRODUCER: &str = "pdfsplice";

/// Statistics about a merge operation.
#[derive(Debug, Clone, Default)]
pub struct MergeStatistics {
    /// Number of documents merged.
    pub files_merged: usize,

    /// Total number of pages in the merged document.
    pub total_pages: usize,

    /// Objects copied into the output.
    pub objects_copied: usize,

    /// Dangling references rewritten to `null`.
    pub dangling_references: usize,

    /// Time taken by the copy.
    pub merge_time: Duration,
}

/// Combines documents into one.
///
/// # Examples
///
/// ```no_run
/// use pdfsplice::{Merger, Metadata};
///
/// # fn example(a: pdfsplice::Document, b: pdfsplice::Document) -> pdfsplice::Result<()> {
/// let merger = Merger::new().with_metadata(Metadata {
///     title: Some("Combined".to_string()),
///     ..Metadata::default()
/// });
/// let merged = merger.merge(&[a, b])?;
/// println!("{} pages", merged.page_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Merger {
    limits: Limits,
    cancel: Cancellation,
    metadata: Metadata,
}

impl Merger {
    /// Create a merger with default limits and no metadata overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `limits` to the output.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Observe `cancel` between copy steps.
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Override Info fields of the output.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Merge `documents` in order.
    ///
    /// # Errors
    ///
    /// - [`PdfSpliceError::EmptyInput`] if `documents` is empty
    /// - [`PdfSpliceError::PageLimitExceeded`] if the output would exceed
    ///   the page or object ceiling
    /// - [`PdfSpliceError::Cancelled`] if cancelled
    /// - [`PdfSpliceError::MissingObject`] for a dangling reference in a
    ///   strictly parsed source
    pub fn merge(&self, documents: &[Document]) -> Result<Document> {
        self.merge_with_statistics(documents).map(|(doc, _)| doc)
    }

    /// Merge `documents` and report what was copied.
    pub fn merge_with_statistics(
        &self,
        documents: &[Document],
    ) -> Result<(Document, MergeStatistics)> {
        let start = Instant::now();
        let Some(first) = documents.first() else {
            return Err(PdfSpliceError::EmptyInput);
        };

        // Check the page ceiling before copying anything.
        let total_pages: usize = documents.iter().map(Document::page_count).sum();
        if total_pages > self.limits.max_pages {
            return Err(PdfSpliceError::PageLimitExceeded {
                what: "pages",
                limit: self.limits.max_pages,
                requested: total_pages,
            });
        }

        let mut builder = DocumentBuilder::new(&self.limits, &self.cancel);
        for doc in documents {
            let indices: Vec<usize> = (0..doc.page_count()).collect();
            builder.append_pages(doc, &indices)?;
        }

        let copy_stats = builder.stats();
        let page_count = builder.page_count();
        let merged = builder.finish(Some(self.output_info(first)))?;

        let statistics = MergeStatistics {
            files_merged: documents.len(),
            total_pages: page_count,
            objects_copied: copy_stats.objects,
            dangling_references: copy_stats.dangling,
            merge_time: start.elapsed(),
        };
        info!(
            "Merged {} document(s) into {} page(s), {} object(s) in {:?}",
            statistics.files_merged,
            statistics.total_pages,
            statistics.objects_copied,
            statistics.merge_time
        );
        Ok((merged, statistics))
    }

    /// Info of the first source, overridden by the configured metadata.
    fn output_info(&self, first: &Document) -> Dictionary {
        let mut info = Dictionary::new();
        if let Some(source_info) = first.info() {
            let detached = detach_dictionary(first, source_info);
            for key in INHERITED_INFO_KEYS {
                if let Some(value) = detached.get(key) {
                    info.set(key, value.clone());
                }
            }
        }
        for (key, value) in self.metadata.entries() {
            if let Some(value) = value {
                info.set(key, Object::text(value));
            }
        }
        info.set("Producer", Object::text(PRODUCER));
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary;
    use crate::object::{ObjectId, Stream};
    use std::collections::BTreeMap;

    fn document(version: &str, contents: &[&str], title: Option<&str>) -> Document {
        let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
        let mut kids = Vec::new();
        let mut next = 10;
        for text in contents {
            let page_id = (next, 0);
            let content_id = (next + 1, 0);
            next += 2;
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
                Object::Stream(Stream::new(Dictionary::new(), text.as_bytes().to_vec())),
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
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(595), Object::Integer(842)],
            }),
        );
        let mut trailer = dictionary! { "Root" => (1, 0) };
        if let Some(title) = title {
            objects.insert(
                (3, 0),
                Object::Dictionary(dictionary! {
                    "Title" => Object::string_literal(title),
                    "Producer" => Object::string_literal("other tool"),
                }),
            );
            trailer.set("Info", (3, 0));
        }
        Document::from_objects(version, objects, trailer).unwrap()
    }

    #[test]
    fn test_merge_preserves_order() {
        let a = document("1.4", &["a1", "a2"], None);
        let b = document("1.6", &["b1", "b2", "b3"], None);
        let merged = Merger::new().merge(&[a, b]).unwrap();

        assert_eq!(merged.page_count(), 5);
        let contents: Vec<Vec<u8>> = (0..5).map(|i| merged.page_contents(i).unwrap()).collect();
        assert_eq!(
            contents,
            vec![
                b"a1".to_vec(),
                b"a2".to_vec(),
                b"b1".to_vec(),
                b"b2".to_vec(),
                b"b3".to_vec()
            ]
        );
        assert_eq!(merged.version(), "1.6");
    }

    #[test]
    fn test_inherited_media_box_materialized() {
        let merged = Merger::new()
            .merge(&[document("1.4", &["x"], None)])
            .unwrap();
        let page = merged.get(merged.page_ids()[0]).unwrap().as_dict().unwrap();
        assert!(page.has(b"MediaBox"));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            Merger::new().merge(&[]),
            Err(PdfSpliceError::EmptyInput)
        ));
    }

    #[test]
    fn test_page_limit_checked_up_front() {
        let docs = [
            document("1.4", &["a", "b"], None),
            document("1.4", &["c", "d"], None),
        ];
        let merger = Merger::new().with_limits(Limits {
            max_pages: 3,
            ..Limits::default()
        });
        assert!(matches!(
            merger.merge(&docs),
            Err(PdfSpliceError::PageLimitExceeded { what: "pages", limit: 3, requested: 4 })
        ));
    }

    #[test]
    fn test_cancelled_merge() {
        let cancel = Cancellation::new();
        cancel.cancel();
        let merger = Merger::new().with_cancellation(cancel);
        assert!(matches!(
            merger.merge(&[document("1.4", &["a"], None)]),
            Err(PdfSpliceError::Cancelled)
        ));
    }

    #[test]
    fn test_info_from_first_document_with_overrides() {
        let a = document("1.4", &["a"], Some("First"));
        let b = document("1.4", &["b"], Some("Second"));

        let merged = Merger::new().merge(&[a.clone(), b.clone()]).unwrap();
        let info = merged.info().unwrap();
        assert_eq!(info.get(b"Title").and_then(Object::as_str_bytes), Some(&b"First"[..]));
        assert_eq!(
            info.get(b"Producer").and_then(Object::as_str_bytes),
            Some(PRODUCER.as_bytes())
        );

        let merger = Merger::new().with_metadata(Metadata {
            title: Some("Override".to_string()),
            author: Some("Me".to_string()),
            ..Metadata::default()
        });
        let merged = merger.merge(&[a, b]).unwrap();
        let info = merged.info().unwrap();
        assert_eq!(info.get(b"Title").and_then(Object::as_str_bytes), Some(&b"Override"[..]));
        assert_eq!(info.get(b"Author").and_then(Object::as_str_bytes), Some(&b"Me"[..]));
    }

    #[test]
    fn test_statistics() {
        let docs = [document("1.4", &["a"], None), document("1.4", &["b", "c"], None)];
        let (_, stats) = Merger::new().merge_with_statistics(&docs).unwrap();
        assert_eq!(stats.files_merged, 2);
        assert_eq!(stats.total_pages, 3);
        // One page object and one content stream per page.
        assert_eq!(stats.objects_copied, 6);
        assert_eq!(stats.dangling_references, 0);
    }
}
