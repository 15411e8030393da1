//! pdfsplice - merge whole PDF documents and split them into page ranges.
//!
//! The library parses the PDF object graph (classic cross-reference tables,
//! cross-reference streams and object streams), resolves the page tree,
//! and writes consistent new documents that share nothing with their
//! sources:
//!
//! - [`merge_documents`] concatenates documents in order
//! - [`split_document`] extracts page ranges into separate documents
//! - [`parse_range_spec`] turns `"1-3,5"` into [`PageRange`]s
//! - [`serialize_document`] produces deterministic PDF bytes
//!
//! Damaged cross-reference data is repaired by scanning the file unless
//! strict parsing is requested.
//!
//! # Examples
//!
//! ```no_run
//! use pdfsplice::{merge_documents, parse_document, serialize_document};
//!
//! # fn example() -> pdfsplice::Result<()> {
//! let a = parse_document(&std::fs::read("a.pdf").unwrap())?;
//! let b = parse_document(&std::fs::read("b.pdf").unwrap())?;
//! let merged = merge_documents(&[a, b])?;
//! std::fs::write("merged.pdf", serialize_document(&merged)?).unwrap();
//! # Ok(())
//! # }
//! ```
//!
//! ```no_run
//! use pdfsplice::{parse_document, parse_range_spec, split_document};
//!
//! # fn example(bytes: &[u8]) -> pdfsplice::Result<()> {
//! let doc = parse_document(bytes)?;
//! let ranges = parse_range_spec("1-3, 5", doc.page_count())?;
//! let parts = split_document(&doc, &ranges)?;
//! assert_eq!(parts.len(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod config;
pub mod copy;
pub mod document;
pub mod error;
pub mod inspect;
pub mod io;
pub mod merge;
pub mod object;
pub mod output;
pub mod pages;
pub mod parser;
pub mod ranges;
pub mod split;
pub mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use cancel::Cancellation;
pub use config::{Config, Limits, Metadata, ParseOptions};
pub use document::Document;
pub use error::{PdfSpliceError, Result};
pub use inspect::DocumentInfo;
pub use merge::{MergeStatistics, Merger};
pub use object::{Dictionary, Object, ObjectId, Stream, StringFormat};
pub use parser::Parser;
pub use ranges::{PageRange, PlannedRanges, parse_range_spec};
pub use split::Splitter;
pub use writer::{serialize_document, write_document};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Parse a PDF held in memory with default (tolerant) options.
pub fn parse_document(bytes: &[u8]) -> Result<Document> {
    Parser::default().parse(bytes)
}

/// Concatenate `documents` with default limits.
pub fn merge_documents(documents: &[Document]) -> Result<Document> {
    Merger::new().merge(documents)
}

/// Extract each of `ranges` from `document` with default limits.
pub fn split_document(document: &Document, ranges: &PlannedRanges) -> Result<Vec<Document>> {
    Splitter::new().split(document, ranges)
}
