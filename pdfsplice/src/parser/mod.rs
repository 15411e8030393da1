//! PDF parsing.
//!
//! [`Parser`] turns raw bytes into a [`Document`]: it checks the header,
//! follows the cross-reference chain from `startxref`, builds a lazy object
//! index and resolves the page tree. In tolerant mode a broken chain, or an
//! index that does not lead to a usable catalog, triggers one rebuild of
//! the index by scanning the file.

pub(crate) mod filters;
pub(crate) mod lexer;
pub(crate) mod objstm;
pub(crate) mod repair;
pub(crate) mod xref;

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, warn};

use crate::cancel::Cancellation;
use crate::config::ParseOptions;
use crate::document::{Document, DocumentParts, Location, Slot};
use crate::error::{ErrorCategory, PdfSpliceError, Result};
use crate::object::{Dictionary, ObjectId};

use lexer::{Lexer, find};
use xref::XrefEntry;

/// The `%PDF-` marker must start within this many bytes.
const HEADER_WINDOW: usize = 1024;

/// Configurable PDF parser.
///
/// # Examples
///
/// ```no_run
/// use pdfsplice::{ParseOptions, Parser};
///
/// # fn example(bytes: &[u8]) -> pdfsplice::Result<()> {
/// let doc = Parser::new(ParseOptions::strict()).parse(bytes)?;
/// println!("{} pages", doc.page_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Parser {
    options: ParseOptions,
    cancel: Cancellation,
}

impl Parser {
    /// Create a parser with the given options.
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            cancel: Cancellation::new(),
        }
    }

    /// Observe `cancel` while resolving the page tree.
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// The options in effect.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse a complete PDF file held in memory.
    ///
    /// # Errors
    ///
    /// - [`PdfSpliceError::MalformedInput`] for a missing header or an
    ///   unusable cross-reference chain (strict mode, or when the scan also
    ///   fails)
    /// - [`PdfSpliceError::TruncatedInput`] when input ends mid-structure
    /// - [`PdfSpliceError::UnsupportedFeature`] for encrypted files
    /// - [`PdfSpliceError::PageLimitExceeded`] past the configured limits
    /// - page tree errors from [`pages::walk`](crate::pages::walk)
    pub fn parse(&self, bytes: &[u8]) -> Result<Document> {
        self.parse_shared(Arc::from(bytes))
    }

    /// Parse a file whose bytes are already shared.
    pub fn parse_shared(&self, bytes: Arc<[u8]>) -> Result<Document> {
        let limits = &self.options.limits;
        if bytes.len() > limits.max_input_bytes {
            return Err(PdfSpliceError::PageLimitExceeded {
                what: "bytes",
                limit: limits.max_input_bytes,
                requested: bytes.len(),
            });
        }

        let version = read_header(&bytes)?;
        debug!("PDF header version {version}, {} bytes", bytes.len());

        match self.parse_indexed(&bytes, &version) {
            Ok(doc) => Ok(doc),
            Err(err) if self.options.tolerant && should_repair(&err) => {
                warn!("Cross-reference data unusable ({err}); rebuilding index by scanning the file");
                let recovered =
                    repair::rebuild_index(&bytes, self.options.limits.max_input_bytes)?;
                self.finish(
                    &version,
                    recovered.trailer,
                    recovered.slots,
                    Arc::clone(&bytes),
                    true,
                )
            }
            Err(err) => Err(err),
        }
    }

    fn parse_indexed(&self, bytes: &Arc<[u8]>, version: &str) -> Result<Document> {
        let start = xref::find_startxref(bytes)?;
        let max_decoded = self.options.limits.max_input_bytes;
        let table = xref::load_xref_chain(bytes, start, max_decoded)?;

        let mut slots = BTreeMap::new();
        for (number, entry) in &table.entries {
            let (id, location): (ObjectId, Location) = match *entry {
                XrefEntry::Free => continue,
                XrefEntry::InUse { offset, generation } => {
                    ((*number, generation), Location::Offset(offset))
                }
                XrefEntry::Compressed { container, index } => {
                    ((*number, 0), Location::Compressed { container, index })
                }
            };
            slots.insert(id, Slot::lazy(location));
        }

        if self.options.tolerant {
            verify_offsets(bytes, &slots)?;
        }

        self.finish(version, table.trailer, slots, Arc::clone(bytes), false)
    }

    fn finish(
        &self,
        version: &str,
        trailer: Dictionary,
        slots: BTreeMap<ObjectId, Slot>,
        source: Arc<[u8]>,
        repaired: bool,
    ) -> Result<Document> {
        if trailer.has(b"Encrypt") {
            return Err(PdfSpliceError::unsupported("encryption"));
        }
        let limits = &self.options.limits;
        if slots.len() > limits.max_objects {
            return Err(PdfSpliceError::PageLimitExceeded {
                what: "objects",
                limit: limits.max_objects,
                requested: slots.len(),
            });
        }

        Document::from_parts(
            DocumentParts {
                version: version.to_string(),
                trailer,
                slots,
                source: Some(source),
                tolerant: self.options.tolerant,
                repaired,
            },
            limits,
            &self.cancel,
        )
    }
}

/// Input damage worth a scan. Encryption and resource limits are not.
fn should_repair(err: &PdfSpliceError) -> bool {
    matches!(err.category(), ErrorCategory::Input)
        && !matches!(err, PdfSpliceError::UnsupportedFeature { .. })
}

/// Read the version from `%PDF-x.y` within the header window.
fn read_header(bytes: &[u8]) -> Result<String> {
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    let Some(at) = find(window, b"%PDF-", 0) else {
        return Err(PdfSpliceError::malformed(0, "missing '%PDF-' header"));
    };
    let digits = &bytes[at + 5..];
    let len = digits
        .iter()
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .count();
    let version = std::str::from_utf8(&digits[..len]).unwrap_or_default();
    let valid = matches!(version.split_once('.'), Some((major, minor)) if !major.is_empty() && !minor.is_empty());
    if !valid {
        return Err(PdfSpliceError::malformed(at + 5, "invalid PDF version in header"));
    }
    Ok(version.to_string())
}

/// Cheap check that every offset entry lands on the header it promises.
fn verify_offsets(bytes: &[u8], slots: &BTreeMap<ObjectId, Slot>) -> Result<()> {
    for (id, slot) in slots {
        let Slot::Lazy {
            location: Location::Offset(offset),
            ..
        } = slot
        else {
            continue;
        };
        let found = Lexer::new(bytes, *offset).read_object_header();
        if found.map(|found| found.0) != Some(id.0) {
            return Err(PdfSpliceError::malformed(
                *offset,
                format!("xref entry for object {} {} does not point at its header", id.0, id.1),
            ));
        }
    }
    Ok(())
}
