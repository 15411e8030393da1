//! Error types for pdfsplice.
//!
//! Every fallible operation in the crate returns [`PdfSpliceError`]. The
//! variants carry enough context (offending token, object id, byte offset)
//! for a caller to render a precise message without re-inspecting input.
//!
//! # Error Categories
//!
//! - **Input**: malformed, truncated, or unsupported PDF bytes
//! - **Structural**: page tree cycles, documents without pages
//! - **Validation**: bad range specifications, out-of-bounds ranges
//! - **Resource**: empty input lists, configured ceilings, cancellation
//! - **I/O**: reading sources and writing output

use std::io;
use std::path::PathBuf;

use crate::object::ObjectId;

/// Result type alias for pdfsplice operations.
pub type Result<T> = std::result::Result<T, PdfSpliceError>;

/// Broad grouping of [`PdfSpliceError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Problems with the PDF bytes themselves.
    Input,
    /// Problems with the document's page tree.
    Structural,
    /// Problems with caller-provided page ranges.
    Validation,
    /// Configured ceilings, empty inputs, cancellation.
    Resource,
    /// File system and stream failures.
    Io,
}

/// Main error type for pdfsplice operations.
#[derive(Debug, thiserror::Error)]
pub enum PdfSpliceError {
    /// The header, cross-reference data or trailer could not be read.
    #[error("Malformed PDF at byte {offset}: {details}")]
    MalformedInput {
        /// Byte offset where the problem was detected.
        offset: usize,
        /// What was expected or found.
        details: String,
    },

    /// The input ended in the middle of a structure.
    #[error("Unexpected end of input at byte {offset} while reading {context}")]
    TruncatedInput {
        /// Byte offset where input ran out.
        offset: usize,
        /// The structure being read.
        context: String,
    },

    /// The document uses a feature this engine does not handle.
    #[error("Unsupported PDF feature: {feature}")]
    UnsupportedFeature {
        /// Name of the feature (e.g. "encryption").
        feature: String,
    },

    /// A page tree node is reachable from itself through `/Kids`.
    #[error("Page tree contains a cycle through object {} {}", .id.0, .id.1)]
    CyclicPageTree {
        /// The node that was reached a second time.
        id: ObjectId,
    },

    /// The page tree resolved to zero pages.
    #[error("Document contains no pages")]
    EmptyDocument,

    /// A required object is absent from the document.
    #[error("Object {} {} R is not present in the document", .id.0, .id.1)]
    MissingObject {
        /// The unresolvable object id.
        id: ObjectId,
    },

    /// A token of a range specification is not a valid page range.
    #[error("Invalid page range '{token}': {reason}")]
    InvalidRange {
        /// The offending token, as written by the user.
        token: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A planned range does not fit the document.
    #[error("Page range {start}-{end} is out of bounds (document has {total} page(s))")]
    RangeOutOfBounds {
        /// First page of the range.
        start: usize,
        /// Last page of the range.
        end: usize,
        /// Page count of the document.
        total: usize,
    },

    /// No documents were given to merge.
    #[error("No input documents were provided")]
    EmptyInput,

    /// A configured ceiling would be exceeded.
    #[error("Limit exceeded: {requested} {what} requested, at most {limit} allowed")]
    PageLimitExceeded {
        /// What is being counted ("pages", "objects", "bytes").
        what: &'static str,
        /// The configured ceiling.
        limit: usize,
        /// The amount the operation needed.
        requested: usize,
    },

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// Serializing a document to its sink failed.
    #[error("Failed to write PDF output: {source}")]
    Write {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Input file was not found.
    #[error("File not found: {}", .path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Input file exists but could not be read.
    #[error("Failed to read {}\n  Reason: {source}", .path.display())]
    FailedToRead {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Output file could not be created or renamed into place.
    #[error("Failed to create output file: {}\n  Reason: {source}", .path.display())]
    FailedToCreateOutput {
        /// Path where output should be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Output file already exists and overwrite is not allowed.
    #[error(
        "Output file already exists: {}\n  Use --force to overwrite or choose a different output path",
        .path.display()
    )]
    OutputExists {
        /// Path to the existing output file.
        path: PathBuf,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<io::Error> for PdfSpliceError {
    fn from(err: io::Error) -> Self {
        Self::Write { source: err }
    }
}

impl From<anyhow::Error> for PdfSpliceError {
    fn from(err: anyhow::Error) -> Self {
        Self::invalid_config(err.to_string())
    }
}

impl PdfSpliceError {
    /// Create a MalformedInput error.
    pub fn malformed(offset: usize, details: impl Into<String>) -> Self {
        Self::MalformedInput {
            offset,
            details: details.into(),
        }
    }

    /// Create a TruncatedInput error.
    pub fn truncated(offset: usize, context: impl Into<String>) -> Self {
        Self::TruncatedInput {
            offset,
            context: context.into(),
        }
    }

    /// Create an UnsupportedFeature error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            feature: feature.into(),
        }
    }

    /// Create an InvalidRange error.
    pub fn invalid_range(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Create an OutputExists error.
    pub fn output_exists(path: PathBuf) -> Self {
        Self::OutputExists { path }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// The category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedInput { .. }
            | Self::TruncatedInput { .. }
            | Self::UnsupportedFeature { .. }
            | Self::MissingObject { .. } => ErrorCategory::Input,
            Self::CyclicPageTree { .. } | Self::EmptyDocument => ErrorCategory::Structural,
            Self::InvalidRange { .. } | Self::RangeOutOfBounds { .. } => {
                ErrorCategory::Validation
            }
            Self::EmptyInput
            | Self::PageLimitExceeded { .. }
            | Self::Cancelled
            | Self::InvalidConfig { .. }
            | Self::Other { .. } => ErrorCategory::Resource,
            Self::Write { .. }
            | Self::FileNotFound { .. }
            | Self::FailedToRead { .. }
            | Self::FailedToCreateOutput { .. }
            | Self::OutputExists { .. } => ErrorCategory::Io,
        }
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } | Self::FailedToRead { .. } => 2,
            Self::MalformedInput { .. }
            | Self::TruncatedInput { .. }
            | Self::UnsupportedFeature { .. }
            | Self::MissingObject { .. }
            | Self::CyclicPageTree { .. }
            | Self::EmptyDocument => 3,
            Self::OutputExists { .. } => 4,
            Self::Write { .. } | Self::FailedToCreateOutput { .. } => 5,
            Self::PageLimitExceeded { .. } => 6,
            Self::Cancelled => 130, // Standard exit code for SIGINT
            Self::InvalidRange { .. }
            | Self::RangeOutOfBounds { .. }
            | Self::EmptyInput
            | Self::InvalidConfig { .. }
            | Self::Other { .. } => 1,
        }
    }
}
