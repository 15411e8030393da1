//! PDF loading.
//!
//! Files are read with tokio and parsed on the blocking pool, so several
//! inputs can be loaded concurrently without stalling the runtime.
//!
//! # Examples
//!
//! ```no_run
//! use pdfsplice::io::PdfReader;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let paths = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
//! let (results, stats) = reader.load_all(&paths, 4).await;
//! println!("{} of {} loaded", stats.success_count, results.len());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use log::debug;

use crate::cancel::Cancellation;
use crate::config::ParseOptions;
use crate::document::Document;
use crate::error::{PdfSpliceError, Result};
use crate::parser::Parser;

use super::format_file_size;

/// A loaded PDF document with metadata.
#[derive(Debug)]
pub struct LoadedPdf {
    /// The parsed document.
    pub document: Document,

    /// Path to the source file.
    pub path: PathBuf,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Time taken to read and parse the file.
    pub load_time: Duration,

    /// File size in bytes.
    pub file_size: u64,
}

/// Result of a load operation (success or failure).
pub type LoadResult = Result<LoadedPdf>;

/// Statistics for a batch load operation.
#[derive(Debug, Clone, Default)]
pub struct LoadStatistics {
    /// Number of PDFs successfully loaded.
    pub success_count: usize,

    /// Number of PDFs that failed to load.
    pub failure_count: usize,

    /// Number of PDFs whose index had to be rebuilt.
    pub repaired_count: usize,

    /// Total time taken for all loads.
    pub total_time: Duration,

    /// Average time per successful load.
    pub average_time: Duration,

    /// Total size of successfully loaded files.
    pub total_size: u64,

    /// Total number of pages loaded.
    pub total_pages: usize,
}

impl LoadStatistics {
    fn from_results(results: &[LoadResult], total_time: Duration) -> Self {
        let mut stats = Self {
            total_time,
            ..Self::default()
        };
        let mut total_load_time = Duration::ZERO;

        for result in results {
            match result {
                Ok(loaded) => {
                    stats.success_count += 1;
                    stats.total_size += loaded.file_size;
                    stats.total_pages += loaded.page_count;
                    total_load_time += loaded.load_time;
                    if loaded.document.was_repaired() {
                        stats.repaired_count += 1;
                    }
                }
                Err(_) => stats.failure_count += 1,
            }
        }

        if stats.success_count > 0 {
            stats.average_time = total_load_time / stats.success_count as u32;
        }
        stats
    }

    /// Format total size as human-readable string.
    pub fn format_total_size(&self) -> String {
        format_file_size(self.total_size)
    }
}

/// Loads PDF files from disk.
#[derive(Debug, Clone, Default)]
pub struct PdfReader {
    options: ParseOptions,
    cancel: Cancellation,
}

impl PdfReader {
    /// Create a reader with default (tolerant) parse options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reader with the given parse options.
    pub fn with_options(options: ParseOptions) -> Self {
        Self {
            options,
            cancel: Cancellation::new(),
        }
    }

    /// Observe `cancel` while parsing.
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    /// Load a single PDF document.
    ///
    /// # Errors
    ///
    /// - [`PdfSpliceError::FileNotFound`] if `path` does not exist
    /// - [`PdfSpliceError::FailedToRead`] for other I/O failures
    /// - any parse error from [`Parser::parse`]
    pub async fn load(&self, path: &Path) -> Result<LoadedPdf> {
        let start = Instant::now();
        let path = path.to_path_buf();

        let bytes = tokio::fs::read(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                PdfSpliceError::FileNotFound { path: path.clone() }
            } else {
                PdfSpliceError::FailedToRead {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let file_size = bytes.len() as u64;

        let parser = Parser::new(self.options.clone()).with_cancellation(self.cancel.clone());
        let bytes: Arc<[u8]> = Arc::from(bytes);
        let document = tokio::task::spawn_blocking(move || parser.parse_shared(bytes))
            .await
            .map_err(|err| PdfSpliceError::other(format!("parser task failed: {err}")))??;

        let load_time = start.elapsed();
        debug!(
            "Loaded {} ({} pages) in {load_time:?}",
            path.display(),
            document.page_count()
        );

        Ok(LoadedPdf {
            page_count: document.page_count(),
            document,
            path,
            load_time,
            file_size,
        })
    }

    /// Load multiple PDF documents with at most `workers` in flight.
    ///
    /// Results are returned in the order of `paths`.
    pub async fn load_parallel(&self, paths: &[PathBuf], workers: usize) -> Vec<LoadResult> {
        let tasks = paths.iter().enumerate().map(|(idx, path)| async move {
            (idx, self.load(path).await)
        });

        let mut indexed: Vec<(usize, LoadResult)> = stream::iter(tasks)
            .buffer_unordered(workers.max(1))
            .collect()
            .await;
        indexed.sort_by_key(|(idx, _)| *idx);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    /// Load all PDFs and report aggregate statistics.
    pub async fn load_all(
        &self,
        paths: &[PathBuf],
        max_workers: usize,
    ) -> (Vec<LoadResult>, LoadStatistics) {
        let start = Instant::now();
        let results = self.load_parallel(paths, max_workers).await;
        let stats = LoadStatistics::from_results(&results, start.elapsed());
        (results, stats)
    }
}
