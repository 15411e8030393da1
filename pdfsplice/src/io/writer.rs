//! PDF saving.
//!
//! Writes are atomic by default: the document is serialized into a
//! temporary sibling file which is renamed over the destination once
//! complete. A failed write leaves no partial output behind.
//!
//! # Examples
//!
//! ```no_run
//! use pdfsplice::io::PdfWriter;
//! use std::path::Path;
//!
//! # async fn example(doc: pdfsplice::Document) -> Result<(), Box<dyn std::error::Error>> {
//! let writer = PdfWriter::new();
//! writer.save(&doc, Path::new("output.pdf")).await?;
//! # Ok(())
//! # }
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::task;

use crate::document::Document;
use crate::error::{PdfSpliceError, Result};
use crate::writer::serialize_document;

use super::format_file_size;

/// Options for writing PDF files.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Write to a temporary file, then rename.
    pub atomic: bool,

    /// Buffer size for writing (in bytes).
    pub buffer_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            atomic: true,
            buffer_size: 64 * 1024,
        }
    }
}

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to serialize and write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// Saves documents to disk.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    options: WriteOptions,
}

impl PdfWriter {
    /// Create a writer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with custom options.
    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Create a writer that writes the destination in place.
    pub fn non_atomic() -> Self {
        Self::with_options(WriteOptions {
            atomic: false,
            ..WriteOptions::default()
        })
    }

    /// Save a document to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// - [`PdfSpliceError::FailedToCreateOutput`] if the file cannot be created
    /// - [`PdfSpliceError::Write`] if writing or renaming fails
    pub async fn save(&self, doc: &Document, path: &Path) -> Result<()> {
        self.save_with_stats(doc, path).await.map(|_| ())
    }

    /// Save a document and report what was written.
    ///
    /// The document is serialized on the calling task. Only the bytes move
    /// to the blocking pool for the file write.
    pub async fn save_with_stats(&self, doc: &Document, path: &Path) -> Result<WriteStatistics> {
        let start = Instant::now();
        let bytes = serialize_document(doc)?;

        let path = path.to_path_buf();
        let options = self.options.clone();
        task::spawn_blocking(move || write_file(&bytes, &path, &options, start))
            .await
            .map_err(|e| PdfSpliceError::other(format!("Write task failed: {e}")))?
    }

    /// Save several documents as one unit.
    ///
    /// Files already at the destinations are moved aside first. If any save
    /// fails, outputs written by this call are removed and the moved files
    /// are put back, so the directory ends up as it was before the call.
    pub async fn save_all(&self, outputs: &[(Document, PathBuf)]) -> Result<Vec<WriteStatistics>> {
        let mut written = Vec::with_capacity(outputs.len());
        let mut backups = Vec::new();
        for (doc, path) in outputs {
            let result = match move_aside(path).await {
                Ok(backup) => {
                    backups.extend(backup.map(|backup| (backup, path.clone())));
                    self.save_with_stats(doc, path).await
                }
                Err(err) => Err(err),
            };
            match result {
                Ok(stats) => written.push(stats),
                Err(err) => {
                    self.roll_back(&written, &backups).await;
                    return Err(err);
                }
            }
        }

        for (backup, _) in &backups {
            if let Err(err) = self.remove_if_exists(backup).await {
                warn!("Could not remove {}: {err}", backup.display());
            }
        }
        Ok(written)
    }

    async fn roll_back(&self, written: &[WriteStatistics], backups: &[(PathBuf, PathBuf)]) {
        for stats in written {
            if let Err(err) = self.remove_if_exists(&stats.output_path).await {
                warn!("Could not remove {}: {err}", stats.output_path.display());
            }
        }
        for (backup, original) in backups {
            if let Err(err) = tokio::fs::rename(backup, original).await {
                warn!(
                    "Could not restore {} from {}: {err}",
                    original.display(),
                    backup.display()
                );
            }
        }
    }

    /// Check that the parent directory of `path` exists.
    ///
    /// # Errors
    ///
    /// [`PdfSpliceError::InvalidConfig`] naming the missing directory.
    pub async fn can_write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            let is_dir = tokio::fs::metadata(parent)
                .await
                .map(|metadata| metadata.is_dir())
                .unwrap_or(false);
            if !is_dir {
                return Err(PdfSpliceError::invalid_config(format!(
                    "Output directory does not exist: {}",
                    parent.display()
                )));
            }
        }
        Ok(())
    }

    /// Remove `path` if it exists.
    pub async fn remove_if_exists(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn write_file(
    bytes: &[u8],
    path: &Path,
    options: &WriteOptions,
    start: Instant,
) -> Result<WriteStatistics> {
    let write_path = if options.atomic {
        temp_path(path)
    } else {
        path.to_path_buf()
    };

    let result = write_to(bytes, &write_path, options.buffer_size).and_then(|file_size| {
        if options.atomic {
            std::fs::rename(&write_path, path)?;
        }
        Ok(file_size)
    });

    let file_size = match result {
        Ok(file_size) => file_size,
        Err(err) => {
            let _ = std::fs::remove_file(&write_path);
            return Err(err);
        }
    };

    let write_time = start.elapsed();
    debug!(
        "Wrote {} ({}) in {write_time:?}",
        path.display(),
        format_file_size(file_size)
    );
    Ok(WriteStatistics {
        write_time,
        file_size,
        output_path: path.to_path_buf(),
    })
}

fn write_to(bytes: &[u8], path: &Path, buffer_size: usize) -> Result<u64> {
    let file = std::fs::File::create(path).map_err(|source| PdfSpliceError::FailedToCreateOutput {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = std::io::BufWriter::with_capacity(buffer_size, file);
    writer.write_all(bytes)?;
    let file = writer.into_inner().map_err(|err| err.into_error())?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

/// Rename an existing file at `path` to its backup name. `None` when there
/// was nothing to move.
async fn move_aside(path: &Path) -> Result<Option<PathBuf>> {
    let backup = sibling_path(path, "pdfsplice-bak");
    match tokio::fs::rename(path, &backup).await {
        Ok(()) => Ok(Some(backup)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// `dir/.name.pdfsplice-tmp` next to the destination.
fn temp_path(path: &Path) -> PathBuf {
    sibling_path(path, "pdfsplice-tmp")
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{name}.{suffix}"))
}
