//! Terminal output for the command-line front end.
//!
//! # Examples
//!
//! ```no_run
//! use pdfsplice::output::OutputFormatter;
//!
//! let formatter = OutputFormatter::new(false, false);
//! formatter.info("Starting merge");
//! formatter.success("Merge completed");
//! ```

pub mod formatter;

pub use formatter::{MessageLevel, OutputFormatter};

use crate::inspect::DocumentInfo;
use crate::io::{LoadStatistics, WriteStatistics, format_file_size};

/// Display load statistics to the user.
pub fn display_load_statistics(formatter: &OutputFormatter, stats: &LoadStatistics) {
    if stats.failure_count > 0 {
        formatter.warning(&format!(
            "{} file(s) failed to load",
            stats.failure_count
        ));
    }
    if stats.repaired_count > 0 {
        formatter.warning(&format!(
            "{} file(s) had damaged cross-reference data and were recovered by scanning",
            stats.repaired_count
        ));
    }

    formatter.info(&format!(
        "Loaded {} file(s) in {:.2}s: {} pages, {}",
        stats.success_count,
        stats.total_time.as_secs_f64(),
        stats.total_pages,
        stats.format_total_size()
    ));
}

/// Display the files written by a split, one per line.
pub fn display_written_files(formatter: &OutputFormatter, written: &[WriteStatistics]) {
    for (index, stats) in written.iter().enumerate() {
        formatter.list_item(
            index + 1,
            &format!(
                "{} ({})",
                stats.output_path.display(),
                stats.format_file_size()
            ),
        );
    }
}

/// Display a document summary as text.
pub fn display_document_info(formatter: &OutputFormatter, info: &DocumentInfo) {
    formatter.field("Pages", &info.page_count.to_string());
    formatter.field("Version", &info.version);
    formatter.field("Objects", &info.object_count.to_string());
    if let Some(size) = info.file_size {
        formatter.field("Size", &format_file_size(size));
    }
    for (label, value) in info.metadata_fields() {
        formatter.field(label, value);
    }
    if info.repaired {
        formatter.warning("Cross-reference data was damaged; index rebuilt by scanning");
    }
}
