//! pdfsplice - merge whole PDF documents and split them into page ranges.

mod cli;

use clap::Parser;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process;

use crate::cli::Cli;
use pdfsplice::config::{Command, Config, InfoConfig, MergeConfig, OverwriteMode, SplitConfig};
use pdfsplice::error::{PdfSpliceError, Result};
use pdfsplice::io::{LoadedPdf, PdfReader, PdfWriter};
use pdfsplice::output::{
    OutputFormatter, display_document_info, display_load_statistics, display_written_files,
};
use pdfsplice::ranges::with_remaining;
use pdfsplice::{Cancellation, Document, DocumentInfo, Merger, PageRange, Splitter, parse_range_spec};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        process::exit(err.exit_code());
    }
}

/// Route `log` records to stderr. `RUST_LOG` overrides the flag-derived level.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Main application logic.
async fn run(cli: Cli) -> Result<()> {
    let config = cli.to_config()?;
    let formatter = OutputFormatter::from_config(&config);

    let cancel = Cancellation::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match &config.command {
        Command::Merge(merge) => run_merge(&config, merge, &formatter, cancel).await,
        Command::Split(split) => run_split(&config, split, &formatter, cancel).await,
        Command::Info(info) => run_info(&config, info, &formatter).await,
    }
}

async fn run_merge(
    config: &Config,
    merge: &MergeConfig,
    formatter: &OutputFormatter,
    cancel: Cancellation,
) -> Result<()> {
    handle_output_overwrite(&merge.output, config.overwrite_mode, formatter)?;
    let writer = PdfWriter::new();
    writer.can_write(&merge.output).await?;

    formatter.info(&format!("Loading {} file(s)...", merge.inputs.len()));
    let reader = PdfReader::with_options(config.parse_options()).with_cancellation(cancel.clone());
    let (results, stats) = reader.load_all(&merge.inputs, config.effective_jobs()).await;
    display_load_statistics(formatter, &stats);

    let documents = results
        .into_iter()
        .map(|result| result.map(|loaded| loaded.document))
        .collect::<Result<Vec<Document>>>()?;

    let merger = Merger::new()
        .with_limits(config.limits)
        .with_cancellation(cancel)
        .with_metadata(merge.metadata.clone());
    let (merged, merge_stats) =
        tokio::task::spawn_blocking(move || merger.merge_with_statistics(&documents))
            .await
            .map_err(|e| PdfSpliceError::other(format!("Merge task failed: {e}")))??;

    let write_stats = writer.save_with_stats(&merged, &merge.output).await?;

    formatter.success(&format!(
        "Created {} ({} pages, {})",
        merge.output.display(),
        merge_stats.total_pages,
        write_stats.format_file_size()
    ));
    if formatter.is_verbose() {
        formatter.section("Statistics");
        formatter.detail("Input files", &merge_stats.files_merged.to_string());
        formatter.detail("Objects copied", &merge_stats.objects_copied.to_string());
        formatter.detail(
            "Dangling references",
            &merge_stats.dangling_references.to_string(),
        );
        formatter.detail("Load time", &format!("{:.2}s", stats.total_time.as_secs_f64()));
        formatter.detail(
            "Merge time",
            &format!("{:.2}s", merge_stats.merge_time.as_secs_f64()),
        );
        formatter.detail(
            "Write time",
            &format!("{:.2}s", write_stats.write_time.as_secs_f64()),
        );
    }
    Ok(())
}

async fn run_split(
    config: &Config,
    split: &SplitConfig,
    formatter: &OutputFormatter,
    cancel: Cancellation,
) -> Result<()> {
    let reader = PdfReader::with_options(config.parse_options()).with_cancellation(cancel.clone());
    let loaded = load_one(&reader, &split.input, formatter).await?;
    let total = loaded.page_count;

    let ranges = plan_ranges(split, total)?;
    let prefix = split.effective_prefix();
    let paths = output_paths(split, &ranges, &prefix);
    for path in &paths {
        handle_output_overwrite(path, config.overwrite_mode, formatter)?;
    }

    tokio::fs::create_dir_all(&split.output_dir)
        .await
        .map_err(|source| PdfSpliceError::FailedToCreateOutput {
            path: split.output_dir.clone(),
            source,
        })?;

    formatter.info(&format!(
        "Splitting {} pages into {} file(s)...",
        total,
        ranges.len()
    ));
    let splitter = Splitter::new()
        .with_limits(config.limits)
        .with_cancellation(cancel);
    let source = loaded.document;
    let documents = tokio::task::spawn_blocking(move || splitter.split(&source, &ranges))
        .await
        .map_err(|e| PdfSpliceError::other(format!("Split task failed: {e}")))??;

    let outputs: Vec<(Document, PathBuf)> = documents.into_iter().zip(paths).collect();
    let written = PdfWriter::new().save_all(&outputs).await?;

    formatter.success(&format!(
        "Wrote {} file(s) to {}",
        written.len(),
        split.output_dir.display()
    ));
    display_written_files(formatter, &written);
    Ok(())
}

async fn run_info(config: &Config, info: &InfoConfig, formatter: &OutputFormatter) -> Result<()> {
    let reader = PdfReader::with_options(config.parse_options());
    let loaded = reader.load(&info.input).await?;
    let summary = DocumentInfo::from_document(&loaded.document, Some(loaded.file_size));

    if info.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| PdfSpliceError::other(format!("Failed to encode JSON: {e}")))?;
        println!("{json}");
    } else {
        formatter.section(&info.input.display().to_string());
        display_document_info(formatter, &summary);
    }
    Ok(())
}

async fn load_one(reader: &PdfReader, path: &Path, formatter: &OutputFormatter) -> Result<LoadedPdf> {
    let loaded = reader.load(path).await?;
    if loaded.document.was_repaired() {
        formatter.warning(&format!(
            "{}: damaged cross-reference data, index rebuilt by scanning",
            path.display()
        ));
    }
    formatter.debug(&format!(
        "Loaded {} ({} pages) in {:.2}s",
        path.display(),
        loaded.page_count,
        loaded.load_time.as_secs_f64()
    ));
    Ok(loaded)
}

/// Ranges to write: every page by default; explicit ranges plus, when
/// auto-split is on, the pages they leave out.
fn plan_ranges(split: &SplitConfig, total: usize) -> Result<Vec<PageRange>> {
    match &split.ranges {
        None => parse_range_spec("", total),
        Some(spec) => {
            let ranges = parse_range_spec(spec, total)?;
            Ok(if split.auto_split {
                with_remaining(&ranges, total)
            } else {
                ranges
            })
        }
    }
}

/// One path per range. A repeated range gets a numeric suffix so no
/// output overwrites another.
fn output_paths(split: &SplitConfig, ranges: &[PageRange], prefix: &str) -> Vec<PathBuf> {
    let mut used = HashSet::new();
    ranges
        .iter()
        .map(|range| {
            let stem = range.file_stem(prefix);
            let mut candidate = stem.clone();
            let mut n = 2;
            while !used.insert(candidate.clone()) {
                candidate = format!("{stem}_{n}");
                n += 1;
            }
            split.output_path(&candidate)
        })
        .collect()
}

/// Handle output file overwrite scenarios.
fn handle_output_overwrite(
    path: &Path,
    mode: OverwriteMode,
    formatter: &OutputFormatter,
) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    match mode {
        OverwriteMode::Force => Ok(()),
        OverwriteMode::NoClobber => Err(PdfSpliceError::output_exists(path.to_path_buf())),
        OverwriteMode::Prompt => {
            // No prompt in quiet mode; behave like --no-clobber.
            if formatter.is_quiet() {
                return Err(PdfSpliceError::output_exists(path.to_path_buf()));
            }

            formatter.warning(&format!("Output file already exists: {}", path.display()));

            use std::io::{self, Write};
            print!("Overwrite? [y/N]: ");
            io::stdout().flush().ok();

            let mut response = String::new();
            io::stdin()
                .read_line(&mut response)
                .map_err(|err| PdfSpliceError::other(format!("Failed to read input: {err}")))?;

            let response = response.trim().to_lowercase();
            if response == "y" || response == "yes" {
                Ok(())
            } else {
                Err(PdfSpliceError::Cancelled)
            }
        }
    }
}
