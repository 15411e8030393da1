//! CLI argument parsing for pdfsplice.
//!
//! This module is also compiled by `build.rs` to render the man page, so
//! it only depends on `clap` and the `pdfsplice` library.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use pdfsplice::config::{
    Command, Config, InfoConfig, Limits, MergeConfig, Metadata, OverwriteMode, SplitConfig,
};
use pdfsplice::error::{PdfSpliceError, Result};

/// Merge whole PDF documents and split them into page ranges.
#[derive(Parser, Debug)]
#[command(name = "pdfsplice")]
#[command(version)]
#[command(about = "Merge whole PDF documents and split them into page ranges", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Operation to run
    #[command(subcommand)]
    pub command: Commands,

    /// Show detailed progress and statistics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Fail on damaged cross-reference data instead of scanning the file
    #[arg(long, global = true)]
    pub strict: bool,

    /// Overwrite existing output files without confirmation
    #[arg(short, long, global = true)]
    pub force: bool,

    /// Never overwrite existing output files
    #[arg(long, global = true, conflicts_with = "force")]
    pub no_clobber: bool,

    /// Maximum number of pages in any document
    #[arg(long, global = true, value_name = "N")]
    pub max_pages: Option<usize>,

    /// Maximum number of objects in any document
    #[arg(long, global = true, value_name = "N")]
    pub max_objects: Option<usize>,
}

/// pdfsplice subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Concatenate PDF files into one document
    ///
    /// Every page of every input is copied in the order given.
    ///
    /// Example:
    ///   pdfsplice merge a.pdf b.pdf -o combined.pdf
    Merge(MergeArgs),

    /// Split a PDF into one file per page range
    ///
    /// Without --ranges every page becomes its own file. With --ranges the
    /// pages left out are appended as extra files unless --no-auto-split
    /// is given.
    ///
    /// Example:
    ///   pdfsplice split report.pdf -r "1-3,5" -d parts/
    Split(SplitArgs),

    /// Show page count, version and metadata of a PDF
    Info(InfoArgs),
}

/// Arguments of `pdfsplice merge`.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Input PDF files to merge (in order)
    #[arg(required = true, value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Output PDF file path
    #[arg(short, long, value_name = "FILE", default_value = "merged.pdf")]
    pub output: PathBuf,

    /// Set title metadata (default: title of the first input)
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Set author metadata (default: author of the first input)
    #[arg(long, value_name = "TEXT")]
    pub author: Option<String>,

    /// Set subject metadata
    #[arg(long, value_name = "TEXT")]
    pub subject: Option<String>,

    /// Set keywords metadata (comma-separated)
    #[arg(long, value_name = "TEXT")]
    pub keywords: Option<String>,

    /// Number of files loaded concurrently (default: CPU cores)
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,
}

/// Arguments of `pdfsplice split`.
#[derive(Args, Debug)]
pub struct SplitArgs {
    /// PDF file to split
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Page ranges, e.g. "1-3,5,7-9" (1-based, inclusive)
    #[arg(short, long, value_name = "RANGES")]
    pub ranges: Option<String>,

    /// Do not write the pages left out by --ranges
    #[arg(long)]
    pub no_auto_split: bool,

    /// Output file name prefix (default: "<input stem>_split")
    #[arg(short, long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Directory receiving the output files
    #[arg(short = 'd', long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,
}

/// Arguments of `pdfsplice info`.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// PDF file to describe
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Convert CLI arguments into a validated Config.
    ///
    /// # Errors
    ///
    /// [`PdfSpliceError::InvalidConfig`] if the combination of arguments is
    /// rejected by [`Config::validate`].
    pub fn to_config(&self) -> Result<Config> {
        let overwrite_mode = if self.force {
            OverwriteMode::Force
        } else if self.no_clobber {
            OverwriteMode::NoClobber
        } else {
            OverwriteMode::Prompt
        };

        let defaults = Limits::default();
        let limits = Limits {
            max_pages: self.max_pages.unwrap_or(defaults.max_pages),
            max_objects: self.max_objects.unwrap_or(defaults.max_objects),
            ..defaults
        };

        let command = match &self.command {
            Commands::Merge(args) => Command::Merge(MergeConfig {
                inputs: args.inputs.clone(),
                output: args.output.clone(),
                metadata: Metadata::new(
                    args.title.clone(),
                    args.author.clone(),
                    args.subject.clone(),
                    args.keywords.clone(),
                ),
                jobs: args.jobs,
            }),
            Commands::Split(args) => Command::Split(SplitConfig {
                input: args.input.clone(),
                ranges: args.ranges.clone(),
                auto_split: !args.no_auto_split,
                prefix: args.prefix.clone(),
                output_dir: args.output_dir.clone(),
            }),
            Commands::Info(args) => Command::Info(InfoConfig {
                input: args.input.clone(),
                json: args.json,
            }),
        };

        let config = Config {
            command,
            verbose: self.verbose,
            quiet: self.quiet,
            strict: self.strict,
            overwrite_mode,
            limits,
        };

        config.validate().map_err(|e| {
            PdfSpliceError::invalid_config(format!("Configuration validation failed: {e}"))
        })?;

        Ok(config)
    }
}
