//! Configuration module for pdfsplice.
//!
//! Library-level knobs ([`Limits`], [`ParseOptions`], [`Metadata`]) live
//! next to the command-line [`Config`] that the CLI builds from its
//! arguments. Every struct has a sensible `Default`; `validate()` checks
//! the combinations that cannot be expressed in the types.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

/// Resource ceilings protecting memory under adversarial input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Most pages a parsed document or a built output may have.
    pub max_pages: usize,
    /// Most objects a parsed index or a built output may have.
    pub max_objects: usize,
    /// Largest input accepted by the parser, in bytes.
    pub max_input_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_pages: 10_000,
            max_objects: 1_000_000,
            max_input_bytes: 512 * 1024 * 1024,
        }
    }
}

impl Limits {
    /// Limits that never trigger.
    pub fn unlimited() -> Self {
        Self {
            max_pages: usize::MAX,
            max_objects: usize::MAX,
            max_input_bytes: usize::MAX,
        }
    }

    /// Validate the limits.
    ///
    /// # Errors
    ///
    /// Returns an error if any ceiling is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            bail!("Maximum page count must be at least 1");
        }
        if self.max_objects == 0 {
            bail!("Maximum object count must be at least 1");
        }
        if self.max_input_bytes == 0 {
            bail!("Maximum input size must be at least 1 byte");
        }
        Ok(())
    }
}

/// How the parser treats damaged input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Rebuild the object index by scanning the file when the
    /// cross-reference data is unusable, and tolerate dangling references.
    pub tolerant: bool,
    /// Ceilings applied while parsing.
    pub limits: Limits,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            tolerant: true,
            limits: Limits::default(),
        }
    }
}

impl ParseOptions {
    /// Options that fail on any structural damage.
    pub fn strict() -> Self {
        Self {
            tolerant: false,
            ..Self::default()
        }
    }
}

/// PDF metadata to set on the output document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Document title.
    pub title: Option<String>,
    /// Document author.
    pub author: Option<String>,
    /// Document subject.
    pub subject: Option<String>,
    /// Document keywords (comma-separated).
    pub keywords: Option<String>,
}

impl Metadata {
    /// Check if any metadata fields are set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
    }

    /// Create metadata from optional strings, trimming whitespace.
    pub fn new(
        title: Option<String>,
        author: Option<String>,
        subject: Option<String>,
        keywords: Option<String>,
    ) -> Self {
        let to_string_opt = |opt: Option<String>| {
            opt.filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
        };

        Self {
            title: to_string_opt(title),
            author: to_string_opt(author),
            subject: to_string_opt(subject),
            keywords: to_string_opt(keywords),
        }
    }

    /// Info dictionary keys paired with the values set here.
    pub(crate) fn entries(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("Title", self.title.as_deref()),
            ("Author", self.author.as_deref()),
            ("Subject", self.subject.as_deref()),
            ("Keywords", self.keywords.as_deref()),
        ]
    }
}

/// Output file overwrite behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteMode {
    /// Prompt the user before overwriting (default).
    #[default]
    Prompt,
    /// Always overwrite without prompting.
    Force,
    /// Never overwrite, error if file exists.
    NoClobber,
}

/// Settings for `pdfsplice merge`.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Input PDF file paths (in merge order).
    pub inputs: Vec<PathBuf>,
    /// Output PDF file path.
    pub output: PathBuf,
    /// Metadata to set on the output document.
    pub metadata: Metadata,
    /// Number of concurrent loads (None = auto-detect).
    pub jobs: Option<usize>,
}

/// Settings for `pdfsplice split`.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// The document to split.
    pub input: PathBuf,
    /// Range specification such as "1-3,5". `None` splits every page.
    pub ranges: Option<String>,
    /// Append the pages the ranges leave out as extra outputs.
    pub auto_split: bool,
    /// Output file name prefix (None = "<input stem>_split").
    pub prefix: Option<String>,
    /// Directory receiving the output files.
    pub output_dir: PathBuf,
}

impl SplitConfig {
    /// The file name prefix in effect.
    pub fn effective_prefix(&self) -> String {
        self.prefix.clone().unwrap_or_else(|| {
            let stem = self
                .input
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            format!("{stem}_split")
        })
    }

    /// Path of the output file with the given stem.
    pub fn output_path(&self, stem: &str) -> PathBuf {
        self.output_dir.join(format!("{stem}.pdf"))
    }
}

/// Settings for `pdfsplice info`.
#[derive(Debug, Clone)]
pub struct InfoConfig {
    /// The document to describe.
    pub input: PathBuf,
    /// Print JSON instead of text.
    pub json: bool,
}

/// The operation selected on the command line.
#[derive(Debug, Clone)]
pub enum Command {
    /// Concatenate documents.
    Merge(MergeConfig),
    /// Split one document into page ranges.
    Split(SplitConfig),
    /// Describe one document.
    Info(InfoConfig),
}

/// Complete configuration for one pdfsplice invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// The operation to run.
    pub command: Command,

    /// Verbose output mode.
    pub verbose: bool,

    /// Quiet mode - suppress non-error output.
    pub quiet: bool,

    /// Disable the repair fallback.
    pub strict: bool,

    /// File overwrite behavior.
    pub overwrite_mode: OverwriteMode,

    /// Resource ceilings.
    pub limits: Limits,
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Verbose and quiet modes are both enabled
    /// - A merge has no inputs, zero jobs, or writes over one of its inputs
    /// - A split prefix contains a path separator
    /// - A limit is zero
    pub fn validate(&self) -> Result<()> {
        if self.verbose && self.quiet {
            bail!("Cannot use both --verbose and --quiet");
        }

        self.limits.validate()?;

        match &self.command {
            Command::Merge(merge) => {
                if merge.inputs.is_empty() {
                    bail!("No input files specified");
                }

                if merge.jobs == Some(0) {
                    bail!("Number of jobs must be at least 1");
                }

                // Validate that output path is not in inputs
                for input in &merge.inputs {
                    if input == &merge.output {
                        bail!(
                            "Output file cannot be the same as an input file: {}",
                            merge.output.display()
                        );
                    }
                }
            }
            Command::Split(split) => {
                if let Some(prefix) = &split.prefix {
                    if prefix.trim().is_empty() {
                        bail!("Output prefix cannot be empty");
                    }
                    if prefix.contains(['/', '\\']) {
                        bail!("Output prefix cannot contain a path separator: {prefix}");
                    }
                }
            }
            Command::Info(_) => {}
        }

        Ok(())
    }

    /// Parser options derived from `--strict` and the limits.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            tolerant: !self.strict,
            limits: self.limits,
        }
    }

    /// Get the effective number of parallel loads.
    ///
    /// Returns the configured job count, or the number of CPU cores if auto-detect.
    pub fn effective_jobs(&self) -> usize {
        let configured = match &self.command {
            Command::Merge(merge) => merge.jobs,
            _ => None,
        };
        configured.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Check if output should be displayed.
    pub fn should_print(&self) -> bool {
        !self.quiet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge_config() -> Config {
        Config {
            command: Command::Merge(MergeConfig {
                inputs: vec![PathBuf::from("a.pdf")],
                output: PathBuf::from("out.pdf"),
                metadata: Metadata::default(),
                jobs: None,
            }),
            verbose: false,
            quiet: false,
            strict: false,
            overwrite_mode: OverwriteMode::Prompt,
            limits: Limits::default(),
        }
    }

    fn split_config(prefix: Option<&str>) -> SplitConfig {
        SplitConfig {
            input: PathBuf::from("docs/report.pdf"),
            ranges: None,
            auto_split: true,
            prefix: prefix.map(str::to_string),
            output_dir: PathBuf::from("out"),
        }
    }

    #[test]
    fn test_limits_default() {
        let limits = Limits::default();
        assert_eq!(limits.max_pages, 10_000);
        assert_eq!(limits.max_objects, 1_000_000);
        assert_eq!(limits.max_input_bytes, 512 * 1024 * 1024);
        assert!(limits.validate().is_ok());
    }

    #[test]
    fn test_limits_reject_zero() {
        let limits = Limits {
            max_pages: 0,
            ..Limits::default()
        };
        assert!(limits.validate().is_err());
    }

    #[test]
    fn test_parse_options_follow_strict_flag() {
        let mut config = merge_config();
        assert!(config.parse_options().tolerant);
        config.strict = true;
        assert!(!config.parse_options().tolerant);
        assert!(!ParseOptions::strict().tolerant);
    }

    #[test]
    fn test_metadata_is_empty() {
        let empty = Metadata::default();
        assert!(empty.is_empty());

        let not_empty = Metadata {
            title: Some("Title".to_string()),
            ..Default::default()
        };
        assert!(!not_empty.is_empty());
    }

    #[test]
    fn test_metadata_new_trims_whitespace() {
        let meta = Metadata::new(
            Some("  Title  ".to_string()),
            Some("   ".to_string()),
            None,
            Some("keyword".to_string()),
        );

        assert_eq!(meta.title, Some("Title".to_string()));
        assert_eq!(meta.author, None); // Whitespace-only becomes None
        assert_eq!(meta.subject, None);
        assert_eq!(meta.keywords, Some("keyword".to_string()));
    }

    #[test]
    fn test_merge_config_validation() {
        let mut config = merge_config();
        assert!(config.validate().is_ok());

        // Test verbose + quiet conflict
        config.verbose = true;
        config.quiet = true;
        assert!(config.validate().is_err());
        config.verbose = false;
        config.quiet = false;

        let Command::Merge(merge) = &mut config.command else {
            unreachable!()
        };

        // Test zero jobs
        merge.jobs = Some(0);
        assert!(config.validate().is_err());

        let Command::Merge(merge) = &mut config.command else {
            unreachable!()
        };
        merge.jobs = None;

        // Test output same as input
        merge.output = PathBuf::from("a.pdf");
        assert!(config.validate().is_err());

        let Command::Merge(merge) = &mut config.command else {
            unreachable!()
        };
        merge.output = PathBuf::from("out.pdf");
        merge.inputs.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_prefix_validation() {
        let mut config = merge_config();
        config.command = Command::Split(split_config(Some("../escape")));
        assert!(config.validate().is_err());

        config.command = Command::Split(split_config(Some("part")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_split_default_prefix_uses_input_stem() {
        let split = split_config(None);
        assert_eq!(split.effective_prefix(), "report_split");
        assert_eq!(
            split.output_path("report_split_page_1"),
            PathBuf::from("out/report_split_page_1.pdf")
        );
        assert_eq!(split_config(Some("x")).effective_prefix(), "x");
    }

    #[test]
    fn test_effective_jobs() {
        let mut config = merge_config();
        if let Command::Merge(merge) = &mut config.command {
            merge.jobs = Some(4);
        }
        assert_eq!(config.effective_jobs(), 4);

        config.command = Command::Info(InfoConfig {
            input: PathBuf::from("a.pdf"),
            json: false,
        });
        assert!(config.effective_jobs() >= 1);
    }

    #[test]
    fn test_should_print() {
        let mut config = merge_config();
        assert!(config.should_print());

        config.quiet = true;
        assert!(!config.should_print());
    }
}
