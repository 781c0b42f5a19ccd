use anyhow::{anyhow, bail, Result};
use batchren_core::config::DefaultsConfig;
use batchren_core::RuleSpec;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use super::types::{OutputFormat, PreviewArg};

/// Rule-based batch file renaming with preview and undo
#[derive(Parser, Debug)]
#[command(name = "batchren")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Run as if started in <path> instead of the current working directory
    #[arg(short = 'C', global = true, value_name = "PATH")]
    pub directory: Option<PathBuf>,

    /// Assume yes for all prompts
    #[arg(short = 'y', long = "yes", global = true, env = "BATCHREN_YES")]
    pub yes: bool,
}

/// The renaming rule. Exactly one must be given.
#[derive(Args, Debug, Clone, Default)]
#[group(required = true, multiple = false)]
pub struct RuleArgs {
    /// Prepend TEXT to every file name
    #[arg(long, value_name = "TEXT", allow_hyphen_values = true)]
    pub prefix: Option<String>,

    /// Insert TEXT before the extension
    #[arg(long, value_name = "TEXT", allow_hyphen_values = true)]
    pub suffix: Option<String>,

    /// Replace every occurrence of SEARCH with REPLACE
    #[arg(
        long,
        num_args = 2,
        value_names = ["SEARCH", "REPLACE"],
        allow_hyphen_values = true
    )]
    pub replace: Option<Vec<String>>,

    /// Regex replacement; $1 or ${name} in REPLACEMENT insert capture groups
    #[arg(
        long,
        num_args = 2,
        value_names = ["PATTERN", "REPLACEMENT"],
        allow_hyphen_values = true
    )]
    pub regex: Option<Vec<String>>,

    /// Replace the base name with a number, e.g. --sequence=img_{n:03d}
    #[arg(
        long,
        value_name = "FORMAT",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = ""
    )]
    pub sequence: Option<String>,

    /// Prefix names with the current date, e.g. --date-prefix=%Y%m%d
    #[arg(
        long = "date-prefix",
        value_name = "FORMAT",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = ""
    )]
    pub date_prefix: Option<String>,
}

impl RuleArgs {
    /// Build the rule, filling unset formats from the config defaults
    pub fn to_rule(&self, start: Option<i64>, defaults: &DefaultsConfig) -> Result<RuleSpec> {
        if start.is_some() && self.sequence.is_none() {
            bail!("--start can only be used with --sequence");
        }

        let or_default = |value: &str, default: &str| {
            if value.is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        };

        if let Some(ref prefix) = self.prefix {
            return Ok(RuleSpec::AddPrefix {
                prefix: prefix.clone(),
            });
        }
        if let Some(ref suffix) = self.suffix {
            return Ok(RuleSpec::AddSuffix {
                suffix: suffix.clone(),
            });
        }
        if let Some([search, replace]) = self.replace.as_deref() {
            return Ok(RuleSpec::ReplaceText {
                search: search.clone(),
                replace: replace.clone(),
            });
        }
        if let Some([pattern, replacement]) = self.regex.as_deref() {
            return Ok(RuleSpec::RegexReplace {
                pattern: pattern.clone(),
                replacement: replacement.clone(),
            });
        }
        if let Some(ref format) = self.sequence {
            return Ok(RuleSpec::SequentialNumber {
                format: or_default(format, &defaults.sequence_format),
                start: start.unwrap_or(defaults.sequence_start),
            });
        }
        if let Some(ref format) = self.date_prefix {
            return Ok(RuleSpec::DatePrefix {
                date_format: or_default(format, &defaults.date_format),
            });
        }

        Err(anyhow!("No renaming rule given"))
    }
}

/// Which files to rename
#[derive(Args, Debug, Clone, Default)]
pub struct FileArgs {
    /// Files or directories to rename (directories are walked recursively)
    #[arg(value_name = "PATHS", default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Only rename files whose name matches one of these globs, e.g. "*.jpg;*.png"
    #[arg(long, value_name = "PATTERNS")]
    pub filter: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the proposed names without touching any file
    Preview {
        #[command(flatten)]
        rule: RuleArgs,

        /// First number for --sequence
        #[arg(long, allow_hyphen_values = true)]
        start: Option<i64>,

        #[command(flatten)]
        files: FileArgs,

        /// Preview format (defaults to config or table)
        #[arg(long, value_enum)]
        preview: Option<PreviewArg>,

        /// Output format for machine consumption
        #[arg(long, value_enum, default_value = "summary")]
        output: OutputFormat,
    },

    /// Preview, confirm and rename
    Apply {
        #[command(flatten)]
        rule: RuleArgs,

        /// First number for --sequence
        #[arg(long, allow_hyphen_values = true)]
        start: Option<i64>,

        #[command(flatten)]
        files: FileArgs,

        /// Preview format shown before confirming (defaults to config or table)
        #[arg(long, value_enum)]
        preview: Option<PreviewArg>,

        /// Directory in which the backup directory is created
        #[arg(long, value_name = "DIR")]
        backup_root: Option<PathBuf>,

        /// Output format for machine consumption
        #[arg(long, value_enum, default_value = "summary")]
        output: OutputFormat,
    },

    /// Interactive session with undo, reading commands from stdin
    Session {
        /// Initial files or directories
        #[arg(value_name = "PATHS")]
        paths: Vec<PathBuf>,

        /// Initial filter, e.g. "*.jpg;*.png"
        #[arg(long, value_name = "PATTERNS")]
        filter: Option<String>,

        /// Directory in which backup directories are created
        #[arg(long, value_name = "DIR")]
        backup_root: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,

        /// Write the script into this directory instead of stdout
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Show version information
    Version {
        /// Output format
        #[arg(long, value_enum, default_value = "summary")]
        output: OutputFormat,
    },
}
