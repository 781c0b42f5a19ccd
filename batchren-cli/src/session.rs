use anyhow::{anyhow, bail, Result};
use batchren_core::config::DefaultsConfig;
use batchren_core::{
    collect_files, parse_filter_patterns, preview, render_preview, to_pairs, FileEntry,
    OutputFormatter, Preview, ProposedName, RenameOperation, Session, StatusResult, UndoToken,
};
use clap::{CommandFactory, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::apply::confirm_with_input;
use crate::cli::RuleArgs;

/// One line typed at the session prompt
#[derive(Parser, Debug)]
#[command(
    name = "batchren-session",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true,
    disable_help_subcommand = true
)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// List the selected files
    Files,
    /// Add files or directories to the selection
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Clear the selection
    Clear,
    /// Set the name filter, e.g. filter *.jpg;*.png (no argument clears it)
    Filter { patterns: Vec<String> },
    /// Preview a rule against the selection
    Preview {
        #[command(flatten)]
        rule: RuleArgs,

        /// First number for --sequence
        #[arg(long, allow_hyphen_values = true)]
        start: Option<i64>,
    },
    /// Rename according to the last preview
    Apply,
    /// Undo the most recent rename (or the one TOKEN names)
    Undo { token: Option<UndoToken> },
    /// Show selection and undo state
    Status,
    /// Show this help
    Help,
    /// Leave the session
    #[command(alias = "exit")]
    Quit,
}

/// Selection and preferences carried between session commands
pub struct SessionState {
    pub paths: Vec<PathBuf>,
    pub filters: Vec<String>,
    pub defaults: DefaultsConfig,
    pub format: Preview,
    pub use_color: Option<bool>,
    pub yes: bool,
    pending: Option<Vec<ProposedName>>,
}

impl SessionState {
    pub fn new(
        defaults: DefaultsConfig,
        format: Preview,
        use_color: Option<bool>,
        yes: bool,
    ) -> Self {
        Self {
            paths: Vec::new(),
            filters: Vec::new(),
            defaults,
            format,
            use_color,
            yes,
            pending: None,
        }
    }

    fn files(&self) -> Result<Vec<FileEntry>> {
        collect_files(&self.paths, &self.filters)
    }

    pub fn add_path(&mut self, path: PathBuf) -> Result<()> {
        let entry = FileEntry::new(&path)?;
        if !entry.original_path.exists() {
            bail!("No such file or directory: {}", path.display());
        }
        if !self.paths.contains(&entry.original_path) {
            self.paths.push(entry.original_path);
        }
        Ok(())
    }

    /// Keep the selection pointing at the same files after they move
    fn follow(&mut self, operations: &[RenameOperation], forward: bool) {
        for op in operations {
            let (from, to) = if forward {
                (&op.original_path, &op.new_path)
            } else {
                (&op.new_path, &op.original_path)
            };
            for path in &mut self.paths {
                if path == from {
                    path.clone_from(to);
                }
            }
        }
    }
}

/// Split a command line into words, honoring single and double quotes
fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            },
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            },
            None => {
                current.push(c);
                in_word = true;
            },
        }
    }

    if quote.is_some() {
        return Err(anyhow!("Unterminated quote"));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Read commands from `input` until `quit` or end of input
pub fn run_session<R: BufRead, W: Write>(
    session: &mut Session,
    state: &mut SessionState,
    input: &mut R,
    out: &mut W,
    prompt: bool,
) -> Result<()> {
    let mut line = String::new();

    loop {
        if prompt {
            write!(out, "batchren> ")?;
            out.flush()?;
        }

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let words = match split_words(&line) {
            Ok(words) if words.is_empty() => continue,
            Ok(words) => words,
            Err(e) => {
                writeln!(out, "Error: {e}")?;
                continue;
            },
        };

        let command = match SessionLine::try_parse_from(words) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                write!(out, "{}", e.render())?;
                continue;
            },
        };

        if matches!(command, SessionCommand::Quit) {
            break;
        }

        if let Err(e) = run_command(command, session, state, input, out) {
            writeln!(out, "Error: {e:#}")?;
        }
    }

    Ok(())
}

fn run_command<R: BufRead, W: Write>(
    command: SessionCommand,
    session: &mut Session,
    state: &mut SessionState,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    match command {
        SessionCommand::Files => {
            let files = state.files()?;
            if files.is_empty() {
                writeln!(out, "No files selected")?;
            }
            for file in files {
                writeln!(out, "{}", file.original_path.display())?;
            }
        },

        SessionCommand::Add { paths } => {
            for path in paths {
                state.add_path(path)?;
            }
            state.pending = None;
            writeln!(out, "{} files selected", state.files()?.len())?;
        },

        SessionCommand::Clear => {
            state.paths.clear();
            state.pending = None;
            writeln!(out, "Selection cleared")?;
        },

        SessionCommand::Filter { patterns } => {
            state.filters = parse_filter_patterns(&patterns.join(";"));
            state.pending = None;
            if state.filters.is_empty() {
                writeln!(out, "Filter cleared")?;
            } else {
                writeln!(out, "Filter: {}", state.filters.join(";"))?;
            }
        },

        SessionCommand::Preview { rule, start } => {
            let rule = rule.to_rule(start, &state.defaults)?;
            let rows = preview(&state.files()?, &rule)?;
            let format = if state.format == Preview::None {
                Preview::Summary
            } else {
                state.format
            };
            writeln!(out, "{}", render_preview(&rows, format, state.use_color))?;
            state.pending = Some(rows);
        },

        SessionCommand::Apply => {
            let rows = state
                .pending
                .take()
                .ok_or_else(|| anyhow!("Nothing to apply; run preview first"))?;
            let changing = rows.iter().filter(|r| r.changed()).count();

            if changing > 0 && !state.yes && !confirm_with_input(input, changing)? {
                writeln!(out, "Aborted; no files were renamed")?;
                state.pending = Some(rows);
                return Ok(());
            }

            let report = session.execute(&to_pairs(&rows))?;
            state.follow(&report.succeeded, true);
            write!(out, "{}", report.format_summary())?;
        },

        SessionCommand::Undo { token } => {
            let modified = session.modified_since_execute();
            if !modified.is_empty() {
                writeln!(
                    out,
                    "Warning: {} renamed files changed since the rename",
                    modified.len()
                )?;
            }

            let report = match token {
                Some(token) => session.undo(token)?,
                None => session.undo_latest()?,
            };
            state.follow(&report.succeeded, false);
            state.pending = None;
            write!(out, "{}", report.format_summary())?;
        },

        SessionCommand::Status => {
            let status = StatusResult {
                files: state.files()?.len(),
                undo_depth: session.undo_depth(),
                latest_token: session.latest_token(),
                modified_since_execute: session.modified_since_execute(),
            };
            write!(out, "{}", status.format_summary())?;
        },

        SessionCommand::Help => {
            write!(out, "{}", SessionLine::command().render_help())?;
        },

        SessionCommand::Quit => {},
    }

    Ok(())
}
