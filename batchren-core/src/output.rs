use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Write;
use std::path::PathBuf;

use crate::error::OperationFailure;
use crate::preview::{find_collisions, ProposedName};
use crate::session::ExecuteReport;
use crate::undo::{UndoReport, UndoToken};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Summary,
    Json,
}

/// Result of a preview command
#[derive(Debug, Serialize, Deserialize)]
pub struct PreviewResult {
    pub rule: String,
    pub rows: Vec<ProposedName>,
}

impl PreviewResult {
    pub fn changed(&self) -> usize {
        self.rows.iter().filter(|r| r.changed()).count()
    }
}

/// Result of a status command
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResult {
    pub files: usize,
    pub undo_depth: usize,
    pub latest_token: Option<UndoToken>,
    /// Files renamed by the latest record whose content changed since
    pub modified_since_execute: Vec<PathBuf>,
}

/// Result of a version command
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResult {
    pub name: String,
    pub version: String,
}

/// Trait for formatting output in different formats
pub trait OutputFormatter {
    fn format(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Json => self.format_json(),
            OutputFormat::Summary => self.format_summary(),
        }
    }
    fn format_json(&self) -> String;
    fn format_summary(&self) -> String;
}

fn write_failures(output: &mut String, failed: &[OperationFailure]) {
    for failure in failed {
        writeln!(
            output,
            "✗ {} -> {}: {}",
            failure.original_path.display(),
            failure.target_path.display(),
            failure.message
        )
        .unwrap();
    }
}

impl OutputFormatter for PreviewResult {
    fn format_json(&self) -> String {
        serde_json::to_string(&json!({
            "success": true,
            "operation": "preview",
            "rule": self.rule,
            "summary": {
                "files": self.rows.len(),
                "changed": self.changed(),
                "collisions": find_collisions(&self.rows).len(),
            },
            "rows": self.rows,
        }))
        .unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        let mut output = format!("Rule: {}\n", self.rule);
        writeln!(
            output,
            "{} of {} files would be renamed",
            self.changed(),
            self.rows.len()
        )
        .unwrap();

        let collisions = find_collisions(&self.rows).len();
        if collisions > 0 {
            writeln!(output, "{} files collide on the same target", collisions).unwrap();
        }

        output
    }
}

impl OutputFormatter for ExecuteReport {
    fn format_json(&self) -> String {
        serde_json::to_string(&json!({
            "success": self.is_complete(),
            "operation": "apply",
            "undo_token": self.undo_token,
            "backup_dir": self.backup_dir,
            "summary": {
                "renamed": self.succeeded.len(),
                "failed": self.failed.len(),
                "skipped": self.skipped,
            },
            "succeeded": self.succeeded,
            "failed": self.failed,
        }))
        .unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        let mut output = String::new();

        if self.succeeded.is_empty() && self.failed.is_empty() {
            output.push_str("Nothing to rename\n");
            return output;
        }

        writeln!(output, "✓ Renamed {} files", self.succeeded.len()).unwrap();
        if self.skipped > 0 {
            writeln!(output, "Skipped {} unchanged files", self.skipped).unwrap();
        }
        if !self.failed.is_empty() {
            writeln!(output, "✗ {} renames failed", self.failed.len()).unwrap();
            write_failures(&mut output, &self.failed);
        }
        if let Some(ref dir) = self.backup_dir {
            writeln!(output, "Backups: {}", dir.display()).unwrap();
        }
        if let Some(token) = self.undo_token {
            writeln!(output, "Undo token: {}", token).unwrap();
        }

        output
    }
}

impl OutputFormatter for UndoReport {
    fn format_json(&self) -> String {
        serde_json::to_string(&json!({
            "success": self.failed.is_empty(),
            "operation": "undo",
            "token": self.token,
            "fully_reversed": self.fully_reversed,
            "retained_backup_dir": self.retained_backup_dir,
            "summary": {
                "restored": self.succeeded.len(),
                "failed": self.failed.len(),
            },
            "failed": self.failed,
        }))
        .unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        let mut output = format!("Undo {}\n", self.token);

        writeln!(output, "✓ Restored {} files", self.succeeded.len()).unwrap();
        if !self.failed.is_empty() {
            writeln!(output, "✗ {} files could not be restored", self.failed.len()).unwrap();
            write_failures(&mut output, &self.failed);
        }

        if self.fully_reversed {
            if let Some(ref dir) = self.retained_backup_dir {
                writeln!(output, "Backup directory could not be removed: {}", dir.display())
                    .unwrap();
            }
        } else {
            output.push_str("Undo is incomplete; run undo again to retry\n");
        }

        output
    }
}

impl OutputFormatter for StatusResult {
    fn format_json(&self) -> String {
        serde_json::to_string(&self).unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        let mut output = format!("Files: {}\n", self.files);

        match self.latest_token {
            Some(token) => writeln!(
                output,
                "Undo available: {} ({} pending)",
                token, self.undo_depth
            )
            .unwrap(),
            None => output.push_str("Nothing to undo\n"),
        }

        if !self.modified_since_execute.is_empty() {
            output.push_str("Modified since rename:\n");
            for path in &self.modified_since_execute {
                writeln!(output, "  {}", path.display()).unwrap();
            }
        }

        output
    }
}

impl OutputFormatter for VersionResult {
    fn format_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn format_summary(&self) -> String {
        format!("{} {}", self.name, self.version)
    }
}
