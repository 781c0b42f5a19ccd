use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::undo::UndoToken;

/// Problems detected before anything on disk is touched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    // Rule fields
    #[error("{rule}: {field} must not be empty")]
    EmptyField {
        rule: &'static str,
        field: &'static str,
    },

    #[error("Invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("Invalid sequence format '{format}': {reason}")]
    InvalidSequenceFormat { format: String, reason: String },

    #[error("Invalid date format '{format}'")]
    InvalidDateFormat { format: String },

    // Batch admission
    #[error("Invalid file name '{name}' for {}: {reason}", .source_path.display())]
    InvalidName {
        source_path: PathBuf,
        name: String,
        reason: &'static str,
    },

    #[error("Source file does not exist: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("File name is not valid UTF-8: {}", .0.display())]
    NonUtf8Name(PathBuf),

    #[error("Source is not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Target already exists: {}", .0.display())]
    TargetExists(PathBuf),

    #[error("{} files would be renamed to {}", .sources.len(), .target.display())]
    DuplicateTarget {
        target: PathBuf,
        sources: Vec<PathBuf>,
    },

    #[error("{} files share the name '{name}' and cannot be backed up together", .sources.len())]
    DuplicateBackupName { name: String, sources: Vec<PathBuf> },
}

/// Errors returned by preview, execute and undo.
///
/// Per-file failures during execute or undo are not errors; they are
/// reported as [`OperationFailure`] values inside the reports.
#[derive(Debug, Error)]
pub enum RenameError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Undo token {requested} is not the most recent operation (latest is {latest})")]
    StaleUndoToken {
        requested: UndoToken,
        latest: UndoToken,
    },
}

impl RenameError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this error was raised by the admission check or rule validation
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Why a single rename (or its reversal) did not happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Copy or rename failed at the filesystem level
    Io,
    /// The rename target appeared after the admission check
    TargetOccupied,
    /// The original path was reoccupied before undo
    UndoConflict,
}

/// One per-file failure inside an execute or undo report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    pub original_path: PathBuf,
    pub target_path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}
