use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::backup::calculate_checksum;
use crate::error::{FailureKind, OperationFailure, RenameError};
use crate::log::OperationLog;
use crate::transaction::{rename_no_replace, RenameOperation};

/// Opaque handle naming one undo record within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UndoToken(u64);

impl UndoToken {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for UndoToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Accepts both `#3` and `3`
impl FromStr for UndoToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches('#');
        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| format!("Invalid undo token: {}", s))
    }
}

/// The reversible description of one (possibly partial) execute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoRecord {
    pub token: UndoToken,
    pub created_at: String,
    /// Completed renames in execution order
    pub operations: Vec<RenameOperation>,
    pub backup_dir: PathBuf,
}

impl UndoRecord {
    /// Renamed files whose content no longer matches the backup checksum,
    /// or that are gone from their new path
    pub fn modified_files(&self) -> Vec<PathBuf> {
        self.operations
            .iter()
            .filter(|op| {
                calculate_checksum(&op.new_path).map_or(true, |checksum| checksum != op.checksum)
            })
            .map(|op| op.new_path.clone())
            .collect()
    }
}

/// Result of one undo pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoReport {
    pub token: UndoToken,
    /// Operations reversed by this pass, in reversal order
    pub succeeded: Vec<RenameOperation>,
    pub failed: Vec<OperationFailure>,
    /// True when the record is fully consumed
    pub fully_reversed: bool,
    /// Backup directory left on disk: the record still has operations, or
    /// the directory could not be deleted
    pub retained_backup_dir: Option<PathBuf>,
}

/// LIFO stack of undo records, owned by a session
#[derive(Debug, Default)]
pub struct UndoStack {
    records: Vec<UndoRecord>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: UndoRecord) {
        self.records.push(record);
    }

    pub fn peek(&self) -> Option<&UndoRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Reverse the most recent record, which must be the one `token` names.
    ///
    /// Operations are reversed newest first. One that cannot be reversed is
    /// reported and stays in the record, which then stays on the stack so a
    /// later call can finish the job. The backup directory is removed once
    /// the record is empty.
    pub fn undo(
        &mut self,
        token: UndoToken,
        log: &mut OperationLog,
    ) -> Result<UndoReport, RenameError> {
        let record = self.records.last_mut().ok_or(RenameError::NothingToUndo)?;
        if record.token != token {
            return Err(RenameError::StaleUndoToken {
                requested: token,
                latest: record.token,
            });
        }

        log.log(&format!(
            "Starting undo {} ({} operations)",
            token,
            record.operations.len()
        ));

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut remaining = Vec::new();

        for op in record.operations.drain(..).rev() {
            match rename_no_replace(&op.new_path, &op.original_path) {
                Ok(()) => {
                    log.log(&format!(
                        "Restored {} -> {}",
                        op.new_path.display(),
                        op.original_path.display()
                    ));
                    succeeded.push(op);
                },
                Err((kind, message)) => {
                    let kind = match kind {
                        FailureKind::TargetOccupied => FailureKind::UndoConflict,
                        other => other,
                    };
                    log.log(&format!(
                        "Failed to restore {}: {}",
                        op.original_path.display(),
                        message
                    ));
                    failed.push(OperationFailure {
                        original_path: op.original_path.clone(),
                        target_path: op.new_path.clone(),
                        kind,
                        message,
                    });
                    remaining.push(op);
                },
            }
        }

        remaining.reverse();
        record.operations = remaining;

        if !record.operations.is_empty() {
            let backup_dir = record.backup_dir.clone();
            log.log(&format!(
                "Undo {} incomplete: {} operations remain, backup kept at {}",
                token,
                record.operations.len(),
                backup_dir.display()
            ));
            return Ok(UndoReport {
                token,
                succeeded,
                failed,
                fully_reversed: false,
                retained_backup_dir: Some(backup_dir),
            });
        }

        let backup_dir = record.backup_dir.clone();
        self.records.pop();

        let retained_backup_dir = match fs::remove_dir_all(&backup_dir) {
            Ok(()) => {
                log.log(&format!("Removed backup {}", backup_dir.display()));
                None
            },
            Err(e) => {
                log.log(&format!(
                    "Failed to remove backup {}: {}",
                    backup_dir.display(),
                    e
                ));
                Some(backup_dir)
            },
        };

        Ok(UndoReport {
            token,
            succeeded,
            failed,
            fully_reversed: true,
            retained_backup_dir,
        })
    }
}
