use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Config;
use crate::error::{OperationFailure, RenameError};
use crate::files::FileEntry;
use crate::log::OperationLog;
use crate::preview::{preview, ProposedName};
use crate::rule::RuleSpec;
use crate::transaction::{RenameOperation, RenamePair, Transaction};
use crate::undo::{UndoRecord, UndoReport, UndoStack, UndoToken};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Directory in which backup directories are created
    pub backup_root: PathBuf,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            backup_root: PathBuf::from("."),
        }
    }
}

/// Result of one execute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteReport {
    pub succeeded: Vec<RenameOperation>,
    pub failed: Vec<OperationFailure>,
    /// Pairs left alone because their name does not change
    pub skipped: usize,
    /// Handle for undo; `None` when nothing was renamed
    pub undo_token: Option<UndoToken>,
    pub backup_dir: Option<PathBuf>,
}

impl ExecuteReport {
    /// True when every admitted rename went through
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A caller-owned renaming session.
///
/// The session owns the undo stack, so independent sessions never see each
/// other's records. Undo history lives only as long as the session.
#[derive(Debug, Default)]
pub struct Session {
    options: SessionOptions,
    log: OperationLog,
    stack: UndoStack,
    next_token: u64,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Build a session from the loaded config, opening its log file
    pub fn from_config(config: &Config) -> std::io::Result<Self> {
        let log = match config.log_path() {
            Some(path) => OperationLog::open(path)?,
            None => OperationLog::disabled(),
        };
        Ok(Self::new(SessionOptions {
            backup_root: config.defaults.backup_root.clone(),
        })
        .with_log(log))
    }

    #[must_use]
    pub fn with_log(mut self, log: OperationLog) -> Self {
        self.log = log;
        self
    }

    /// Create backup directories under `backup_root` instead
    #[must_use]
    pub fn with_backup_root(mut self, backup_root: PathBuf) -> Self {
        self.options.backup_root = backup_root;
        self
    }

    /// Proposed names for `files` under `rule`. Touches nothing on disk.
    pub fn preview(
        &self,
        files: &[FileEntry],
        rule: &RuleSpec,
    ) -> Result<Vec<ProposedName>, RenameError> {
        Ok(preview(files, rule)?)
    }

    /// Admit and run a batch of renames, pushing an undo record for
    /// whatever completed.
    pub fn execute(&mut self, pairs: &[RenamePair]) -> Result<ExecuteReport, RenameError> {
        let transaction = Transaction::admit(pairs).map_err(|e| {
            self.log.log(&format!("Batch rejected: {}", e));
            e
        })?;
        self.execute_admitted(transaction)
    }

    /// Run a batch that already passed [`Transaction::admit`]
    pub fn execute_admitted(
        &mut self,
        transaction: Transaction,
    ) -> Result<ExecuteReport, RenameError> {
        let skipped = transaction.skipped();
        let outcome = transaction.execute(&self.options.backup_root, &mut self.log)?;

        let undo_token = match outcome.backup_dir.clone() {
            Some(backup_dir) if !outcome.completed.is_empty() => {
                self.next_token += 1;
                let token = UndoToken::new(self.next_token);
                self.stack.push(UndoRecord {
                    token,
                    created_at: chrono::Local::now().to_rfc3339(),
                    operations: outcome.completed.clone(),
                    backup_dir,
                });
                self.log.log(&format!(
                    "Recorded undo {} for {} renames",
                    token,
                    outcome.completed.len()
                ));
                Some(token)
            },
            _ => None,
        };

        Ok(ExecuteReport {
            succeeded: outcome.completed,
            failed: outcome.failed,
            skipped,
            undo_token,
            backup_dir: outcome.backup_dir,
        })
    }

    /// Undo the record named by `token`, which must be the most recent one
    pub fn undo(&mut self, token: UndoToken) -> Result<UndoReport, RenameError> {
        self.stack.undo(token, &mut self.log)
    }

    /// Undo whatever record is on top of the stack
    pub fn undo_latest(&mut self) -> Result<UndoReport, RenameError> {
        let token = self.latest_token().ok_or(RenameError::NothingToUndo)?;
        self.undo(token)
    }

    pub fn latest_token(&self) -> Option<UndoToken> {
        self.stack.peek().map(|record| record.token)
    }

    /// Number of records that can still be undone
    pub fn undo_depth(&self) -> usize {
        self.stack.len()
    }

    /// Files renamed by the latest record whose content changed since.
    /// Undo still restores them; this only lets a caller warn first.
    pub fn modified_since_execute(&self) -> Vec<PathBuf> {
        self.stack
            .peek()
            .map(UndoRecord::modified_files)
            .unwrap_or_default()
    }
}
