#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod backup;
pub mod config;
pub mod error;
pub mod files;
pub mod log;
pub mod output;
pub mod preview;
pub mod rule;
pub mod session;
pub mod transaction;
pub mod undo;

pub use config::Config;
pub use error::{FailureKind, OperationFailure, RenameError, ValidationError};
pub use files::{collect_files, parse_filter_patterns, FileEntry, NameFilter};
pub use log::OperationLog;
pub use output::{
    OutputFormat, OutputFormatter, PreviewResult, StatusResult, VersionResult,
};
pub use preview::{
    find_collisions, preview, preview_at, render_preview, should_use_color, to_pairs, Preview,
    ProposedName,
};
pub use rule::{CompiledRule, NameContext, RuleSpec, SequenceFormat};
pub use session::{ExecuteReport, Session, SessionOptions};
pub use transaction::{ExecutionOutcome, RenameOperation, RenamePair, Transaction};
pub use undo::{UndoRecord, UndoReport, UndoStack, UndoToken};
