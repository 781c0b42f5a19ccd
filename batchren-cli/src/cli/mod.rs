pub mod args;
pub mod types;

pub use args::{Cli, Commands, FileArgs, RuleArgs};
pub use types::{OutputFormat, PreviewArg};
