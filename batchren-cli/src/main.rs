use anyhow::{Context, Result};
use batchren_core::{
    parse_filter_patterns, Config, OutputFormatter, RenameError, Session, ValidationError,
    VersionResult,
};
use clap::{CommandFactory, Parser};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process;

mod apply;
mod cli;
mod preview;
mod session;

use cli::{Cli, Commands, OutputFormat, PreviewArg};

fn main() {
    let cli = Cli::parse();

    // Handle -C directory flag
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("Failed to change to directory: {}", dir.display()))
            .unwrap_or_else(|e| {
                eprintln!("Error: {e:#}");
                process::exit(2);
            });
    }

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: {e:#}; using default settings");
        Config::default()
    });
    let use_color = if cli.no_color {
        Some(false)
    } else {
        config.defaults.use_color
    };

    let result = match cli.command {
        Commands::Preview {
            rule,
            start,
            files,
            preview: preview_arg,
            output,
        } => rule.to_rule(start, &config.defaults).and_then(|rule| {
            let format = PreviewArg::resolve(preview_arg, &config.defaults.preview_format);
            preview::handle_preview(&rule, &files, format, use_color, output)
        }),

        Commands::Apply {
            rule,
            start,
            files,
            preview: preview_arg,
            backup_root,
            output,
        } => rule.to_rule(start, &config.defaults).and_then(|rule| {
            let mut session = open_session(&config, backup_root)?;
            let options = apply::ApplyOptions {
                format: PreviewArg::resolve(preview_arg, &config.defaults.preview_format),
                use_color,
                yes: cli.yes,
                output,
            };
            apply::handle_apply(&rule, &files, &mut session, &options)
        }),

        Commands::Session {
            paths,
            filter,
            backup_root,
        } => handle_session(&config, paths, filter, backup_root, use_color, cli.yes),

        Commands::Completions { shell, dir } => handle_completions(shell, dir.as_deref()),

        Commands::Version { output } => handle_version(output),
    };

    match result {
        Ok(true) => process::exit(0),
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(exit_code(&e));
        },
    }
}

/// 1 for a rejected rule or batch, 2 for everything else
fn exit_code(error: &anyhow::Error) -> i32 {
    let rejected = error.downcast_ref::<ValidationError>().is_some()
        || error
            .downcast_ref::<RenameError>()
            .is_some_and(RenameError::is_validation);
    if rejected {
        1
    } else {
        2
    }
}

fn open_session(config: &Config, backup_root: Option<PathBuf>) -> Result<Session> {
    let session = Session::from_config(config).with_context(|| {
        format!(
            "Failed to open log file: {}",
            config.defaults.log_file.display()
        )
    })?;
    Ok(match backup_root {
        Some(backup_root) => session.with_backup_root(backup_root),
        None => session,
    })
}

fn handle_session(
    config: &Config,
    paths: Vec<PathBuf>,
    filter: Option<String>,
    backup_root: Option<PathBuf>,
    use_color: Option<bool>,
    yes: bool,
) -> Result<bool> {
    let mut session = open_session(config, backup_root)?;
    let mut state = session::SessionState::new(
        config.defaults.clone(),
        PreviewArg::resolve(None, &config.defaults.preview_format),
        use_color,
        yes,
    );
    for path in paths {
        state.add_path(path)?;
    }
    if let Some(filter) = filter {
        state.filters = parse_filter_patterns(&filter);
    }

    let interactive = io::stdin().is_terminal();
    if interactive {
        eprintln!("batchren session. Type 'help' for commands, 'quit' to leave.");
    }

    session::run_session(
        &mut session,
        &mut state,
        &mut io::stdin().lock(),
        &mut io::stdout().lock(),
        interactive,
    )?;

    if session.undo_depth() > 0 {
        eprintln!(
            "{} renames can no longer be undone; backups are kept on disk",
            session.undo_depth()
        );
    }

    Ok(true)
}

fn handle_completions(shell: clap_complete::Shell, dir: Option<&Path>) -> Result<bool> {
    let mut cmd = <Cli as CommandFactory>::command();
    match dir {
        Some(dir) => generate_completions(shell, &mut cmd, "batchren", dir)?,
        None => clap_complete::generate(shell, &mut cmd, "batchren", &mut io::stdout()),
    }
    Ok(true)
}

// Generate shell completions
pub fn generate_completions<G: clap_complete::Generator>(
    gen: G,
    cmd: &mut clap::Command,
    name: &str,
    out_dir: &Path,
) -> Result<()> {
    use clap_complete::generate_to;
    use std::fs;

    fs::create_dir_all(out_dir)?;
    let path = generate_to(gen, cmd, name, out_dir)?;
    println!("Generated completion file: {}", path.display());
    Ok(())
}

fn handle_version(output: OutputFormat) -> Result<bool> {
    let version_result = VersionResult {
        name: "batchren".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    println!("{}", version_result.format(output.into()));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap_complete::Shell;
    use tempfile::TempDir;

    #[test]
    fn test_generate_completions_bash() {
        let temp_dir = TempDir::new().unwrap();
        let mut cmd = <Cli as CommandFactory>::command();

        let result = generate_completions(Shell::Bash, &mut cmd, "batchren", temp_dir.path());

        assert!(result.is_ok());

        let completion_file = temp_dir.path().join("batchren.bash");
        assert!(completion_file.exists());

        let content = std::fs::read_to_string(completion_file).unwrap();
        assert!(content.contains("complete"));
        assert!(content.contains("batchren"));
    }

    #[test]
    fn test_generate_completions_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir.path().join("nested").join("dir");
        let mut cmd = <Cli as CommandFactory>::command();

        assert!(!nested_path.exists());

        let result = generate_completions(Shell::Zsh, &mut cmd, "batchren", &nested_path);

        assert!(result.is_ok());
        assert!(nested_path.join("_batchren").exists());
    }

    #[test]
    fn test_exit_codes() {
        let rejected = anyhow::Error::new(RenameError::from(ValidationError::TargetExists(
            PathBuf::from("x"),
        )));
        assert_eq!(exit_code(&rejected), 1);

        let rule = anyhow::Error::new(ValidationError::InvalidDateFormat {
            format: "%Q".to_string(),
        });
        assert_eq!(exit_code(&rule.context("while previewing")), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("disk on fire")), 2);
        assert_eq!(exit_code(&anyhow::Error::new(RenameError::NothingToUndo)), 2);
    }
}
