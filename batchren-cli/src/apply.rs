use anyhow::{Context, Result};
use batchren_core::{
    preview, render_preview, to_pairs, OutputFormatter, Preview, RuleSpec, Session,
};
use std::io::{self, BufRead, Write};

use crate::cli::{FileArgs, OutputFormat};
use crate::preview::collect;

pub struct ApplyOptions {
    pub format: Preview,
    pub use_color: Option<bool>,
    pub yes: bool,
    pub output: OutputFormat,
}

/// Preview, confirm and execute. Returns false when some rename failed.
pub fn handle_apply(
    rule: &RuleSpec,
    files: &FileArgs,
    session: &mut Session,
    options: &ApplyOptions,
) -> Result<bool> {
    let entries = collect(files)?;
    let rows = preview(&entries, rule)?;
    let changing = rows.iter().filter(|r| r.changed()).count();

    if options.output == OutputFormat::Summary && options.format != Preview::None {
        println!("{}", render_preview(&rows, options.format, options.use_color));
    }

    if changing > 0 && !options.yes {
        let confirmed = confirm_with_input(&mut io::stdin().lock(), changing)?;
        if !confirmed {
            eprintln!("Aborted; no files were renamed");
            return Ok(true);
        }
    }

    let report = session
        .execute(&to_pairs(&rows))
        .with_context(|| format!("Failed to apply rule: {}", rule))?;

    match options.output {
        OutputFormat::Json => println!("{}", report.format_json()),
        OutputFormat::Summary => print!("{}", report.format_summary()),
    }

    Ok(report.is_complete())
}

/// Ask before renaming. Anything but an explicit yes declines.
pub fn confirm_with_input<R: BufRead>(reader: &mut R, count: usize) -> Result<bool> {
    eprint!("Rename {} files? [y/N]: ", count);
    io::stderr().flush()?;

    let mut input = String::new();
    reader.read_line(&mut input)?;
    Ok(matches!(
        input.trim().to_lowercase().as_str(),
        "y" | "yes"
    ))
}
