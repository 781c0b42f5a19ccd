use anyhow::Result;
use batchren_core::{
    collect_files, parse_filter_patterns, preview, render_preview, FileEntry, OutputFormatter,
    Preview, PreviewResult, RuleSpec,
};

use crate::cli::{FileArgs, OutputFormat};

/// Collect the files named on the command line
pub fn collect(files: &FileArgs) -> Result<Vec<FileEntry>> {
    let filters = files
        .filter
        .as_deref()
        .map(parse_filter_patterns)
        .unwrap_or_default();
    collect_files(&files.paths, &filters)
}

pub fn handle_preview(
    rule: &RuleSpec,
    files: &FileArgs,
    format: Preview,
    use_color: Option<bool>,
    output: OutputFormat,
) -> Result<bool> {
    let entries = collect(files)?;
    let rows = preview(&entries, rule)?;

    let result = PreviewResult {
        rule: rule.to_string(),
        rows,
    };

    match output {
        OutputFormat::Json => println!("{}", result.format_json()),
        OutputFormat::Summary => {
            if format == Preview::None {
                print!("{}", result.format_summary());
            } else {
                println!("{}", render_preview(&result.rows, format, use_color));
            }
        },
    }

    Ok(true)
}
