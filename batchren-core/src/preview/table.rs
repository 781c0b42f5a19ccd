use comfy_table::{Cell, Color, ContentArrangement, Table};
use std::io::{self, IsTerminal};
use std::path::Path;

use super::{find_collisions, ProposedName};

/// Render preview rows as a table
pub fn render_table(rows: &[ProposedName], use_color: bool) -> String {
    let mut table = Table::new();

    if io::stdout().is_terminal() {
        table.set_content_arrangement(ContentArrangement::Dynamic);
    } else {
        table.set_content_arrangement(ContentArrangement::Disabled);
    }

    // Force styling even in non-TTY environments when colors are explicitly requested
    if use_color {
        table.enforce_styling();
        table.set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Directory").fg(Color::Cyan),
            Cell::new("Original").fg(Color::Cyan),
            Cell::new("Proposed").fg(Color::Cyan),
        ]);
    } else {
        table.set_header(vec!["#", "Directory", "Original", "Proposed"]);
    }

    let collisions = find_collisions(rows);

    for (index, row) in rows.iter().enumerate() {
        let dir = display_dir(row.original_path.parent());
        let number = (index + 1).to_string();

        let (proposed, color) = if collisions.contains(&index) {
            (format!("{} (collision)", row.proposed_name), Color::Red)
        } else if row.changed() {
            (format!("→ {}", row.proposed_name), Color::Green)
        } else {
            ("(unchanged)".to_string(), Color::DarkGrey)
        };

        if use_color {
            table.add_row(vec![
                Cell::new(number).fg(Color::DarkGrey),
                Cell::new(dir),
                Cell::new(&row.original_name),
                Cell::new(proposed).fg(color),
            ]);
        } else {
            table.add_row(vec![number, dir, row.original_name.clone(), proposed]);
        }
    }

    let changed = rows.iter().filter(|r| r.changed()).count();
    let footer = format!("{} of {} files change", changed, rows.len());
    if use_color {
        table.add_row(vec![
            Cell::new("TOTAL").fg(Color::Cyan),
            Cell::new(""),
            Cell::new(""),
            Cell::new(footer).fg(Color::White),
        ]);
    } else {
        table.add_row(vec!["TOTAL".to_string(), String::new(), String::new(), footer]);
    }

    table.to_string()
}

/// Make a directory relative to the current directory for cleaner display
fn display_dir(dir: Option<&Path>) -> String {
    let Some(dir) = dir else {
        return String::new();
    };
    match std::env::current_dir()
        .ok()
        .and_then(|cwd| dir.strip_prefix(cwd).ok())
    {
        Some(relative) if relative.as_os_str().is_empty() => ".".to_string(),
        Some(relative) => relative.display().to_string(),
        None => dir.display().to_string(),
    }
}
