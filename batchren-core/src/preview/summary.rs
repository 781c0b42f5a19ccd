use nu_ansi_term::{Color, Style};
use std::fmt::Write;

use super::{find_collisions, ProposedName};

/// Render preview rows as a compact line-per-change listing
pub fn render_summary(rows: &[ProposedName], use_color: bool) -> String {
    let mut output = String::new();
    let collisions = find_collisions(rows);
    let changed = rows.iter().filter(|r| r.changed()).count();

    let header = Style::new().bold();
    let arrow = Color::Green.normal();
    let clash = Color::Red.bold();
    let paint = |style: Style, text: &str| {
        if use_color {
            style.paint(text).to_string()
        } else {
            text.to_string()
        }
    };

    writeln!(output, "{}", paint(header, "[PREVIEW]")).unwrap();
    writeln!(output, "Files: {}", rows.len()).unwrap();
    writeln!(output, "Changing: {}", changed).unwrap();
    writeln!(output, "Unchanged: {}", rows.len() - changed).unwrap();
    if !collisions.is_empty() {
        writeln!(
            output,
            "{}",
            paint(clash, &format!("Collisions: {}", collisions.len()))
        )
        .unwrap();
    }

    if changed > 0 {
        writeln!(output).unwrap();
        writeln!(output, "{}", paint(header, "[RENAMES]")).unwrap();
        for (index, row) in rows.iter().enumerate().filter(|(_, r)| r.changed()) {
            let marker = if collisions.contains(&index) {
                paint(clash, " !")
            } else {
                String::new()
            };
            writeln!(
                output,
                "{} {} {}{}",
                row.original_name,
                paint(arrow, "->"),
                row.proposed_name,
                marker
            )
            .unwrap();
        }
    }

    output
}
