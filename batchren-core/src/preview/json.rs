use super::ProposedName;

/// Render preview rows as JSON
pub fn render_json(rows: &[ProposedName]) -> String {
    serde_json::to_string_pretty(rows).unwrap_or_else(|_| "null".to_string())
}
