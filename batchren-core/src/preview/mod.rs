mod json;
mod summary;
mod table;

pub use json::render_json;
pub use summary::render_summary;
pub use table::render_table;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use crate::error::ValidationError;
use crate::files::FileEntry;
use crate::rule::{NameContext, RuleSpec};
use crate::transaction::RenamePair;

/// One row of a preview: what a file is called now and what it would become
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedName {
    pub original_path: PathBuf,
    pub original_name: String,
    pub proposed_name: String,
}

impl ProposedName {
    pub fn changed(&self) -> bool {
        self.original_name != self.proposed_name
    }

    /// Turn the confirmed row into an execute request
    pub fn to_pair(&self) -> RenamePair {
        RenamePair::new(&self.original_path, &self.proposed_name)
    }
}

/// Compute the proposed names for `files` in their given order, using the
/// current time for date-based rules.
pub fn preview(files: &[FileEntry], rule: &RuleSpec) -> Result<Vec<ProposedName>, ValidationError> {
    preview_at(files, rule, Local::now())
}

/// Same as [`preview`] with an explicit instant. One instant is used for the
/// whole batch.
pub fn preview_at(
    files: &[FileEntry],
    rule: &RuleSpec,
    now: DateTime<Local>,
) -> Result<Vec<ProposedName>, ValidationError> {
    let compiled = rule.compile()?;

    Ok(files
        .iter()
        .enumerate()
        .map(|(index, file)| ProposedName {
            original_path: file.original_path.clone(),
            original_name: file.display_name.clone(),
            proposed_name: compiled
                .generate_name(&file.display_name, &NameContext::new(index, now)),
        })
        .collect())
}

/// Execute requests for every row of a preview, in order
pub fn to_pairs(rows: &[ProposedName]) -> Vec<RenamePair> {
    rows.iter().map(ProposedName::to_pair).collect()
}

/// Indices of changing rows whose target collides with another row's target
pub fn find_collisions(rows: &[ProposedName]) -> HashSet<usize> {
    let mut by_target: HashMap<PathBuf, Vec<usize>> = HashMap::new();
    for (index, row) in rows.iter().enumerate().filter(|(_, row)| row.changed()) {
        by_target
            .entry(row.original_path.with_file_name(&row.proposed_name))
            .or_default()
            .push(index);
    }

    by_target
        .into_values()
        .filter(|indices| indices.len() > 1)
        .flatten()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preview {
    Table,
    Summary,
    Json,
    None,
}

impl std::str::FromStr for Preview {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "summary" => Ok(Self::Summary),
            "json" => Ok(Self::Json),
            "none" => Ok(Self::None),
            _ => Err(format!("Invalid preview format: {}", s)),
        }
    }
}

/// Determine whether to use colors based on explicit preference or terminal detection
pub fn should_use_color(use_color: Option<bool>) -> bool {
    use_color.unwrap_or_else(|| io::stdout().is_terminal())
}

/// Render the preview rows in the specified format
pub fn render_preview(rows: &[ProposedName], format: Preview, use_color: Option<bool>) -> String {
    let use_color = should_use_color(use_color);

    match format {
        Preview::Table => render_table(rows, use_color),
        Preview::Summary => render_summary(rows, use_color),
        Preview::Json => render_json(rows),
        Preview::None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entries(names: &[&str]) -> Vec<FileEntry> {
        names
            .iter()
            .map(|name| FileEntry {
                original_path: PathBuf::from("/photos").join(name),
                display_name: (*name).to_string(),
            })
            .collect()
    }

    fn proposed(rows: &[ProposedName]) -> Vec<&str> {
        rows.iter().map(|r| r.proposed_name.as_str()).collect()
    }

    #[test]
    fn test_preview_sequential_numbering_follows_input_order() {
        let files = entries(&["p1.jpg", "p2.jpg", "p3.jpg"]);
        let rule = RuleSpec::SequentialNumber {
            format: "img_{n:03d}".to_string(),
            start: 1,
        };

        let rows = preview(&files, &rule).unwrap();
        assert_eq!(
            proposed(&rows),
            vec!["img_001.jpg", "img_002.jpg", "img_003.jpg"]
        );
        assert_eq!(rows[2].original_path, PathBuf::from("/photos/p3.jpg"));
    }

    #[test]
    fn test_preview_is_idempotent() {
        let files = entries(&["a.txt", "b.txt"]);
        let rule = RuleSpec::DatePrefix {
            date_format: "%Y%m%d-%H%M%S".to_string(),
        };
        let now = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let first = preview_at(&files, &rule, now).unwrap();
        let second = preview_at(&files, &rule, now).unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].proposed_name, "20240102-030405_a.txt");
    }

    #[test]
    fn test_preview_rejects_invalid_rule() {
        let files = entries(&["a.txt"]);
        let rule = RuleSpec::RegexReplace {
            pattern: "[".to_string(),
            replacement: String::new(),
        };
        assert!(matches!(
            preview(&files, &rule),
            Err(ValidationError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_find_collisions() {
        let files = entries(&["a.txt", "b.txt", "c.txt"]);
        let rule = RuleSpec::RegexReplace {
            pattern: "^[ab]".to_string(),
            replacement: "z".to_string(),
        };
        let rows = preview(&files, &rule).unwrap();

        let collisions = find_collisions(&rows);
        assert_eq!(collisions, HashSet::from([0, 1]));
    }

    #[test]
    fn test_to_pairs_and_changed() {
        let files = entries(&["a.txt", "b.txt"]);
        let rule = RuleSpec::ReplaceText {
            search: "a".to_string(),
            replace: "x".to_string(),
        };
        let rows = preview(&files, &rule).unwrap();

        assert!(rows[0].changed());
        assert!(!rows[1].changed());
        let pairs = to_pairs(&rows);
        assert_eq!(pairs[0], RenamePair::new("/photos/a.txt", "x.txt"));
        assert!(pairs[1].is_noop());
    }

    #[test]
    fn test_preview_format_from_str() {
        assert_eq!("TABLE".parse::<Preview>(), Ok(Preview::Table));
        assert_eq!("none".parse::<Preview>(), Ok(Preview::None));
        assert!("diff".parse::<Preview>().is_err());
    }
}
