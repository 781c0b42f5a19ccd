use anyhow::{anyhow, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::backup::BACKUP_DIR_PREFIX;
use crate::config::CONFIG_DIR;
use crate::error::ValidationError;

/// A candidate file as listed by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute path of the file
    pub original_path: PathBuf,
    /// Basename shown in previews
    pub display_name: String,
}

impl FileEntry {
    /// Build an entry, resolving relative paths against the current directory.
    ///
    /// The parent directory is canonicalized so one file always gets one
    /// path. Names that are not valid UTF-8 are rejected, since rules work
    /// on text.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .context("Failed to determine current directory")?
                .join(path)
        };
        let display_name = absolute
            .file_name()
            .ok_or_else(|| anyhow!("Path has no file name: {}", absolute.display()))?
            .to_str()
            .ok_or_else(|| ValidationError::NonUtf8Name(absolute.clone()))?
            .to_string();

        Ok(Self {
            original_path: normalize_path(&absolute),
            display_name,
        })
    }
}

/// Resolve `.`, `..` and symlinks in the parent directory, keeping the
/// final component as given. Falls back to the path unchanged when the
/// parent cannot be resolved.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return path.to_path_buf();
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    fs::canonicalize(parent).map_or_else(|_| path.to_path_buf(), |dir| dir.join(name))
}

/// Split user input such as `"*.jpg; *.png"` into individual glob patterns
pub fn parse_filter_patterns(input: &str) -> Vec<String> {
    input
        .split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Compiled basename filter. An empty filter accepts every file.
#[derive(Debug, Clone)]
pub struct NameFilter {
    set: Option<GlobSet>,
}

impl NameFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self { set: None });
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob =
                Glob::new(pattern).with_context(|| format!("Invalid filter pattern: {pattern}"))?;
            builder.add(glob);
        }
        let set = builder.build().context("Failed to build filter patterns")?;
        Ok(Self { set: Some(set) })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.set.as_ref().map_or(true, |set| set.is_match(name))
    }
}

/// Directories the tool writes itself; never walked into
fn is_internal_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry.file_name().to_str().is_some_and(|name| {
            name == CONFIG_DIR || name.starts_with(BACKUP_DIR_PREFIX)
        })
}

/// Collect the files to rename from a list of files and directories.
///
/// Directories are walked recursively in name order so the resulting
/// sequence is stable between runs. The config directory and backup
/// directories below a root are skipped. Filters are matched against the
/// basename. A file reached twice is listed once, at its first position.
pub fn collect_files(roots: &[PathBuf], filters: &[String]) -> Result<Vec<FileEntry>> {
    let filter = NameFilter::new(filters)?;
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for root in roots {
        let metadata = fs::metadata(root)
            .with_context(|| format!("Cannot access {}", root.display()))?;

        let candidates: Vec<PathBuf> = if metadata.is_dir() {
            WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_internal_dir(e))
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(walkdir::DirEntry::into_path)
                .collect()
        } else {
            vec![root.clone()]
        };

        for path in candidates {
            let entry = FileEntry::new(&path)?;
            if !filter.matches(&entry.display_name) {
                continue;
            }
            if seen.insert(entry.original_path.clone()) {
                entries.push(entry);
            }
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(entries: &[FileEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.display_name.as_str()).collect()
    }

    #[test]
    fn test_parse_filter_patterns() {
        assert_eq!(
            parse_filter_patterns("*.jpg; *.png ;;"),
            vec!["*.jpg".to_string(), "*.png".to_string()]
        );
        assert!(parse_filter_patterns("  ").is_empty());
    }

    #[test]
    fn test_collect_walks_directories_in_name_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("sub").join("c.txt"), "c").unwrap();

        let entries = collect_files(&[root.to_path_buf()], &[]).unwrap();
        assert_eq!(names(&entries), vec!["a.txt", "b.txt", "c.txt"]);
        assert!(entries.iter().all(|e| e.original_path.is_absolute()));
    }

    #[test]
    fn test_collect_applies_filters_to_basename() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("one.jpg"), "").unwrap();
        fs::write(root.join("two.png"), "").unwrap();
        fs::write(root.join("three.txt"), "").unwrap();

        let filters = parse_filter_patterns("*.jpg;*.png");
        let entries = collect_files(&[root.to_path_buf()], &filters).unwrap();
        assert_eq!(names(&entries), vec!["one.jpg", "two.png"]);
    }

    #[test]
    fn test_collect_keeps_explicit_file_order_and_dedupes() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let z = root.join("z.txt");
        let a = root.join("a.txt");
        fs::write(&z, "").unwrap();
        fs::write(&a, "").unwrap();

        let entries = collect_files(&[z.clone(), a, z], &[]).unwrap();
        assert_eq!(names(&entries), vec!["z.txt", "a.txt"]);
    }

    #[test]
    fn test_collect_skips_config_and_backup_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join(".batchren")).unwrap();
        fs::create_dir(root.join("rename_backup_20240101120000")).unwrap();
        fs::write(root.join(".batchren").join("batchren.log"), "").unwrap();
        fs::write(root.join("rename_backup_20240101120000").join("a.txt"), "").unwrap();
        fs::write(root.join("a.txt"), "").unwrap();

        let entries = collect_files(&[root.to_path_buf()], &[]).unwrap();
        assert_eq!(names(&entries), vec!["a.txt"]);
    }

    #[test]
    fn test_collect_dedupes_paths_through_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("w")).unwrap();
        fs::create_dir(root.join("x")).unwrap();
        fs::write(root.join("x").join("a.txt"), "").unwrap();

        let direct = root.join("x").join("a.txt");
        let detour = root.join("w").join("..").join("x").join("a.txt");
        let entries = collect_files(&[direct, detour], &[]).unwrap();

        assert_eq!(entries.len(), 1);
        assert!(!entries[0]
            .original_path
            .components()
            .any(|c| c == std::path::Component::ParentDir));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_are_rejected() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(OsStr::from_bytes(b"caf\xe9.txt"));
        if fs::write(&path, "").is_err() {
            // Filesystem refuses non-UTF-8 names
            return;
        }

        let err = collect_files(&[temp_dir.path().to_path_buf()], &[]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::NonUtf8Name(path))
        );
    }

    #[test]
    fn test_collect_missing_root_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = collect_files(&[temp_dir.path().join("nope")], &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_filter_pattern() {
        assert!(NameFilter::new(&["[".to_string()]).is_err());
        assert!(NameFilter::new(&[]).unwrap().matches("anything"));
    }
}
