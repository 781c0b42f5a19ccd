use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::backup::{backup_file, create_backup_dir};
use crate::error::{FailureKind, OperationFailure, RenameError, ValidationError};
use crate::files::normalize_path;
use crate::log::OperationLog;

/// One confirmed preview row: rename `original_path` to `proposed_name`
/// inside the same directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePair {
    pub original_path: PathBuf,
    pub proposed_name: String,
}

impl RenamePair {
    pub fn new(original_path: impl Into<PathBuf>, proposed_name: impl Into<String>) -> Self {
        Self {
            original_path: original_path.into(),
            proposed_name: proposed_name.into(),
        }
    }

    /// True when the proposed name equals the current basename
    pub fn is_noop(&self) -> bool {
        self.original_path
            .file_name()
            .is_some_and(|name| name == self.proposed_name.as_str())
    }

    /// Sibling path carrying the proposed name
    pub fn target_path(&self) -> PathBuf {
        self.original_path.with_file_name(&self.proposed_name)
    }
}

/// A rename that was carried out, with everything needed to reverse it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOperation {
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    pub backup_path: PathBuf,
    /// SHA-256 of the content at backup time
    pub checksum: String,
}

#[derive(Debug, Clone)]
struct PlannedRename {
    original_path: PathBuf,
    new_path: PathBuf,
}

/// What a transaction did on disk
#[derive(Debug, Default)]
pub struct ExecutionOutcome {
    pub completed: Vec<RenameOperation>,
    pub failed: Vec<OperationFailure>,
    /// Backup directory holding copies of the completed operations. `None`
    /// when nothing was renamed.
    pub backup_dir: Option<PathBuf>,
}

/// A batch that passed the admission check and is ready to run.
#[derive(Debug)]
pub struct Transaction {
    renames: Vec<PlannedRename>,
    skipped: usize,
}

impl Transaction {
    /// Check the whole batch before touching anything.
    ///
    /// Pairs whose name does not change are dropped. Every remaining pair
    /// needs an existing regular file as source, a valid single-component
    /// name, a free target, a target no other pair uses, and a basename no
    /// other pair uses (backups are stored flat).
    pub fn admit(pairs: &[RenamePair]) -> Result<Self, ValidationError> {
        let mut renames = Vec::new();
        let mut skipped = 0;
        let mut targets: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
        let mut backup_names: HashMap<OsString, Vec<PathBuf>> = HashMap::new();

        for pair in pairs {
            if pair.is_noop() {
                skipped += 1;
                continue;
            }

            let original = &pair.original_path;
            let Some(file_name) = original.file_name() else {
                return Err(ValidationError::MissingSource(original.clone()));
            };
            if file_name.to_str().is_none() {
                return Err(ValidationError::NonUtf8Name(original.clone()));
            }

            validate_name(&pair.proposed_name).map_err(|reason| ValidationError::InvalidName {
                source_path: original.clone(),
                name: pair.proposed_name.clone(),
                reason,
            })?;

            match fs::metadata(original) {
                Ok(metadata) if metadata.is_file() => {},
                Ok(_) => return Err(ValidationError::NotAFile(original.clone())),
                Err(_) => return Err(ValidationError::MissingSource(original.clone())),
            }

            let new_path = pair.target_path();
            if path_exists(&new_path) && !is_case_only_rename(original, &new_path) {
                return Err(ValidationError::TargetExists(new_path));
            }

            targets
                .entry(normalize_path(&new_path))
                .or_default()
                .push(original.clone());
            backup_names
                .entry(file_name.to_os_string())
                .or_default()
                .push(original.clone());
            renames.push(PlannedRename {
                original_path: original.clone(),
                new_path,
            });
        }

        for planned in &renames {
            let sources = &targets[&normalize_path(&planned.new_path)];
            if sources.len() > 1 {
                return Err(ValidationError::DuplicateTarget {
                    target: planned.new_path.clone(),
                    sources: sources.clone(),
                });
            }

            if let Some(name) = planned.original_path.file_name() {
                let sources = &backup_names[name];
                if sources.len() > 1 {
                    return Err(ValidationError::DuplicateBackupName {
                        name: name.to_string_lossy().into_owned(),
                        sources: sources.clone(),
                    });
                }
            }
        }

        Ok(Self { renames, skipped })
    }

    /// Number of files that will actually be renamed
    pub fn len(&self) -> usize {
        self.renames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    /// Number of pairs dropped because their name does not change
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Back up and rename every admitted file, in order.
    ///
    /// A failing file is reported and the batch moves on to the next one.
    /// Completed renames are never rolled back here; the caller receives
    /// them so they can be undone as a unit.
    pub fn execute(
        self,
        backup_root: &Path,
        log: &mut OperationLog,
    ) -> Result<ExecutionOutcome, RenameError> {
        if self.renames.is_empty() {
            return Ok(ExecutionOutcome::default());
        }

        log.log(&format!("Starting rename of {} files", self.renames.len()));

        let backup_dir = create_backup_dir(backup_root).map_err(|e| {
            log.log(&format!("Failed to create backup directory: {}", e));
            RenameError::io(
                format!(
                    "Failed to create backup directory in {}",
                    backup_root.display()
                ),
                e,
            )
        })?;
        log.log(&format!("Backup directory: {}", backup_dir.display()));

        let mut outcome = ExecutionOutcome::default();

        for planned in self.renames {
            let (backup_path, checksum) = match backup_file(&planned.original_path, &backup_dir) {
                Ok(backup) => backup,
                Err(e) => {
                    log.log(&format!(
                        "Failed to back up {}: {}",
                        planned.original_path.display(),
                        e
                    ));
                    outcome.failed.push(OperationFailure {
                        original_path: planned.original_path,
                        target_path: planned.new_path,
                        kind: FailureKind::Io,
                        message: format!("backup failed: {}", e),
                    });
                    continue;
                },
            };

            log.log(&format!(
                "Renaming {} -> {}",
                planned.original_path.display(),
                planned.new_path.display()
            ));

            match rename_no_replace(&planned.original_path, &planned.new_path) {
                Ok(()) => outcome.completed.push(RenameOperation {
                    original_path: planned.original_path,
                    new_path: planned.new_path,
                    backup_path,
                    checksum,
                }),
                Err((kind, message)) => {
                    log.log(&format!(
                        "Failed to rename {}: {}",
                        planned.original_path.display(),
                        message
                    ));
                    // The original is untouched, so its copy is not needed
                    let _ = fs::remove_file(&backup_path);
                    outcome.failed.push(OperationFailure {
                        original_path: planned.original_path,
                        target_path: planned.new_path,
                        kind,
                        message,
                    });
                },
            }
        }

        if outcome.completed.is_empty() {
            let _ = fs::remove_dir_all(&backup_dir);
            log.log("No file was renamed; backup directory removed");
        } else {
            outcome.backup_dir = Some(backup_dir);
        }

        log.log(&format!(
            "Rename finished: {} succeeded, {} failed",
            outcome.completed.len(),
            outcome.failed.len()
        ));

        Ok(outcome)
    }
}

/// Reject names that are not a single path component
fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is empty");
    }
    if name == "." || name == ".." {
        return Err("name is reserved");
    }
    if name.chars().any(|c| c == '/' || std::path::is_separator(c)) {
        return Err("name contains a path separator");
    }
    if name.contains('\0') {
        return Err("name contains a NUL byte");
    }
    Ok(())
}

fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// On a case-insensitive filesystem `Photo.JPG` and `photo.jpg` name the
/// same file; renaming one to the other is allowed.
fn is_case_only_rename(from: &Path, to: &Path) -> bool {
    let (Some(from_name), Some(to_name)) = (from.file_name(), to.file_name()) else {
        return false;
    };
    from_name != to_name
        && from_name.to_string_lossy().to_lowercase() == to_name.to_string_lossy().to_lowercase()
        && is_same_file(from, to)
}

#[cfg(unix)]
fn is_same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase(),
        _ => false,
    }
}

/// Rename `from` to `to` without ever replacing an existing file.
///
/// A case-only rename of the same file goes through a temporary name so it
/// also works on case-insensitive filesystems.
pub(crate) fn rename_no_replace(from: &Path, to: &Path) -> Result<(), (FailureKind, String)> {
    if path_exists(to) {
        if !is_case_only_rename(from, to) {
            return Err((
                FailureKind::TargetOccupied,
                format!("{} already exists", to.display()),
            ));
        }

        let temp = from.with_file_name(format!(
            ".{}.{}.batchren.tmp",
            from.file_name().unwrap_or_default().to_string_lossy(),
            std::process::id()
        ));
        fs::rename(from, &temp).map_err(|e| {
            (
                FailureKind::Io,
                format!("failed to rename {} to temp: {}", from.display(), e),
            )
        })?;
        return fs::rename(&temp, to).map_err(|e| {
            let _ = fs::rename(&temp, from);
            (
                FailureKind::Io,
                format!("failed to rename temp to {}: {}", to.display(), e),
            )
        });
    }

    fs::rename(from, to).map_err(|e| {
        (
            FailureKind::Io,
            format!(
                "failed to rename {} to {}: {}",
                from.display(),
                to.display(),
                e
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(names: &[&str]) -> (TempDir, Vec<PathBuf>) {
        let temp_dir = TempDir::new().unwrap();
        let paths = names
            .iter()
            .map(|name| {
                let path = temp_dir.path().join(name);
                fs::write(&path, format!("content of {name}")).unwrap();
                path
            })
            .collect();
        (temp_dir, paths)
    }

    #[test]
    fn test_admit_skips_noop_pairs() {
        let (_dir, paths) = setup(&["a.txt", "b.txt"]);
        let pairs = vec![
            RenamePair::new(&paths[0], "x.txt"),
            RenamePair::new(&paths[1], "b.txt"),
        ];

        let tx = Transaction::admit(&pairs).unwrap();
        assert_eq!(tx.len(), 1);
        assert_eq!(tx.skipped(), 1);
    }

    #[test]
    fn test_admit_rejects_missing_source() {
        let (dir, _) = setup(&[]);
        let missing = dir.path().join("ghost.txt");
        let err = Transaction::admit(&[RenamePair::new(&missing, "x.txt")]).unwrap_err();
        assert_eq!(err, ValidationError::MissingSource(missing));
    }

    #[test]
    fn test_admit_rejects_directories() {
        let (dir, _) = setup(&[]);
        let sub = dir.path().join("folder");
        fs::create_dir(&sub).unwrap();
        let err = Transaction::admit(&[RenamePair::new(&sub, "renamed")]).unwrap_err();
        assert_eq!(err, ValidationError::NotAFile(sub));
    }

    #[test]
    fn test_admit_rejects_existing_target() {
        let (_dir, paths) = setup(&["a.txt", "b.txt"]);
        let err = Transaction::admit(&[RenamePair::new(&paths[0], "b.txt")]).unwrap_err();
        assert_eq!(err, ValidationError::TargetExists(paths[1].clone()));
    }

    #[test]
    fn test_admit_rejects_duplicate_targets() {
        let (dir, paths) = setup(&["a.txt", "b.txt"]);
        let pairs = vec![
            RenamePair::new(&paths[0], "c.txt"),
            RenamePair::new(&paths[1], "c.txt"),
        ];

        match Transaction::admit(&pairs).unwrap_err() {
            ValidationError::DuplicateTarget { target, sources } => {
                assert_eq!(target, dir.path().join("c.txt"));
                assert_eq!(sources, paths);
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_admit_rejects_duplicate_targets_through_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("w")).unwrap();
        fs::create_dir(root.join("x")).unwrap();
        fs::write(root.join("x").join("a.txt"), "a").unwrap();
        fs::write(root.join("x").join("b.txt"), "b").unwrap();

        let pairs = vec![
            RenamePair::new(root.join("w").join("..").join("x").join("a.txt"), "c.txt"),
            RenamePair::new(root.join("x").join("b.txt"), "c.txt"),
        ];
        let err = Transaction::admit(&pairs).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateTarget { ref sources, .. } if sources.len() == 2));
        assert!(root.join("x").join("a.txt").exists());
        assert!(!root.join("x").join("c.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_admit_rejects_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(OsStr::from_bytes(b"caf\xe9.txt"));
        if fs::write(&path, "cafe").is_err() {
            return;
        }

        let err = Transaction::admit(&[RenamePair::new(&path, "caf\u{fffd}.txt")]).unwrap_err();
        assert_eq!(err, ValidationError::NonUtf8Name(path.clone()));
        assert!(path.exists());
    }

    #[test]
    fn test_admit_rejects_shared_basenames() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("one").join("photo.jpg");
        let second = temp_dir.path().join("two").join("photo.jpg");
        for path in [&first, &second] {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "jpg").unwrap();
        }

        let pairs = vec![
            RenamePair::new(&first, "a.jpg"),
            RenamePair::new(&second, "b.jpg"),
        ];
        let err = Transaction::admit(&pairs).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateBackupName { ref name, .. } if name == "photo.jpg"));
    }

    #[test]
    fn test_admit_rejects_invalid_names() {
        let (_dir, paths) = setup(&["a.txt"]);
        for bad in ["", ".", "..", "sub/dir.txt"] {
            let err = Transaction::admit(&[RenamePair::new(&paths[0], bad)]).unwrap_err();
            assert!(
                matches!(err, ValidationError::InvalidName { .. }),
                "expected invalid name for {bad:?}"
            );
        }
    }

    #[test]
    fn test_execute_renames_and_backs_up() {
        let (dir, paths) = setup(&["a.txt", "b.txt"]);
        let pairs = vec![
            RenamePair::new(&paths[0], "x.txt"),
            RenamePair::new(&paths[1], "y.txt"),
        ];
        let mut log = OperationLog::disabled();

        let outcome = Transaction::admit(&pairs)
            .unwrap()
            .execute(dir.path(), &mut log)
            .unwrap();

        assert_eq!(outcome.completed.len(), 2);
        assert!(outcome.failed.is_empty());
        assert!(!paths[0].exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("x.txt")).unwrap(),
            "content of a.txt"
        );

        let backup_dir = outcome.backup_dir.unwrap();
        assert_eq!(
            fs::read_to_string(backup_dir.join("a.txt")).unwrap(),
            "content of a.txt"
        );
        assert_eq!(outcome.completed[1].backup_path, backup_dir.join("b.txt"));
    }

    #[test]
    fn test_execute_empty_transaction_creates_nothing() {
        let (dir, paths) = setup(&["a.txt"]);
        let mut log = OperationLog::disabled();
        let tx = Transaction::admit(&[RenamePair::new(&paths[0], "a.txt")]).unwrap();
        assert!(tx.is_empty());

        let outcome = tx.execute(dir.path(), &mut log).unwrap();
        assert!(outcome.backup_dir.is_none());
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_rename_no_replace_refuses_occupied_target() {
        let (_dir, paths) = setup(&["a.txt", "b.txt"]);
        let (kind, _) = rename_no_replace(&paths[0], &paths[1]).unwrap_err();
        assert_eq!(kind, FailureKind::TargetOccupied);
        assert_eq!(fs::read_to_string(&paths[1]).unwrap(), "content of b.txt");
    }
}
