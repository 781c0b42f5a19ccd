use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Append-only activity log shared by execute and undo.
///
/// Each line is `[YYYY-MM-DD HH:MM:SS] message`. A log without a file
/// discards everything.
#[derive(Debug, Default)]
pub struct OperationLog {
    path: Option<PathBuf>,
    file: Option<File>,
}

impl OperationLog {
    /// Open (or create) the log file, creating parent directories as needed
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            file: Some(file),
        })
    }

    /// A log that writes nowhere
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write one line. Logging never interrupts a rename, so write errors
    /// are swallowed after the first one disables the log.
    pub fn log(&mut self, message: &str) {
        if let Some(ref mut file) = self.file {
            let written = writeln!(
                file,
                "[{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                message
            )
            .and_then(|()| file.flush());
            if written.is_err() {
                self.file = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_appends_timestamped_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("nested").join("batchren.log");

        let mut log = OperationLog::open(&log_path).unwrap();
        log.log("first");
        log.log("second");
        drop(log);

        let mut log = OperationLog::open(&log_path).unwrap();
        log.log("third");

        let content = fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] first"));
        assert!(lines[2].ends_with("] third"));
    }

    #[test]
    fn test_disabled_log_is_silent() {
        let mut log = OperationLog::disabled();
        log.log("ignored");
        assert!(log.path().is_none());
    }
}
