use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Name prefix of every backup directory
pub const BACKUP_DIR_PREFIX: &str = "rename_backup_";

const CREATE_ATTEMPTS: usize = 3;

/// Create a fresh `rename_backup_<YYYYMMDDHHMMSS>` directory under `root`.
///
/// The directory is created exclusively. When the name for the current
/// second is taken, wait for the next second and try again.
pub fn create_backup_dir(root: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(root)?;

    for _ in 0..CREATE_ATTEMPTS {
        let now = chrono::Local::now();
        let dir = root.join(format!("{}{}", BACKUP_DIR_PREFIX, now.format("%Y%m%d%H%M%S")));
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let into_second = u64::from(now.timestamp_subsec_millis()).min(999);
                thread::sleep(Duration::from_millis(1000 - into_second + 10));
            },
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!(
            "no free backup directory name under {} after {} attempts",
            root.display(),
            CREATE_ATTEMPTS
        ),
    ))
}

/// Copy `source` into `backup_dir` under its basename and return the backup
/// path together with the content checksum.
///
/// Permissions come along with the copy; the modification time is carried
/// over when the platform allows it. An existing backup is never replaced.
pub fn backup_file(source: &Path, backup_dir: &Path) -> io::Result<(PathBuf, String)> {
    let name = source.file_name().ok_or_else(|| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} has no file name", source.display()),
        )
    })?;
    let backup_path = backup_dir.join(name);
    if backup_path.exists() {
        return Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("backup {} already exists", backup_path.display()),
        ));
    }

    let source_checksum = calculate_checksum(source)?;
    fs::copy(source, &backup_path)?;

    if let Ok(modified) = fs::metadata(source).and_then(|m| m.modified()) {
        if let Ok(copy) = File::options().write(true).open(&backup_path) {
            let _ = copy.set_modified(modified);
        }
    }

    let backup_checksum = calculate_checksum(&backup_path)?;
    if backup_checksum != source_checksum {
        let _ = fs::remove_file(&backup_path);
        return Err(io::Error::new(
            ErrorKind::InvalidData,
            format!("backup of {} does not match the original", source.display()),
        ));
    }

    Ok((backup_path, source_checksum))
}

/// Calculate SHA256 checksum of a file
pub fn calculate_checksum(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
