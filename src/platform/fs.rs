// IntuneLens - platform/fs.rs
//
// Filesystem helpers: reading log files, locating the newest log in the
// Intune log directory, and atomic export writes.

use crate::util::constants::LOG_FILE_PATTERN;
use crate::util::error::{ExportError, LoadError};
use glob::Pattern;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Read the full content of a log file.
///
/// The file must be a regular file holding valid UTF-8; anything else is a
/// `LoadError` so the caller can keep its previous snapshot.
pub fn read_log_file(path: &Path) -> Result<String, LoadError> {
    let metadata = std::fs::metadata(path).map_err(|e| LoadError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    if !metadata.is_file() {
        return Err(LoadError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let bytes = std::fs::read(path).map_err(|e| LoadError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    String::from_utf8(bytes).map_err(|e| LoadError::InvalidEncoding {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Find the most recently modified `*.log` file directly inside `dir`.
///
/// Entries whose metadata cannot be read are skipped.
pub fn latest_log_file(dir: &Path) -> Result<PathBuf, LoadError> {
    let pattern = Pattern::new(LOG_FILE_PATTERN).expect("LOG_FILE_PATTERN is a valid glob");

    let entries = std::fs::read_dir(dir).map_err(|e| LoadError::Read {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if !pattern.matches(&name.to_string_lossy()) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        let newer = latest.as_ref().map_or(true, |(best, _)| modified > *best);
        if newer {
            latest = Some((modified, entry.path()));
        }
    }

    match latest {
        Some((_, path)) => {
            tracing::debug!(dir = %dir.display(), file = %path.display(), "Latest log file found");
            Ok(path)
        }
        None => Err(LoadError::NoLogFiles {
            dir: dir.to_path_buf(),
        }),
    }
}

/// Write an export file atomically (write temp -> rename).
///
/// `write` receives a buffered writer on a sibling temp file. If it fails, or
/// the flush/rename fails, the temp file is removed and any existing file at
/// `path` is left untouched.
pub fn write_atomic<T, F>(path: &Path, write: F) -> Result<T, ExportError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<T, ExportError>,
{
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file_name = path.file_name().ok_or_else(|| {
        io_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "export path has no file name",
        ))
    })?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let result = File::create(&tmp).map_err(io_err).and_then(|file| {
        let mut writer = BufWriter::new(file);
        let value = write(&mut writer)?;
        writer.flush().map_err(io_err)?;
        Ok(value)
    });

    let result = result.and_then(|value| {
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(value)
    });

    if result.is_err() {
        // Best effort; the temp file may never have been created.
        let _ = std::fs::remove_file(&tmp);
    } else {
        tracing::info!(path = %path.display(), "Export written");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_read_log_file_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.log");
        std::fs::write(&path, [0xff, 0xfe, 0x00, b'a']).unwrap();
        assert!(matches!(
            read_log_file(&path),
            Err(LoadError::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn test_read_log_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_log_file(&dir.path().join("missing.log"));
        assert!(matches!(result, Err(LoadError::Read { .. })));
    }

    #[test]
    fn test_read_log_file_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_log_file(dir.path()),
            Err(LoadError::NotAFile { .. })
        ));
    }

    #[test]
    fn test_latest_log_file_picks_newest_log() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("IntuneMDMDaemon 2025-07-21.log");
        let new = dir.path().join("IntuneMDMDaemon 2025-07-22.log");
        let other = dir.path().join("notes.txt");
        std::fs::write(&old, "a").unwrap();
        std::fs::write(&new, "b").unwrap();
        std::fs::write(&other, "c").unwrap();

        let now = SystemTime::now();
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(now - Duration::from_secs(3600))
            .unwrap();
        File::options()
            .write(true)
            .open(&new)
            .unwrap()
            .set_modified(now)
            .unwrap();
        File::options()
            .write(true)
            .open(&other)
            .unwrap()
            .set_modified(now + Duration::from_secs(60))
            .unwrap();

        assert_eq!(latest_log_file(dir.path()).unwrap(), new);
    }

    #[test]
    fn test_latest_log_file_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            latest_log_file(dir.path()),
            Err(LoadError::NoLogFiles { .. })
        ));
    }

    #[test]
    fn test_write_atomic_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "old").unwrap();
        write_atomic(&path, |w| {
            w.write_all(b"new").map_err(|e| ExportError::Io {
                path: path.clone(),
                source: e,
            })
        })
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert!(!dir.path().join("out.csv.tmp").exists());
    }

    #[test]
    fn test_write_atomic_failure_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "old").unwrap();
        let result: Result<(), ExportError> = write_atomic(&path, |_| {
            Err(ExportError::Io {
                path: path.clone(),
                source: io::Error::new(io::ErrorKind::Other, "boom"),
            })
        });
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
        assert!(!dir.path().join("out.csv.tmp").exists());
    }

    #[test]
    fn test_write_atomic_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("out.csv");
        let result = write_atomic(&path, |_| Ok(()));
        assert!(matches!(result, Err(ExportError::Io { .. })));
    }
}
