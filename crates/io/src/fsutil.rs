use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use crate::error::IoError;

/// `<stem>_BACKUP_<YYYYMMDD_HHMMSS>.<ext>` next to `path`.
pub fn backup_path(path: &Path, at: NaiveDateTime) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let mut name = format!("{stem}_BACKUP_{}", at.format("%Y%m%d_%H%M%S"));
    if let Some(ext) = path.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    path.with_file_name(name)
}

/// Copy `path` to a timestamped sibling and flush it to storage. Never
/// overwrites an earlier backup; a same-second collision gets a counter.
pub fn create_backup(path: &Path) -> Result<PathBuf, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound { what: "file to back up", path: path.to_path_buf() });
    }
    let base = backup_path(path, Local::now().naive_local());
    let mut target = base.clone();
    let mut n = 1;
    while target.exists() {
        n += 1;
        let stem = base.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let ext = base.extension().map(|e| format!(".{}", e.to_string_lossy())).unwrap_or_default();
        target = base.with_file_name(format!("{stem}_{n}{ext}"));
    }

    std::fs::copy(path, &target)
        .map_err(|e| IoError::Write(format!("cannot create backup {}: {e}", target.display())))?;
    File::open(&target)?.sync_all()?;
    log::info!("backup written to {}", target.display());
    Ok(target)
}

/// Write `path` through a temporary sibling: `write` fills the temp file,
/// which is synced and then renamed over `path`. On failure the temp file is
/// removed and `path` is untouched.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<(), IoError>
where
    F: FnOnce(&Path) -> Result<(), IoError>,
{
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_default();
    let tmp_path = if ext.is_empty() { path.with_extension("tmp") } else { path.with_extension(format!("{ext}.tmp")) };

    let result = write(&tmp_path).and_then(|()| {
        File::open(&tmp_path)?.sync_all()?;
        std::fs::rename(&tmp_path, path)
            .map_err(|e| IoError::Write(format!("failed to rename tmp to {}: {e}", path.display())))
    });
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}
