use chrono::{DateTime, Datelike, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use crate::config::MonthFolderStyle;
use crate::error::{IngestError, Result};

/// Collision suffix layout, millisecond precision
const COLLISION_STAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Where a processed file ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

/// `root/<year>/<month>` for `now`, created if absent
pub fn dated_folder(root: &Path, now: DateTime<Local>, style: MonthFolderStyle) -> Result<PathBuf> {
    let month = match style {
        MonthFolderStyle::Name => now.format("%B").to_string(),
        MonthFolderStyle::Number => format!("{:02}", now.month()),
    };
    let folder = root.join(now.year().to_string()).join(month);
    fs::create_dir_all(&folder)?;
    Ok(folder)
}

/// Moves processed files into the archive or error folder of the batch
#[derive(Debug, Clone)]
pub struct FileRouter {
    archive_dir: PathBuf,
    error_dir: PathBuf,
}

impl FileRouter {
    /// Resolve and create both dated destination folders for a batch
    /// starting at `now`.
    pub fn new(
        archive_root: &Path,
        error_root: &Path,
        now: DateTime<Local>,
        style: MonthFolderStyle,
    ) -> Result<Self> {
        Ok(Self {
            archive_dir: dated_folder(archive_root, now, style)?,
            error_dir: dated_folder(error_root, now, style)?,
        })
    }

    pub fn destination(&self, outcome: Outcome) -> &Path {
        match outcome {
            Outcome::Success => &self.archive_dir,
            Outcome::Error => &self.error_dir,
        }
    }

    /// Move `file` to the folder for `outcome` and return its new path
    pub fn route(&self, file: &Path, outcome: Outcome) -> Result<PathBuf> {
        let dest = move_file(file, self.destination(outcome))?;
        log::info!(
            "Moved file '{}' to {} folder.",
            file_name_of(file),
            match outcome {
                Outcome::Success => "archive",
                Outcome::Error => "error",
            }
        );
        Ok(dest)
    }
}

/// Move `file` into `dest_dir` without overwriting anything already there.
///
/// A clashing name gets `_<yyyyMMddHHmmssfff>` appended to its stem; if
/// that name is taken as well a counter follows the stamp.
pub fn move_file(file: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let file_name = file
        .file_name()
        .ok_or_else(|| IngestError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a file path: {}", file.display()),
        )))?;

    let mut dest = dest_dir.join(file_name);
    if dest.exists() {
        dest = free_collision_path(file, dest_dir, Local::now());
    }

    match fs::rename(file, &dest) {
        Ok(_) => {}
        Err(e) if is_cross_device(&e) => copy_then_remove(file, &dest, |p| fs::remove_file(p))?,
        Err(e) => return Err(e.into()),
    }
    Ok(dest)
}

/// `rename` failed only because source and destination are on different volumes
fn is_cross_device(err: &io::Error) -> bool {
    #[cfg(unix)]
    const CROSS_DEVICE: i32 = 18; // EXDEV
    #[cfg(windows)]
    const CROSS_DEVICE: i32 = 17; // ERROR_NOT_SAME_DEVICE
    #[cfg(not(any(unix, windows)))]
    const CROSS_DEVICE: i32 = -1;

    err.raw_os_error() == Some(CROSS_DEVICE)
}

/// Copy `file` to `dest`, then delete `file`. If the delete fails the copy
/// is removed again so the file exists in exactly one place.
fn copy_then_remove<F>(file: &Path, dest: &Path, remove: F) -> io::Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    fs::copy(file, dest)?;
    if let Err(e) = remove(file) {
        if let Err(cleanup) = fs::remove_file(dest) {
            log::error!("Failed to remove copy '{}': {}", dest.display(), cleanup);
        }
        return Err(e);
    }
    Ok(())
}

fn free_collision_path(file: &Path, dest_dir: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = file
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let stamp = now.format(COLLISION_STAMP_FORMAT).to_string();

    let mut candidate = dest_dir.join(format!("{}_{}{}", stem, stamp, extension));
    let mut n = 1;
    while candidate.exists() {
        candidate = dest_dir.join(format!("{}_{}_{}{}", stem, stamp, n, extension));
        n += 1;
    }
    candidate
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
