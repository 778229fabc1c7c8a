use walkdir::WalkDir;
use std::io;
use std::path::{Path, PathBuf};
use crate::error::{Result, IngestError};

/// A production-log workbook waiting in the source folder
#[derive(Debug, Clone)]
pub struct LogFile {
    pub file_name: String,
    pub absolute_path: PathBuf,
    pub file_size: u64,
}

/// List the `*.xlsx` files directly inside `source` (no recursion).
///
/// The extension match is case-insensitive. Results are sorted by file name
/// so a batch always processes files in the same order.
pub fn discover_log_files(source: &Path) -> Result<Vec<LogFile>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(source).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                let msg = format!("Cannot read source folder {}: {}", source.display(), err);
                return Err(IngestError::Io(
                    err.into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, msg)),
                ));
            }
            Err(err) => {
                log::warn!("Skipping unreadable entry in {}: {}", source.display(), err);
                continue;
            }
        };
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let is_xlsx = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|e| e.eq_ignore_ascii_case("xlsx"))
            .unwrap_or(false);
        if !is_xlsx {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                log::warn!("Skipping {}: {}", path.display(), err);
                continue;
            }
        };

        files.push(LogFile {
            file_name: entry.file_name().to_string_lossy().to_string(),
            absolute_path: path.to_path_buf(),
            file_size: metadata.len(),
        });
    }

    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    log::debug!("Discovered {} xlsx files in {}", files.len(), source.display());
    Ok(files)
}
