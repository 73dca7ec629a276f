use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prefix Word uses for owner/lock files next to an open document.
const LOCK_FILE_PREFIX: &str = "~$";

/// Whether a file name looks like a checkable Word document.
pub fn is_docx_candidate(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(".docx") && !file_name.starts_with(LOCK_FILE_PREFIX)
}

/// Find `.docx` files in `dir`, optionally descending into subdirectories.
///
/// The result is sorted. A missing or unreadable directory yields an empty
/// list with a warning rather than an error.
///
/// Symlinks are not followed when walking: a symlinked `.docx` is collected
/// like any other file, but a symlinked directory is never descended into.
pub fn scan_directory(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut found = Vec::new();

    if !dir.is_dir() {
        warn!(dir = %dir.display(), "directory does not exist");
        return found;
    }

    collect(dir, recursive, &mut found);
    found.sort();
    debug!(dir = %dir.display(), count = found.len(), "scan finished");
    found
}

fn collect(dir: &Path, recursive: bool, found: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), "cannot read directory: {e}");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            if recursive {
                collect(&path, recursive, found);
            }
            continue;
        }

        let name = entry.file_name();
        if is_docx_candidate(&name.to_string_lossy()) {
            found.push(path);
        }
    }
}
