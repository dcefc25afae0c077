//! Directory listing implementation using walkdir.

use super::filter::{is_hidden, ImageFilter};
use super::ScannedFile;
use crate::error::ScanError;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

fn ensure_directory(path: &Path) -> Result<(), ScanError> {
    if !path.is_dir() {
        return Err(ScanError::DirectoryNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn to_scan_error(error: walkdir::Error) -> ScanError {
    let path = error.path().map(|p| p.to_path_buf()).unwrap_or_default();

    if error.io_error().map(|e| e.kind()) == Some(std::io::ErrorKind::PermissionDenied) {
        ScanError::PermissionDenied { path }
    } else {
        ScanError::ReadDirectory {
            path,
            source: std::io::Error::other(error.to_string()),
        }
    }
}

/// Image files directly inside `directory`, sorted by file name.
///
/// Entries that cannot be read are logged and skipped.
pub fn list_image_files(
    directory: &Path,
    include_hidden: bool,
) -> Result<Vec<ScannedFile>, ScanError> {
    ensure_directory(directory)?;

    let filter = ImageFilter::new().with_hidden(include_hidden);
    let mut files = Vec::new();

    for entry_result in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %to_scan_error(e), "skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() || !filter.should_include(entry.path()) {
            continue;
        }

        match fs::metadata(entry.path()) {
            Ok(metadata) => {
                let modified = metadata
                    .modified()
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                // Not every filesystem records a birth time
                let created = metadata.created().unwrap_or(modified);

                files.push(ScannedFile {
                    path: entry.path().to_path_buf(),
                    file_name: entry.file_name().to_string_lossy().into_owned(),
                    size: metadata.len(),
                    creation: DateTime::<Utc>::from(created),
                    modification: DateTime::<Utc>::from(modified),
                    format: filter.get_format(entry.path()),
                });
            }
            Err(source) => {
                let error = ScanError::ReadDirectory {
                    path: entry.path().to_path_buf(),
                    source,
                };
                warn!(error = %error, "skipping unreadable file");
            }
        }
    }

    Ok(files)
}

/// Direct subdirectories of `directory`, sorted by name
pub fn list_sub_directories(
    directory: &Path,
    include_hidden: bool,
) -> Result<Vec<PathBuf>, ScanError> {
    ensure_directory(directory)?;

    let directories = WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter(|e| include_hidden || !is_hidden(e.path()))
        .map(|e| e.into_path())
        .collect();

    Ok(directories)
}

/// `root` followed by every directory below it, depth-first, sorted by name.
///
/// Hidden directories (and everything inside them) are skipped unless
/// `include_hidden` is set. Symbolic links are not followed.
pub fn list_directory_tree(root: &Path, include_hidden: bool) -> Result<Vec<PathBuf>, ScanError> {
    ensure_directory(root)?;

    let keep = |entry: &DirEntry| entry.depth() == 0 || include_hidden || !is_hidden(entry.path());

    let mut directories = Vec::new();
    for entry_result in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(keep)
    {
        match entry_result {
            Ok(entry) if entry.file_type().is_dir() => directories.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!(error = %to_scan_error(e), "skipping unreadable directory"),
        }
    }

    Ok(directories)
}

/// Number of image files anywhere below `root`
pub fn count_image_files(root: &Path, include_hidden: bool) -> usize {
    let filter = ImageFilter::new().with_hidden(include_hidden);

    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || include_hidden || !is_hidden(e.path()))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && filter.should_include(e.path()))
        .count()
}
