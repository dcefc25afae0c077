//! # Transfer Module
//!
//! Copies, moves and deletes asset files while keeping the catalog in step.
//!
//! Moves use `rename` when source and destination share a filesystem and
//! fall back to copy, size check and delete otherwise. A source file is
//! never deleted before its copy has been verified, and an existing file at
//! the destination is never replaced.

use crate::core::imaging::{decode, is_valid_image, ThumbnailGenerator};
use crate::core::model::{Asset, FileProperties, Folder};
use crate::core::repository::AssetRepository;
use crate::error::{CatalogError, Result, TransferError};
use crate::events::{Event, EventSender, TransferEvent};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Copy `source` to `destination`, checking the copied size
pub fn copy_file(source: &Path, destination: &Path) -> std::result::Result<(), TransferError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|source| TransferError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let copy_error = |error| TransferError::CopyFailed {
        from: source.to_path_buf(),
        to: destination.to_path_buf(),
        source: error,
    };

    let expected = fs::metadata(source).map_err(copy_error)?.len();
    fs::copy(source, destination).map_err(copy_error)?;
    let actual = fs::metadata(destination).map_err(copy_error)?.len();

    if actual != expected {
        // Copy was incomplete, don't leave a truncated file behind
        let _ = fs::remove_file(destination);
        return Err(TransferError::VerificationFailed {
            path: destination.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Move `source` to `destination`
pub fn move_file(source: &Path, destination: &Path) -> std::result::Result<(), TransferError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|source| TransferError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }

    // rename fails across filesystems
    copy_file(source, destination)?;
    fs::remove_file(source).map_err(|error| TransferError::DeleteFailed {
        path: source.to_path_buf(),
        source: error,
    })
}

/// Refuse a transfer that would replace a file, before anything is touched.
///
/// Two assets sharing a file name would land on the same target, so that
/// counts as a clash too.
fn check_targets(assets: &[Asset], destination: &Path) -> std::result::Result<(), TransferError> {
    let mut targets: HashSet<PathBuf> = HashSet::new();
    for asset in assets {
        let target = destination.join(&asset.file_name);
        if target == asset.full_path() {
            continue;
        }
        if target.exists() || !targets.insert(target.clone()) {
            return Err(TransferError::DestinationExists { path: target });
        }
    }
    Ok(())
}

/// Size and timestamps of a freshly written `target`
fn file_properties(source: &Path, target: &Path) -> std::result::Result<FileProperties, TransferError> {
    let metadata = fs::metadata(target).map_err(|error| TransferError::CopyFailed {
        from: source.to_path_buf(),
        to: target.to_path_buf(),
        source: error,
    })?;
    let modified = metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
    let created = metadata.created().unwrap_or(modified);

    Ok(FileProperties {
        size: metadata.len(),
        creation: DateTime::<Utc>::from(created),
        modification: DateTime::<Utc>::from(modified),
    })
}

/// Moves, copies and deletes cataloged assets
pub struct MoveAssetsService {
    repository: Arc<AssetRepository>,
    thumbnails: ThumbnailGenerator,
}

impl MoveAssetsService {
    pub fn new(repository: Arc<AssetRepository>, thumbnails: ThumbnailGenerator) -> Self {
        Self {
            repository,
            thumbnails,
        }
    }

    /// Copy or move `assets` into `destination` and catalog them there.
    ///
    /// With `preserve_original_files` the sources stay in place (copy);
    /// otherwise they are removed from disk and from the catalog (move).
    pub fn move_assets(
        &self,
        assets: &[Asset],
        destination: &Path,
        preserve_original_files: bool,
        events: &EventSender,
    ) -> Result<bool> {
        if assets.is_empty() {
            return Err(CatalogError::argument("assets cannot be empty"));
        }
        if destination.as_os_str().is_empty() {
            return Err(CatalogError::argument("destination folder cannot be empty"));
        }
        if let Some(missing) = assets.iter().find(|a| !a.full_path().is_file()) {
            return Err(TransferError::FileNotFound {
                path: missing.full_path(),
            }
            .into());
        }
        check_targets(assets, destination)?;

        fs::create_dir_all(destination).map_err(|source| TransferError::CreateDirectory {
            path: destination.to_path_buf(),
            source,
        })?;
        let destination_folder = self.repository.add_folder(destination)?;

        for asset in assets {
            let source = asset.full_path();
            let target = destination.join(&asset.file_name);
            if source == target {
                debug!(path = %source.display(), "Source and destination are the same file");
                continue;
            }

            let thumbnail = self.thumbnail_for(asset)?;

            if preserve_original_files {
                copy_file(&source, &target)?;
                events.send(Event::Transfer(TransferEvent::AssetCopied {
                    from: source.clone(),
                    to: target.clone(),
                }));
            } else {
                move_file(&source, &target)?;
                self.repository
                    .delete_asset(&asset.folder.path, &asset.file_name)?;
                events.send(Event::Transfer(TransferEvent::AssetMoved {
                    from: source.clone(),
                    to: target.clone(),
                }));
            }

            let mut relocated = asset.relocated(&destination_folder);
            relocated.file_properties = file_properties(&source, &target)?;
            // Some platforms carry the source mtime over on copy
            relocated.thumbnail_creation = Utc::now().max(relocated.file_properties.modification);
            self.repository.add_asset(relocated, thumbnail)?;
        }

        self.repository.add_recent_target_path(destination)?;
        self.repository.save_catalog(None)?;

        info!(
            count = assets.len(),
            destination = %destination.display(),
            preserve_original_files,
            "Assets transferred"
        );
        Ok(true)
    }

    /// Stored thumbnail of `asset`, or a freshly rendered one when nothing
    /// usable is stored
    fn thumbnail_for(&self, asset: &Asset) -> Result<Option<Vec<u8>>> {
        match self
            .repository
            .load_thumbnail(&asset.folder.path, &asset.file_name)?
        {
            Some(bytes) if is_valid_image(&bytes) => return Ok(Some(bytes)),
            Some(_) => {
                debug!(path = %asset.full_path().display(), "Stored thumbnail is unreadable");
            }
            None => {}
        }

        let rendered = decode(&asset.full_path())
            .and_then(|decoded| self.thumbnails.generate(&decoded.image));
        match rendered {
            Ok(thumbnail) => Ok(Some(thumbnail.bytes)),
            Err(e) => {
                warn!(path = %asset.full_path().display(), error = %e, "No thumbnail for asset");
                Ok(None)
            }
        }
    }

    /// Copy a single file. Returns whether the destination now exists.
    pub fn copy_asset(&self, source: &Path, destination: &Path) -> Result<bool> {
        if !source.is_file() {
            return Err(TransferError::FileNotFound {
                path: source.to_path_buf(),
            }
            .into());
        }
        if destination.exists() {
            return Err(TransferError::DestinationExists {
                path: destination.to_path_buf(),
            }
            .into());
        }
        copy_file(source, destination)?;
        Ok(destination.is_file())
    }

    /// Delete asset files together with their catalog entries and thumbnails
    pub fn delete_assets(&self, assets: &[Asset], events: &EventSender) -> Result<()> {
        if assets.is_empty() {
            return Err(CatalogError::argument("assets cannot be empty"));
        }
        if assets.iter().any(|a| a.file_name.is_empty()) {
            return Err(CatalogError::argument("asset file name cannot be empty"));
        }

        let mut affected: HashMap<_, Folder> = HashMap::new();

        for asset in assets {
            let path = asset.full_path();
            if path.is_file() {
                fs::remove_file(&path).map_err(|source| TransferError::DeleteFailed {
                    path: path.clone(),
                    source,
                })?;
            }

            self.repository
                .delete_asset(&asset.folder.path, &asset.file_name)?;
            affected.insert(asset.folder.id, asset.folder.clone());
            debug!(path = %path.display(), "Asset deleted");
            events.send(Event::Transfer(TransferEvent::AssetDeleted { path }));
        }

        for folder in affected.values() {
            self.repository.save_catalog(Some(folder))?;
        }

        info!(count = assets.len(), "Assets deleted");
        Ok(())
    }
}
