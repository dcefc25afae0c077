//! # Catalog Module
//!
//! Brings the catalog in line with the assets directory.
//!
//! ## Stages
//! 1. **Walk** - list the directory tree below the assets directory
//! 2. **Reconcile** - per folder, add new files, refresh outdated ones and
//!    drop files that vanished
//! 3. **Prune** - forget folders that no longer exist on disk
//! 4. **Backup** - write today's backup when anything changed
//!
//! ## Parallelism
//! Uses rayon to hash, decode and render thumbnails of a folder's files
//! across multiple CPU cores.

use crate::config::AppSettings;
use crate::core::hasher::{sha512_file, AssetHasher};
use crate::core::imaging::{decode, ThumbnailGenerator};
use crate::core::model::{
    Asset, AssetMetadata, FileProperties, Folder, MetadataFlag, Pixel, Rotation,
    CORRUPTED_MESSAGE, ROTATED_MESSAGE,
};
use crate::core::repository::AssetRepository;
use crate::core::scanner::{
    count_image_files, list_directory_tree, list_image_files, ScannedFile,
};
use crate::error::{CatalogError, HashError, ImagingError, Result, ScanError};
use crate::events::{CatalogChange, CatalogProgress, CatalogSummary, Event, EventSender};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Catalogs the assets directory into the repository
pub struct CatalogAssetsService {
    repository: Arc<AssetRepository>,
    assets_directory: PathBuf,
    include_hidden: bool,
    batch_size: usize,
    hasher: AssetHasher,
    thumbnails: ThumbnailGenerator,
}

/// Counters for one cataloging run
struct RunState<'a> {
    events: &'a EventSender,
    summary: CatalogSummary,
    budget: usize,
    processed: usize,
    total: usize,
}

impl<'a> RunState<'a> {
    fn send(&self, change: CatalogChange) {
        self.events.send(Event::Catalog(change));
    }
}

impl CatalogAssetsService {
    pub fn new(repository: Arc<AssetRepository>, settings: &AppSettings) -> Self {
        Self {
            repository,
            assets_directory: settings.assets_directory.clone(),
            include_hidden: settings.include_hidden,
            batch_size: settings.catalog_batch_size.max(1),
            hasher: AssetHasher::new(settings.hash_algorithm),
            thumbnails: ThumbnailGenerator::new(
                settings.thumbnail_max_width,
                settings.thumbnail_max_height,
                settings.thumbnail_quality,
            ),
        }
    }

    /// Run one cataloging pass, reporting progress through `events`.
    ///
    /// Setting `cancel` stops the run before the next folder; folders
    /// already processed stay saved.
    pub fn catalog_assets(
        &self,
        events: &EventSender,
        cancel: &AtomicBool,
    ) -> Result<CatalogSummary> {
        let start_time = Instant::now();
        let root = self.assets_directory.as_path();

        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            }
            .into());
        }

        let total_files = count_image_files(root, self.include_hidden);
        info!(root = %root.display(), total_files, "Cataloging started");

        let mut run = RunState {
            events,
            summary: CatalogSummary::default(),
            budget: self.batch_size,
            processed: 0,
            total: total_files,
        };
        run.send(CatalogChange::Started {
            root: root.to_path_buf(),
            total_files,
        });

        let directories = list_directory_tree(root, self.include_hidden)?;

        for directory in &directories {
            if cancel.load(Ordering::SeqCst) {
                info!("Cataloging cancelled");
                return Err(CatalogError::Cancelled);
            }
            if run.budget == 0 {
                run.summary.batch_limit_reached = true;
                break;
            }
            self.catalog_folder(directory, &mut run)?;
        }

        self.prune_missing_folders(root, &mut run)?;

        if run.summary.has_changes() {
            self.backup(&run)?;
        }

        run.summary.duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            created = run.summary.assets_created,
            updated = run.summary.assets_updated,
            deleted = run.summary.assets_deleted,
            failed = run.summary.assets_failed,
            duration_ms = run.summary.duration_ms,
            "Cataloging finished"
        );
        run.send(CatalogChange::Ended {
            summary: run.summary.clone(),
        });

        Ok(run.summary)
    }

    fn catalog_folder(&self, directory: &Path, run: &mut RunState<'_>) -> Result<()> {
        let mut changed = false;

        let folder = match self.repository.get_folder_by_path(directory)? {
            Some(folder) => folder,
            None => {
                let folder = self.repository.add_folder(directory)?;
                run.summary.folders_created += 1;
                run.send(CatalogChange::FolderCreated {
                    path: directory.to_path_buf(),
                });
                changed = true;
                folder
            }
        };

        let files = list_image_files(directory, self.include_hidden)?;
        let on_disk: HashSet<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
        let cataloged = self.repository.get_assets_by_folder_id(folder.id)?;

        for asset in cataloged.iter().filter(|a| !on_disk.contains(a.file_name.as_str())) {
            if self.repository.delete_asset(directory, &asset.file_name)?.is_some() {
                debug!(path = %asset.full_path().display(), "Asset removed from catalog");
                run.summary.assets_deleted += 1;
                run.send(CatalogChange::AssetDeleted {
                    path: asset.full_path(),
                });
                changed = true;
            }
        }

        let mut work: Vec<(&ScannedFile, bool)> = Vec::new();
        for file in &files {
            match cataloged.iter().find(|a| a.file_name == file.file_name) {
                None => work.push((file, false)),
                Some(asset) if asset.is_outdated(file.modification) => work.push((file, true)),
                Some(_) => {}
            }
        }
        // New files first so a limited batch grows the catalog
        work.sort_by_key(|(_, is_update)| *is_update);

        if work.len() > run.budget {
            work.truncate(run.budget);
            run.summary.batch_limit_reached = true;
        }
        run.budget -= work.len();

        let results: Vec<(&ScannedFile, bool, Result<(Asset, Option<Vec<u8>>)>)> = work
            .par_iter()
            .map(|(file, is_update)| (*file, *is_update, self.build_asset(&folder, file)))
            .collect();

        for (file, is_update, result) in results {
            match result {
                Ok((asset, thumbnail)) => {
                    self.repository.add_asset(asset, thumbnail)?;
                    run.processed += 1;
                    let progress = CatalogProgress {
                        path: file.path.clone(),
                        processed: run.processed,
                        total: run.total,
                    };
                    if is_update {
                        run.summary.assets_updated += 1;
                        run.send(CatalogChange::AssetUpdated(progress));
                    } else {
                        run.summary.assets_created += 1;
                        run.send(CatalogChange::AssetCreated(progress));
                    }
                    changed = true;
                }
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "Failed to catalog asset");
                    run.summary.assets_failed += 1;
                    run.send(CatalogChange::AssetFailed {
                        path: file.path.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if changed {
            self.repository.save_catalog(Some(&folder))?;
        }
        Ok(())
    }

    /// Hash, decode and render one file.
    ///
    /// Files that cannot be decoded are still cataloged, flagged as corrupted
    /// and without a thumbnail. Only unreadable files fail.
    fn build_asset(&self, folder: &Folder, file: &ScannedFile) -> Result<(Asset, Option<Vec<u8>>)> {
        let hash = match self.hasher.hash_file(&file.path) {
            Ok(hash) => hash,
            // A perceptual hash needs pixels; fall back to the content hash
            Err(HashError::DecodeError { .. }) => sha512_file(&file.path)?,
            Err(e) => return Err(e.into()),
        };

        let mut asset = Asset {
            folder_id: folder.id,
            folder: folder.clone(),
            file_name: file.file_name.clone(),
            pixel: Pixel::default(),
            file_properties: FileProperties {
                size: file.size,
                creation: file.creation,
                modification: file.modification,
            },
            thumbnail_creation: Utc::now(),
            hash,
            rotation: Rotation::Rotate0,
            metadata: AssetMetadata::default(),
        };

        let rendered = if file.format.is_decodable() {
            decode(&file.path).and_then(|decoded| {
                self.thumbnails
                    .generate(&decoded.image)
                    .map(|thumbnail| (decoded, thumbnail))
            })
        } else {
            Err(ImagingError::DecodeFailed {
                path: file.path.clone(),
                reason: "unsupported format".to_string(),
            })
        };

        match rendered {
            Ok((decoded, thumbnail)) => {
                asset.pixel = Pixel {
                    asset: decoded.original,
                    thumbnail: thumbnail.dimensions,
                };
                asset.rotation = decoded.rotation;
                if decoded.rotation != Rotation::Rotate0 {
                    asset.metadata.rotated = MetadataFlag::set(ROTATED_MESSAGE);
                }
                debug!(path = %file.path.display(), "Asset cataloged");
                Ok((asset, Some(thumbnail.bytes)))
            }
            Err(e) => {
                debug!(path = %file.path.display(), error = %e, "Asset is corrupted");
                asset.metadata.corrupted = MetadataFlag::set(CORRUPTED_MESSAGE);
                Ok((asset, None))
            }
        }
    }

    fn prune_missing_folders(&self, root: &Path, run: &mut RunState<'_>) -> Result<()> {
        let missing: Vec<Folder> = self
            .repository
            .get_folders()?
            .into_iter()
            .filter(|f| f.is_within(root) && !f.path.is_dir())
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        for folder in &missing {
            let assets = self.repository.get_assets_by_folder_id(folder.id)?;
            self.repository.delete_folder(folder)?;
            run.summary.assets_deleted += assets.len();
            run.summary.folders_deleted += 1;
            info!(path = %folder.path.display(), "Folder removed from catalog");
            run.send(CatalogChange::FolderDeleted {
                path: folder.path.clone(),
            });
        }

        self.repository.save_catalog(None)?;
        Ok(())
    }

    fn backup(&self, run: &RunState<'_>) -> Result<()> {
        run.send(CatalogChange::BackupStarted);
        let created = !self.repository.backup_exists()?;
        if created {
            self.repository.write_backup()?;
        }
        run.send(CatalogChange::BackupCompleted { created });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::InMemoryStorage;
    use crate::core::test_support::{
        touch_in_future, write_test_image, write_test_jpeg_with_orientation,
    };
    use crate::events::{null_sender, EventChannel};
    use std::fs;
    use tempfile::TempDir;

    fn service(root: &Path, batch_size: usize) -> (Arc<AssetRepository>, CatalogAssetsService) {
        let storage = Arc::new(InMemoryStorage::new());
        let repository = Arc::new(AssetRepository::new(storage));
        repository.initialize().unwrap();

        let settings = AppSettings {
            assets_directory: root.to_path_buf(),
            catalog_batch_size: batch_size,
            thumbnail_max_width: 32,
            thumbnail_max_height: 32,
            ..AppSettings::default()
        };
        let service = CatalogAssetsService::new(repository.clone(), &settings);
        (repository, service)
    }

    fn run(service: &CatalogAssetsService) -> CatalogSummary {
        service
            .catalog_assets(&null_sender(), &AtomicBool::new(false))
            .unwrap()
    }

    #[test]
    fn catalogs_new_assets_with_thumbnails() {
        let temp_dir = TempDir::new().unwrap();
        write_test_image(&temp_dir.path().join("a.png"), 64, 32, 1);
        write_test_image(&temp_dir.path().join("sub/b.png"), 20, 20, 2);
        let (repository, service) = service(temp_dir.path(), 100);

        let summary = run(&service);

        assert_eq!(summary.folders_created, 2);
        assert_eq!(summary.assets_created, 2);
        assert!(!summary.batch_limit_reached);

        let asset = repository
            .get_asset(temp_dir.path(), "a.png")
            .unwrap()
            .unwrap();
        assert_eq!(asset.pixel.asset.width, 64);
        assert_eq!(asset.pixel.thumbnail.width, 32);
        assert_eq!(asset.pixel.thumbnail.height, 16);
        assert_eq!(asset.hash.len(), 128);
        assert!(repository.contains_thumbnail(temp_dir.path(), "a.png").unwrap());
        assert!(!repository.has_changes().unwrap());
        assert!(repository.backup_exists().unwrap());
    }

    #[test]
    fn second_run_changes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        write_test_image(&temp_dir.path().join("a.png"), 16, 16, 1);
        let (_, service) = service(temp_dir.path(), 100);

        run(&service);
        let summary = run(&service);

        assert!(!summary.has_changes());
    }

    #[test]
    fn corrupted_file_is_cataloged_without_thumbnail() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("broken.jpg"), b"not really a jpeg").unwrap();
        let (repository, service) = service(temp_dir.path(), 100);

        let summary = run(&service);

        assert_eq!(summary.assets_created, 1);
        let asset = repository
            .get_asset(temp_dir.path(), "broken.jpg")
            .unwrap()
            .unwrap();
        assert!(asset.is_corrupted());
        assert_eq!(asset.metadata.corrupted.message.as_deref(), Some(CORRUPTED_MESSAGE));
        assert_eq!(asset.pixel, Pixel::default());
        assert!(!repository.contains_thumbnail(temp_dir.path(), "broken.jpg").unwrap());
    }

    #[test]
    fn modified_file_is_recataloged() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.png");
        write_test_image(&path, 16, 16, 1);
        let (repository, service) = service(temp_dir.path(), 100);
        run(&service);
        let before = repository.get_asset(temp_dir.path(), "a.png").unwrap().unwrap();

        write_test_image(&path, 24, 16, 7);
        touch_in_future(&path);
        let (sender, receiver) = EventChannel::new();
        let summary = service
            .catalog_assets(&sender, &AtomicBool::new(false))
            .unwrap();
        drop(sender);

        assert_eq!(summary.assets_updated, 1);
        assert_eq!(summary.assets_created, 0);
        let after = repository.get_asset(temp_dir.path(), "a.png").unwrap().unwrap();
        assert_ne!(after.hash, before.hash);
        assert_eq!(after.pixel.asset.width, 24);
        assert!(receiver
            .drain()
            .iter()
            .any(|e| matches!(e, Event::Catalog(CatalogChange::AssetUpdated(_)))));
    }

    #[test]
    fn asset_that_turns_corrupted_loses_its_thumbnail() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.png");
        write_test_image(&path, 16, 16, 1);
        let (repository, service) = service(temp_dir.path(), 100);
        run(&service);
        assert!(repository.contains_thumbnail(temp_dir.path(), "a.png").unwrap());

        fs::write(&path, b"no longer a png").unwrap();
        touch_in_future(&path);
        let summary = run(&service);

        assert_eq!(summary.assets_updated, 1);
        let asset = repository.get_asset(temp_dir.path(), "a.png").unwrap().unwrap();
        assert!(asset.is_corrupted());
        assert!(!repository.contains_thumbnail(temp_dir.path(), "a.png").unwrap());
    }

    #[test]
    fn exif_orientation_rotates_thumbnail() {
        let temp_dir = TempDir::new().unwrap();
        write_test_jpeg_with_orientation(&temp_dir.path().join("turned.jpg"), 40, 20, 6);
        let (_, service) = service(temp_dir.path(), 100);
        let file = &list_image_files(temp_dir.path(), false).unwrap()[0];

        let (asset, thumbnail) = service
            .build_asset(&Folder::new(temp_dir.path()), file)
            .unwrap();

        assert_eq!(asset.rotation, Rotation::Rotate90);
        assert!(asset.metadata.rotated.is_true);
        assert_eq!(asset.metadata.rotated.message.as_deref(), Some(ROTATED_MESSAGE));
        assert!(!asset.is_corrupted());
        assert_eq!((asset.pixel.asset.width, asset.pixel.asset.height), (40, 20));
        assert_eq!(
            (asset.pixel.thumbnail.width, asset.pixel.thumbnail.height),
            (16, 32)
        );
        assert!(thumbnail.is_some());
    }

    #[test]
    fn vanished_files_and_folders_are_removed() {
        let temp_dir = TempDir::new().unwrap();
        write_test_image(&temp_dir.path().join("keep.png"), 16, 16, 1);
        write_test_image(&temp_dir.path().join("gone.png"), 16, 16, 2);
        write_test_image(&temp_dir.path().join("old/x.png"), 16, 16, 3);
        let (repository, service) = service(temp_dir.path(), 100);
        run(&service);

        fs::remove_file(temp_dir.path().join("gone.png")).unwrap();
        fs::remove_dir_all(temp_dir.path().join("old")).unwrap();
        let summary = run(&service);

        assert_eq!(summary.folders_deleted, 1);
        assert_eq!(summary.assets_deleted, 2);
        assert!(!repository.folder_exists(&temp_dir.path().join("old")).unwrap());
        assert_eq!(repository.asset_count().unwrap(), 1);
    }

    #[test]
    fn batch_size_limits_one_run() {
        let temp_dir = TempDir::new().unwrap();
        for i in 0..5 {
            write_test_image(&temp_dir.path().join(format!("{}.png", i)), 8, 8, i);
        }
        let (repository, service) = service(temp_dir.path(), 3);

        let first = run(&service);
        assert_eq!(first.assets_created, 3);
        assert!(first.batch_limit_reached);

        let second = run(&service);
        assert_eq!(second.assets_created, 2);
        assert!(!second.batch_limit_reached);
        assert_eq!(repository.asset_count().unwrap(), 5);
    }

    #[test]
    fn events_are_reported_in_order() {
        let temp_dir = TempDir::new().unwrap();
        write_test_image(&temp_dir.path().join("a.png"), 8, 8, 1);
        let (_, service) = service(temp_dir.path(), 100);
        let (sender, receiver) = EventChannel::new();

        service
            .catalog_assets(&sender, &AtomicBool::new(false))
            .unwrap();
        drop(sender);

        let events = receiver.drain();
        assert!(matches!(
            events.first(),
            Some(Event::Catalog(CatalogChange::Started { total_files: 1, .. }))
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Catalog(CatalogChange::AssetCreated(p)) if p.processed == 1)));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Catalog(CatalogChange::BackupCompleted { created: true }))));
        assert!(matches!(
            events.last(),
            Some(Event::Catalog(CatalogChange::Ended { .. }))
        ));
    }

    #[test]
    fn cancelled_run_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        write_test_image(&temp_dir.path().join("a.png"), 8, 8, 1);
        let (repository, service) = service(temp_dir.path(), 100);

        let result = service.catalog_assets(&null_sender(), &AtomicBool::new(true));

        assert!(matches!(result, Err(CatalogError::Cancelled)));
        assert_eq!(repository.asset_count().unwrap(), 0);
    }

    #[test]
    fn missing_root_is_an_error() {
        let (_, service) = service(Path::new("/nonexistent/photos/12345"), 100);
        let result = service.catalog_assets(&null_sender(), &AtomicBool::new(false));
        assert!(matches!(result, Err(CatalogError::Scan(_))));
    }
}
