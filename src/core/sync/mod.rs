//! # Sync Module
//!
//! One-way mirroring of image files between directory pairs.
//!
//! Each saved `SyncAssetsDirectoriesDefinition` copies the source's images
//! that are missing in the destination. Optionally it recurses into
//! subdirectories and removes destination images the source no longer has.
//! Only the filesystem is touched; the catalog picks up changes on the next
//! cataloging run.

use crate::core::model::SyncAssetsDirectoriesDefinition;
use crate::core::repository::AssetRepository;
use crate::core::scanner::{list_image_files, list_sub_directories};
use crate::core::transfer::copy_file;
use crate::error::{Result, ScanError, TransferError};
use crate::events::{Event, EventSender, SyncEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of syncing one directory pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAssetsResult {
    pub source_directory: String,
    pub destination_directory: String,
    pub synced_images: usize,
    pub deleted_images: usize,
    pub message: String,
}

impl SyncAssetsResult {
    fn new(definition: &SyncAssetsDirectoriesDefinition) -> Self {
        Self {
            source_directory: definition.source_directory.clone(),
            destination_directory: definition.destination_directory.clone(),
            ..Default::default()
        }
    }

    fn finish(&mut self) {
        let mut message = match self.synced_images {
            0 => format!(
                "No images synced from '{}' to '{}'",
                self.source_directory, self.destination_directory
            ),
            1 => format!(
                "1 image synced from '{}' to '{}'",
                self.source_directory, self.destination_directory
            ),
            n => format!(
                "{} images synced from '{}' to '{}'",
                n, self.source_directory, self.destination_directory
            ),
        };
        match self.deleted_images {
            0 => {}
            1 => message.push_str(", 1 image deleted in destination"),
            n => message.push_str(&format!(", {} images deleted in destination", n)),
        }
        message.push('.');
        self.message = message;
    }
}

/// Runs the saved sync configuration
pub struct SyncAssetsService {
    repository: Arc<AssetRepository>,
    include_hidden: bool,
}

impl SyncAssetsService {
    pub fn new(repository: Arc<AssetRepository>, include_hidden: bool) -> Self {
        Self {
            repository,
            include_hidden,
        }
    }

    /// Sync every saved definition, in order.
    ///
    /// A definition that fails is reported in its own result and does not
    /// stop the ones after it.
    pub fn sync_assets(&self, events: &EventSender) -> Result<Vec<SyncAssetsResult>> {
        let configuration = self.repository.get_sync_assets_configuration()?;
        let mut results = Vec::with_capacity(configuration.definitions.len());

        for definition in &configuration.definitions {
            events.send(Event::Sync(SyncEvent::DefinitionStarted {
                source: definition.source_directory.clone().into(),
                destination: definition.destination_directory.clone().into(),
            }));

            let result = self.sync_definition(definition, events);
            info!(message = %result.message, "Sync finished");
            events.send(Event::Sync(SyncEvent::DefinitionCompleted {
                message: result.message.clone(),
            }));
            results.push(result);
        }

        Ok(results)
    }

    fn sync_definition(
        &self,
        definition: &SyncAssetsDirectoriesDefinition,
        events: &EventSender,
    ) -> SyncAssetsResult {
        let mut result = SyncAssetsResult::new(definition);
        let source = Path::new(&definition.source_directory);

        if !source.is_dir() {
            warn!(source = %source.display(), "Sync source is missing");
            result.message = format!(
                "Source directory '{}' not found.",
                definition.source_directory
            );
            return result;
        }

        let destination = Path::new(&definition.destination_directory);
        match self.mirror(source, destination, definition, &mut result, events) {
            Ok(()) => result.finish(),
            Err(error) => {
                warn!(
                    source = %source.display(),
                    destination = %destination.display(),
                    error = %error,
                    "Sync failed"
                );
                result.message = format!(
                    "Failed to sync '{}' to '{}': {}.",
                    definition.source_directory, definition.destination_directory, error
                );
            }
        }
        result
    }

    /// Mirror `source` into `destination`, never descending into the
    /// destination when it lives inside the source
    fn mirror(
        &self,
        source: &Path,
        destination: &Path,
        definition: &SyncAssetsDirectoriesDefinition,
        result: &mut SyncAssetsResult,
        events: &EventSender,
    ) -> Result<()> {
        create_directory(destination)?;
        let source = canonical(source)?;
        let destination = canonical(destination)?;

        self.sync_directory(&source, &destination, &destination, definition, result, events)
    }

    fn sync_directory(
        &self,
        source: &Path,
        destination: &Path,
        destination_root: &Path,
        definition: &SyncAssetsDirectoriesDefinition,
        result: &mut SyncAssetsResult,
        events: &EventSender,
    ) -> Result<()> {
        create_directory(destination)?;

        let source_files = list_image_files(source, self.include_hidden)?;
        let destination_files = list_image_files(destination, self.include_hidden)?;

        let source_names: HashSet<&str> =
            source_files.iter().map(|f| f.file_name.as_str()).collect();
        let destination_names: HashSet<&str> = destination_files
            .iter()
            .map(|f| f.file_name.as_str())
            .collect();

        for file in source_files
            .iter()
            .filter(|f| !destination_names.contains(f.file_name.as_str()))
        {
            let target = destination.join(&file.file_name);
            copy_file(&file.path, &target)?;
            debug!(from = %file.path.display(), to = %target.display(), "Image synced");
            result.synced_images += 1;
            events.send(Event::Sync(SyncEvent::FileCopied {
                from: file.path.clone(),
                to: target,
            }));
        }

        if definition.delete_assets_not_in_source {
            for file in destination_files
                .iter()
                .filter(|f| !source_names.contains(f.file_name.as_str()))
            {
                fs::remove_file(&file.path).map_err(|error| TransferError::DeleteFailed {
                    path: file.path.clone(),
                    source: error,
                })?;
                debug!(path = %file.path.display(), "Image deleted in destination");
                result.deleted_images += 1;
                events.send(Event::Sync(SyncEvent::FileDeleted {
                    path: file.path.clone(),
                }));
            }
        }

        if definition.include_sub_folders {
            for sub_directory in list_sub_directories(source, self.include_hidden)? {
                if sub_directory == destination_root {
                    debug!(path = %sub_directory.display(), "Skipping the sync destination");
                    continue;
                }
                if let Some(name) = sub_directory.file_name() {
                    self.sync_directory(
                        &sub_directory,
                        &destination.join(name),
                        destination_root,
                        definition,
                        result,
                        events,
                    )?;
                }
            }
        }

        Ok(())
    }
}

fn create_directory(path: &Path) -> std::result::Result<(), TransferError> {
    fs::create_dir_all(path).map_err(|error| TransferError::CreateDirectory {
        path: path.to_path_buf(),
        source: error,
    })
}

fn canonical(path: &Path) -> std::result::Result<PathBuf, ScanError> {
    fs::canonicalize(path).map_err(|source| ScanError::ReadDirectory {
        path: path.to_path_buf(),
        source,
    })
}
