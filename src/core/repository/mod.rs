//! # Repository Module
//!
//! The in-memory catalog, backed by a `CatalogStorage`.
//!
//! All reads are served from memory. Mutations mark the catalog as changed
//! and only reach storage on `save_catalog`. Thumbnails are loaded lazily,
//! one folder at a time, the first time any of them is needed.

use crate::core::model::{Asset, Folder, SyncAssetsConfiguration};
use crate::core::storage::{CatalogStorage, ThumbnailMap};
use crate::error::StorageError;
use chrono::Local;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// How many destinations `add_recent_target_path` remembers
pub const MAX_RECENT_TARGET_PATHS: usize = 20;

#[derive(Default)]
struct CatalogState {
    folders: Vec<Folder>,
    assets: Vec<Asset>,
    sync_configuration: SyncAssetsConfiguration,
    recent_target_paths: Vec<PathBuf>,
    thumbnails: HashMap<Uuid, ThumbnailMap>,
    dirty_thumbnails: HashSet<Uuid>,
    removed_folders: HashSet<Uuid>,
    has_changes: bool,
}

impl CatalogState {
    fn folder_by_path(&self, path: &Path) -> Option<&Folder> {
        self.folders.iter().find(|f| f.path == path)
    }

    fn asset_position(&self, directory: &Path, file_name: &str) -> Option<usize> {
        self.assets
            .iter()
            .position(|a| a.folder.path == directory && a.file_name == file_name)
    }
}

/// Thread-safe catalog of folders, assets and thumbnails
pub struct AssetRepository {
    storage: Arc<dyn CatalogStorage>,
    state: RwLock<CatalogState>,
}

impl AssetRepository {
    /// Create an empty repository; call `initialize` to load stored data
    pub fn new(storage: Arc<dyn CatalogStorage>) -> Self {
        Self {
            storage,
            state: RwLock::new(CatalogState::default()),
        }
    }

    /// Load folders, assets, sync configuration and recent paths from storage
    pub fn initialize(&self) -> Result<(), StorageError> {
        let folders = self.storage.load_folders()?;
        let assets = self.storage.load_assets()?;
        let definitions = self.storage.load_sync_definitions()?;
        let recent_target_paths = self.storage.load_recent_target_paths()?;

        info!(
            folders = folders.len(),
            assets = assets.len(),
            "Catalog loaded"
        );

        let mut state = self.write()?;
        *state = CatalogState {
            folders,
            assets,
            sync_configuration: SyncAssetsConfiguration::new(definitions),
            recent_target_paths,
            ..CatalogState::default()
        };
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CatalogState>, StorageError> {
        self.state.read().map_err(|_| StorageError::Corrupted {
            path: PathBuf::from("catalog"),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CatalogState>, StorageError> {
        self.state.write().map_err(|_| StorageError::Corrupted {
            path: PathBuf::from("catalog"),
        })
    }

    // Folders

    /// Add a folder for `path`, or return the one already cataloged
    pub fn add_folder(&self, path: &Path) -> Result<Folder, StorageError> {
        let mut state = self.write()?;
        if let Some(existing) = state.folder_by_path(path) {
            return Ok(existing.clone());
        }

        let folder = Folder::new(path);
        debug!(path = %path.display(), "Folder added");
        state.folders.push(folder.clone());
        state.has_changes = true;
        Ok(folder)
    }

    /// All folders, ordered by path
    pub fn get_folders(&self) -> Result<Vec<Folder>, StorageError> {
        let mut folders = self.read()?.folders.clone();
        folders.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(folders)
    }

    /// Direct children of `parent`, ordered by path
    pub fn get_sub_folders(
        &self,
        parent: &Folder,
        include_hidden: bool,
    ) -> Result<Vec<Folder>, StorageError> {
        let mut children: Vec<Folder> = self
            .read()?
            .folders
            .iter()
            .filter(|f| parent.is_parent_of(f))
            .filter(|f| include_hidden || !f.is_hidden())
            .cloned()
            .collect();
        children.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(children)
    }

    pub fn get_folder_by_path(&self, path: &Path) -> Result<Option<Folder>, StorageError> {
        Ok(self.read()?.folder_by_path(path).cloned())
    }

    pub fn folder_exists(&self, path: &Path) -> Result<bool, StorageError> {
        Ok(self.read()?.folder_by_path(path).is_some())
    }

    /// Remove a folder together with its assets and thumbnails
    pub fn delete_folder(&self, folder: &Folder) -> Result<(), StorageError> {
        let mut state = self.write()?;
        let before = state.folders.len();
        state.folders.retain(|f| f.id != folder.id);
        if state.folders.len() == before {
            return Ok(());
        }

        state.assets.retain(|a| a.folder_id != folder.id);
        state.thumbnails.remove(&folder.id);
        state.dirty_thumbnails.remove(&folder.id);
        state.removed_folders.insert(folder.id);
        state.has_changes = true;
        debug!(path = %folder.path.display(), "Folder deleted");
        Ok(())
    }

    // Assets

    /// Add an asset, replacing any entry with the same folder and file name.
    ///
    /// `thumbnail` is stored under the asset's folder when given. Without
    /// one, any thumbnail left from an earlier entry is dropped.
    pub fn add_asset(&self, asset: Asset, thumbnail: Option<Vec<u8>>) -> Result<(), StorageError> {
        let mut state = self.write()?;
        self.ensure_thumbnails_loaded(&mut state, asset.folder_id)?;

        let touched = match (state.thumbnails.get_mut(&asset.folder_id), thumbnail) {
            (Some(map), Some(bytes)) => {
                map.insert(asset.file_name.clone(), bytes);
                true
            }
            (Some(map), None) => map.remove(&asset.file_name).is_some(),
            (None, _) => false,
        };
        if touched {
            state.dirty_thumbnails.insert(asset.folder_id);
        }

        match state.asset_position(&asset.folder.path, &asset.file_name) {
            Some(index) => state.assets[index] = asset,
            None => state.assets.push(asset),
        }
        state.has_changes = true;
        Ok(())
    }

    /// Replace a cataloged asset. Returns `false` when it was not cataloged.
    pub fn update_asset(
        &self,
        asset: Asset,
        thumbnail: Option<Vec<u8>>,
    ) -> Result<bool, StorageError> {
        if !self.is_asset_cataloged(&asset.folder.path, &asset.file_name)? {
            return Ok(false);
        }
        self.add_asset(asset, thumbnail)?;
        Ok(true)
    }

    /// Remove an asset and its thumbnail, returning the removed entry
    pub fn delete_asset(
        &self,
        directory: &Path,
        file_name: &str,
    ) -> Result<Option<Asset>, StorageError> {
        let mut state = self.write()?;
        let Some(index) = state.asset_position(directory, file_name) else {
            return Ok(None);
        };

        let asset = state.assets.remove(index);
        self.ensure_thumbnails_loaded(&mut state, asset.folder_id)?;
        if let Some(map) = state.thumbnails.get_mut(&asset.folder_id) {
            map.remove(file_name);
        }
        state.dirty_thumbnails.insert(asset.folder_id);
        state.has_changes = true;
        Ok(Some(asset))
    }

    /// Assets of one folder, ordered by file name
    pub fn get_assets_by_folder_id(&self, folder_id: Uuid) -> Result<Vec<Asset>, StorageError> {
        let mut assets: Vec<Asset> = self
            .read()?
            .assets
            .iter()
            .filter(|a| a.folder_id == folder_id)
            .cloned()
            .collect();
        assets.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(assets)
    }

    pub fn get_cataloged_assets(&self) -> Result<Vec<Asset>, StorageError> {
        Ok(self.read()?.assets.clone())
    }

    /// Assets of the folder at `directory`, ordered by file name
    pub fn get_cataloged_assets_by_path(&self, directory: &Path) -> Result<Vec<Asset>, StorageError> {
        match self.get_folder_by_path(directory)? {
            Some(folder) => self.get_assets_by_folder_id(folder.id),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_asset(&self, directory: &Path, file_name: &str) -> Result<Option<Asset>, StorageError> {
        let state = self.read()?;
        Ok(state
            .asset_position(directory, file_name)
            .map(|index| state.assets[index].clone()))
    }

    pub fn is_asset_cataloged(&self, directory: &Path, file_name: &str) -> Result<bool, StorageError> {
        Ok(self.read()?.asset_position(directory, file_name).is_some())
    }

    pub fn asset_count(&self) -> Result<usize, StorageError> {
        Ok(self.read()?.assets.len())
    }

    // Thumbnails

    fn ensure_thumbnails_loaded(
        &self,
        state: &mut CatalogState,
        folder_id: Uuid,
    ) -> Result<(), StorageError> {
        if !state.thumbnails.contains_key(&folder_id) {
            let map = if state.removed_folders.contains(&folder_id) {
                ThumbnailMap::new()
            } else {
                self.storage.load_thumbnails(folder_id)?
            };
            state.thumbnails.insert(folder_id, map);
        }
        Ok(())
    }

    fn with_folder_thumbnails<T>(
        &self,
        directory: &Path,
        f: impl FnOnce(&mut ThumbnailMap) -> T,
    ) -> Result<Option<(Uuid, T)>, StorageError> {
        let mut state = self.write()?;
        let Some(folder_id) = state.folder_by_path(directory).map(|f| f.id) else {
            return Ok(None);
        };
        self.ensure_thumbnails_loaded(&mut state, folder_id)?;
        Ok(state
            .thumbnails
            .get_mut(&folder_id)
            .map(|map| (folder_id, f(map))))
    }

    pub fn contains_thumbnail(&self, directory: &Path, file_name: &str) -> Result<bool, StorageError> {
        Ok(self
            .with_folder_thumbnails(directory, |map| map.contains_key(file_name))?
            .map(|(_, found)| found)
            .unwrap_or(false))
    }

    /// JPEG bytes of the thumbnail, if one is stored
    pub fn load_thumbnail(
        &self,
        directory: &Path,
        file_name: &str,
    ) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .with_folder_thumbnails(directory, |map| map.get(file_name).cloned())?
            .and_then(|(_, bytes)| bytes))
    }

    pub fn remove_thumbnail(&self, directory: &Path, file_name: &str) -> Result<(), StorageError> {
        let removed = self.with_folder_thumbnails(directory, |map| map.remove(file_name).is_some())?;
        if let Some((folder_id, true)) = removed {
            let mut state = self.write()?;
            state.dirty_thumbnails.insert(folder_id);
            state.has_changes = true;
        }
        Ok(())
    }

    // Sync configuration

    /// A snapshot of the sync configuration
    pub fn get_sync_assets_configuration(&self) -> Result<SyncAssetsConfiguration, StorageError> {
        Ok(self.read()?.sync_configuration.clone())
    }

    pub fn save_sync_assets_configuration(
        &self,
        configuration: SyncAssetsConfiguration,
    ) -> Result<(), StorageError> {
        let mut state = self.write()?;
        state.sync_configuration = configuration;
        state.has_changes = true;
        Ok(())
    }

    // Recent target paths

    pub fn get_recent_target_paths(&self) -> Result<Vec<PathBuf>, StorageError> {
        Ok(self.read()?.recent_target_paths.clone())
    }

    /// Replace the list, keeping the first occurrence of each path
    pub fn save_recent_target_paths(&self, paths: Vec<PathBuf>) -> Result<(), StorageError> {
        let mut state = self.write()?;
        let mut kept: Vec<PathBuf> = Vec::with_capacity(paths.len());
        for path in paths {
            if !kept.contains(&path) {
                kept.push(path);
            }
        }
        kept.truncate(MAX_RECENT_TARGET_PATHS);
        state.recent_target_paths = kept;
        state.has_changes = true;
        Ok(())
    }

    /// Remember a move/copy destination, most recent first
    pub fn add_recent_target_path(&self, path: &Path) -> Result<(), StorageError> {
        let mut state = self.write()?;
        state.recent_target_paths.retain(|p| p != path);
        state.recent_target_paths.insert(0, path.to_path_buf());
        state.recent_target_paths.truncate(MAX_RECENT_TARGET_PATHS);
        state.has_changes = true;
        Ok(())
    }

    // Persistence

    pub fn has_changes(&self) -> Result<bool, StorageError> {
        Ok(self.read()?.has_changes)
    }

    /// Write the catalog to storage.
    ///
    /// Tables are always written in full. With `folder` set, only that
    /// folder's pending thumbnails are flushed; others stay pending.
    pub fn save_catalog(&self, folder: Option<&Folder>) -> Result<(), StorageError> {
        let mut state = self.write()?;

        self.storage.save_catalog(&state.folders, &state.assets)?;
        self.storage
            .save_sync_definitions(&state.sync_configuration.definitions)?;
        self.storage
            .save_recent_target_paths(&state.recent_target_paths)?;

        for folder_id in state.removed_folders.drain().collect::<Vec<_>>() {
            self.storage.delete_thumbnails(folder_id)?;
        }

        let to_flush: Vec<Uuid> = match folder {
            Some(folder) => state
                .dirty_thumbnails
                .iter()
                .copied()
                .filter(|id| *id == folder.id)
                .collect(),
            None => state.dirty_thumbnails.iter().copied().collect(),
        };

        for folder_id in to_flush {
            if let Some(map) = state.thumbnails.get(&folder_id) {
                self.storage.save_thumbnails(folder_id, map)?;
            }
            state.dirty_thumbnails.remove(&folder_id);
        }

        state.has_changes = !state.dirty_thumbnails.is_empty();
        debug!(
            folders = state.folders.len(),
            assets = state.assets.len(),
            "Catalog saved"
        );
        Ok(())
    }

    /// Whether today's backup has already been written
    pub fn backup_exists(&self) -> Result<bool, StorageError> {
        self.storage.backup_exists(Local::now().date_naive())
    }

    /// Write (or refresh) today's backup
    pub fn write_backup(&self) -> Result<(), StorageError> {
        let today = Local::now().date_naive();
        info!(date = %today, "Writing catalog backup");
        self.storage.write_backup(today)
    }
}
