//! In-memory storage backend for testing.

use super::{CatalogStorage, ThumbnailMap};
use crate::core::model::{Asset, Folder, SyncAssetsDirectoriesDefinition};
use crate::error::StorageError;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    folders: Vec<Folder>,
    assets: Vec<Asset>,
    thumbnails: HashMap<Uuid, ThumbnailMap>,
    sync_definitions: Vec<SyncAssetsDirectoriesDefinition>,
    recent_target_paths: Vec<PathBuf>,
    backups: BTreeSet<NaiveDate>,
}

/// In-memory storage backend
///
/// Behaves like `SqliteStorage` without touching the filesystem.
pub struct InMemoryStorage {
    state: RwLock<MemoryState>,
    backups_to_keep: usize,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::with_backups_to_keep(2)
    }

    pub fn with_backups_to_keep(backups_to_keep: usize) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            backups_to_keep,
        }
    }

    /// Dates of the backups currently kept, oldest first
    pub fn backup_dates(&self) -> Vec<NaiveDate> {
        self.read()
            .map(|s| s.backups.iter().copied().collect())
            .unwrap_or_default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, StorageError> {
        self.state.read().map_err(|_| StorageError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, StorageError> {
        self.state.write().map_err(|_| StorageError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStorage for InMemoryStorage {
    fn load_folders(&self) -> Result<Vec<Folder>, StorageError> {
        let mut folders = self.read()?.folders.clone();
        folders.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(folders)
    }

    fn save_folders(&self, folders: &[Folder]) -> Result<(), StorageError> {
        self.write()?.folders = folders.to_vec();
        Ok(())
    }

    fn load_assets(&self) -> Result<Vec<Asset>, StorageError> {
        let state = self.read()?;
        // Mirror the SQL join: assets without a stored folder are dropped
        let mut assets: Vec<Asset> = state
            .assets
            .iter()
            .filter(|a| state.folders.iter().any(|f| f.id == a.folder_id))
            .cloned()
            .collect();
        assets.sort_by(|a, b| {
            a.folder
                .path
                .cmp(&b.folder.path)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        Ok(assets)
    }

    fn save_assets(&self, assets: &[Asset]) -> Result<(), StorageError> {
        self.write()?.assets = assets.to_vec();
        Ok(())
    }

    fn load_thumbnails(&self, folder_id: Uuid) -> Result<ThumbnailMap, StorageError> {
        Ok(self
            .read()?
            .thumbnails
            .get(&folder_id)
            .cloned()
            .unwrap_or_default())
    }

    fn save_thumbnails(
        &self,
        folder_id: Uuid,
        thumbnails: &ThumbnailMap,
    ) -> Result<(), StorageError> {
        self.write()?.thumbnails.insert(folder_id, thumbnails.clone());
        Ok(())
    }

    fn delete_thumbnails(&self, folder_id: Uuid) -> Result<(), StorageError> {
        self.write()?.thumbnails.remove(&folder_id);
        Ok(())
    }

    fn load_sync_definitions(&self) -> Result<Vec<SyncAssetsDirectoriesDefinition>, StorageError> {
        Ok(self.read()?.sync_definitions.clone())
    }

    fn save_sync_definitions(
        &self,
        definitions: &[SyncAssetsDirectoriesDefinition],
    ) -> Result<(), StorageError> {
        self.write()?.sync_definitions = definitions.to_vec();
        Ok(())
    }

    fn load_recent_target_paths(&self) -> Result<Vec<PathBuf>, StorageError> {
        Ok(self.read()?.recent_target_paths.clone())
    }

    fn save_recent_target_paths(&self, paths: &[PathBuf]) -> Result<(), StorageError> {
        self.write()?.recent_target_paths = paths.to_vec();
        Ok(())
    }

    fn write_backup(&self, date: NaiveDate) -> Result<(), StorageError> {
        let mut state = self.write()?;
        state.backups.insert(date);
        while state.backups.len() > self.backups_to_keep {
            state.backups.pop_first();
        }
        Ok(())
    }

    fn backup_exists(&self, date: NaiveDate) -> Result<bool, StorageError> {
        Ok(self.read()?.backups.contains(&date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::sample_asset;

    #[test]
    fn empty_storage_loads_nothing() {
        let storage = InMemoryStorage::new();
        assert!(storage.load_folders().unwrap().is_empty());
        assert!(storage.load_assets().unwrap().is_empty());
        assert!(storage.load_thumbnails(Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn assets_without_folder_are_not_loaded() {
        let storage = InMemoryStorage::new();
        let kept = Folder::new("/photos");
        let orphan = Folder::new("/gone");

        storage.save_folders(&[kept.clone()]).unwrap();
        storage
            .save_assets(&[sample_asset(&kept, "a.jpg"), sample_asset(&orphan, "b.jpg")])
            .unwrap();

        let assets = storage.load_assets().unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].file_name, "a.jpg");
    }

    #[test]
    fn backups_keep_most_recent_dates() {
        let storage = InMemoryStorage::with_backups_to_keep(2);
        for day in 1..=4 {
            storage
                .write_backup(NaiveDate::from_ymd_opt(2024, 2, day).unwrap())
                .unwrap();
        }

        let dates = storage.backup_dates();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 4).unwrap(),
            ]
        );
    }
}
