//! # Storage Module
//!
//! The catalog database: object tables, thumbnail blobs and dated backups.
//!
//! ## Layout
//! - **Tables** - folders, assets, sync definitions, recent target paths
//! - **Blobs** - encoded JPEG thumbnails keyed by folder id and file name
//! - **Backups** - one copy of the database per day, pruned to a fixed count
//!
//! ## Backends
//! - `SqliteStorage` - Persistent storage using SQLite
//! - `InMemoryStorage` - For testing

mod memory;
mod sqlite;

pub use memory::InMemoryStorage;
pub use sqlite::SqliteStorage;

use crate::core::model::{Asset, Folder, SyncAssetsDirectoriesDefinition};
use crate::error::StorageError;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Thumbnails of a single folder, keyed by file name
pub type ThumbnailMap = HashMap<String, Vec<u8>>;

/// Trait for catalog storage backends
///
/// Saves have replace semantics: the stored table becomes exactly the
/// slice that was passed in.
pub trait CatalogStorage: Send + Sync {
    fn load_folders(&self) -> Result<Vec<Folder>, StorageError>;

    fn save_folders(&self, folders: &[Folder]) -> Result<(), StorageError>;

    fn load_assets(&self) -> Result<Vec<Asset>, StorageError>;

    fn save_assets(&self, assets: &[Asset]) -> Result<(), StorageError>;

    /// Store folders and assets together.
    ///
    /// Backends that support transactions should write both tables atomically.
    fn save_catalog(&self, folders: &[Folder], assets: &[Asset]) -> Result<(), StorageError> {
        self.save_folders(folders)?;
        self.save_assets(assets)
    }

    fn load_thumbnails(&self, folder_id: Uuid) -> Result<ThumbnailMap, StorageError>;

    fn save_thumbnails(
        &self,
        folder_id: Uuid,
        thumbnails: &ThumbnailMap,
    ) -> Result<(), StorageError>;

    fn delete_thumbnails(&self, folder_id: Uuid) -> Result<(), StorageError>;

    fn load_sync_definitions(&self) -> Result<Vec<SyncAssetsDirectoriesDefinition>, StorageError>;

    fn save_sync_definitions(
        &self,
        definitions: &[SyncAssetsDirectoriesDefinition],
    ) -> Result<(), StorageError>;

    fn load_recent_target_paths(&self) -> Result<Vec<PathBuf>, StorageError>;

    fn save_recent_target_paths(&self, paths: &[PathBuf]) -> Result<(), StorageError>;

    /// Write (or overwrite) the backup for `date` and prune old backups
    fn write_backup(&self, date: NaiveDate) -> Result<(), StorageError>;

    fn backup_exists(&self, date: NaiveDate) -> Result<bool, StorageError>;
}

/// File name used for the backup of a given day
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("{}.db", date.format("%Y%m%d"))
}

/// Parse a backup file name back into its date
pub fn parse_backup_file_name(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_suffix(".db")?;
    NaiveDate::parse_from_str(stem, "%Y%m%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_names_are_dated() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(backup_file_name(date), "20240309.db");
        assert_eq!(parse_backup_file_name("20240309.db"), Some(date));
    }

    #[test]
    fn unrelated_files_are_not_backups() {
        assert_eq!(parse_backup_file_name("catalog.db"), None);
        assert_eq!(parse_backup_file_name("20240309.zip"), None);
    }
}
