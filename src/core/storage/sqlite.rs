//! SQLite storage backend.

use super::{backup_file_name, parse_backup_file_name, CatalogStorage, ThumbnailMap};
use crate::core::model::{
    Asset, AssetMetadata, Dimensions, FileProperties, Folder, MetadataFlag, Pixel, Rotation,
    SyncAssetsDirectoriesDefinition,
};
use crate::error::StorageError;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row, Transaction};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS folders (
        id TEXT PRIMARY KEY,
        path TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS assets (
        folder_id TEXT NOT NULL,
        file_name TEXT NOT NULL,
        width INTEGER NOT NULL,
        height INTEGER NOT NULL,
        thumbnail_width INTEGER NOT NULL,
        thumbnail_height INTEGER NOT NULL,
        file_size INTEGER NOT NULL,
        file_creation TEXT NOT NULL,
        file_modification TEXT NOT NULL,
        thumbnail_creation TEXT NOT NULL,
        hash TEXT NOT NULL,
        rotation INTEGER NOT NULL,
        corrupted INTEGER NOT NULL,
        corrupted_message TEXT,
        rotated INTEGER NOT NULL,
        rotated_message TEXT,
        PRIMARY KEY (folder_id, file_name)
    );
    CREATE INDEX IF NOT EXISTS idx_assets_hash ON assets(hash);
    CREATE TABLE IF NOT EXISTS thumbnails (
        folder_id TEXT NOT NULL,
        file_name TEXT NOT NULL,
        data BLOB NOT NULL,
        PRIMARY KEY (folder_id, file_name)
    );
    CREATE TABLE IF NOT EXISTS sync_definitions (
        ordinal INTEGER PRIMARY KEY,
        source_directory TEXT NOT NULL,
        destination_directory TEXT NOT NULL,
        include_sub_folders INTEGER NOT NULL,
        delete_assets_not_in_source INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS recent_target_paths (
        ordinal INTEGER PRIMARY KEY,
        path TEXT NOT NULL
    );
";

/// SQLite-backed catalog database
///
/// Uses WAL mode so readers are not blocked by a write in progress.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    backups_directory: PathBuf,
    backups_to_keep: usize,
}

impl SqliteStorage {
    /// Open or create a catalog database at the given path
    pub fn open(
        path: &Path,
        backups_directory: &Path,
        backups_to_keep: usize,
    ) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StorageError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        debug!(path = %path.display(), "catalog database opened");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
            backups_directory: backups_directory.to_path_buf(),
            backups_to_keep,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    fn backup_path(&self, date: NaiveDate) -> PathBuf {
        self.backups_directory.join(backup_file_name(date))
    }

    /// Delete the oldest backups beyond `backups_to_keep`.
    ///
    /// Returns the number of backups removed.
    fn prune_backups(&self) -> Result<usize, StorageError> {
        let entries = match fs::read_dir(&self.backups_directory) {
            Ok(entries) => entries,
            Err(_) => return Ok(0),
        };

        let mut backups: Vec<(NaiveDate, PathBuf)> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name();
                parse_backup_file_name(&name.to_string_lossy()).map(|date| (date, e.path()))
            })
            .collect();

        backups.sort_by(|a, b| b.0.cmp(&a.0));

        let mut removed = 0;
        for (_, path) in backups.into_iter().skip(self.backups_to_keep) {
            fs::remove_file(&path).map_err(|e| StorageError::BackupFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            removed += 1;
        }

        Ok(removed)
    }

    fn replace_folders(tx: &Transaction<'_>, folders: &[Folder]) -> rusqlite::Result<()> {
        tx.execute("DELETE FROM folders", [])?;
        let mut stmt = tx.prepare("INSERT INTO folders (id, path) VALUES (?1, ?2)")?;
        for folder in folders {
            stmt.execute(params![
                folder.id.to_string(),
                folder.path.to_string_lossy()
            ])?;
        }
        Ok(())
    }

    fn replace_assets(tx: &Transaction<'_>, assets: &[Asset]) -> rusqlite::Result<()> {
        tx.execute("DELETE FROM assets", [])?;
        let mut stmt = tx.prepare(
            "INSERT INTO assets
             (folder_id, file_name, width, height, thumbnail_width, thumbnail_height,
              file_size, file_creation, file_modification, thumbnail_creation, hash,
              rotation, corrupted, corrupted_message, rotated, rotated_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )?;
        for asset in assets {
            stmt.execute(params![
                asset.folder_id.to_string(),
                asset.file_name,
                asset.pixel.asset.width,
                asset.pixel.asset.height,
                asset.pixel.thumbnail.width,
                asset.pixel.thumbnail.height,
                asset.file_properties.size as i64,
                to_text(asset.file_properties.creation),
                to_text(asset.file_properties.modification),
                to_text(asset.thumbnail_creation),
                asset.hash,
                asset.rotation.degrees(),
                asset.metadata.corrupted.is_true,
                asset.metadata.corrupted.message,
                asset.metadata.rotated.is_true,
                asset.metadata.rotated.message,
            ])?;
        }
        Ok(())
    }

    fn read_asset(row: &Row<'_>) -> rusqlite::Result<Asset> {
        let folder_id = parse_uuid(0, row.get(0)?)?;
        let folder = Folder {
            id: folder_id,
            path: PathBuf::from(row.get::<_, String>(16)?),
        };

        Ok(Asset {
            folder_id,
            folder,
            file_name: row.get(1)?,
            pixel: Pixel {
                asset: Dimensions::new(row.get(2)?, row.get(3)?),
                thumbnail: Dimensions::new(row.get(4)?, row.get(5)?),
            },
            file_properties: FileProperties {
                size: row.get::<_, i64>(6)? as u64,
                creation: parse_time(7, row.get(7)?)?,
                modification: parse_time(8, row.get(8)?)?,
            },
            thumbnail_creation: parse_time(9, row.get(9)?)?,
            hash: row.get(10)?,
            rotation: Rotation::from_degrees(row.get(11)?),
            metadata: AssetMetadata {
                corrupted: MetadataFlag {
                    is_true: row.get(12)?,
                    message: row.get(13)?,
                },
                rotated: MetadataFlag {
                    is_true: row.get(14)?,
                    message: row.get(15)?,
                },
            },
        })
    }
}

fn to_text(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_time(idx: usize, value: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_uuid(idx: usize, value: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

impl CatalogStorage for SqliteStorage {
    fn load_folders(&self) -> Result<Vec<Folder>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, path FROM folders ORDER BY path")?;

        let folders = stmt
            .query_map([], |row| {
                Ok(Folder {
                    id: parse_uuid(0, row.get(0)?)?,
                    path: PathBuf::from(row.get::<_, String>(1)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(folders)
    }

    fn save_folders(&self, folders: &[Folder]) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::replace_folders(&tx, folders)?;
        tx.commit()?;
        Ok(())
    }

    fn load_assets(&self) -> Result<Vec<Asset>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT a.folder_id, a.file_name, a.width, a.height, a.thumbnail_width,
                    a.thumbnail_height, a.file_size, a.file_creation, a.file_modification,
                    a.thumbnail_creation, a.hash, a.rotation, a.corrupted, a.corrupted_message,
                    a.rotated, a.rotated_message, f.path
             FROM assets a JOIN folders f ON f.id = a.folder_id
             ORDER BY f.path, a.file_name",
        )?;

        let assets = stmt
            .query_map([], Self::read_asset)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(assets)
    }

    fn save_assets(&self, assets: &[Asset]) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::replace_assets(&tx, assets)?;
        tx.commit()?;
        Ok(())
    }

    fn save_catalog(&self, folders: &[Folder], assets: &[Asset]) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::replace_folders(&tx, folders)?;
        Self::replace_assets(&tx, assets)?;
        tx.commit()?;
        Ok(())
    }

    fn load_thumbnails(&self, folder_id: Uuid) -> Result<ThumbnailMap, StorageError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT file_name, data FROM thumbnails WHERE folder_id = ?1")?;

        let thumbnails = stmt
            .query_map([folder_id.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<rusqlite::Result<ThumbnailMap>>()?;

        Ok(thumbnails)
    }

    fn save_thumbnails(
        &self,
        folder_id: Uuid,
        thumbnails: &ThumbnailMap,
    ) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = folder_id.to_string();

        tx.execute("DELETE FROM thumbnails WHERE folder_id = ?1", [&id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO thumbnails (folder_id, file_name, data) VALUES (?1, ?2, ?3)",
            )?;
            for (file_name, data) in thumbnails {
                stmt.execute(params![id, file_name, data])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_thumbnails(&self, folder_id: Uuid) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM thumbnails WHERE folder_id = ?1",
            [folder_id.to_string()],
        )?;
        Ok(())
    }

    fn load_sync_definitions(&self) -> Result<Vec<SyncAssetsDirectoriesDefinition>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT source_directory, destination_directory, include_sub_folders,
                    delete_assets_not_in_source
             FROM sync_definitions ORDER BY ordinal",
        )?;

        let definitions = stmt
            .query_map([], |row| {
                Ok(SyncAssetsDirectoriesDefinition {
                    source_directory: row.get(0)?,
                    destination_directory: row.get(1)?,
                    include_sub_folders: row.get(2)?,
                    delete_assets_not_in_source: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(definitions)
    }

    fn save_sync_definitions(
        &self,
        definitions: &[SyncAssetsDirectoriesDefinition],
    ) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM sync_definitions", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sync_definitions
                 (ordinal, source_directory, destination_directory, include_sub_folders,
                  delete_assets_not_in_source)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (ordinal, definition) in definitions.iter().enumerate() {
                stmt.execute(params![
                    ordinal as i64,
                    definition.source_directory,
                    definition.destination_directory,
                    definition.include_sub_folders,
                    definition.delete_assets_not_in_source,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_recent_target_paths(&self) -> Result<Vec<PathBuf>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT path FROM recent_target_paths ORDER BY ordinal")?;

        let paths = stmt
            .query_map([], |row| row.get::<_, String>(0).map(PathBuf::from))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(paths)
    }

    fn save_recent_target_paths(&self, paths: &[PathBuf]) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM recent_target_paths", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO recent_target_paths (ordinal, path) VALUES (?1, ?2)")?;
            for (ordinal, path) in paths.iter().enumerate() {
                stmt.execute(params![ordinal as i64, path.to_string_lossy()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_backup(&self, date: NaiveDate) -> Result<(), StorageError> {
        let target = self.backup_path(date);

        fs::create_dir_all(&self.backups_directory).map_err(|e| StorageError::BackupFailed {
            path: target.clone(),
            reason: e.to_string(),
        })?;

        // VACUUM INTO refuses to overwrite an existing file
        if target.exists() {
            fs::remove_file(&target).map_err(|e| StorageError::BackupFailed {
                path: target.clone(),
                reason: e.to_string(),
            })?;
        }

        {
            let conn = self.lock()?;
            conn.execute("VACUUM INTO ?1", [target.to_string_lossy()])
                .map_err(|e| StorageError::BackupFailed {
                    path: target.clone(),
                    reason: e.to_string(),
                })?;
        }

        let pruned = self.prune_backups()?;
        info!(path = %target.display(), pruned, "catalog backup written");
        Ok(())
    }

    fn backup_exists(&self, date: NaiveDate) -> Result<bool, StorageError> {
        Ok(self.backup_path(date).exists())
    }
}
