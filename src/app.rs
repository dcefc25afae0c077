//! Application facade.
//!
//! Wires the repository and the catalog services together behind one
//! object that front ends (the CLI, tests) talk to.

use crate::config::AppSettings;
use crate::core::catalog::CatalogAssetsService;
use crate::core::duplicates::FindDuplicatedAssetsService;
use crate::core::imaging::ThumbnailGenerator;
use crate::core::model::{Asset, Folder, SyncAssetsConfiguration};
use crate::core::repository::AssetRepository;
use crate::core::scanner::count_image_files;
use crate::core::storage::{CatalogStorage, SqliteStorage};
use crate::core::sync::{SyncAssetsResult, SyncAssetsService};
use crate::core::transfer::MoveAssetsService;
use crate::error::{CatalogError, Result};
use crate::events::{CatalogSummary, EventSender};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Application {
    settings: AppSettings,
    repository: Arc<AssetRepository>,
    catalog: CatalogAssetsService,
    duplicates: FindDuplicatedAssetsService,
    transfer: MoveAssetsService,
    sync: SyncAssetsService,
}

impl Application {
    /// Build the application on top of an explicit storage backend
    pub fn new(settings: AppSettings, storage: Arc<dyn CatalogStorage>) -> Result<Self> {
        if settings.use_perceptual_hash && !settings.hash_algorithm.is_perceptual() {
            warn!(
                algorithm = %settings.hash_algorithm,
                "Perceptual duplicate search works best with the dHash algorithm"
            );
        }

        let repository = Arc::new(AssetRepository::new(storage));
        repository.initialize()?;

        let thumbnails = ThumbnailGenerator::new(
            settings.thumbnail_max_width,
            settings.thumbnail_max_height,
            settings.thumbnail_quality,
        );

        Ok(Self {
            catalog: CatalogAssetsService::new(repository.clone(), &settings),
            duplicates: FindDuplicatedAssetsService::new(repository.clone(), &settings),
            transfer: MoveAssetsService::new(repository.clone(), thumbnails),
            sync: SyncAssetsService::new(repository.clone(), settings.include_hidden),
            repository,
            settings,
        })
    }

    /// Open the SQLite catalog in the settings' data directory
    pub fn open(settings: AppSettings) -> Result<Self> {
        let storage = SqliteStorage::open(
            &settings.database_path(),
            &settings.backups_directory(),
            settings.backups_to_keep,
        )?;
        info!(path = %settings.database_path().display(), "Catalog opened");
        Self::new(settings, Arc::new(storage))
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Cataloged assets of `directory` whose files still exist, by file name
    pub fn get_assets(&self, directory: &Path) -> Result<Vec<Asset>> {
        if directory.as_os_str().is_empty() {
            return Err(CatalogError::argument("directory cannot be empty"));
        }

        Ok(self
            .repository
            .get_cataloged_assets_by_path(directory)?
            .into_iter()
            .filter(|a| a.full_path().is_file())
            .collect())
    }

    pub fn get_asset_count(&self) -> Result<usize> {
        Ok(self.repository.asset_count()?)
    }

    pub fn get_sub_folders(&self, parent: &Folder, include_hidden: bool) -> Result<Vec<Folder>> {
        Ok(self.repository.get_sub_folders(parent, include_hidden)?)
    }

    /// The folder of the assets directory, cataloged on first use
    pub fn get_root_catalog_folders(&self) -> Result<Vec<Folder>> {
        let root = match self
            .repository
            .get_folder_by_path(&self.settings.assets_directory)?
        {
            Some(folder) => folder,
            None => self.repository.add_folder(&self.settings.assets_directory)?,
        };
        Ok(vec![root])
    }

    pub fn get_initial_folder(&self) -> PathBuf {
        self.settings.assets_directory.clone()
    }

    pub fn load_thumbnail(&self, asset: &Asset) -> Result<Option<Vec<u8>>> {
        Ok(self
            .repository
            .load_thumbnail(&asset.folder.path, &asset.file_name)?)
    }

    pub fn catalog_assets(&self, events: &EventSender, cancel: &AtomicBool) -> Result<CatalogSummary> {
        self.catalog.catalog_assets(events, cancel)
    }

    pub fn get_duplicated_assets(&self) -> Result<Vec<Vec<Asset>>> {
        self.duplicates.get_duplicated_assets()
    }

    pub fn move_assets(
        &self,
        assets: &[Asset],
        destination: &Path,
        preserve_original_files: bool,
        events: &EventSender,
    ) -> Result<bool> {
        self.transfer
            .move_assets(assets, destination, preserve_original_files, events)
    }

    pub fn copy_asset(&self, source: &Path, destination: &Path) -> Result<bool> {
        self.transfer.copy_asset(source, destination)
    }

    pub fn delete_assets(&self, assets: &[Asset], events: &EventSender) -> Result<()> {
        self.transfer.delete_assets(assets, events)
    }

    pub fn get_sync_assets_configuration(&self) -> Result<SyncAssetsConfiguration> {
        Ok(self.repository.get_sync_assets_configuration()?)
    }

    /// Normalize, validate and persist a sync configuration
    pub fn set_sync_assets_configuration(&self, configuration: SyncAssetsConfiguration) -> Result<()> {
        let configuration = configuration.normalize().validate();
        self.repository
            .save_sync_assets_configuration(configuration)?;
        self.repository.save_catalog(None)?;
        Ok(())
    }

    pub fn sync_assets(&self, events: &EventSender) -> Result<Vec<SyncAssetsResult>> {
        self.sync.sync_assets(events)
    }

    pub fn get_recent_target_paths(&self) -> Result<Vec<PathBuf>> {
        Ok(self.repository.get_recent_target_paths()?)
    }

    /// Image files currently under the assets directory
    pub fn get_total_files_count(&self) -> usize {
        count_image_files(&self.settings.assets_directory, self.settings.include_hidden)
    }

    pub fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    pub fn is_asset_cataloged(&self, directory: &Path, file_name: &str) -> Result<bool> {
        Ok(self.repository.is_asset_cataloged(directory, file_name)?)
    }

    /// Write today's backup now, whether or not the catalog changed
    pub fn write_backup(&self) -> Result<()> {
        self.repository.save_catalog(None)?;
        Ok(self.repository.write_backup()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::SyncAssetsDirectoriesDefinition;
    use crate::core::storage::InMemoryStorage;
    use crate::core::test_support::write_test_image;
    use crate::events::null_sender;
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    fn application(root: &Path) -> Application {
        let settings = AppSettings {
            assets_directory: root.to_path_buf(),
            data_directory: root.join(".data"),
            ..AppSettings::default()
        };
        Application::new(settings, Arc::new(InMemoryStorage::new())).unwrap()
    }

    #[test]
    fn get_assets_rejects_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let app = application(temp_dir.path());
        let result = app.get_assets(Path::new(""));
        assert!(matches!(result, Err(CatalogError::Argument(_))));
    }

    #[test]
    fn get_assets_filters_vanished_files() {
        let temp_dir = TempDir::new().unwrap();
        write_test_image(&temp_dir.path().join("b.png"), 8, 8, 1);
        write_test_image(&temp_dir.path().join("a.png"), 8, 8, 2);
        write_test_image(&temp_dir.path().join("c.png"), 8, 8, 3);
        let app = application(temp_dir.path());
        app.catalog_assets(&null_sender(), &AtomicBool::new(false))
            .unwrap();

        fs::remove_file(temp_dir.path().join("c.png")).unwrap();
        let names: Vec<String> = app
            .get_assets(temp_dir.path())
            .unwrap()
            .into_iter()
            .map(|a| a.file_name)
            .collect();

        assert_eq!(names, vec!["a.png", "b.png"]);
        assert_eq!(app.get_asset_count().unwrap(), 3);
        assert_eq!(app.get_total_files_count(), 2);
    }

    #[test]
    fn root_folder_is_the_assets_directory() {
        let temp_dir = TempDir::new().unwrap();
        let app = application(temp_dir.path());

        let roots = app.get_root_catalog_folders().unwrap();

        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].path, temp_dir.path());
        assert_eq!(app.get_initial_folder(), temp_dir.path());
    }

    #[test]
    fn sync_configuration_is_validated_on_save() {
        let temp_dir = TempDir::new().unwrap();
        let app = application(temp_dir.path());

        app.set_sync_assets_configuration(SyncAssetsConfiguration::new(vec![
            SyncAssetsDirectoriesDefinition::new("/src/", "/dst"),
            SyncAssetsDirectoriesDefinition::new("/same", "/same/"),
        ]))
        .unwrap();

        let saved = app.get_sync_assets_configuration().unwrap();
        assert_eq!(saved.definitions.len(), 1);
        assert_eq!(saved.definitions[0].source_directory, "/src");
    }

    #[test]
    fn sync_configuration_can_be_read_concurrently() {
        let temp_dir = TempDir::new().unwrap();
        let app = Arc::new(application(temp_dir.path()));
        app.set_sync_assets_configuration(SyncAssetsConfiguration::new(vec![
            SyncAssetsDirectoriesDefinition::new("/src", "/dst"),
        ]))
        .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let app = app.clone();
                thread::spawn(move || app.get_sync_assets_configuration().unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().definitions.len(), 1);
        }
    }

    #[test]
    fn manual_backup_is_written() {
        let temp_dir = TempDir::new().unwrap();
        let app = application(temp_dir.path());
        app.write_backup().unwrap();
        assert!(app.repository.backup_exists().unwrap());
    }
}
