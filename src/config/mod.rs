//! # Config Module
//!
//! User settings for the catalog, stored as `settings.json` in the
//! application data directory. Every field has a default, so a missing or
//! partial file is valid.

use crate::core::hasher::HashAlgorithmKind;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APPLICATION_FOLDER: &str = "photo-catalog";
const SETTINGS_FILE: &str = "settings.json";
const DATABASE_FILE: &str = "catalog.db";
const BACKUPS_FOLDER: &str = "backups";

/// Resolves where the application keeps its data.
pub trait PathProvider: Send + Sync {
    /// Folder holding the settings file, the catalog database and backups
    fn application_data_folder(&self) -> Result<PathBuf, ConfigError>;
}

/// Uses the platform data directory (`~/.local/share`, `~/Library/Application Support`, ...)
#[derive(Debug, Default, Clone)]
pub struct DefaultPathProvider;

impl PathProvider for DefaultPathProvider {
    fn application_data_folder(&self) -> Result<PathBuf, ConfigError> {
        dirs::data_dir()
            .map(|dir| dir.join(APPLICATION_FOLDER))
            .ok_or(ConfigError::NoDataDirectory)
    }
}

/// A fixed data folder, used by tests and the `--data-dir` flag
#[derive(Debug, Clone)]
pub struct FixedPathProvider(pub PathBuf);

impl PathProvider for FixedPathProvider {
    fn application_data_folder(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.0.clone())
    }
}

/// User settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Root directory that gets cataloged
    pub assets_directory: PathBuf,
    /// Where the catalog database and backups live
    pub data_directory: PathBuf,
    pub thumbnail_max_width: u32,
    pub thumbnail_max_height: u32,
    /// JPEG quality for thumbnails (1-100)
    pub thumbnail_quality: u8,
    /// Maximum number of new or updated assets processed per cataloging run
    pub catalog_batch_size: usize,
    pub backups_to_keep: usize,
    pub hash_algorithm: HashAlgorithmKind,
    /// Group duplicates by perceptual distance instead of exact hash
    pub use_perceptual_hash: bool,
    /// Maximum Hamming distance for perceptual duplicates
    pub perceptual_threshold: u32,
    pub include_hidden: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        let pictures = dirs::picture_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        let data = DefaultPathProvider
            .application_data_folder()
            .unwrap_or_else(|_| PathBuf::from(".").join(APPLICATION_FOLDER));

        Self {
            assets_directory: pictures,
            data_directory: data,
            thumbnail_max_width: 200,
            thumbnail_max_height: 150,
            thumbnail_quality: 80,
            catalog_batch_size: 1000,
            backups_to_keep: 2,
            hash_algorithm: HashAlgorithmKind::Sha512,
            use_perceptual_hash: false,
            perceptual_threshold: 8,
            include_hidden: false,
        }
    }
}

impl AppSettings {
    /// Load settings from the provider's data folder, falling back to
    /// defaults when no settings file exists yet.
    pub fn load(provider: &dyn PathProvider) -> Result<Self, ConfigError> {
        let folder = provider.application_data_folder()?;
        let path = folder.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self {
                data_directory: folder,
                ..Self::default()
            });
        }

        let mut settings = Self::load_from(&path)?;
        if settings.data_directory.as_os_str().is_empty() {
            settings.data_directory = folder;
        }
        Ok(settings)
    }

    /// Load settings from an explicit file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write settings as pretty JSON
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Read {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        fs::write(path, content).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Path of the catalog database
    pub fn database_path(&self) -> PathBuf {
        self.data_directory.join(DATABASE_FILE)
    }

    /// Folder holding dated backups of the catalog database
    pub fn backups_directory(&self) -> PathBuf {
        self.data_directory.join(BACKUPS_FOLDER)
    }

    /// Path of the settings file inside a data folder
    pub fn settings_path(data_folder: &Path) -> PathBuf {
        data_folder.join(SETTINGS_FILE)
    }
}
