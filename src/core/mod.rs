//! # Core Module
//!
//! The GUI-agnostic photo catalog engine.
//!
//! ## Modules
//! - `model` - Folders, assets and sync definitions
//! - `storage` - Catalog database, thumbnail blobs and backups
//! - `repository` - In-memory catalog backed by storage
//! - `scanner` - Lists image files and directories
//! - `hasher` - Content and perceptual hashes
//! - `imaging` - Decoding, EXIF rotation and thumbnails
//! - `catalog` - Keeps the catalog in line with the assets directory
//! - `duplicates` - Groups duplicated assets
//! - `transfer` - Copies, moves and deletes assets
//! - `sync` - Mirrors directory pairs

pub mod catalog;
pub mod duplicates;
pub mod hasher;
pub mod imaging;
pub mod model;
pub mod repository;
pub mod scanner;
pub mod storage;
pub mod sync;
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use hasher::HashAlgorithmKind;
pub use model::{Asset, Folder, SyncAssetsConfiguration, SyncAssetsDirectoriesDefinition};
pub use repository::AssetRepository;
pub use sync::SyncAssetsResult;
