//! # Model Module
//!
//! The catalog's data types: folders, assets and sync definitions.

mod asset;
mod folder;
mod sync;

pub use asset::{
    Asset, AssetMetadata, Dimensions, FileProperties, MetadataFlag, Pixel, Rotation,
    CORRUPTED_MESSAGE, ROTATED_MESSAGE,
};
pub use folder::Folder;
pub use sync::{SyncAssetsConfiguration, SyncAssetsDirectoriesDefinition};
