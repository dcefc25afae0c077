//! Cataloged assets.

use super::Folder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

pub const CORRUPTED_MESSAGE: &str = "The asset is corrupted";
pub const ROTATED_MESSAGE: &str = "The asset has been rotated";

/// Width and height in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Pixel sizes of the asset and of its thumbnail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pixel {
    pub asset: Dimensions,
    pub thumbnail: Dimensions,
}

/// Filesystem properties captured when the asset was cataloged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProperties {
    pub size: u64,
    pub creation: DateTime<Utc>,
    pub modification: DateTime<Utc>,
}

/// A boolean fact about an asset plus an optional explanation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFlag {
    pub is_true: bool,
    pub message: Option<String>,
}

impl MetadataFlag {
    pub fn set(message: &str) -> Self {
        Self {
            is_true: true,
            message: Some(message.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub corrupted: MetadataFlag,
    pub rotated: MetadataFlag,
}

/// Clockwise rotation needed to display the asset upright
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Rotate0,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    /// Map an EXIF orientation tag (1-8) to a rotation
    pub fn from_exif_orientation(orientation: u32) -> Self {
        match orientation {
            3 | 4 => Rotation::Rotate180,
            5 | 6 => Rotation::Rotate90,
            7 | 8 => Rotation::Rotate270,
            _ => Rotation::Rotate0,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Rotate0 => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }

    pub fn from_degrees(degrees: u32) -> Self {
        match degrees % 360 {
            90 => Rotation::Rotate90,
            180 => Rotation::Rotate180,
            270 => Rotation::Rotate270,
            _ => Rotation::Rotate0,
        }
    }
}

/// A cataloged image file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub folder_id: Uuid,
    pub folder: Folder,
    pub file_name: String,
    pub pixel: Pixel,
    pub file_properties: FileProperties,
    pub thumbnail_creation: DateTime<Utc>,
    pub hash: String,
    pub rotation: Rotation,
    pub metadata: AssetMetadata,
}

impl Asset {
    /// Absolute path of the asset file
    pub fn full_path(&self) -> PathBuf {
        self.folder.path.join(&self.file_name)
    }

    /// Same asset as seen from another folder (used when copying/moving)
    pub fn relocated(&self, folder: &Folder) -> Self {
        Self {
            folder_id: folder.id,
            folder: folder.clone(),
            ..self.clone()
        }
    }

    pub fn is_corrupted(&self) -> bool {
        self.metadata.corrupted.is_true
    }

    /// The file on disk is newer than the cataloged thumbnail
    pub fn is_outdated(&self, modification: DateTime<Utc>) -> bool {
        modification > self.thumbnail_creation
    }
}
