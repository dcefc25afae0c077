//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the catalog services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Cataloging events
    Catalog(CatalogChange),
    /// Move, copy and delete events
    Transfer(TransferEvent),
    /// Directory sync events
    Sync(SyncEvent),
}

/// Changes applied to the catalog while it is being built
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CatalogChange {
    /// Cataloging has started
    Started { root: PathBuf, total_files: usize },
    /// A folder was added to the catalog
    FolderCreated { path: PathBuf },
    /// A folder no longer on disk was removed from the catalog
    FolderDeleted { path: PathBuf },
    /// A new asset was cataloged
    AssetCreated(CatalogProgress),
    /// An asset modified on disk was recataloged
    AssetUpdated(CatalogProgress),
    /// An asset no longer on disk was removed from the catalog
    AssetDeleted { path: PathBuf },
    /// An asset could not be processed; cataloging continues
    AssetFailed { path: PathBuf, message: String },
    /// Writing the catalog backup has started
    BackupStarted,
    /// Writing the catalog backup has finished
    BackupCompleted { created: bool },
    /// Cataloging finished
    Ended { summary: CatalogSummary },
}

/// Progress information while cataloging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProgress {
    /// The asset file
    pub path: PathBuf,
    /// Files processed so far
    pub processed: usize,
    /// Total image files under the assets directory
    pub total: usize,
}

/// Summary of a cataloging run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub folders_created: usize,
    pub folders_deleted: usize,
    pub assets_created: usize,
    pub assets_updated: usize,
    pub assets_deleted: usize,
    pub assets_failed: usize,
    /// The run stopped because the batch size was reached
    pub batch_limit_reached: bool,
    pub duration_ms: u64,
}

impl CatalogSummary {
    /// Whether this run changed the catalog at all
    pub fn has_changes(&self) -> bool {
        self.folders_created
            + self.folders_deleted
            + self.assets_created
            + self.assets_updated
            + self.assets_deleted
            > 0
    }
}

/// Events from moving, copying and deleting assets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransferEvent {
    AssetCopied { from: PathBuf, to: PathBuf },
    AssetMoved { from: PathBuf, to: PathBuf },
    AssetDeleted { path: PathBuf },
}

/// Events from syncing directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SyncEvent {
    /// Started processing a source/destination pair
    DefinitionStarted {
        source: PathBuf,
        destination: PathBuf,
    },
    FileCopied { from: PathBuf, to: PathBuf },
    FileDeleted { path: PathBuf },
    /// Finished processing a source/destination pair
    DefinitionCompleted { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Catalog(CatalogChange::AssetCreated(CatalogProgress {
            path: PathBuf::from("/photos/a.jpg"),
            processed: 3,
            total: 10,
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Catalog(CatalogChange::AssetCreated(p)) => {
                assert_eq!(p.processed, 3);
                assert_eq!(p.total, 10);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn empty_summary_has_no_changes() {
        assert!(!CatalogSummary::default().has_changes());
    }

    #[test]
    fn summary_with_deleted_asset_has_changes() {
        let summary = CatalogSummary {
            assets_deleted: 1,
            ..Default::default()
        };
        assert!(summary.has_changes());
    }
}
