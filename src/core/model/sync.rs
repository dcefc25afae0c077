//! Directory sync configuration.

use serde::{Deserialize, Serialize};

/// One source/destination pair to keep in sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAssetsDirectoriesDefinition {
    pub source_directory: String,
    pub destination_directory: String,
    /// Mirror subdirectories of the source too
    pub include_sub_folders: bool,
    /// Remove destination files that no longer exist in the source
    pub delete_assets_not_in_source: bool,
}

impl SyncAssetsDirectoriesDefinition {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source_directory: source.into(),
            destination_directory: destination.into(),
            ..Default::default()
        }
    }

    fn is_valid(&self) -> bool {
        !self.source_directory.is_empty()
            && !self.destination_directory.is_empty()
            && self.source_directory != self.destination_directory
    }

    fn normalize(&mut self) {
        self.source_directory = normalize_directory(&self.source_directory);
        self.destination_directory = normalize_directory(&self.destination_directory);
    }
}

fn normalize_directory(directory: &str) -> String {
    let trimmed = directory.trim();
    let without_separator = trimmed.trim_end_matches(['/', '\\']);
    if without_separator.is_empty() && !trimmed.is_empty() {
        // keep a bare root such as "/"
        trimmed[..1].to_string()
    } else {
        without_separator.to_string()
    }
}

/// Ordered list of directory pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAssetsConfiguration {
    pub definitions: Vec<SyncAssetsDirectoriesDefinition>,
}

impl SyncAssetsConfiguration {
    pub fn new(definitions: Vec<SyncAssetsDirectoriesDefinition>) -> Self {
        Self { definitions }
    }

    /// Trim whitespace and trailing separators from every directory
    pub fn normalize(mut self) -> Self {
        self.definitions.iter_mut().for_each(|d| d.normalize());
        self
    }

    /// Drop incomplete definitions and ones that sync a directory onto itself
    pub fn validate(mut self) -> Self {
        self.definitions.retain(|d| d.is_valid());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_whitespace_and_separators() {
        let config = SyncAssetsConfiguration::new(vec![SyncAssetsDirectoriesDefinition::new(
            "  /photos/src/ ",
            "/backup/dst\\",
        )])
        .normalize();

        assert_eq!(config.definitions[0].source_directory, "/photos/src");
        assert_eq!(config.definitions[0].destination_directory, "/backup/dst");
    }

    #[test]
    fn normalize_keeps_root() {
        assert_eq!(normalize_directory("/"), "/");
    }

    #[test]
    fn validate_drops_invalid_definitions_preserving_order() {
        let config = SyncAssetsConfiguration::new(vec![
            SyncAssetsDirectoriesDefinition::new("/a", "/b"),
            SyncAssetsDirectoriesDefinition::new("", "/b"),
            SyncAssetsDirectoriesDefinition::new("/same", "/same"),
            SyncAssetsDirectoriesDefinition::new("/c", "/d"),
        ])
        .normalize()
        .validate();

        let sources: Vec<_> = config
            .definitions
            .iter()
            .map(|d| d.source_directory.as_str())
            .collect();
        assert_eq!(sources, vec!["/a", "/c"]);
    }

    #[test]
    fn trailing_separator_does_not_hide_self_sync() {
        let config = SyncAssetsConfiguration::new(vec![SyncAssetsDirectoriesDefinition::new(
            "/same/", "/same",
        )])
        .normalize()
        .validate();

        assert!(config.definitions.is_empty());
    }
}
