//! Catalog folders.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A directory node in the catalog tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub path: PathBuf,
}

impl Folder {
    /// Create a folder with a fresh id
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: path.into(),
        }
    }

    /// Last component of the path, or the whole path for a root
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    /// Whether `other` is a direct child of this folder
    pub fn is_parent_of(&self, other: &Folder) -> bool {
        other.path.parent() == Some(self.path.as_path())
    }

    /// Hidden folders start with a dot
    pub fn is_hidden(&self) -> bool {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
    }

    /// Whether this folder is `root` or lives somewhere below it
    pub fn is_within(&self, root: &Path) -> bool {
        self.path.starts_with(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_last_component() {
        let folder = Folder::new("/photos/2024/summer");
        assert_eq!(folder.name(), "summer");
    }

    #[test]
    fn root_name_is_whole_path() {
        let folder = Folder::new("/");
        assert_eq!(folder.name(), "/");
    }

    #[test]
    fn is_parent_of_direct_child_only() {
        let parent = Folder::new("/photos");
        let child = Folder::new("/photos/2024");
        let grandchild = Folder::new("/photos/2024/summer");

        assert!(parent.is_parent_of(&child));
        assert!(!parent.is_parent_of(&grandchild));
        assert!(!child.is_parent_of(&parent));
    }

    #[test]
    fn similar_prefix_is_not_a_child() {
        let parent = Folder::new("/photos");
        let other = Folder::new("/photos-old/2024");
        assert!(!parent.is_parent_of(&other));
        assert!(!other.is_within(&parent.path));
    }

    #[test]
    fn dot_folders_are_hidden() {
        assert!(Folder::new("/photos/.thumbnails").is_hidden());
        assert!(!Folder::new("/photos/trips").is_hidden());
    }
}
