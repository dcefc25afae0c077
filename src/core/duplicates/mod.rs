//! # Duplicates Module
//!
//! Finds cataloged assets that are copies of each other.
//!
//! ## Matching
//! - **Exact** - assets sharing the same hash
//! - **Perceptual** - assets whose hashes differ by at most `threshold` bits,
//!   grouped transitively (A~B and B~C puts A, B and C together)
//!
//! Assets whose file disappeared since cataloging are left out of the result.

use crate::config::AppSettings;
use crate::core::hasher::hamming_distance;
use crate::core::model::Asset;
use crate::core::repository::AssetRepository;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Disjoint-set over asset indices
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let p = self.parent[x];
        if p != x {
            let root = self.find(p);
            self.parent[x] = root;
            root
        } else {
            x
        }
    }

    fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent[root_a] = root_b;
        }
    }
}

/// Group assets with identical hashes
pub fn group_exact(assets: Vec<Asset>) -> Vec<Vec<Asset>> {
    let mut by_hash: HashMap<String, Vec<Asset>> = HashMap::new();
    for asset in assets.into_iter().filter(|a| !a.hash.is_empty()) {
        by_hash.entry(asset.hash.clone()).or_default().push(asset);
    }
    by_hash.into_values().filter(|g| g.len() > 1).collect()
}

/// Group assets whose hashes are within `threshold` bits of each other
pub fn group_perceptual(assets: Vec<Asset>, threshold: u32) -> Vec<Vec<Asset>> {
    let mut sets = UnionFind::new(assets.len());

    for i in 0..assets.len() {
        for j in (i + 1)..assets.len() {
            let close = hamming_distance(&assets[i].hash, &assets[j].hash)
                .map(|distance| distance <= threshold)
                .unwrap_or(false);
            if close {
                sets.union(i, j);
            }
        }
    }

    let mut groups: HashMap<usize, Vec<Asset>> = HashMap::new();
    for (index, asset) in assets.into_iter().enumerate() {
        groups.entry(sets.find(index)).or_default().push(asset);
    }
    groups.into_values().filter(|g| g.len() > 1).collect()
}

/// Drop vanished files and put groups in a stable order
fn finalize(groups: Vec<Vec<Asset>>) -> Vec<Vec<Asset>> {
    let mut groups: Vec<Vec<Asset>> = groups
        .into_iter()
        .map(|group| {
            let mut group: Vec<Asset> = group
                .into_iter()
                .filter(|a| a.full_path().is_file())
                .collect();
            group.sort_by_key(|a| a.full_path());
            group
        })
        .filter(|g| g.len() > 1)
        .collect();

    groups.sort_by_key(|g| g[0].full_path());
    groups
}

/// Reports duplicated assets of the catalog
pub struct FindDuplicatedAssetsService {
    repository: Arc<AssetRepository>,
    use_perceptual_hash: bool,
    threshold: u32,
}

impl FindDuplicatedAssetsService {
    pub fn new(repository: Arc<AssetRepository>, settings: &AppSettings) -> Self {
        Self {
            repository,
            use_perceptual_hash: settings.use_perceptual_hash,
            threshold: settings.perceptual_threshold,
        }
    }

    /// Groups of at least two duplicated assets, each sorted by path
    pub fn get_duplicated_assets(&self) -> Result<Vec<Vec<Asset>>> {
        let assets = self.repository.get_cataloged_assets()?;
        let total = assets.len();

        let groups = if self.use_perceptual_hash {
            group_perceptual(assets, self.threshold)
        } else {
            group_exact(assets)
        };
        let groups = finalize(groups);

        info!(
            assets = total,
            groups = groups.len(),
            perceptual = self.use_perceptual_hash,
            "Duplicate search finished"
        );
        Ok(groups)
    }
}
