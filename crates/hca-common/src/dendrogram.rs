//! Clustering result returned by the clustering collaborator.

use serde::{Deserialize, Serialize};

/// One agglomeration step. Indices below `labels.len()` are leaves; larger
/// indices refer to the cluster formed by merge `index - labels.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

/// Renderable dendrogram scoped to a single analysis job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dendrogram {
    pub labels: Vec<String>,
    #[serde(default)]
    pub merges: Vec<Merge>,
    #[serde(default)]
    pub metric: String,
}

impl Dendrogram {
    pub fn leaf_count(&self) -> usize {
        self.labels.len()
    }

    /// A complete tree has exactly `n - 1` merges.
    pub fn is_complete(&self) -> bool {
        !self.labels.is_empty() && self.merges.len() + 1 == self.labels.len()
    }
}
