//! Interfaces to the external collaborators the pipeline supervises.
//!
//! Parsing, alignment, clustering and rendering all happen behind these
//! traits. The pipeline only sequences the calls and decides what a failure
//! means for the run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analysis::{JobParams, Metric};
use crate::dendrogram::Dendrogram;
use crate::error::CollaboratorError;
use crate::structures::{HotspotId, LoadedStructure};

/// Loads one structure file into a typed structure record.
#[async_trait]
pub trait StructureSource: Send + Sync {
    async fn load(&self, path: &Path) -> Result<LoadedStructure, CollaboratorError>;
}

/// Rigid-body alignment of one structure onto a reference.
#[async_trait]
pub trait StructureAligner: Send + Sync {
    async fn align(
        &self,
        moving: &LoadedStructure,
        reference: &LoadedStructure,
    ) -> Result<AlignmentReport, CollaboratorError>;
}

/// Pairwise or multivariate hierarchical clustering.
#[async_trait]
pub trait ClusteringEngine: Send + Sync {
    async fn cluster(&self, request: &ClusterRequest) -> Result<Dendrogram, CollaboratorError>;
}

/// Persists a dendrogram as a raster image.
#[async_trait]
pub trait PlotRenderer: Send + Sync {
    async fn render(
        &self,
        plot: &Dendrogram,
        destination: &Path,
        options: &RenderOptions,
    ) -> Result<(), CollaboratorError>;

    /// Releases any plotting resources held for `plot`. Called exactly once
    /// per clustering result, whether rendering succeeded or not.
    fn release(&self, plot: &Dendrogram);
}

/// Optional statistics reported by the aligner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    #[serde(default)]
    pub rmsd: Option<f64>,

    /// Coordinates of the moved structure, written by the aligner.
    #[serde(default)]
    pub aligned: Option<PathBuf>,
}

/// One hotspot as seen by the clustering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterItem {
    pub id: HotspotId,
    /// Coordinates of the owning structure: the aligned copy once one exists,
    /// the loaded file otherwise.
    #[serde(default)]
    pub structure: PathBuf,
    #[serde(default)]
    pub descriptors: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRequest {
    pub metric: Metric,
    pub hotspots: Vec<ClusterItem>,
    pub params: JobParams,
    /// Every `structure` path already sits in one reference frame; the
    /// collaborator must not align them again.
    pub pre_aligned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub title: String,
    pub dpi: u32,
    /// Crop the canvas to the drawn content.
    pub tight_bbox: bool,
}

/// The full set of collaborators a pipeline run talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn StructureSource>,
    pub aligner: Arc<dyn StructureAligner>,
    pub clustering: Arc<dyn ClusteringEngine>,
    pub renderer: Arc<dyn PlotRenderer>,
}

impl Collaborators {
    /// Use one backend for every collaborator role.
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: StructureSource + StructureAligner + ClusteringEngine + PlotRenderer + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            source: backend.clone(),
            aligner: backend.clone(),
            clustering: backend.clone(),
            renderer: backend,
        }
    }
}
