//! hca-common: Shared types, errors, and collaborator traits used across all HCA crates.

pub mod error;
pub mod structures;
pub mod analysis;
pub mod reference;
pub mod dendrogram;
pub mod collaborators;

// Re-export commonly used types
pub use error::{CollaboratorError, PipelineError, Result};
pub use structures::{Hotspot, HotspotId, LoadedStructure};
pub use analysis::{Comparator, JobParams, LinkageMethod, Metric, Threshold};
pub use reference::{ReferencePolicy, StructureFilter};
pub use dendrogram::{Dendrogram, Merge};
pub use collaborators::{
    AlignmentReport, ClusterItem, ClusterRequest, ClusteringEngine, Collaborators, PlotRenderer,
    RenderOptions, StructureAligner, StructureSource,
};
