//! hca-pipeline: Orchestrator for hotspot hierarchical clustering runs.
//!
//! Stages, in order:
//! 1. Resolve the input pattern and load every structure file
//! 2. Align structures onto a reference (optional, or per job)
//! 3. Select hotspots and enforce the minimum-cardinality invariant
//! 4. Dispatch each clustering job and persist its dendrogram
//! 5. Report artifacts, failures and timings

pub mod working_set;
pub mod progress;
pub mod console;
pub mod loader;
pub mod alignment;
pub mod selection;
pub mod artifact;
pub mod dispatch;
pub mod report;
pub mod driver;
pub mod bridge;

pub use working_set::WorkingSet;
pub use console::Console;
pub use alignment::{AlignmentOutcome, AlignmentStatus, AlignmentSummary};
pub use selection::{HotspotPredicate, HotspotSelection};
pub use dispatch::{DispatchSettings, Dispatcher, JobFailure, JobFailureKind, JobRun, OutputArtifact};
pub use loader::LoaderOptions;
pub use report::PipelineReport;
pub use driver::{Pipeline, PipelineSettings, PipelineState};
pub use bridge::CommandBridge;
