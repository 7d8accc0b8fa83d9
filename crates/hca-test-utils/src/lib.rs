//! Shared testing utilities: an in-memory collaborator backend that records
//! every call, fixture builders, and a cloneable output buffer.

use async_trait::async_trait;
use hca_common::{
    AlignmentReport, ClusterRequest, ClusteringEngine, CollaboratorError, Collaborators,
    Dendrogram, Hotspot, LoadedStructure, Merge, Metric, PlotRenderer, RenderOptions,
    StructureAligner, StructureSource,
};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Output capture ────────────────────────────────────────────────────────────

/// `Write` sink shared between the code under test and the assertion side.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// Hotspot with an `S0` strength plus derived `CD`/`MD` descriptors.
pub fn hotspot(name: &str, s0: f64) -> Hotspot {
    Hotspot::new(name)
        .with_descriptor("S0", s0)
        .with_descriptor("CD", s0 / 4.0)
        .with_descriptor("MD", s0 / 2.0)
}

/// Protein-bearing FTMap structure carrying `(name, S0)` hotspots.
pub fn ftmap_structure(name: &str, hotspots: &[(&str, f64)]) -> LoadedStructure {
    hotspots
        .iter()
        .fold(LoadedStructure::new(name).with_protein(true), |s, (h, s0)| {
            s.with_hotspot(hotspot(h, *s0))
        })
}

/// Create empty `<stem>.pdb` files so a glob has something to match.
pub fn touch_structure_files(dir: &Path, stems: &[&str]) -> Vec<PathBuf> {
    stems
        .iter()
        .map(|stem| {
            let path = dir.join(format!("{stem}.pdb"));
            std::fs::write(&path, b"HEADER    FTMAP\n").unwrap();
            path
        })
        .collect()
}

/// Where the fake aligner claims to have written `structure` after moving it.
pub fn aligned_copy(structure: &LoadedStructure) -> PathBuf {
    structure
        .source
        .with_file_name(format!("{}_aligned.pdb", structure.name))
}

pub fn scratch_dir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

// ── Fake backend ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(PathBuf),
    Align { moving: String, reference: String },
    Cluster {
        metric: Metric,
        hotspots: Vec<String>,
        coordinates: Vec<PathBuf>,
        pre_aligned: bool,
    },
    Render { destination: PathBuf, title: String, dpi: u32 },
    Release { metric: String },
}

/// In-memory collaborator backend. Structures are keyed by file stem.
#[derive(Debug, Default)]
pub struct FakeBackend {
    structures: HashMap<String, LoadedStructure>,
    failing_loads: HashSet<String>,
    failing_alignments: HashSet<String>,
    failing_clusters: HashSet<Metric>,
    failing_renders: HashSet<Metric>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_structure(mut self, structure: LoadedStructure) -> Self {
        self.structures.insert(structure.name.clone(), structure);
        self
    }

    pub fn failing_load(mut self, stem: &str) -> Self {
        self.failing_loads.insert(stem.to_string());
        self
    }

    pub fn failing_alignment(mut self, structure: &str) -> Self {
        self.failing_alignments.insert(structure.to_string());
        self
    }

    pub fn failing_cluster(mut self, metric: Metric) -> Self {
        self.failing_clusters.insert(metric);
        self
    }

    pub fn failing_render(mut self, metric: Metric) -> Self {
        self.failing_renders.insert(metric);
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn align_calls(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Align { moving, reference } => Some((moving, reference)),
                _ => None,
            })
            .collect()
    }

    pub fn cluster_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Cluster { .. }))
            .collect()
    }

    pub fn release_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Release { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Wire one shared fake into every collaborator role.
pub fn collaborators(backend: &Arc<FakeBackend>) -> Collaborators {
    Collaborators {
        source: backend.clone(),
        aligner: backend.clone(),
        clustering: backend.clone(),
        renderer: backend.clone(),
    }
}

#[async_trait]
impl StructureSource for FakeBackend {
    async fn load(&self, path: &Path) -> Result<LoadedStructure, CollaboratorError> {
        self.record(Call::Load(path.to_path_buf()));
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing_loads.contains(&stem) {
            return Err(CollaboratorError::Rejected(format!("malformed structure {stem}")));
        }
        let mut structure = self
            .structures
            .get(&stem)
            .cloned()
            .ok_or_else(|| CollaboratorError::Rejected(format!("no fixture for {stem}")))?;
        structure.source = path.to_path_buf();
        Ok(structure)
    }
}

#[async_trait]
impl StructureAligner for FakeBackend {
    async fn align(
        &self,
        moving: &LoadedStructure,
        reference: &LoadedStructure,
    ) -> Result<AlignmentReport, CollaboratorError> {
        self.record(Call::Align {
            moving: moving.name.clone(),
            reference: reference.name.clone(),
        });
        if self.failing_alignments.contains(&moving.name) {
            return Err(CollaboratorError::Rejected(format!(
                "no matching atoms between {} and {}",
                moving.name, reference.name
            )));
        }
        Ok(AlignmentReport {
            rmsd: Some(0.5),
            aligned: Some(aligned_copy(moving)),
        })
    }
}

#[async_trait]
impl ClusteringEngine for FakeBackend {
    async fn cluster(&self, request: &ClusterRequest) -> Result<Dendrogram, CollaboratorError> {
        let labels: Vec<String> = request.hotspots.iter().map(|h| h.id.to_string()).collect();
        self.record(Call::Cluster {
            metric: request.metric,
            hotspots: labels.clone(),
            coordinates: request.hotspots.iter().map(|h| h.structure.clone()).collect(),
            pre_aligned: request.pre_aligned,
        });
        if self.failing_clusters.contains(&request.metric) {
            return Err(CollaboratorError::Rejected(format!(
                "{} distance matrix is degenerate",
                request.metric
            )));
        }
        let n = labels.len();
        let merges = (1..n)
            .map(|i| Merge {
                left: if i == 1 { 0 } else { n + i - 2 },
                right: i,
                distance: i as f64,
                size: i + 1,
            })
            .collect();
        Ok(Dendrogram {
            labels,
            merges,
            metric: request.metric.function_name().to_string(),
        })
    }
}

#[async_trait]
impl PlotRenderer for FakeBackend {
    async fn render(
        &self,
        plot: &Dendrogram,
        destination: &Path,
        options: &RenderOptions,
    ) -> Result<(), CollaboratorError> {
        self.record(Call::Render {
            destination: destination.to_path_buf(),
            title: options.title.clone(),
            dpi: options.dpi,
        });
        let failing = self
            .failing_renders
            .iter()
            .any(|m| m.function_name() == plot.metric);
        if failing {
            std::fs::write(destination, b"partial")?;
            return Err(CollaboratorError::Rejected("canvas too small".to_string()));
        }
        std::fs::write(destination, format!("PNG {}", plot.labels.join(",")))?;
        Ok(())
    }

    fn release(&self, plot: &Dendrogram) {
        self.record(Call::Release {
            metric: plot.metric.clone(),
        });
    }
}
