//! Per-job analysis dispatch: scope, align, cluster, render, persist.
//!
//! A job never aborts the run. Every failure is captured as a
//! [`JobFailure`] and the driver moves on to the next job.

use hca_common::{
    ClusterItem, ClusterRequest, Collaborators, Dendrogram, PlotRenderer, ReferencePolicy,
    RenderOptions, Threshold,
};
use hca_config::{AlignmentMode, AnalysisJob};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::alignment::{self, AlignmentSummary};
use crate::artifact::StagedArtifact;
use crate::console::Console;
use crate::report::as_secs;
use crate::selection::{self, HotspotPredicate, HotspotSelection, MIN_HOTSPOTS};
use crate::working_set::WorkingSet;

// ── Results ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputArtifact {
    pub job: String,
    pub path: PathBuf,
    pub hotspots: usize,
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobFailureKind {
    Selection,
    Alignment,
    Clustering,
    Render,
}

impl fmt::Display for JobFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobFailureKind::Selection => "selection",
            JobFailureKind::Alignment => "alignment",
            JobFailureKind::Clustering => "clustering",
            JobFailureKind::Render => "render",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobFailure {
    pub job: String,
    pub kind: JobFailureKind,
    pub detail: String,
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} failed): {}", self.job, self.kind, self.detail)
    }
}

/// Outcome of one job plus any alignment it triggered.
#[derive(Debug)]
pub struct JobRun {
    pub outcome: Result<OutputArtifact, JobFailure>,
    pub alignment: Option<AlignmentSummary>,
}

// ── Dispatcher ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub mode: AlignmentMode,
    pub reference: ReferencePolicy,
    pub threshold: Threshold,
    pub dpi: u32,
    pub tight_bbox: bool,
}

/// Releases the plot however the render step ends.
struct PlotGuard<'a> {
    renderer: &'a dyn PlotRenderer,
    plot: Dendrogram,
}

impl Drop for PlotGuard<'_> {
    fn drop(&mut self) {
        self.renderer.release(&self.plot);
    }
}

type StepResult<T> = Result<T, (JobFailureKind, String)>;

pub struct Dispatcher<'a> {
    collaborators: &'a Collaborators,
    settings: &'a DispatchSettings,
}

impl<'a> Dispatcher<'a> {
    pub fn new(collaborators: &'a Collaborators, settings: &'a DispatchSettings) -> Self {
        Self {
            collaborators,
            settings,
        }
    }

    pub async fn run(
        &self,
        job: &AnalysisJob,
        selection: &HotspotSelection,
        set: &mut WorkingSet,
        console: &mut Console,
    ) -> JobRun {
        let start = Instant::now();
        info!(job = %job.name, metric = %job.metric, "Running analysis job");
        console.line(format!("Running {} analysis...", job.name));

        let mut alignment = None;
        let outcome = match self.execute(job, selection, set, console, &mut alignment).await {
            Ok((path, hotspots)) => {
                let artifact = OutputArtifact {
                    job: job.name.clone(),
                    path,
                    hotspots,
                    elapsed: start.elapsed(),
                };
                console.done(format!(
                    "{} saved to {} ({:.1}s)",
                    job.name,
                    artifact.path.display(),
                    artifact.elapsed.as_secs_f64()
                ));
                Ok(artifact)
            }
            Err((kind, detail)) => {
                let failure = JobFailure {
                    job: job.name.clone(),
                    kind,
                    detail,
                    elapsed: start.elapsed(),
                };
                warn!("Job {}", failure);
                console.warn(format!("Job {failure}"));
                Err(failure)
            }
        };

        JobRun { outcome, alignment }
    }

    async fn execute(
        &self,
        job: &AnalysisJob,
        selection: &HotspotSelection,
        set: &mut WorkingSet,
        console: &mut Console,
        alignment: &mut Option<AlignmentSummary>,
    ) -> StepResult<(PathBuf, usize)> {
        let scoped;
        let selection = match &job.selection_prefixes {
            Some(prefixes) => {
                let predicate = HotspotPredicate::standard(prefixes.as_slice(), self.settings.threshold.clone());
                scoped = selection::select(set, &predicate);
                debug!(job = %job.name, %predicate, selected = scoped.len(), "Job-level selection");
                if scoped.len() < MIN_HOTSPOTS {
                    return Err((
                        JobFailureKind::Selection,
                        format!(
                            "only {} hotspots match {} (at least {} required)",
                            scoped.len(),
                            predicate,
                            MIN_HOTSPOTS
                        ),
                    ));
                }
                &scoped
            }
            None => selection,
        };

        let pre_aligned = self.prepare_frame(job, selection, set, console, alignment).await?;

        let request = ClusterRequest {
            metric: job.metric,
            hotspots: selection
                .iter()
                .map(|id| ClusterItem {
                    id: id.clone(),
                    structure: set
                        .coordinates(&id.structure)
                        .map(Path::to_path_buf)
                        .unwrap_or_default(),
                    descriptors: set
                        .hotspot(id)
                        .map(|h| h.descriptors.clone())
                        .unwrap_or_default(),
                })
                .collect(),
            params: job.params.clone(),
            pre_aligned,
        };

        let plot = self
            .collaborators
            .clustering
            .cluster(&request)
            .await
            .map_err(|e| (JobFailureKind::Clustering, e.to_string()))?;
        if !plot.is_complete() {
            debug!(job = %job.name, leaves = plot.leaf_count(), "Dendrogram has fewer merges than expected");
        }

        let guard = PlotGuard {
            renderer: self.collaborators.renderer.as_ref(),
            plot,
        };
        let options = RenderOptions {
            title: format!("{} | {}", job.title(), self.settings.threshold),
            dpi: self.settings.dpi,
            tight_bbox: self.settings.tight_bbox,
        };

        let render_err = |e: String| (JobFailureKind::Render, e);
        let staged = StagedArtifact::new(&job.output).map_err(|e| render_err(e.to_string()))?;
        self.collaborators
            .renderer
            .render(&guard.plot, staged.path(), &options)
            .await
            .map_err(|e| render_err(e.to_string()))?;
        let path = staged.commit().map_err(|e| render_err(e.to_string()))?;

        Ok((path, selection.len()))
    }

    /// Bring the job's structures into a shared frame if the metric needs
    /// it. Returns whether the clustering request may assume alignment.
    async fn prepare_frame(
        &self,
        job: &AnalysisJob,
        selection: &HotspotSelection,
        set: &mut WorkingSet,
        console: &mut Console,
        alignment: &mut Option<AlignmentSummary>,
    ) -> StepResult<bool> {
        let scope = selection.structures();
        if !job.requires_pre_alignment {
            return Ok(set.covers(scope.as_slice()));
        }

        match self.settings.mode {
            AlignmentMode::Disabled => {
                warn!(job = %job.name, "Alignment disabled; clustering structures in their deposited frames");
                console.warn(format!(
                    "{} expects aligned structures but alignment is disabled",
                    job.name
                ));
                Ok(false)
            }
            AlignmentMode::Global => Ok(set.frame().is_some()),
            AlignmentMode::PerJob if set.covers(scope.as_slice()) => Ok(true),
            AlignmentMode::PerJob => {
                let summary = alignment::align_scope(
                    set,
                    &scope,
                    &self.settings.reference,
                    self.collaborators.aligner.as_ref(),
                    console,
                )
                .await;
                let aligned = summary.reference.is_some();
                *alignment = Some(summary);
                if aligned {
                    Ok(true)
                } else {
                    Err((
                        JobFailureKind::Alignment,
                        format!("no {} among the selected structures", self.settings.reference),
                    ))
                }
            }
        }
    }
}
