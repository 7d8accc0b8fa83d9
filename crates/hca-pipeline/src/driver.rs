//! Pipeline driver: sequences the stages and owns the failure policy.
//!
//! Fatal errors abort the run immediately. Per-structure alignment failures
//! and per-job failures are recorded and the run carries on; it only fails
//! at the end if no job produced an artifact.

use hca_common::{Collaborators, HotspotId, PipelineError, Result, Threshold};
use hca_config::{AlignmentMode, AnalysisJob, Config};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::alignment;
use crate::console::Console;
use crate::dispatch::{DispatchSettings, Dispatcher};
use crate::loader::{self, LoaderOptions};
use crate::report::PipelineReport;
use crate::selection::{self, HotspotPredicate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    Loading,
    Aligning,
    Selecting,
    Analyzing,
    Reporting,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Everything a run needs from the configuration, resolved and validated.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub pattern: String,
    pub loader: LoaderOptions,
    pub predicate: HotspotPredicate,
    pub threshold: Threshold,
    pub exclude_failed_alignments: bool,
    pub dispatch: DispatchSettings,
    pub jobs: Vec<AnalysisJob>,
    pub report_json: Option<PathBuf>,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let threshold = config.selection.threshold();
        Ok(Self {
            pattern: config.input.pattern.clone(),
            loader: LoaderOptions {
                skip_unreadable: config.input.skip_unreadable,
            },
            predicate: HotspotPredicate::standard(config.selection.name_prefixes.as_slice(), threshold.clone()),
            threshold: threshold.clone(),
            exclude_failed_alignments: config.alignment.exclude_failed,
            dispatch: DispatchSettings {
                mode: config.alignment_mode(),
                reference: config.alignment.reference.clone(),
                threshold,
                dpi: config.output.dpi,
                tight_bbox: config.output.tight_bbox,
            },
            jobs: config.resolve_jobs(),
            report_json: config.output.report_json.clone(),
        })
    }

    /// Distinct job-level predicates, in job order.
    fn job_predicates(&self) -> Vec<HotspotPredicate> {
        let mut predicates: Vec<HotspotPredicate> = Vec::new();
        for prefixes in self.jobs.iter().filter_map(|j| j.selection_prefixes.as_ref()) {
            let predicate = HotspotPredicate::standard(prefixes.as_slice(), self.threshold.clone());
            if !predicates.contains(&predicate) {
                predicates.push(predicate);
            }
        }
        predicates
    }
}

fn join_predicates(predicates: &[HotspotPredicate]) -> String {
    predicates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct Pipeline {
    settings: PipelineSettings,
    collaborators: Collaborators,
    console: Console,
    state: PipelineState,
    visited: Vec<PipelineState>,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings, collaborators: Collaborators, console: Console) -> Self {
        Self {
            settings,
            collaborators,
            console,
            state: PipelineState::Init,
            visited: vec![PipelineState::Init],
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = %self.state, to = %next, "Pipeline state transition");
        self.state = next;
        self.visited.push(next);
    }

    pub async fn run(&mut self) -> Result<PipelineReport> {
        match self.execute().await {
            Ok(mut report) => {
                self.transition(PipelineState::Done);
                report.stages = self.visited.clone();
                Ok(report)
            }
            Err(e) => {
                error!(stage = %self.state, "Pipeline failed: {}", e);
                self.transition(PipelineState::Failed);
                self.console.fail(&e);
                Err(e)
            }
        }
    }

    async fn execute(&mut self) -> Result<PipelineReport> {
        let started = Instant::now();
        let settings = self.settings.clone();
        let collaborators = self.collaborators.clone();
        let mut report = PipelineReport::new(&settings.pattern);

        self.console.banner("FTMap Hotspot HCA");
        info!(pattern = %settings.pattern, jobs = settings.jobs.len(), mode = %settings.dispatch.mode, "Starting pipeline");

        // ── Load ──
        self.transition(PipelineState::Loading);
        let mut set = loader::load_all(
            &settings.pattern,
            &settings.loader,
            collaborators.source.as_ref(),
            &mut self.console,
        )
        .await?;
        report.structures_loaded = set.len();

        // ── Global alignment ──
        if settings.dispatch.mode == AlignmentMode::Global {
            self.transition(PipelineState::Aligning);
            let summary = alignment::align_all(
                &mut set,
                &settings.dispatch.reference,
                collaborators.aligner.as_ref(),
                &mut self.console,
            )
            .await?;
            if settings.exclude_failed_alignments {
                for failed in summary.failures() {
                    debug!(structure = %failed.structure, "Excluding unaligned structure from selection");
                    set.exclude(&failed.structure);
                }
            }
            report.record_alignment(summary);
        }

        // ── Select ──
        self.transition(PipelineState::Selecting);
        let hotspots = selection::select(&set, &settings.predicate);
        if settings.jobs.iter().any(|j| j.selection_prefixes.is_none()) {
            self.console
                .line(format!("Using hotspot selection: {}", settings.predicate));
            selection::validate(&hotspots, &settings.threshold)?;
            report.selection = settings.predicate.to_string();
            report.hotspots_selected = hotspots.len();
            info!("Selected {} hotspots with {}", hotspots.len(), settings.threshold);
            self.console
                .done(format!("{} hotspots selected with {}", hotspots.len(), settings.threshold));
        } else {
            // Every job selects its own hotspots; each checks its selection.
            let predicates = settings.job_predicates();
            let selected: BTreeSet<HotspotId> = predicates
                .iter()
                .flat_map(|p| selection::select(&set, p).ids)
                .collect();
            report.selection = join_predicates(&predicates);
            report.hotspots_selected = selected.len();
            debug!(selection = %report.selection, selected = selected.len(), "Run-wide selection skipped");
            self.console
                .line(format!("Using per-job hotspot selection: {}", report.selection));
        }

        // ── Analyze ──
        self.transition(PipelineState::Analyzing);
        let dispatcher = Dispatcher::new(&collaborators, &settings.dispatch);
        for job in &settings.jobs {
            let run = dispatcher.run(job, &hotspots, &mut set, &mut self.console).await;
            if let Some(summary) = run.alignment {
                report.record_alignment(summary);
            }
            match run.outcome {
                Ok(artifact) => report.artifacts.push(artifact),
                Err(failure) => report.failures.push(failure),
            }
        }
        if report.artifacts.is_empty() {
            return Err(PipelineError::AllJobsFailed {
                attempted: settings.jobs.len(),
            });
        }

        // ── Report ──
        self.transition(PipelineState::Reporting);
        report.total_elapsed = started.elapsed();
        report.stages = self.visited.clone();
        self.console.line(report.render_summary().trim_end());
        if let Some(path) = &settings.report_json {
            let written = report.write_json(path)?;
            self.console
                .done(format!("Run report written to {}", written.display()));
        }
        info!(
            artifacts = report.artifacts.len(),
            failures = report.failures.len(),
            elapsed = report.total_elapsed.as_secs_f64(),
            "Pipeline completed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hca_config::Preset;

    #[test]
    fn test_settings_follow_preset() {
        let mut config = Config::default();
        config.output.preset = Preset::Jaccard;
        config.output.prefix = "run7".into();
        let settings = PipelineSettings::from_config(&config).unwrap();

        assert_eq!(settings.dispatch.mode, AlignmentMode::PerJob);
        assert_eq!(settings.jobs.len(), 1);
        assert_eq!(settings.jobs[0].output, PathBuf::from("run7_Jaccard.png"));
        assert_eq!(settings.predicate.to_string(), "((B* OR D*) AND S0 > 20)");
    }

    #[test]
    fn test_euclidean_preset_uses_job_predicate() {
        let mut config = Config::default();
        config.output.preset = Preset::Euclidean;
        let settings = PipelineSettings::from_config(&config).unwrap();
        let predicates = settings.job_predicates();
        assert_eq!(predicates.len(), 1);
        assert_eq!(join_predicates(&predicates), "((K15_*) AND S0 > 20)");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.output.dpi = 0;
        let err = PipelineSettings::from_config(&config).unwrap_err();
        assert_eq!(err.exit_code(), 64);
    }
}
