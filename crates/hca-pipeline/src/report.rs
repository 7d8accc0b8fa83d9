//! Run report: artifacts, failures, alignment outcomes and timings.

use chrono::{DateTime, Utc};
use hca_common::Result;
use serde::{Serialize, Serializer};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::alignment::{AlignmentStatus, AlignmentSummary};
use crate::dispatch::{JobFailure, OutputArtifact};
use crate::driver::PipelineState;

/// Serialize a duration as fractional seconds.
pub(crate) fn as_secs<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub pattern: String,
    pub structures_loaded: usize,
    /// `None` when no alignment ran.
    pub alignment: Option<AlignmentSummary>,
    pub selection: String,
    pub hotspots_selected: usize,
    /// Artifacts in job-declaration order.
    pub artifacts: Vec<OutputArtifact>,
    pub failures: Vec<JobFailure>,
    #[serde(serialize_with = "as_secs")]
    pub total_elapsed: Duration,
    /// States the driver passed through.
    pub stages: Vec<PipelineState>,
}

impl PipelineReport {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            pattern: pattern.into(),
            structures_loaded: 0,
            alignment: None,
            selection: String::new(),
            hotspots_selected: 0,
            artifacts: vec![],
            failures: vec![],
            total_elapsed: Duration::ZERO,
            stages: vec![],
        }
    }

    pub fn artifact_paths(&self) -> Vec<&Path> {
        self.artifacts.iter().map(|a| a.path.as_path()).collect()
    }

    /// Sum of per-job wall-clock time, successful and failed.
    pub fn jobs_elapsed(&self) -> Duration {
        self.artifacts
            .iter()
            .map(|a| a.elapsed)
            .chain(self.failures.iter().map(|f| f.elapsed))
            .sum()
    }

    pub fn record_alignment(&mut self, summary: AlignmentSummary) {
        match &mut self.alignment {
            Some(existing) => existing.merge(summary),
            None => self.alignment = Some(summary),
        }
    }

    /// Closing transcript block.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n=== PIPELINE COMPLETED SUCCESSFULLY ===");
        let _ = writeln!(out, "Total execution time: {:.1} seconds", self.total_elapsed.as_secs_f64());
        if let Some(alignment) = &self.alignment {
            let _ = writeln!(
                out,
                "Alignment: {} aligned, {} failed (reference {})",
                alignment.succeeded(),
                alignment.failed(),
                alignment.reference.as_deref().unwrap_or("none")
            );
            for outcome in alignment.failures() {
                if let AlignmentStatus::Failed { message } = &outcome.status {
                    let _ = writeln!(out, "  - {}: {}", outcome.structure, message);
                }
            }
        }
        let _ = writeln!(out, "Generated files:");
        for artifact in &self.artifacts {
            let _ = writeln!(out, "  - {}", artifact.path.display());
        }
        if !self.failures.is_empty() {
            let _ = writeln!(out, "Failed jobs:");
            for failure in &self.failures {
                let _ = writeln!(out, "  - {failure}");
            }
        }
        out
    }

    pub fn write_json(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::AlignmentOutcome;
    use crate::dispatch::JobFailureKind;
    use hca_test_utils::scratch_dir;

    fn artifact(job: &str, ms: u64) -> OutputArtifact {
        OutputArtifact {
            job: job.into(),
            path: PathBuf::from(format!("hotspots_{job}.png")),
            hotspots: 4,
            elapsed: Duration::from_millis(ms),
        }
    }

    fn report() -> PipelineReport {
        let mut report = PipelineReport::new("./ftmap/*.pdb");
        report.artifacts = vec![artifact("HO", 1500), artifact("Jaccard", 500)];
        report.failures = vec![JobFailure {
            job: "Overlap".into(),
            kind: JobFailureKind::Render,
            detail: "canvas too small".into(),
            elapsed: Duration::from_millis(250),
        }];
        report.total_elapsed = Duration::from_millis(2500);
        report
    }

    #[test]
    fn test_summary_lists_artifacts_and_failures() {
        let text = report().render_summary();
        assert!(text.contains("Total execution time: 2.5 seconds"));
        assert!(text.contains("  - hotspots_HO.png\n  - hotspots_Jaccard.png\n"));
        assert!(text.contains("Overlap (render failed): canvas too small"));
    }

    #[test]
    fn test_summary_reports_alignment_counts() {
        let outcome = |structure: &str, status| AlignmentOutcome {
            structure: structure.into(),
            reference: "apo".into(),
            status,
            rmsd: None,
            aligned: None,
        };
        let mut report = report();
        report.record_alignment(AlignmentSummary {
            reference: Some("apo".into()),
            outcomes: vec![
                outcome("holo", AlignmentStatus::Aligned),
                outcome("mutant", AlignmentStatus::Aligned),
                outcome(
                    "broken",
                    AlignmentStatus::Failed {
                        message: "no matching atoms".into(),
                    },
                ),
            ],
        });

        let text = report.render_summary();
        assert!(text.contains("Alignment: 2 aligned, 1 failed (reference apo)\n  - broken: no matching atoms\n"));
        assert!(!self::report().render_summary().contains("Alignment:"));
    }

    #[test]
    fn test_jobs_elapsed_counts_failures() {
        assert_eq!(report().jobs_elapsed(), Duration::from_millis(2250));
    }

    #[test]
    fn test_json_report() {
        let dir = scratch_dir();
        let path = dir.path().join("reports").join("run.json");
        report().write_json(&path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["artifacts"][0]["job"], "HO");
        assert_eq!(value["artifacts"][0]["elapsed"], 1.5);
        assert_eq!(value["failures"][0]["kind"], "render");
        assert_eq!(value["total_elapsed"], 2.5);
        assert!(value["alignment"].is_null());
    }
}
