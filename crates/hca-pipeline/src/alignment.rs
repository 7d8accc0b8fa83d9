//! Structural alignment onto a shared reference.
//!
//! A failed alignment is recorded and reported but never aborts the stage.
//! Only a working set with fewer than two eligible structures is fatal, and
//! only for the global pass.

use hca_common::{LoadedStructure, PipelineError, ReferencePolicy, Result, StructureAligner};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::console::Console;
use crate::working_set::WorkingSet;

/// Minimum eligible structures for a global alignment pass.
pub const MIN_ALIGNABLE: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlignmentStatus {
    Aligned,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentOutcome {
    pub structure: String,
    pub reference: String,
    #[serde(flatten)]
    pub status: AlignmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rmsd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aligned: Option<PathBuf>,
}

impl AlignmentOutcome {
    pub fn is_aligned(&self) -> bool {
        matches!(self.status, AlignmentStatus::Aligned)
    }
}

/// Per-structure alignment results, in working-set order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlignmentSummary {
    pub reference: Option<String>,
    pub outcomes: Vec<AlignmentOutcome>,
}

impl AlignmentSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_aligned()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &AlignmentOutcome> {
        self.outcomes.iter().filter(|o| !o.is_aligned())
    }

    /// Fold a later (per-job) summary into this one.
    pub fn merge(&mut self, other: AlignmentSummary) {
        if self.reference.is_none() {
            self.reference = other.reference;
        }
        self.outcomes.extend(other.outcomes);
    }
}

async fn align_onto(
    candidates: &[&LoadedStructure],
    reference: &LoadedStructure,
    aligner: &dyn StructureAligner,
    console: &mut Console,
) -> Vec<AlignmentOutcome> {
    let start = Instant::now();
    let mut outcomes = Vec::with_capacity(candidates.len());

    for (i, moving) in candidates.iter().enumerate() {
        let outcome = match aligner.align(moving, reference).await {
            Ok(report) => {
                debug!(structure = %moving.name, rmsd = ?report.rmsd, "Aligned");
                AlignmentOutcome {
                    structure: moving.name.clone(),
                    reference: reference.name.clone(),
                    status: AlignmentStatus::Aligned,
                    rmsd: report.rmsd,
                    aligned: report.aligned,
                }
            }
            Err(e) => {
                warn!("Alignment failed for {}: {}", moving.name, e);
                console.warn(format!("Alignment failed for {}: {}", moving.name, e));
                AlignmentOutcome {
                    structure: moving.name.clone(),
                    reference: reference.name.clone(),
                    status: AlignmentStatus::Failed {
                        message: e.to_string(),
                    },
                    rmsd: None,
                    aligned: None,
                }
            }
        };
        outcomes.push(outcome);
        console.progress(i + 1, candidates.len(), start, "Aligning");
    }
    outcomes
}

/// Enter the outcomes into the working set's frame and coordinate table.
fn commit(set: &mut WorkingSet, summary: &AlignmentSummary) {
    let Some(reference) = &summary.reference else {
        return;
    };
    set.record_alignment(reference, summary.outcomes.iter().map(|o| o.structure.clone()));
    for outcome in &summary.outcomes {
        if let Some(path) = &outcome.aligned {
            set.set_aligned_coordinates(&outcome.structure, path.clone());
        }
    }
}

/// Align every eligible structure onto the first eligible one.
pub async fn align_all(
    set: &mut WorkingSet,
    policy: &ReferencePolicy,
    aligner: &dyn StructureAligner,
    console: &mut Console,
) -> Result<AlignmentSummary> {
    let eligible = policy.eligible(set.structures());
    if eligible.len() < MIN_ALIGNABLE {
        return Err(PipelineError::InsufficientInput {
            eligible: eligible.len(),
            required: MIN_ALIGNABLE,
        });
    }

    let reference = eligible[0];
    info!("Aligning {} structures onto {} ({})", eligible.len() - 1, reference.name, policy);
    console.line(format!("Reference structure: {}", reference.name));

    let outcomes = align_onto(&eligible[1..], reference, aligner, console).await;
    let summary = AlignmentSummary {
        reference: Some(reference.name.clone()),
        outcomes,
    };

    commit(set, &summary);
    console.done(format!(
        "Alignment complete: {} aligned, {} failed",
        summary.succeeded(),
        summary.failed()
    ));
    Ok(summary)
}

/// Align only the named structures, on demand for one job. Structures already
/// in the frame are skipped; the frame's reference is reused when one exists.
pub async fn align_scope(
    set: &mut WorkingSet,
    scope: &[String],
    policy: &ReferencePolicy,
    aligner: &dyn StructureAligner,
    console: &mut Console,
) -> AlignmentSummary {
    let in_scope: Vec<&LoadedStructure> = set
        .structures()
        .iter()
        .filter(|s| scope.contains(&s.name))
        .collect();

    let reference = match set.frame() {
        Some(frame) => set.get(&frame.reference),
        None => policy.eligible(in_scope.iter().copied()).into_iter().next(),
    };
    let Some(reference) = reference else {
        warn!("No eligible alignment reference among {} structures", in_scope.len());
        console.warn(format!("No alignment reference available ({policy})"));
        return AlignmentSummary::default();
    };

    let candidates: Vec<&LoadedStructure> = in_scope
        .iter()
        .copied()
        .filter(|s| s.name != reference.name && policy.is_eligible(s))
        .filter(|s| set.frame().map_or(true, |f| !f.members.contains(&s.name)))
        .collect();

    let outcomes = align_onto(&candidates, reference, aligner, console).await;
    let summary = AlignmentSummary {
        reference: Some(reference.name.clone()),
        outcomes,
    };
    commit(set, &summary);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use hca_common::{LoadedStructure, StructureFilter};
    use hca_test_utils::{FakeBackend, SharedBuffer};

    fn protein(name: &str) -> LoadedStructure {
        LoadedStructure::new(name).with_protein(true)
    }

    #[tokio::test]
    async fn test_partial_failure_is_recorded() {
        let mut set = WorkingSet::from_structures([
            protein("a"),
            protein("b"),
            LoadedStructure::new("ligand_only"),
            protein("c"),
            protein("d"),
        ]);
        let backend = FakeBackend::new().failing_alignment("c");
        let buf = SharedBuffer::new();
        let mut console = Console::with_writer(buf.clone());

        let summary = align_all(&mut set, &ReferencePolicy::default(), &backend, &mut console)
            .await
            .unwrap();

        assert_eq!(summary.reference.as_deref(), Some("a"));
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.failures().next().map(|o| o.structure.as_str()), Some("c"));
        assert_eq!(
            backend.align_calls(),
            vec![
                ("b".to_string(), "a".to_string()),
                ("c".to_string(), "a".to_string()),
                ("d".to_string(), "a".to_string()),
            ]
        );
        assert!(buf.contents().contains("Alignment failed for c"));
        assert!(set.covers(&["a", "b", "c", "d"]));
        assert!(!set.covers(&["ligand_only"]));
        assert_eq!(set.coordinates("b"), Some(std::path::Path::new("b_aligned.pdb")));
        assert_eq!(set.coordinates("c"), Some(std::path::Path::new("")));
    }

    #[tokio::test]
    async fn test_too_few_eligible_is_fatal_before_any_call() {
        let mut set = WorkingSet::from_structures([protein("only"), LoadedStructure::new("ligand")]);
        let backend = FakeBackend::new();
        let mut console = Console::with_writer(SharedBuffer::new());

        let err = align_all(&mut set, &ReferencePolicy::default(), &backend, &mut console)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientInput { eligible: 1, required: 2 }
        ));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_name_policy_picks_reference() {
        let mut set = WorkingSet::from_structures([protein("x1"), protein("ref_apo"), protein("ref_holo")]);
        let backend = FakeBackend::new();
        let mut console = Console::with_writer(SharedBuffer::new());
        let policy = ReferencePolicy::FirstMatching(StructureFilter::NameContains("ref".into()));

        let summary = align_all(&mut set, &policy, &backend, &mut console).await.unwrap();
        assert_eq!(summary.reference.as_deref(), Some("ref_apo"));
        assert_eq!(backend.align_calls(), vec![("ref_holo".to_string(), "ref_apo".to_string())]);
    }

    #[tokio::test]
    async fn test_scope_alignment_skips_frame_members() {
        let mut set = WorkingSet::from_structures([protein("a"), protein("b"), protein("c")]);
        let backend = FakeBackend::new();
        let mut console = Console::with_writer(SharedBuffer::new());
        let policy = ReferencePolicy::default();

        let first = align_scope(&mut set, &["a".into(), "b".into()], &policy, &backend, &mut console).await;
        assert_eq!(first.succeeded(), 1);

        let second = align_scope(&mut set, &["b".into(), "c".into()], &policy, &backend, &mut console).await;
        assert_eq!(second.reference.as_deref(), Some("a"));
        assert_eq!(second.outcomes.len(), 1);
        assert_eq!(second.outcomes[0].structure, "c");
        assert_eq!(backend.align_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_scope_without_reference_is_empty() {
        let mut set = WorkingSet::from_structures([LoadedStructure::new("ligand")]);
        let backend = FakeBackend::new();
        let mut console = Console::with_writer(SharedBuffer::new());

        let summary = align_scope(
            &mut set,
            &["ligand".into()],
            &ReferencePolicy::default(),
            &backend,
            &mut console,
        )
        .await;
        assert_eq!(summary, AlignmentSummary::default());
        assert!(backend.calls().is_empty());
    }
}
