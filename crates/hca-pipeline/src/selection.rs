//! Hotspot selection and the minimum-cardinality check.

use hca_common::{Hotspot, HotspotId, PipelineError, Result, Threshold};
use serde::Serialize;
use std::fmt;

use crate::working_set::WorkingSet;

/// Hierarchical clustering needs at least two leaves.
pub const MIN_HOTSPOTS: usize = 2;

/// Typed hotspot selection expression.
#[derive(Debug, Clone, PartialEq)]
pub enum HotspotPredicate {
    /// Hotspot name starts with the prefix (class membership).
    NamePrefix(String),
    Threshold(Threshold),
    All(Vec<HotspotPredicate>),
    Any(Vec<HotspotPredicate>),
}

impl HotspotPredicate {
    /// `(any prefix) AND threshold`.
    pub fn standard<S: AsRef<str>>(prefixes: &[S], threshold: Threshold) -> Self {
        let classes = prefixes
            .iter()
            .map(|p| HotspotPredicate::NamePrefix(p.as_ref().to_string()))
            .collect();
        HotspotPredicate::All(vec![
            HotspotPredicate::Any(classes),
            HotspotPredicate::Threshold(threshold),
        ])
    }

    pub fn matches(&self, hotspot: &Hotspot) -> bool {
        match self {
            HotspotPredicate::NamePrefix(prefix) => hotspot.name.starts_with(prefix.as_str()),
            HotspotPredicate::Threshold(t) => t.matches(hotspot),
            HotspotPredicate::All(parts) => parts.iter().all(|p| p.matches(hotspot)),
            HotspotPredicate::Any(parts) => parts.iter().any(|p| p.matches(hotspot)),
        }
    }
}

impl fmt::Display for HotspotPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HotspotPredicate::NamePrefix(prefix) => write!(f, "{prefix}*"),
            HotspotPredicate::Threshold(t) => write!(f, "{t}"),
            HotspotPredicate::All(parts) => join(f, parts, "AND"),
            HotspotPredicate::Any(parts) => join(f, parts, "OR"),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, parts: &[HotspotPredicate], op: &str) -> fmt::Result {
    f.write_str("(")?;
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            write!(f, " {op} ")?;
        }
        write!(f, "{p}")?;
    }
    f.write_str(")")
}

/// Selected hotspots, in working-set order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HotspotSelection {
    pub ids: Vec<HotspotId>,
}

impl HotspotSelection {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HotspotId> {
        self.ids.iter()
    }

    /// Structures contributing at least one hotspot, first-seen order.
    pub fn structures(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for id in &self.ids {
            if !names.contains(&id.structure) {
                names.push(id.structure.clone());
            }
        }
        names
    }
}

/// Evaluate `predicate` over every hotspot of every active structure.
pub fn select(set: &WorkingSet, predicate: &HotspotPredicate) -> HotspotSelection {
    let ids = set
        .active()
        .flat_map(|s| {
            s.hotspots
                .iter()
                .filter(move |h| predicate.matches(h))
                .map(move |h| HotspotId::new(s.name.clone(), h.name.clone()))
        })
        .collect();
    HotspotSelection { ids }
}

/// Fail unless at least [`MIN_HOTSPOTS`] hotspots were selected.
pub fn validate(selection: &HotspotSelection, threshold: &Threshold) -> Result<()> {
    if selection.len() < MIN_HOTSPOTS {
        return Err(PipelineError::InsufficientHotspots {
            found: selection.len(),
            descriptor: threshold.descriptor.clone(),
            comparator: threshold.comparator,
            cutoff: threshold.cutoff,
        });
    }
    Ok(())
}
