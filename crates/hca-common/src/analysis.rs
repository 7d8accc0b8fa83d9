//! Analysis vocabulary: metrics, linkage methods, descriptor thresholds and
//! the numeric parameters passed to the clustering collaborator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::structures::Hotspot;

// ── Metrics ──────────────────────────────────────────────────────────────────

/// Similarity or distance function driving one clustering job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Spatial overlap of probe volumes.
    Ho,
    /// Jaccard index of residues within `radius` of each hotspot.
    Jaccard,
    /// Overlap coefficient of residues within `radius` of each hotspot.
    Overlap,
    /// Euclidean distance over a descriptor vector.
    Euclidean,
}

impl Metric {
    /// Function name understood by the clustering collaborator.
    pub fn function_name(&self) -> &'static str {
        match self {
            Metric::Ho => "ho",
            Metric::Jaccard => "jaccard",
            Metric::Overlap => "overlap",
            Metric::Euclidean => "euclidean",
        }
    }

    /// Human-readable plot title stem.
    pub fn title(&self) -> &'static str {
        match self {
            Metric::Ho => "Hotspot Overlap (HO)",
            Metric::Jaccard => "Residue Jaccard Similarity",
            Metric::Overlap => "Residue Overlap Similarity",
            Metric::Euclidean => "Euclidean HCA",
        }
    }

    /// Pairwise metrics compare hotspots in space and need a radius.
    pub fn is_pairwise(&self) -> bool {
        !matches!(self, Metric::Euclidean)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.function_name())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ho" => Ok(Metric::Ho),
            "jaccard" => Ok(Metric::Jaccard),
            "overlap" => Ok(Metric::Overlap),
            "euclidean" => Ok(Metric::Euclidean),
            other => Err(format!("unknown metric `{other}`")),
        }
    }
}

// ── Linkage ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkageMethod {
    Single,
    Complete,
    Average,
    Weighted,
    Centroid,
    Median,
    Ward,
}

impl fmt::Display for LinkageMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkageMethod::Single => "single",
            LinkageMethod::Complete => "complete",
            LinkageMethod::Average => "average",
            LinkageMethod::Weighted => "weighted",
            LinkageMethod::Centroid => "centroid",
            LinkageMethod::Median => "median",
            LinkageMethod::Ward => "ward",
        };
        f.write_str(name)
    }
}

// ── Thresholds ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Comparator {
    #[default]
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl Comparator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
        }
    }

    pub fn holds(&self, value: f64, cutoff: f64) -> bool {
        match self {
            Comparator::Gt => value > cutoff,
            Comparator::Ge => value >= cutoff,
            Comparator::Lt => value < cutoff,
            Comparator::Le => value <= cutoff,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Numeric threshold on a per-hotspot descriptor, e.g. `S0 > 20`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    #[serde(default = "default_descriptor")]
    pub descriptor: String,
    #[serde(default)]
    pub comparator: Comparator,
    pub cutoff: f64,
}

fn default_descriptor() -> String { "S0".to_string() }

impl Threshold {
    /// `S0 > cutoff`, the FTMap default.
    pub fn strength_above(cutoff: f64) -> Self {
        Self {
            descriptor: default_descriptor(),
            comparator: Comparator::Gt,
            cutoff,
        }
    }

    /// A hotspot lacking the descriptor never satisfies the threshold.
    pub fn matches(&self, hotspot: &Hotspot) -> bool {
        hotspot
            .descriptor(&self.descriptor)
            .map(|v| self.comparator.holds(v, self.cutoff))
            .unwrap_or(false)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.descriptor, self.comparator, self.cutoff)
    }
}

// ── Job parameters ───────────────────────────────────────────────────────────

/// Metric-specific numeric parameters forwarded to the clustering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParams {
    /// Neighbourhood radius in Å for spatial and residue metrics.
    #[serde(default)]
    pub radius: Option<f64>,

    /// Z-score the descriptor columns before computing distances.
    #[serde(default)]
    pub normalize: bool,

    /// `None` lets the collaborator pick its default.
    #[serde(default)]
    pub linkage: Option<LinkageMethod>,

    /// Descriptor columns for multivariate metrics.
    #[serde(default)]
    pub properties: Vec<String>,

    #[serde(default)]
    pub color_threshold: f64,

    #[serde(default)]
    pub hide_threshold: bool,

    /// Leaf annotation is always on.
    #[serde(skip_deserializing, default = "annotate_always")]
    pub annotate: bool,
}

fn annotate_always() -> bool { true }

impl Default for JobParams {
    fn default() -> Self {
        Self {
            radius: None,
            normalize: false,
            linkage: None,
            properties: vec![],
            color_threshold: 0.0,
            hide_threshold: false,
            annotate: true,
        }
    }
}

impl JobParams {
    pub fn pairwise(radius: f64) -> Self {
        Self {
            radius: Some(radius),
            ..Default::default()
        }
    }

    pub fn multivariate<S: Into<String>>(
        properties: impl IntoIterator<Item = S>,
        normalize: bool,
        linkage: LinkageMethod,
    ) -> Self {
        Self {
            properties: properties.into_iter().map(Into::into).collect(),
            normalize,
            linkage: Some(linkage),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_strictly_greater_by_default() {
        let t = Threshold::strength_above(20.0);
        assert!(t.matches(&Hotspot::new("B_000").with_descriptor("S0", 21.0)));
        assert!(!t.matches(&Hotspot::new("B_001").with_descriptor("S0", 20.0)));
        assert!(!t.matches(&Hotspot::new("B_002")));
        assert_eq!(t.to_string(), "S0 > 20");
    }

    #[test]
    fn test_metric_round_trips_through_name() {
        for m in [Metric::Ho, Metric::Jaccard, Metric::Overlap, Metric::Euclidean] {
            assert_eq!(m.function_name().parse::<Metric>().unwrap(), m);
        }
        assert!("ward".parse::<Metric>().is_err());
    }

    #[test]
    fn test_annotate_cannot_be_disabled() {
        let params: JobParams = serde_json::from_str(r#"{"radius": 1.5, "annotate": false}"#).unwrap();
        assert!(params.annotate);
        assert_eq!(params.radius, Some(1.5));
    }
}
