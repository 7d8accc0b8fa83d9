//! Analysis job records and the presets that reproduce the standard runs.

use hca_common::{JobParams, LinkageMethod, Metric};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::AlignmentMode;

/// One clustering job. Immutable once the pipeline starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub name: String,

    pub metric: Metric,

    /// Hotspots must share a reference frame before the metric runs.
    #[serde(default)]
    pub requires_pre_alignment: bool,

    #[serde(flatten)]
    pub params: JobParams,

    /// Artifact path. `{prefix}` is replaced by `output.prefix`.
    pub output: PathBuf,

    /// Overrides the metric's default plot title.
    #[serde(default)]
    pub title: Option<String>,

    /// Hotspot name prefixes for this job only; the run-wide selection is
    /// used when unset.
    #[serde(default)]
    pub selection_prefixes: Option<Vec<String>>,
}

impl AnalysisJob {
    pub fn new(name: impl Into<String>, metric: Metric, output: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            metric,
            requires_pre_alignment: false,
            params: JobParams::default(),
            output: output.into(),
            title: None,
            selection_prefixes: None,
        }
    }

    pub fn with_params(mut self, params: JobParams) -> Self {
        self.params = params;
        self
    }

    pub fn requiring_alignment(mut self) -> Self {
        self.requires_pre_alignment = true;
        self
    }

    pub fn with_selection_prefixes<S: Into<String>>(mut self, prefixes: impl IntoIterator<Item = S>) -> Self {
        self.selection_prefixes = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    /// Plot title stem, without the threshold suffix.
    pub fn title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        match self.metric {
            Metric::Euclidean if !self.params.properties.is_empty() => {
                format!("{} ({})", self.metric.title(), self.params.properties.join(" + "))
            }
            metric => metric.title().to_string(),
        }
    }

    /// Substitute `{prefix}` in the output path.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let templated = self.output.to_string_lossy().replace("{prefix}", prefix);
        self.output = PathBuf::from(templated);
        self
    }
}

// ── Standard jobs ─────────────────────────────────────────────────────────────

fn hotspot_overlap(output: &str) -> AnalysisJob {
    AnalysisJob::new("HO", Metric::Ho, output).with_params(JobParams::pairwise(1.5))
}

fn residue_jaccard(output: &str) -> AnalysisJob {
    AnalysisJob::new("Jaccard", Metric::Jaccard, output)
        .with_params(JobParams::pairwise(5.0))
        .requiring_alignment()
}

fn residue_overlap(output: &str) -> AnalysisJob {
    AnalysisJob::new("Overlap", Metric::Overlap, output)
        .with_params(JobParams::pairwise(5.0))
        .requiring_alignment()
}

fn euclidean(output: &str) -> AnalysisJob {
    AnalysisJob::new("Euclidean", Metric::Euclidean, output)
        .with_params(JobParams::multivariate(["S0", "CD", "MD"], true, LinkageMethod::Ward))
        .with_selection_prefixes(["K15_"])
}

// ── Presets ───────────────────────────────────────────────────────────────────

/// Named job lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// All four analyses in one run.
    #[default]
    All,
    Ho,
    Jaccard,
    Overlap,
    Euclidean,
}

impl Preset {
    pub fn jobs(&self) -> Vec<AnalysisJob> {
        match self {
            Preset::All => vec![
                hotspot_overlap("{prefix}_01_HO_dendrogram.png"),
                residue_jaccard("{prefix}_02_Jaccard_dendrogram.png"),
                residue_overlap("{prefix}_03_Overlap_dendrogram.png"),
                euclidean("{prefix}_04_Euclidean_HCA.png"),
            ],
            Preset::Ho => vec![hotspot_overlap("{prefix}_HO.png")],
            Preset::Jaccard => vec![residue_jaccard("{prefix}_Jaccard.png")],
            Preset::Overlap => vec![residue_overlap("{prefix}_Overlap.png")],
            Preset::Euclidean => vec![euclidean("{prefix}_Euclidean.png")],
        }
    }

    /// Alignment topology used when the config does not pick one.
    pub fn default_alignment_mode(&self) -> AlignmentMode {
        match self {
            Preset::All | Preset::Ho => AlignmentMode::Global,
            Preset::Jaccard | Preset::Overlap => AlignmentMode::PerJob,
            Preset::Euclidean => AlignmentMode::Disabled,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Preset::All => "all",
            Preset::Ho => "ho",
            Preset::Jaccard => "jaccard",
            Preset::Overlap => "overlap",
            Preset::Euclidean => "euclidean",
        };
        f.write_str(name)
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "comprehensive" => Ok(Preset::All),
            "ho" => Ok(Preset::Ho),
            "jaccard" => Ok(Preset::Jaccard),
            "overlap" => Ok(Preset::Overlap),
            "euclidean" => Ok(Preset::Euclidean),
            other => Err(format!(
                "unknown preset `{other}` (expected all, ho, jaccard, overlap or euclidean)"
            )),
        }
    }
}
