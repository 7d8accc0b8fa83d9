//! Configuration loading for the HCA pipeline.
//! Reads hca.toml from the current directory or the path in the HCA_CONFIG env var.

pub mod jobs;

pub use jobs::{AnalysisJob, Preset};

use hca_common::{Comparator, PipelineError, ReferencePolicy, Result, Threshold};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    /// Explicit job list. Empty means "use `output.preset`".
    #[serde(default)]
    pub jobs: Vec<AnalysisJob>,
}

// ── Input ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Glob pattern; `~` and `$VAR` / `${VAR}` are expanded.
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Warn and continue when a single file fails to load.
    #[serde(default)]
    pub skip_unreadable: bool,
}

fn default_pattern() -> String { "./ftmap/*.pdb".to_string() }

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            skip_unreadable: false,
        }
    }
}

// ── Selection ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Hotspot name prefixes (class membership), any of which may match.
    #[serde(default = "default_prefixes")]
    pub name_prefixes: Vec<String>,
    #[serde(default = "default_descriptor")]
    pub descriptor: String,
    #[serde(default)]
    pub comparator: Comparator,
    #[serde(default = "default_cutoff")]
    pub cutoff: f64,
}

fn default_prefixes() -> Vec<String> { vec!["B".to_string(), "D".to_string()] }
fn default_descriptor() -> String { "S0".to_string() }
fn default_cutoff() -> f64 { 20.0 }

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            name_prefixes: default_prefixes(),
            descriptor: default_descriptor(),
            comparator: Comparator::Gt,
            cutoff: default_cutoff(),
        }
    }
}

impl SelectionConfig {
    pub fn threshold(&self) -> Threshold {
        Threshold {
            descriptor: self.descriptor.clone(),
            comparator: self.comparator,
            cutoff: self.cutoff,
        }
    }
}

// ── Alignment ─────────────────────────────────────────────────────────────────

/// Where structural alignment happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentMode {
    /// Once, after loading, over every eligible structure.
    Global,
    /// On demand, scoped to the structures a job actually uses.
    PerJob,
    /// Never; jobs receive structures in their deposited frames.
    #[serde(alias = "skip")]
    Disabled,
}

impl fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlignmentMode::Global => "global",
            AlignmentMode::PerJob => "per-job",
            AlignmentMode::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

impl FromStr for AlignmentMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "global" => Ok(AlignmentMode::Global),
            "per-job" => Ok(AlignmentMode::PerJob),
            "disabled" | "skip" | "none" => Ok(AlignmentMode::Disabled),
            other => Err(format!(
                "unknown alignment mode `{other}` (expected global, per-job or disabled)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Falls back to the preset's topology when unset.
    #[serde(default)]
    pub mode: Option<AlignmentMode>,
    #[serde(default)]
    pub reference: ReferencePolicy,
    /// Drop structures whose alignment failed from hotspot selection.
    #[serde(default)]
    pub exclude_failed: bool,
}

// ── Output ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub preset: Preset,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    #[serde(default = "bool_true")]
    pub tight_bbox: bool,
    /// Write the run report as JSON here.
    #[serde(default)]
    pub report_json: Option<PathBuf>,
}

fn default_prefix() -> String { "hotspots".to_string() }
fn default_dpi() -> u32 { 300 }
fn bool_true() -> bool { true }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            preset: Preset::default(),
            dpi: default_dpi(),
            tight_bbox: true,
            report_json: None,
        }
    }
}

// ── Backend ───────────────────────────────────────────────────────────────────

/// External helper executable implementing the collaborator protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_program() -> String { "hca-bridge".to_string() }

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: vec![],
        }
    }
}

#[cfg(test)]
mod tests;

impl Config {
    /// Load configuration from hca.toml.
    /// Checks HCA_CONFIG env var first, then the current directory; falls
    /// back to defaults when neither exists.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("HCA_CONFIG") {
            return Self::load_from(path);
        }
        let local = Path::new("hca.toml");
        if local.exists() {
            return Self::load_from(local);
        }
        tracing::debug!("No hca.toml found, using built-in defaults");
        Ok(Self::default())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Effective alignment topology.
    pub fn alignment_mode(&self) -> AlignmentMode {
        self.alignment
            .mode
            .unwrap_or_else(|| self.output.preset.default_alignment_mode())
    }

    /// Jobs in declaration order with `{prefix}` substituted.
    pub fn resolve_jobs(&self) -> Vec<AnalysisJob> {
        let jobs = if self.jobs.is_empty() {
            self.output.preset.jobs()
        } else {
            self.jobs.clone()
        };
        jobs.into_iter()
            .map(|job| job.with_prefix(&self.output.prefix))
            .collect()
    }

    /// Reject configurations no run could succeed with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PipelineError::Config(msg));

        if self.input.pattern.trim().is_empty() {
            return invalid("input.pattern is empty".to_string());
        }
        if !self.selection.cutoff.is_finite() {
            return invalid(format!("selection.cutoff must be finite, got {}", self.selection.cutoff));
        }
        if self.selection.name_prefixes.is_empty() {
            return invalid("selection.name_prefixes must name at least one hotspot class".to_string());
        }
        if self.output.dpi == 0 {
            return invalid("output.dpi must be positive".to_string());
        }

        let jobs = self.resolve_jobs();
        if jobs.is_empty() {
            return invalid("no analysis jobs configured".to_string());
        }

        let mut names = HashSet::new();
        let mut outputs = HashSet::new();
        for job in &jobs {
            if !names.insert(job.name.as_str()) {
                return invalid(format!("duplicate job name `{}`", job.name));
            }
            if !outputs.insert(job.output.clone()) {
                return invalid(format!(
                    "jobs share the output path {}",
                    job.output.display()
                ));
            }
            if job.metric.is_pairwise() && job.params.radius.is_none() {
                return invalid(format!("job `{}` ({}) needs a radius", job.name, job.metric));
            }
            if !job.metric.is_pairwise() && job.params.properties.is_empty() {
                return invalid(format!("job `{}` ({}) needs descriptor properties", job.name, job.metric));
            }
        }
        Ok(())
    }
}
