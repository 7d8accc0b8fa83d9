use std::path::PathBuf;
use thiserror::Error;

use crate::analysis::Comparator;

/// Fatal pipeline errors. Any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No FTMap structure files matched `{pattern}`. Check the input pattern.")]
    NoInput { pattern: String },

    #[error("Not enough structures for alignment: {eligible} eligible, at least {required} required")]
    InsufficientInput { eligible: usize, required: usize },

    #[error(
        "Only {found} hotspots found with {descriptor} {comparator} {cutoff}. \
         At least two are required for HCA."
    )]
    InsufficientHotspots {
        found: usize,
        descriptor: String,
        comparator: Comparator,
        cutoff: f64,
    },

    #[error("Failed to load structure {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: CollaboratorError,
    },

    #[error("All {attempted} analysis jobs failed")]
    AllJobsFailed { attempted: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::NoInput { .. } => 2,
            PipelineError::InsufficientInput { .. } => 3,
            PipelineError::InsufficientHotspots { .. } => 4,
            PipelineError::AllJobsFailed { .. } => 5,
            PipelineError::Load { .. } | PipelineError::Collaborator(_) => 6,
            PipelineError::Config(_) => 64,
            PipelineError::Io(_) | PipelineError::Serialization(_) => 74,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by external collaborators (structure loading, alignment,
/// clustering, rendering).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program} {verb}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        verb: String,
        status: String,
        stderr: String,
    },

    #[error("malformed response from `{program} {verb}`: {source}")]
    Protocol {
        program: String,
        verb: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_hotspots_message_echoes_count_and_cutoff() {
        let err = PipelineError::InsufficientHotspots {
            found: 1,
            descriptor: "S0".to_string(),
            comparator: Comparator::Gt,
            cutoff: 20.0,
        };
        assert_eq!(
            err.to_string(),
            "Only 1 hotspots found with S0 > 20. At least two are required for HCA."
        );
    }

    #[test]
    fn test_fractional_cutoff_is_printed_verbatim() {
        let err = PipelineError::InsufficientHotspots {
            found: 0,
            descriptor: "S0".to_string(),
            comparator: Comparator::Gt,
            cutoff: 17.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("Only 0 hotspots"));
        assert!(msg.contains("S0 > 17.5"));
    }

    #[test]
    fn test_exit_codes_are_distinct_for_fatal_preconditions() {
        let codes = [
            PipelineError::NoInput { pattern: "*.pdb".into() }.exit_code(),
            PipelineError::InsufficientInput { eligible: 1, required: 2 }.exit_code(),
            PipelineError::InsufficientHotspots {
                found: 1,
                descriptor: "S0".into(),
                comparator: Comparator::Gt,
                cutoff: 20.0,
            }
            .exit_code(),
            PipelineError::AllJobsFailed { attempted: 4 }.exit_code(),
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
        assert!(codes.iter().all(|c| *c != 0));
    }
}
