//! Input resolution and structure loading.

use hca_common::{PipelineError, Result, StructureSource};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::console::Console;
use crate::working_set::WorkingSet;

lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("static regex");
}

#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Warn and continue when a single file fails to load.
    pub skip_unreadable: bool,
}

/// Expand a leading `~` and `$VAR` / `${VAR}` references. Unknown variables
/// are left as written.
pub fn expand_pattern(pattern: &str) -> String {
    let home_expanded = match pattern.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => format!("{}{rest}", home.display()),
            None => pattern.to_string(),
        },
        _ => pattern.to_string(),
    };

    ENV_VAR
        .replace_all(&home_expanded, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or_default();
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Expand and glob `pattern`. Matches come back in glob order.
pub fn resolve_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let expanded = expand_pattern(pattern);
    let entries = glob::glob(&expanded)
        .map_err(|e| PipelineError::Config(format!("invalid input pattern `{pattern}`: {e}")))?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(path) => debug!(path = %path.display(), "Skipping non-file match"),
            Err(e) => warn!("Unreadable path while expanding {}: {}", pattern, e),
        }
    }

    if files.is_empty() {
        return Err(PipelineError::NoInput {
            pattern: pattern.to_string(),
        });
    }
    debug!(pattern = %expanded, matches = files.len(), "Input pattern resolved");
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load every file matching `pattern` into a fresh working set.
pub async fn load_all(
    pattern: &str,
    options: &LoaderOptions,
    source: &dyn StructureSource,
    console: &mut Console,
) -> Result<WorkingSet> {
    let files = resolve_pattern(pattern)?;
    info!("Found {} FTMap structure files", files.len());
    console.line(format!("Found {} FTMap structure files.", files.len()));

    let start = Instant::now();
    let mut set = WorkingSet::new();
    for (i, path) in files.iter().enumerate() {
        match source.load(path).await {
            Ok(mut structure) => {
                if structure.name.is_empty() {
                    structure.name = file_stem(path);
                }
                if structure.source.as_os_str().is_empty() {
                    structure.source = path.clone();
                }
                debug!(
                    structure = %structure.name,
                    hotspots = structure.hotspots.len(),
                    "Structure loaded"
                );
                set.insert(structure);
            }
            Err(source_err) if options.skip_unreadable => {
                warn!("Skipping {}: {}", path.display(), source_err);
                console.warn(format!("Skipping {}: {}", path.display(), source_err));
            }
            Err(source_err) => {
                return Err(PipelineError::Load {
                    path: path.clone(),
                    source: source_err,
                });
            }
        }
        console.progress(i + 1, files.len(), start, "Loading FTMap files");
    }

    if set.is_empty() {
        return Err(PipelineError::NoInput {
            pattern: pattern.to_string(),
        });
    }
    console.done(format!("{} FTMap structures loaded", set.len()));
    Ok(set)
}
