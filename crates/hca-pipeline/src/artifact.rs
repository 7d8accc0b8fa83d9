//! Atomic artifact writes: render into a sibling temp file, then rename.

use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A half-written artifact. Dropping it without [`commit`](Self::commit)
/// removes the temp file, so a failed render never leaves a partial image
/// at the destination.
pub struct StagedArtifact {
    staging: NamedTempFile,
    destination: PathBuf,
}

impl StagedArtifact {
    pub fn new(destination: &Path) -> std::io::Result<Self> {
        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let suffix = destination
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let staging = tempfile::Builder::new()
            .prefix(".hca-")
            .suffix(&suffix)
            .tempfile_in(&parent)?;

        Ok(Self {
            staging,
            destination: destination.to_path_buf(),
        })
    }

    /// Where the collaborator should write.
    pub fn path(&self) -> &Path {
        self.staging.path()
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Replace the destination with the staged file.
    pub fn commit(self) -> std::io::Result<PathBuf> {
        self.staging
            .persist(&self.destination)
            .map_err(|e| e.error)?;
        Ok(self.destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hca_test_utils::scratch_dir;

    #[test]
    fn test_commit_replaces_destination() {
        let dir = scratch_dir();
        let dest = dir.path().join("plots").join("run_HO.png");

        let staged = StagedArtifact::new(&dest).unwrap();
        assert_eq!(staged.path().extension().and_then(|e| e.to_str()), Some("png"));
        std::fs::write(staged.path(), b"first").unwrap();
        staged.commit().unwrap();

        let staged = StagedArtifact::new(&dest).unwrap();
        std::fs::write(staged.path(), b"second").unwrap();
        staged.commit().unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"second");
    }

    #[test]
    fn test_drop_leaves_nothing_behind() {
        let dir = scratch_dir();
        let dest = dir.path().join("run_HO.png");
        {
            let staged = StagedArtifact::new(&dest).unwrap();
            std::fs::write(staged.path(), b"partial").unwrap();
        }
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
