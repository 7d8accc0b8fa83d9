//! The set of structures loaded for one run.
//!
//! Every stage receives the working set explicitly: loading and alignment
//! take it mutably, selection and clustering read it.

use hca_common::{Hotspot, HotspotId, LoadedStructure};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Structures sharing one reference frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentFrame {
    pub reference: String,
    /// Every structure an alignment was attempted for, plus the reference.
    pub members: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    structures: Vec<LoadedStructure>,
    excluded: BTreeSet<String>,
    frame: Option<AlignmentFrame>,
    aligned: BTreeMap<String, PathBuf>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_structures(structures: impl IntoIterator<Item = LoadedStructure>) -> Self {
        let mut set = Self::new();
        for s in structures {
            set.insert(s);
        }
        set
    }

    /// Add a structure, renaming it `name_2`, `name_3`, ... if the name is taken.
    pub fn insert(&mut self, mut structure: LoadedStructure) -> &LoadedStructure {
        if self.get(&structure.name).is_some() {
            let base = structure.name.clone();
            let mut n = 2;
            while self.get(&format!("{base}_{n}")).is_some() {
                n += 1;
            }
            structure.name = format!("{base}_{n}");
            tracing::debug!(original = %base, renamed = %structure.name, "Duplicate structure name");
        }
        self.structures.push(structure);
        &self.structures[self.structures.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    /// All structures in load order, excluded ones included.
    pub fn structures(&self) -> &[LoadedStructure] {
        &self.structures
    }

    pub fn get(&self, name: &str) -> Option<&LoadedStructure> {
        self.structures.iter().find(|s| s.name == name)
    }

    pub fn hotspot(&self, id: &HotspotId) -> Option<&Hotspot> {
        self.get(&id.structure).and_then(|s| s.hotspot(&id.hotspot))
    }

    /// Structures still taking part in selection.
    pub fn active(&self) -> impl Iterator<Item = &LoadedStructure> {
        self.structures.iter().filter(|s| !self.excluded.contains(&s.name))
    }

    pub fn exclude(&mut self, name: &str) {
        self.excluded.insert(name.to_string());
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }

    pub fn frame(&self) -> Option<&AlignmentFrame> {
        self.frame.as_ref()
    }

    /// Record that `members` were aligned onto `reference`. Later calls
    /// extend the existing frame and keep its original reference.
    pub fn record_alignment<I, S>(&mut self, reference: &str, members: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let frame = self.frame.get_or_insert_with(|| AlignmentFrame {
            reference: reference.to_string(),
            members: BTreeSet::from([reference.to_string()]),
        });
        frame.members.extend(members.into_iter().map(Into::into));
    }

    /// Point `name` at the coordinates the aligner wrote for it.
    pub fn set_aligned_coordinates(&mut self, name: &str, path: PathBuf) {
        self.aligned.insert(name.to_string(), path);
    }

    /// Current coordinates of `name`: the aligned copy if there is one.
    pub fn coordinates(&self, name: &str) -> Option<&Path> {
        match self.aligned.get(name) {
            Some(path) => Some(path.as_path()),
            None => self.get(name).map(|s| s.source.as_path()),
        }
    }

    /// Whether every named structure already sits in the alignment frame.
    pub fn covers<S: AsRef<str>>(&self, names: &[S]) -> bool {
        match &self.frame {
            Some(frame) => names.iter().all(|n| frame.members.contains(n.as_ref())),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_are_suffixed() {
        let set = WorkingSet::from_structures([
            LoadedStructure::new("apo"),
            LoadedStructure::new("apo"),
            LoadedStructure::new("apo"),
        ]);
        let names: Vec<&str> = set.structures().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["apo", "apo_2", "apo_3"]);
    }

    #[test]
    fn test_exclusion_hides_from_active_only() {
        let mut set = WorkingSet::from_structures([LoadedStructure::new("a"), LoadedStructure::new("b")]);
        set.exclude("a");
        assert_eq!(set.len(), 2);
        assert_eq!(set.active().count(), 1);
        assert!(set.is_excluded("a"));
    }

    #[test]
    fn test_frame_coverage() {
        let mut set = WorkingSet::from_structures([
            LoadedStructure::new("a"),
            LoadedStructure::new("b"),
            LoadedStructure::new("c"),
        ]);
        assert!(!set.covers(&["a"]));

        set.record_alignment("a", ["b"]);
        assert!(set.covers(&["a", "b"]));
        assert!(!set.covers(&["a", "c"]));

        set.record_alignment("ignored", ["c"]);
        assert_eq!(set.frame().map(|f| f.reference.as_str()), Some("a"));
        assert!(set.covers(&["a", "b", "c"]));
    }

    #[test]
    fn test_coordinates_prefer_aligned_copy() {
        let mut apo = LoadedStructure::new("apo");
        apo.source = PathBuf::from("/data/apo.pdb");
        let mut holo = LoadedStructure::new("holo");
        holo.source = PathBuf::from("/data/holo.pdb");
        let mut set = WorkingSet::from_structures([apo, holo]);

        set.set_aligned_coordinates("holo", PathBuf::from("/scratch/holo_aligned.pdb"));
        assert_eq!(set.coordinates("apo"), Some(Path::new("/data/apo.pdb")));
        assert_eq!(set.coordinates("holo"), Some(Path::new("/scratch/holo_aligned.pdb")));
        assert_eq!(set.coordinates("missing"), None);
    }
}
