//! Loaded structures and the hotspots they carry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// A named probe cluster inside a loaded structure, annotated with
/// numeric descriptors (`S0`, `CD`, `MD`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub name: String,
    #[serde(default)]
    pub descriptors: BTreeMap<String, f64>,
}

impl Hotspot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptors: BTreeMap::new(),
        }
    }

    pub fn with_descriptor(mut self, key: impl Into<String>, value: f64) -> Self {
        self.descriptors.insert(key.into(), value);
        self
    }

    pub fn descriptor(&self, key: &str) -> Option<f64> {
        self.descriptors.get(key).copied()
    }
}

/// A structure file loaded by the structure collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedStructure {
    /// Object name in the working set (file stem by convention).
    pub name: String,

    /// File the structure was loaded from.
    #[serde(default)]
    pub source: PathBuf,

    /// Whether the structure contains at least one protein polymer atom.
    #[serde(default)]
    pub has_protein: bool,

    #[serde(default)]
    pub hotspots: Vec<Hotspot>,
}

impl LoadedStructure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: PathBuf::new(),
            has_protein: false,
            hotspots: vec![],
        }
    }

    pub fn with_protein(mut self, has_protein: bool) -> Self {
        self.has_protein = has_protein;
        self
    }

    pub fn with_hotspot(mut self, hotspot: Hotspot) -> Self {
        self.hotspots.push(hotspot);
        self
    }

    pub fn hotspot(&self, name: &str) -> Option<&Hotspot> {
        self.hotspots.iter().find(|h| h.name == name)
    }
}

/// Fully qualified hotspot name: `structure.hotspot`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HotspotId {
    pub structure: String,
    pub hotspot: String,
}

impl HotspotId {
    pub fn new(structure: impl Into<String>, hotspot: impl Into<String>) -> Self {
        Self {
            structure: structure.into(),
            hotspot: hotspot.into(),
        }
    }
}

impl fmt::Display for HotspotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.structure, self.hotspot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_deserializes_with_defaults() {
        let json = r#"{"name": "3B24_B", "hotspots": [{"name": "B_000", "descriptors": {"S0": 21.0}}]}"#;
        let s: LoadedStructure = serde_json::from_str(json).unwrap();
        assert_eq!(s.name, "3B24_B");
        assert!(!s.has_protein);
        assert_eq!(s.hotspot("B_000").and_then(|h| h.descriptor("S0")), Some(21.0));
        assert_eq!(s.hotspot("B_000").and_then(|h| h.descriptor("CD")), None);
    }

    #[test]
    fn test_hotspot_id_display() {
        assert_eq!(HotspotId::new("apo", "D_001").to_string(), "apo.D_001");
    }
}
