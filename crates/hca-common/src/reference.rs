//! Reference-structure selection for alignment.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::structures::LoadedStructure;

/// Filter deciding which structures are eligible for alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureFilter {
    /// At least one protein polymer atom.
    ContainsProtein,
    /// Object name contains the fragment.
    NameContains(String),
}

impl StructureFilter {
    pub fn matches(&self, structure: &LoadedStructure) -> bool {
        match self {
            StructureFilter::ContainsProtein => structure.has_protein,
            StructureFilter::NameContains(fragment) => structure.name.contains(fragment.as_str()),
        }
    }
}

/// How the alignment reference is chosen from the loaded order.
///
/// The loaded order follows glob expansion, so the policy is explicit
/// rather than an accident of directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "filter", rename_all = "snake_case")]
pub enum ReferencePolicy {
    FirstOverall,
    FirstMatching(StructureFilter),
}

impl Default for ReferencePolicy {
    fn default() -> Self {
        ReferencePolicy::FirstMatching(StructureFilter::ContainsProtein)
    }
}

impl ReferencePolicy {
    /// Whether `structure` takes part in alignment under this policy.
    pub fn is_eligible(&self, structure: &LoadedStructure) -> bool {
        match self {
            ReferencePolicy::FirstOverall => true,
            ReferencePolicy::FirstMatching(filter) => filter.matches(structure),
        }
    }

    /// Eligible structures in their original order; the first is the reference.
    pub fn eligible<'a, I>(&self, structures: I) -> Vec<&'a LoadedStructure>
    where
        I: IntoIterator<Item = &'a LoadedStructure>,
    {
        structures.into_iter().filter(|s| self.is_eligible(s)).collect()
    }
}

impl fmt::Display for ReferencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferencePolicy::FirstOverall => f.write_str("first structure"),
            ReferencePolicy::FirstMatching(StructureFilter::ContainsProtein) => {
                f.write_str("first protein-bearing structure")
            }
            ReferencePolicy::FirstMatching(StructureFilter::NameContains(fragment)) => {
                write!(f, "first structure named like `{fragment}`")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_matching_skips_probe_only_structures() {
        let structures = vec![
            LoadedStructure::new("probes_only"),
            LoadedStructure::new("apo").with_protein(true),
            LoadedStructure::new("holo").with_protein(true),
        ];
        let eligible = ReferencePolicy::default().eligible(&structures);
        assert_eq!(eligible.len(), 2);
        assert_eq!(eligible[0].name, "apo");

        let all = ReferencePolicy::FirstOverall.eligible(&structures);
        assert_eq!(all[0].name, "probes_only");
    }

    #[test]
    fn test_name_filter() {
        let policy = ReferencePolicy::FirstMatching(StructureFilter::NameContains("3B24".into()));
        assert!(policy.is_eligible(&LoadedStructure::new("3B24_B")));
        assert!(!policy.is_eligible(&LoadedStructure::new("1CRN")));
    }
}
