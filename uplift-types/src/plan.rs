use crate::reference::DependencyRef;
use serde::{Deserialize, Serialize};

/// The additions and removals a reference rewrite would perform.
///
/// A plan carries no side effects; the caller decides whether to inspect it or apply it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewritePlan {
    #[serde(default)]
    pub to_remove: Vec<DependencyRef>,

    #[serde(default)]
    pub to_add: Vec<DependencyRef>,

    /// Outdated references and the mapping entry that matched them, in declared order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<PlannedMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMatch {
    pub reference: DependencyRef,
    pub entry: String,
}

impl RewritePlan {
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }

    /// Number of existing references the plan replaces.
    pub fn outdated_count(&self) -> usize {
        self.to_remove.len()
    }
}
