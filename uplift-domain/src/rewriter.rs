use std::collections::BTreeSet;
use tracing::debug;
use uplift_refmap::ReferenceMap;
use uplift_types::plan::{PlannedMatch, RewritePlan};
use uplift_types::reference::DependencyRef;

/// Compute the edits that bring `current` in line with `map`.
///
/// - Every reference the map matches is removed and its entry's replacements become
///   candidates, in scan order.
/// - Candidates are deduplicated by name (case-insensitive), first occurrence wins.
/// - A candidate is dropped when a reference that stays already has that name.
/// - `support` is added when no remaining or added reference carries its name.
///
/// Pure: no I/O, so the same plan serves inspection and mutation.
pub fn rewrite(
    current: &[DependencyRef],
    map: &ReferenceMap,
    support: &DependencyRef,
) -> RewritePlan {
    let mut to_remove: Vec<DependencyRef> = Vec::new();
    let mut matches = Vec::new();
    let mut kept: Vec<&DependencyRef> = Vec::new();
    let mut candidates: Vec<DependencyRef> = Vec::new();

    for reference in current {
        match map.find_match(&reference.name, reference.version.as_deref()) {
            Some(entry) => {
                debug!(reference = %reference, entry = %entry.name, "outdated reference");
                if !to_remove.contains(reference) {
                    to_remove.push(reference.clone());
                }
                matches.push(PlannedMatch {
                    reference: reference.clone(),
                    entry: entry.name.clone(),
                });
                candidates.extend(entry.replacements.iter().cloned());
            }
            None => kept.push(reference),
        }
    }

    let mut seen = BTreeSet::new();
    candidates.retain(|c| seen.insert(c.name.to_ascii_lowercase()));
    candidates.retain(|c| !kept.iter().any(|k| k.has_name(&c.name)));

    let has_support = kept.iter().any(|k| k.has_name(&support.name))
        || candidates.iter().any(|c| c.has_name(&support.name));
    if !has_support {
        candidates.push(support.clone());
    }

    RewritePlan {
        to_remove,
        to_add: candidates,
        matches,
    }
}
