/// Merged/deleted tables between two snapshots of one taxonomy
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::taxonomy::store::TaxonomyStore;
use crate::taxonomy::types::TaxonId;

/// Result of reconciling a new snapshot against its predecessor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Retired taxid → live replacement in the new snapshot
    pub merged: BTreeMap<TaxonId, TaxonId>,
    /// Taxids retired outright
    pub deleted: BTreeSet<TaxonId>,
}

pub struct VersionReconciler;

impl VersionReconciler {
    /// Compute the merged and deleted tables of `new` relative to `old`.
    ///
    /// 1. A node kept across versions whose parent changed while the
    ///    grandparent did not, and whose old parent vanished, marks
    ///    `old parent → new parent` as a merge.
    /// 2. Vanished old nodes not explained by 1 are deleted.
    /// 3. Merges carried by `old` are chased to a live target in `new`. A
    ///    chain that loops back to its source is dropped; one that ends in a
    ///    deleted or unknown id deletes its source.
    /// 4. Ids live again in `new` are neither merged nor deleted.
    pub fn diff(old: &TaxonomyStore, new: &TaxonomyStore) -> Reconciliation {
        let mut merged: BTreeMap<TaxonId, TaxonId> = BTreeMap::new();

        let kept: BTreeSet<TaxonId> = new.taxids().filter(|t| old.contains(*t)).collect();
        for child in kept {
            let (old_parent, new_parent) = match (old.parent(child), new.parent(child)) {
                (Some(o), Some(n)) => (o, n),
                _ => continue,
            };
            if old_parent == new_parent || new.contains(old_parent) {
                continue;
            }
            if new.parent(new_parent) != old.parent(old_parent) {
                continue;
            }

            match merged.get(&old_parent) {
                Some(&existing) if existing != new_parent => warn!(
                    "Taxid {} looks merged into both {} and {}, keeping {}",
                    old_parent, existing, new_parent, existing
                ),
                Some(_) => {}
                None => {
                    debug!("Taxid {} merged into {}", old_parent, new_parent);
                    merged.insert(old_parent, new_parent);
                }
            }
        }

        let mut deleted: BTreeSet<TaxonId> = old
            .taxids()
            .filter(|t| !t.is_root() && !new.contains(*t) && !merged.contains_key(t))
            .collect();

        let prior: BTreeMap<TaxonId, TaxonId> = old.merged().collect();
        let limit = old.max_hops() + merged.len();
        for (&from, &to) in &prior {
            if new.contains(from) || merged.contains_key(&from) || deleted.contains(&from) {
                continue;
            }

            let mut current = to;
            let mut outcome = None;
            for _ in 0..limit {
                if current == from {
                    break;
                }
                if new.contains(current) {
                    outcome = Some(Ok(current));
                    break;
                }
                match merged.get(&current).or_else(|| prior.get(&current)) {
                    Some(&next) => current = next,
                    None => {
                        outcome = Some(Err(current));
                        break;
                    }
                }
            }

            match outcome {
                Some(Ok(target)) => {
                    if target != to {
                        debug!("Merge chain {} -> {} now ends at {}", from, to, target);
                    }
                    merged.insert(from, target);
                }
                Some(Err(end)) => {
                    debug!("Merge chain of {} ends at retired taxid {}, deleting it", from, end);
                    deleted.insert(from);
                }
                None => warn!(
                    "Merge chain starting at {} loops back on itself, dropping it",
                    from
                ),
            }
        }

        for taxid in old.deleted() {
            if !new.contains(taxid) && !merged.contains_key(&taxid) {
                deleted.insert(taxid);
            }
        }

        info!("{} merged and {} deleted taxids", merged.len(), deleted.len());
        Reconciliation { merged, deleted }
    }
}

impl Reconciliation {
    /// Check the output invariants against the new snapshot
    pub fn is_consistent_with(&self, new: &TaxonomyStore) -> bool {
        self.merged
            .iter()
            .all(|(from, to)| from != to && !new.contains(*from) && new.contains(*to))
            && self
                .deleted
                .iter()
                .all(|t| !new.contains(*t) && !self.merged.contains_key(t))
    }
}
