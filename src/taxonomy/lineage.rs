/// Root-to-node lineage resolution
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::taxonomy::store::TaxonomyStore;
use crate::taxonomy::types::{LineageError, LineageNode, LineagePath, TaxonId};

/// Walks parent links from a taxon up to the root.
///
/// Merge aliases met on the way are followed and recorded; a deleted or
/// unknown id ends the walk with a "not found" outcome. Every walk is capped at
/// [`TaxonomyStore::max_hops`] steps so a corrupted parent chain surfaces as
/// [`LineageError::CycleDetected`] instead of spinning forever.
#[derive(Debug, Clone, Copy)]
pub struct AncestryWalker<'a> {
    store: &'a TaxonomyStore,
    max_hops: usize,
}

impl<'a> AncestryWalker<'a> {
    pub fn new(store: &'a TaxonomyStore) -> Self {
        Self {
            store,
            max_hops: store.max_hops(),
        }
    }

    pub fn store(&self) -> &'a TaxonomyStore {
        self.store
    }

    /// Root-first lineage of `taxid`. The root is left out unless it is the
    /// queried taxon itself.
    pub fn lineage(&self, taxid: TaxonId) -> Result<LineagePath, LineageError> {
        let mut redirects = Vec::new();
        let mut nodes = Vec::new();
        let mut current = taxid;
        let mut hops = 0usize;

        loop {
            hops += 1;
            if hops > self.max_hops {
                return Err(LineageError::CycleDetected { taxid, hops });
            }

            let parent = match self.store.parent(current) {
                Some(parent) => parent,
                None => {
                    if self.store.is_deleted(current) {
                        return Err(LineageError::Deleted(current));
                    }
                    match self.store.alias_of(current) {
                        Some(target) => {
                            debug!("Taxid {} was merged into {}", current, target);
                            redirects.push((current, target));
                            current = target;
                            continue;
                        }
                        None => return Err(LineageError::Unknown(current)),
                    }
                }
            };

            if current.is_root() {
                if nodes.is_empty() {
                    nodes.push(self.node(current));
                }
                break;
            }

            nodes.push(self.node(current));
            current = parent;
        }

        nodes.reverse();
        Ok(LineagePath {
            query: taxid,
            redirects,
            nodes,
        })
    }

    /// Lineages for many taxids, computed in parallel, returned in input order
    pub fn lineages(&self, taxids: &[TaxonId]) -> Vec<Result<LineagePath, LineageError>> {
        taxids.par_iter().map(|&t| self.lineage(t)).collect()
    }

    fn node(&self, taxid: TaxonId) -> LineageNode {
        LineageNode {
            taxid,
            name: self.store.name(taxid).unwrap_or_default().to_string(),
            rank: self.store.rank(taxid).unwrap_or_default().to_string(),
        }
    }
}

impl TaxonomyStore {
    /// Root-first lineage of one taxid
    pub fn lineage(&self, taxid: TaxonId) -> Result<LineagePath, LineageError> {
        AncestryWalker::new(self).lineage(taxid)
    }
}

/// Log a failed lineage the way batch commands report misses
pub fn log_miss(taxid: TaxonId, err: &LineageError) {
    match err {
        LineageError::Deleted(_) => warn!("Taxid {} was deleted", taxid),
        LineageError::Unknown(_) => warn!("Taxid {} not found", taxid),
        other => warn!("Lineage of {} failed: {}", taxid, other),
    }
}
