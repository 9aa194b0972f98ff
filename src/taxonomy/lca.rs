/// Lowest common ancestor queries with per-session memoization
use dashmap::DashMap;
use tracing::warn;

use crate::taxonomy::store::TaxonomyStore;
use crate::taxonomy::types::{LineageError, Resolution, TaxonId};

/// LCA cache bound to one store.
///
/// Depths and pair results are memoized for the lifetime of the cache; the
/// borrow ties the cache to a single snapshot so results never leak across
/// versions.
pub struct LcaCache<'a> {
    store: &'a TaxonomyStore,
    depths: DashMap<TaxonId, usize>,
    pairs: DashMap<(TaxonId, TaxonId), TaxonId>,
}

impl<'a> LcaCache<'a> {
    pub fn new(store: &'a TaxonomyStore) -> Self {
        Self {
            store,
            depths: DashMap::new(),
            pairs: DashMap::new(),
        }
    }

    /// LCA of all `taxids`, folded left to right.
    ///
    /// Merged ids are replaced by their target. A deleted or unknown id makes
    /// the whole result undetermined.
    pub fn lca(&self, taxids: &[TaxonId]) -> Result<TaxonId, LineageError> {
        let (first, rest) = taxids.split_first().ok_or(LineageError::EmptyQuery)?;
        let mut acc = self.live(*first)?;
        for &taxid in rest {
            let other = self.live(taxid)?;
            acc = self.pair(acc, other)?;
        }
        Ok(acc)
    }

    /// LCA of two ids
    pub fn lca2(&self, a: TaxonId, b: TaxonId) -> Result<TaxonId, LineageError> {
        let a = self.live(a)?;
        let b = self.live(b)?;
        self.pair(a, b)
    }

    /// Distance from `taxid` to the root (root = 0)
    pub fn depth(&self, taxid: TaxonId) -> Result<usize, LineageError> {
        if let Some(d) = self.depths.get(&taxid) {
            return Ok(*d);
        }

        let limit = self.store.max_hops();
        let mut path = Vec::new();
        let mut current = taxid;
        let base = loop {
            if let Some(d) = self.depths.get(&current) {
                break *d;
            }
            if current.is_root() {
                break 0;
            }
            if path.len() >= limit {
                return Err(LineageError::CycleDetected {
                    taxid,
                    hops: path.len(),
                });
            }
            path.push(current);
            current = self
                .store
                .parent(current)
                .ok_or(LineageError::Unknown(current))?;
        };

        self.depths.insert(current, base);
        let total = base + path.len();
        for (i, id) in path.iter().enumerate() {
            self.depths.insert(*id, total - i);
        }
        Ok(total)
    }

    pub fn cached_pairs(&self) -> usize {
        self.pairs.len()
    }

    fn live(&self, taxid: TaxonId) -> Result<TaxonId, LineageError> {
        match self.store.resolve(taxid) {
            Resolution::Live(id) => Ok(id),
            Resolution::Merged { from, to } => {
                warn!("Taxid {} was merged into {}", from, to);
                Ok(to)
            }
            Resolution::Deleted(id) => Err(LineageError::Deleted(id)),
            Resolution::Unknown(id) => Err(LineageError::Unknown(id)),
        }
    }

    fn pair(&self, a: TaxonId, b: TaxonId) -> Result<TaxonId, LineageError> {
        if a == b {
            return Ok(a);
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(hit) = self.pairs.get(&key) {
            return Ok(*hit);
        }

        let mut x = a;
        let mut y = b;
        let mut dx = self.depth(x)?;
        let mut dy = self.depth(y)?;

        while dx > dy {
            x = self.step_up(x)?;
            dx -= 1;
        }
        while dy > dx {
            y = self.step_up(y)?;
            dy -= 1;
        }
        while x != y {
            x = self.step_up(x)?;
            y = self.step_up(y)?;
        }

        self.pairs.insert(key, x);
        Ok(x)
    }

    fn step_up(&self, taxid: TaxonId) -> Result<TaxonId, LineageError> {
        self.store.parent(taxid).ok_or(LineageError::Unknown(taxid))
    }
}

impl TaxonomyStore {
    /// One-off LCA without a shared cache
    pub fn lca(&self, taxids: &[TaxonId]) -> Result<TaxonId, LineageError> {
        LcaCache::new(self).lca(taxids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::types::Taxon;
    use std::collections::HashSet;

    fn taxon(taxid: u32, parent: u32, rank: &str) -> Taxon {
        Taxon {
            taxid: TaxonId(taxid),
            parent: TaxonId(parent),
            rank: rank.to_string(),
            name: format!("t{}", taxid),
        }
    }

    //        1
    //       / \
    //      2   9
    //     / \
    //    3   6
    //   / \
    //  4   5
    fn store() -> TaxonomyStore {
        TaxonomyStore::from_taxa(
            vec![
                taxon(1, 1, "no rank"),
                taxon(2, 1, "superkingdom"),
                taxon(3, 2, "phylum"),
                taxon(4, 3, "class"),
                taxon(5, 3, "class"),
                taxon(6, 2, "phylum"),
                taxon(9, 1, "superkingdom"),
            ],
            vec![(TaxonId(50), TaxonId(5))],
            HashSet::from([TaxonId(60)]),
        )
        .unwrap()
    }

    #[test]
    fn test_basic_lca() {
        let store = store();
        let cache = LcaCache::new(&store);
        assert_eq!(cache.lca2(TaxonId(4), TaxonId(5)), Ok(TaxonId(3)));
        assert_eq!(cache.lca2(TaxonId(4), TaxonId(6)), Ok(TaxonId(2)));
        assert_eq!(cache.lca2(TaxonId(4), TaxonId(9)), Ok(TaxonId(1)));
        assert_eq!(cache.lca2(TaxonId(2), TaxonId(3)), Ok(TaxonId(2)));
        assert_eq!(cache.lca2(TaxonId(4), TaxonId(4)), Ok(TaxonId(4)));
    }

    #[test]
    fn test_fold_many() {
        let store = store();
        let cache = LcaCache::new(&store);
        let ids = [TaxonId(4), TaxonId(5), TaxonId(6)];
        assert_eq!(cache.lca(&ids), Ok(TaxonId(2)));
        assert_eq!(cache.lca(&[TaxonId(5)]), Ok(TaxonId(5)));
        assert_eq!(cache.lca(&[]), Err(LineageError::EmptyQuery));
    }

    #[test]
    fn test_merged_substituted_and_misses_taint() {
        let store = store();
        let cache = LcaCache::new(&store);
        assert_eq!(cache.lca2(TaxonId(50), TaxonId(4)), Ok(TaxonId(3)));
        assert_eq!(
            cache.lca(&[TaxonId(4), TaxonId(60)]),
            Err(LineageError::Deleted(TaxonId(60)))
        );
        assert_eq!(
            cache.lca(&[TaxonId(4), TaxonId(5), TaxonId(777)]),
            Err(LineageError::Unknown(TaxonId(777)))
        );
    }

    #[test]
    fn test_depth_and_memo() {
        let store = store();
        let cache = LcaCache::new(&store);
        assert_eq!(cache.depth(TaxonId(1)), Ok(0));
        assert_eq!(cache.depth(TaxonId(4)), Ok(3));
        assert_eq!(cache.depth(TaxonId(5)), Ok(3));
        cache.lca2(TaxonId(4), TaxonId(5)).unwrap();
        cache.lca2(TaxonId(5), TaxonId(4)).unwrap();
        assert_eq!(cache.cached_pairs(), 1);
    }

    #[test]
    fn test_store_shortcut() {
        let store = store();
        assert_eq!(store.lca(&[TaxonId(2), TaxonId(3)]), Ok(TaxonId(2)));
    }
}
