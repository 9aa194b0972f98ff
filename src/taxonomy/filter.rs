/// Rank-based taxid filtering
use std::collections::HashSet;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{TaxkitError, TaxkitResult};
use crate::taxonomy::rank::RankOrder;
use crate::taxonomy::store::TaxonomyStore;
use crate::taxonomy::types::TaxonId;

/// Filter settings, as given on the command line or in `[filter]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankFilterConfig {
    /// Keep ranks strictly less specific than this one
    pub lower_than: Option<String>,
    /// Keep ranks strictly more specific than this one
    pub higher_than: Option<String>,
    /// Always keep these ranks
    pub equal_to: Vec<String>,
    pub black_list: Vec<String>,
    pub discard_unordered: bool,
    /// With `discard_unordered`, judge an unordered taxon by its nearest
    /// ordered ancestor instead of dropping it
    pub save_predictable_unordered: bool,
    pub discard_root: bool,
}

/// Predicate over the taxids of one store.
///
/// Decisions are memoized per taxid for the lifetime of the filter.
pub struct RankFilter<'a> {
    store: &'a TaxonomyStore,
    order: &'a RankOrder,
    lower: Option<u32>,
    higher: Option<u32>,
    equal: HashSet<String>,
    black_list: HashSet<String>,
    discard_unordered: bool,
    save_predictable: bool,
    discard_root: bool,
    cache: DashMap<TaxonId, bool>,
}

impl<'a> RankFilter<'a> {
    pub fn new(
        store: &'a TaxonomyStore,
        order: &'a RankOrder,
        config: &RankFilterConfig,
    ) -> TaxkitResult<Self> {
        if config.lower_than.is_some() && config.higher_than.is_some() {
            return Err(TaxkitError::Configuration(
                "lower-than and higher-than can't be given together".to_string(),
            ));
        }

        for rank in store.ranks() {
            if !order.is_defined(rank) {
                return Err(TaxkitError::Configuration(format!(
                    "rank order not defined in rank file: {}",
                    rank
                )));
            }
        }

        let store_ranks: HashSet<String> = store.ranks().iter().map(|r| r.to_lowercase()).collect();
        let bound = |rank: &str| -> TaxkitResult<u32> {
            let rank = rank.to_lowercase();
            let o = order.order_of(&rank).ok_or_else(|| {
                TaxkitError::Configuration(format!("rank order not defined in rank file: {}", rank))
            })?;
            if !store_ranks.contains(&rank) {
                return Err(TaxkitError::Configuration(format!(
                    "rank not found in taxonomy database: {}",
                    rank
                )));
            }
            Ok(o)
        };

        let lower = config.lower_than.as_deref().map(&bound).transpose()?;
        let higher = config.higher_than.as_deref().map(&bound).transpose()?;
        let mut equal = HashSet::new();
        for rank in &config.equal_to {
            bound(rank)?;
            equal.insert(rank.to_lowercase());
        }

        Ok(Self {
            store,
            order,
            lower,
            higher,
            equal,
            black_list: config.black_list.iter().map(|r| r.to_lowercase()).collect(),
            discard_unordered: config.discard_unordered,
            save_predictable: config.save_predictable_unordered,
            discard_root: config.discard_root,
            cache: DashMap::new(),
        })
    }

    /// Whether `taxid` is kept. Ids that are not live in the store never pass.
    pub fn is_passed(&self, taxid: TaxonId) -> bool {
        if let Some(hit) = self.cache.get(&taxid) {
            return *hit;
        }
        let pass = self.decide(taxid);
        self.cache.insert(taxid, pass);
        pass
    }

    fn decide(&self, taxid: TaxonId) -> bool {
        if self.discard_root && taxid.is_root() {
            return false;
        }
        let rank = match self.store.rank(taxid) {
            Some(rank) => rank.to_lowercase(),
            None => return false,
        };

        if self.black_list.contains(&rank) {
            return false;
        }

        if self.order.is_unordered(&rank) {
            // Equal-to ranks are ordered, so an unordered rank is never a member
            if !self.equal.is_empty() {
                return false;
            }
            if !self.discard_unordered {
                return true;
            }
            if !self.save_predictable {
                return false;
            }
            return match self.nearest_ordered_ancestor(taxid) {
                Some(order) => self.lower.map(|lower| order < lower).unwrap_or(true),
                None => false,
            };
        }

        let order = match self.order.order_of(&rank) {
            Some(order) => order,
            None => return false,
        };

        if self.equal.contains(&rank) {
            return true;
        }
        if let Some(lower) = self.lower {
            return order < lower;
        }
        if let Some(higher) = self.higher {
            return order > higher;
        }
        self.equal.is_empty()
    }

    fn nearest_ordered_ancestor(&self, taxid: TaxonId) -> Option<u32> {
        let mut current = taxid;
        for _ in 0..self.store.max_hops() {
            if current.is_root() {
                return None;
            }
            current = self.store.parent(current)?;
            if let Some(order) = self.store.rank(current).and_then(|r| self.order.order_of(r)) {
                return Some(order);
            }
        }
        None
    }
}

/// Ranks used by `store`, sorted from least to most specific. Unordered ranks
/// come first, then ranks missing from the order.
pub fn store_ranks(store: &TaxonomyStore, order: &RankOrder) -> Vec<(String, Option<u32>)> {
    let mut ranks: Vec<(String, Option<u32>)> = store
        .ranks()
        .iter()
        .map(|r| (r.clone(), order.order_of(r)))
        .collect();
    ranks.sort_by(|a, b| {
        let key = |r: &(String, Option<u32>)| match r.1 {
            Some(o) => (1, o),
            None if order.is_unordered(&r.0) => (0, 0),
            None => (2, 0),
        };
        key(a).cmp(&key(b)).then_with(|| a.0.cmp(&b.0))
    });
    ranks
}
