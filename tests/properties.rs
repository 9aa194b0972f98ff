/// Algebraic properties of LCA and lineage over random trees
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::HashSet;
use taxkit::taxonomy::types::{Taxon, TaxonId};
use taxkit::taxonomy::{LcaCache, TaxonomyStore};

/// Tree over ids 1..=n+1 where node i+2 hangs below some node in 1..=i+1
fn random_tree() -> impl Strategy<Value = TaxonomyStore> {
    prop::collection::vec(any::<Index>(), 1..60).prop_map(|parents| {
        let mut taxa = vec![Taxon {
            taxid: TaxonId::ROOT,
            parent: TaxonId::ROOT,
            rank: "no rank".to_string(),
            name: "root".to_string(),
        }];
        for (i, idx) in parents.iter().enumerate() {
            let taxid = i as u32 + 2;
            let parent = idx.index(i + 1) as u32 + 1;
            taxa.push(Taxon {
                taxid: TaxonId(taxid),
                parent: TaxonId(parent),
                rank: "no rank".to_string(),
                name: format!("t{}", taxid),
            });
        }
        TaxonomyStore::from_taxa(taxa, Vec::new(), HashSet::new()).unwrap()
    })
}

fn pick(store: &TaxonomyStore, idx: &Index) -> TaxonId {
    TaxonId(idx.index(store.len()) as u32 + 1)
}

proptest! {
    #[test]
    fn lca_is_idempotent_and_commutative(store in random_tree(), a in any::<Index>(), b in any::<Index>()) {
        let cache = LcaCache::new(&store);
        let (a, b) = (pick(&store, &a), pick(&store, &b));
        prop_assert_eq!(cache.lca(&[a, a]), Ok(a));
        prop_assert_eq!(cache.lca(&[a, b]), cache.lca(&[b, a]));
    }

    #[test]
    fn lca_is_associative(
        store in random_tree(),
        a in any::<Index>(),
        b in any::<Index>(),
        c in any::<Index>(),
    ) {
        let cache = LcaCache::new(&store);
        let (a, b, c) = (pick(&store, &a), pick(&store, &b), pick(&store, &c));
        let left = cache.lca2(cache.lca2(a, b).unwrap(), c).unwrap();
        let right = cache.lca2(a, cache.lca2(b, c).unwrap()).unwrap();
        prop_assert_eq!(left, right);
        prop_assert_eq!(cache.lca(&[a, b, c]), Ok(left));
    }

    #[test]
    fn lca_is_a_common_ancestor(store in random_tree(), a in any::<Index>(), b in any::<Index>()) {
        let cache = LcaCache::new(&store);
        let (a, b) = (pick(&store, &a), pick(&store, &b));
        let lca = cache.lca2(a, b).unwrap();
        if !lca.is_root() {
            prop_assert!(store.lineage(a).unwrap().taxids().contains(&lca));
            prop_assert!(store.lineage(b).unwrap().taxids().contains(&lca));
        }
    }

    #[test]
    fn parent_lineage_is_a_strict_prefix(store in random_tree(), a in any::<Index>()) {
        let taxid = pick(&store, &a);
        let parent = store.parent(taxid).unwrap();
        let path = store.lineage(taxid).unwrap();
        prop_assert_eq!(path.taxid(), taxid);
        if !taxid.is_root() && !parent.is_root() {
            let parent_path = store.lineage(parent).unwrap();
            prop_assert!(parent_path.is_strict_prefix_of(&path));
            prop_assert_eq!(parent_path.len() + 1, path.len());
        }
    }
}
