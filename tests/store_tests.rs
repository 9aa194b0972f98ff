/// Loading taxdump directories from disk and querying them
mod common;

use common::{write_taxdump, TestEnvironment};
use pretty_assertions::assert_eq;
use taxkit::taxonomy::filter::{RankFilter, RankFilterConfig};
use taxkit::taxonomy::lineage::AncestryWalker;
use taxkit::taxonomy::names::NameIndex;
use taxkit::taxonomy::rank::RankOrder;
use taxkit::taxonomy::store::{DumpPaths, TaxonomyStore};
use taxkit::taxonomy::types::{LineageError, Resolution, TaxonId};
use taxkit::taxonomy::LcaCache;
use taxkit::TaxkitError;

fn load(env: &TestEnvironment) -> TaxonomyStore {
    TaxonomyStore::load(&DumpPaths::from_dir(&env.data_dir)).expect("Failed to load taxdump")
}

#[test]
fn test_load_sample() {
    let env = TestEnvironment::sample();
    let store = load(&env);

    assert_eq!(store.len(), 13);
    assert_eq!(store.merged_count(), 1);
    assert_eq!(store.deleted_count(), 1);
    assert_eq!(store.name(TaxonId(562)), Some("Escherichia coli"));
    assert_eq!(store.rank(TaxonId(561)), Some("genus"));
    assert_eq!(store.parent(TaxonId(2)), Some(TaxonId(131567)));
}

#[test]
fn test_lineage_from_disk() {
    let env = TestEnvironment::sample();
    let store = load(&env);

    let path = store.lineage(TaxonId(83333)).unwrap();
    assert_eq!(
        path.names(),
        vec![
            "cellular organisms",
            "Bacteria",
            "Proteobacteria",
            "Gammaproteobacteria",
            "Enterobacterales",
            "Enterobacteriaceae",
            "Escherichia",
            "Escherichia coli",
            "Escherichia coli K-12",
        ]
    );
    assert_eq!(path.ranks().last(), Some(&"strain"));
}

#[test]
fn test_merged_deleted_unknown() {
    let env = TestEnvironment::sample();
    let store = load(&env);
    let walker = AncestryWalker::new(&store);

    let merged = walker.lineage(TaxonId(469598)).unwrap();
    assert_eq!(merged.taxid(), TaxonId(562));
    assert!(merged.was_redirected());
    assert_eq!(
        store.resolve(TaxonId(469598)),
        Resolution::Merged {
            from: TaxonId(469598),
            to: TaxonId(562)
        }
    );

    assert_eq!(walker.lineage(TaxonId(3)), Err(LineageError::Deleted(TaxonId(3))));
    assert_eq!(
        walker.lineage(TaxonId(999999)),
        Err(LineageError::Unknown(TaxonId(999999)))
    );
}

#[test]
fn test_batch_lineage_keeps_order() {
    let env = TestEnvironment::sample();
    let store = load(&env);
    let walker = AncestryWalker::new(&store);

    let ids: Vec<TaxonId> = [623, 3, 2, 469598].into_iter().map(TaxonId).collect();
    let results = walker.lineages(&ids);
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].as_ref().unwrap().taxid(), TaxonId(623));
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap().names(), vec!["cellular organisms", "Bacteria"]);
    assert_eq!(results[3].as_ref().unwrap().taxid(), TaxonId(562));
}

#[test]
fn test_lca_from_disk() {
    let env = TestEnvironment::sample();
    let store = load(&env);
    let cache = LcaCache::new(&store);

    assert_eq!(cache.lca(&[TaxonId(562), TaxonId(623)]), Ok(TaxonId(543)));
    assert_eq!(cache.lca(&[TaxonId(83333), TaxonId(2157)]), Ok(TaxonId(131567)));
    assert_eq!(cache.lca(&[TaxonId(469598), TaxonId(83333)]), Ok(TaxonId(562)));
    assert_eq!(cache.lca(&[TaxonId(562), TaxonId(3)]), Err(LineageError::Deleted(TaxonId(3))));
}

#[test]
fn test_optional_tables_missing() {
    let env = TestEnvironment::sample();
    std::fs::remove_file(env.data_dir.join("merged.dmp")).unwrap();
    std::fs::remove_file(env.data_dir.join("delnodes.dmp")).unwrap();

    let store = load(&env);
    assert_eq!(store.len(), 13);
    assert_eq!(store.merged_count(), 0);
    assert_eq!(store.resolve(TaxonId(3)), Resolution::Unknown(TaxonId(3)));

    let paths = DumpPaths::from_dir(&env.data_dir);
    assert!(paths.require_all().is_err());
}

#[test]
fn test_malformed_nodes_line() {
    let env = TestEnvironment::sample();
    let nodes = env.data_dir.join("nodes.dmp");
    let mut text = std::fs::read_to_string(&nodes).unwrap();
    text.push_str("12345\t|\tnot-a-number\t|\tspecies\t|\n");
    std::fs::write(&nodes, text).unwrap();

    match TaxonomyStore::load(&DumpPaths::from_dir(&env.data_dir)) {
        Err(TaxkitError::MalformedRecord { line, .. }) => assert_eq!(line, 14),
        other => panic!("expected a malformed record, got {:?}", other.map(|s| s.len())),
    }
}

#[test]
fn test_unknown_parent_is_inconsistent() {
    let env = TestEnvironment::new();
    write_taxdump(
        &env.data_dir,
        &[(1, 1, "no rank", "root"), (5, 77, "species", "Orphan")],
        &[],
        &[],
    );
    assert!(matches!(
        TaxonomyStore::load(&DumpPaths::from_dir(&env.data_dir)),
        Err(TaxkitError::InconsistentTaxonomy(_))
    ));
}

#[test]
fn test_name_lookup() {
    let env = TestEnvironment::sample();
    let store = load(&env);
    let index = NameIndex::new(&store);

    assert_eq!(index.lookup("escherichia COLI"), &[TaxonId(562)]);
    assert!(index.lookup("Escherichia coli (synonym)").is_empty());
    assert!(index.lookup("Homo sapiens").is_empty());
}

#[test]
fn test_filter_with_default_order() {
    let env = TestEnvironment::sample();
    let store = load(&env);
    let order = RankOrder::load_or_init(&env.path("ranks.txt")).unwrap();
    assert!(env.path("ranks.txt").exists());

    let config = RankFilterConfig {
        lower_than: Some("genus".to_string()),
        discard_unordered: true,
        ..Default::default()
    };
    let filter = RankFilter::new(&store, &order, &config).unwrap();

    let kept: Vec<u32> = [1, 131567, 2, 1224, 543, 561, 562, 83333]
        .into_iter()
        .filter(|id| filter.is_passed(TaxonId(*id)))
        .collect();
    assert_eq!(kept, vec![2, 1224, 543]);
}
