/// Exact scientific-name lookup
use std::collections::HashMap;

use crate::taxonomy::store::TaxonomyStore;
use crate::taxonomy::types::TaxonId;

/// Lowercased scientific name → every live taxid carrying it
#[derive(Debug, Default)]
pub struct NameIndex {
    index: HashMap<String, Vec<TaxonId>>,
}

impl NameIndex {
    pub fn new(store: &TaxonomyStore) -> Self {
        let mut index: HashMap<String, Vec<TaxonId>> = HashMap::new();
        for taxid in store.taxids() {
            if let Some(name) = store.name(taxid) {
                index.entry(name.to_lowercase()).or_default().push(taxid);
            }
        }
        for ids in index.values_mut() {
            ids.sort_unstable();
        }
        Self { index }
    }

    /// Case-insensitive, otherwise exact
    pub fn lookup(&self, name: &str) -> &[TaxonId] {
        self.index
            .get(&name.trim().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::types::Taxon;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_homonyms() {
        let taxa = vec![
            Taxon { taxid: TaxonId(1), parent: TaxonId(1), rank: "no rank".into(), name: "root".into() },
            Taxon { taxid: TaxonId(20), parent: TaxonId(1), rank: "genus".into(), name: "Drosophila".into() },
            Taxon { taxid: TaxonId(10), parent: TaxonId(1), rank: "genus".into(), name: "Drosophila".into() },
        ];
        let store = TaxonomyStore::from_taxa(taxa, vec![], HashSet::new()).unwrap();
        let index = NameIndex::new(&store);

        assert_eq!(index.lookup("drosophila"), &[TaxonId(10), TaxonId(20)]);
        assert_eq!(index.lookup(" ROOT "), &[TaxonId(1)]);
        assert!(index.lookup("Drosophil").is_empty());
        assert_eq!(index.len(), 2);
    }
}
