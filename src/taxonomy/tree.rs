/// Downward navigation: children and subtree listing
use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::taxonomy::store::TaxonomyStore;
use crate::taxonomy::types::{LineageError, TaxonId};

/// Parent → sorted children, built once from a store
pub struct ChildIndex<'a> {
    store: &'a TaxonomyStore,
    children: HashMap<TaxonId, Vec<TaxonId>>,
}

/// One row of a depth-first subtree listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtreeEntry {
    pub taxid: TaxonId,
    /// 0 for the listed taxon itself
    pub depth: usize,
}

impl<'a> ChildIndex<'a> {
    pub fn new(store: &'a TaxonomyStore) -> Self {
        let mut children: HashMap<TaxonId, Vec<TaxonId>> = HashMap::new();
        for taxid in store.taxids() {
            if taxid.is_root() {
                continue;
            }
            if let Some(parent) = store.parent(taxid) {
                children.entry(parent).or_default().push(taxid);
            }
        }
        for list in children.values_mut() {
            list.sort_unstable();
        }
        Self { store, children }
    }

    pub fn children(&self, taxid: TaxonId) -> &[TaxonId] {
        self.children.get(&taxid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pre-order listing of `taxid` and everything below it, children in
    /// taxid order. Empty when `taxid` is not live. A taxon reached twice
    /// means the parent links loop, reported as `CycleDetected`.
    pub fn subtree(&self, taxid: TaxonId) -> Result<Vec<SubtreeEntry>, LineageError> {
        let mut out = Vec::new();
        if !self.store.contains(taxid) {
            return Ok(out);
        }

        let mut seen = HashSet::new();
        let mut stack = vec![SubtreeEntry { taxid, depth: 0 }];
        while let Some(entry) = stack.pop() {
            if !seen.insert(entry.taxid) {
                return Err(LineageError::CycleDetected {
                    taxid: entry.taxid,
                    hops: entry.depth,
                });
            }
            out.push(entry);
            for &child in self.children(entry.taxid).iter().rev() {
                stack.push(SubtreeEntry {
                    taxid: child,
                    depth: entry.depth + 1,
                });
            }
        }
        Ok(out)
    }

    /// Nested JSON object keyed by `label(taxid)`
    pub fn subtree_json<F>(&self, taxid: TaxonId, label: &F) -> Result<Value, LineageError>
    where
        F: Fn(TaxonId) -> String,
    {
        let mut seen = HashSet::new();
        self.json_node(taxid, 0, label, &mut seen)
    }

    fn json_node<F>(
        &self,
        taxid: TaxonId,
        depth: usize,
        label: &F,
        seen: &mut HashSet<TaxonId>,
    ) -> Result<Value, LineageError>
    where
        F: Fn(TaxonId) -> String,
    {
        if !seen.insert(taxid) {
            return Err(LineageError::CycleDetected { taxid, hops: depth });
        }
        let mut node = Map::new();
        for &child in self.children(taxid) {
            node.insert(label(child), self.json_node(child, depth + 1, label, seen)?);
        }
        Ok(Value::Object(node))
    }
}
