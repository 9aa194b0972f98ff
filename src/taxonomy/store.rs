/// Immutable snapshot of one taxonomy release
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{TaxkitError, TaxkitResult};
use crate::taxonomy::dump::{self, NodeRecord};
use crate::taxonomy::types::{Resolution, Taxon, TaxonId};

/// Locations of the four dump tables of one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpPaths {
    pub nodes: PathBuf,
    pub names: PathBuf,
    pub delnodes: Option<PathBuf>,
    pub merged: Option<PathBuf>,
}

impl DumpPaths {
    /// Standard file names inside a taxdump directory
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            nodes: dir.join(dump::NODES_FILE),
            names: dir.join(dump::NAMES_FILE),
            delnodes: Some(dir.join(dump::DELNODES_FILE)),
            merged: Some(dir.join(dump::MERGED_FILE)),
        }
    }

    /// All four tables must be present (changelog archives)
    pub fn require_all(&self) -> TaxkitResult<()> {
        let optional = [self.delnodes.as_ref(), self.merged.as_ref()];
        for path in [Some(&self.nodes), Some(&self.names)]
            .into_iter()
            .chain(optional)
        {
            match path {
                Some(p) if p.exists() => {}
                Some(p) => {
                    return Err(TaxkitError::InvalidInput(format!(
                        "dump file not found: {}",
                        p.display()
                    )))
                }
                None => {
                    return Err(TaxkitError::InvalidInput(
                        "delnodes.dmp and merged.dmp are required".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct NodeEntry {
    parent: TaxonId,
    rank: u32,
}

/// Node, name, deleted and merged tables of one taxonomy version.
///
/// A store is only constructed from a consistent table set: exactly one root
/// (taxid 1, its own parent), every parent a live node, deleted ids disjoint
/// from live ids and no alias pointing at itself. Parent chains are not
/// checked for cycles here; walkers carry their own hop guard.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyStore {
    nodes: HashMap<TaxonId, NodeEntry>,
    ranks: Vec<String>,
    names: HashMap<TaxonId, String>,
    deleted: HashSet<TaxonId>,
    merged: HashMap<TaxonId, TaxonId>,
}

impl TaxonomyStore {
    /// Load a snapshot, parsing the four tables in parallel.
    ///
    /// Missing delnodes/merged tables load as empty; any malformed record in
    /// any table aborts the whole load.
    pub fn load(paths: &DumpPaths) -> TaxkitResult<Self> {
        info!("Loading taxonomy from {}", paths.nodes.display());

        let ((nodes, names), (merged, deleted)) = rayon::join(
            || {
                rayon::join(
                    || dump::read_nodes(&paths.nodes),
                    || dump::read_names(&paths.names),
                )
            },
            || {
                rayon::join(
                    || read_optional(paths.merged.as_deref(), dump::read_merged),
                    || read_optional(paths.delnodes.as_deref(), dump::read_delnodes),
                )
            },
        );

        let store = Self::from_tables(
            nodes?,
            names?,
            merged?.unwrap_or_default(),
            deleted?.unwrap_or_default(),
        )?;

        info!(
            "{} nodes in {} ranks, {} deleted, {} merged",
            store.len(),
            store.ranks.len(),
            store.deleted.len(),
            store.merged.len()
        );
        Ok(store)
    }

    /// Build a store from already parsed tables
    pub fn from_tables(
        nodes: Vec<NodeRecord>,
        mut names: HashMap<TaxonId, String>,
        merged: Vec<(TaxonId, TaxonId)>,
        mut deleted: HashSet<TaxonId>,
    ) -> TaxkitResult<Self> {
        let mut ranks: Vec<String> = Vec::new();
        let mut rank_index: HashMap<String, u32> = HashMap::new();
        let mut table: HashMap<TaxonId, NodeEntry> = HashMap::with_capacity(nodes.len());

        for rec in nodes {
            let rank = match rank_index.get(&rec.rank) {
                Some(&idx) => idx,
                None => {
                    let idx = ranks.len() as u32;
                    rank_index.insert(rec.rank.clone(), idx);
                    ranks.push(rec.rank);
                    idx
                }
            };
            if table
                .insert(rec.taxid, NodeEntry { parent: rec.parent, rank })
                .is_some()
            {
                warn!("Duplicate node record for taxid {}, keeping the last one", rec.taxid);
            }
        }

        match table.get(&TaxonId::ROOT) {
            Some(root) if root.parent == TaxonId::ROOT => {}
            Some(root) => {
                return Err(TaxkitError::InconsistentTaxonomy(format!(
                    "root taxid 1 has parent {}",
                    root.parent
                )))
            }
            None => {
                return Err(TaxkitError::InconsistentTaxonomy(
                    "root taxid 1 is missing".to_string(),
                ))
            }
        }

        // Sorted so the reported offender is deterministic
        let ids: BTreeSet<TaxonId> = table.keys().copied().collect();
        for taxid in &ids {
            let parent = table[taxid].parent;
            if !taxid.is_root() && parent == *taxid {
                return Err(TaxkitError::InconsistentTaxonomy(format!(
                    "taxid {} is its own parent but is not the root",
                    taxid
                )));
            }
            if !table.contains_key(&parent) {
                return Err(TaxkitError::InconsistentTaxonomy(format!(
                    "taxid {} has unknown parent {}",
                    taxid, parent
                )));
            }
        }

        names.retain(|taxid, _| table.contains_key(taxid));

        let reused: Vec<TaxonId> = deleted
            .iter()
            .filter(|t| table.contains_key(t))
            .copied()
            .collect();
        for taxid in reused {
            warn!("Taxid {} is both live and deleted, keeping it live", taxid);
            deleted.remove(&taxid);
        }

        let mut aliases = HashMap::with_capacity(merged.len());
        for (from, to) in merged {
            if from == to {
                warn!("Dropping self-referencing merge alias {}", from);
                continue;
            }
            if table.contains_key(&from) {
                warn!("Ignoring merge alias {} -> {}: {} is live", from, to, from);
                continue;
            }
            aliases.insert(from, to);
        }

        Ok(Self {
            nodes: table,
            ranks,
            names,
            deleted,
            merged: aliases,
        })
    }

    /// Build a store from complete taxon records
    pub fn from_taxa<I>(
        taxa: I,
        merged: Vec<(TaxonId, TaxonId)>,
        deleted: HashSet<TaxonId>,
    ) -> TaxkitResult<Self>
    where
        I: IntoIterator<Item = Taxon>,
    {
        let mut nodes = Vec::new();
        let mut names = HashMap::new();
        for t in taxa {
            names.insert(t.taxid, t.name);
            nodes.push(NodeRecord {
                taxid: t.taxid,
                parent: t.parent,
                rank: t.rank,
            });
        }
        Self::from_tables(nodes, names, merged, deleted)
    }

    pub fn parent(&self, taxid: TaxonId) -> Option<TaxonId> {
        self.nodes.get(&taxid).map(|n| n.parent)
    }

    pub fn rank(&self, taxid: TaxonId) -> Option<&str> {
        self.nodes
            .get(&taxid)
            .map(|n| self.ranks[n.rank as usize].as_str())
    }

    pub fn name(&self, taxid: TaxonId) -> Option<&str> {
        self.names.get(&taxid).map(String::as_str)
    }

    pub fn is_deleted(&self, taxid: TaxonId) -> bool {
        self.deleted.contains(&taxid)
    }

    /// Direct merge target of a retired taxid (one hop, not chased)
    pub fn alias_of(&self, taxid: TaxonId) -> Option<TaxonId> {
        self.merged.get(&taxid).copied()
    }

    pub fn contains(&self, taxid: TaxonId) -> bool {
        self.nodes.contains_key(&taxid)
    }

    /// Resolve a taxid against this snapshot, chasing merge chains to a live
    /// target
    pub fn resolve(&self, taxid: TaxonId) -> Resolution {
        if self.contains(taxid) {
            return Resolution::Live(taxid);
        }
        if self.is_deleted(taxid) {
            return Resolution::Deleted(taxid);
        }

        let mut current = taxid;
        for _ in 0..=self.merged.len() {
            match self.alias_of(current) {
                Some(next) if self.contains(next) => {
                    return Resolution::Merged { from: taxid, to: next }
                }
                Some(next) if self.is_deleted(next) => return Resolution::Deleted(taxid),
                Some(next) => current = next,
                None => return Resolution::Unknown(taxid),
            }
        }

        warn!("Merge aliases starting at {} form a loop", taxid);
        Resolution::Unknown(taxid)
    }

    /// Full record of a live taxon
    pub fn taxon(&self, taxid: TaxonId) -> Option<Taxon> {
        let entry = self.nodes.get(&taxid)?;
        Some(Taxon {
            taxid,
            parent: entry.parent,
            rank: self.ranks[entry.rank as usize].clone(),
            name: self.name(taxid).unwrap_or_default().to_string(),
        })
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Live taxids in no particular order
    pub fn taxids(&self) -> impl Iterator<Item = TaxonId> + '_ {
        self.nodes.keys().copied()
    }

    /// Distinct rank labels used by live nodes
    pub fn ranks(&self) -> &[String] {
        &self.ranks
    }

    pub fn deleted(&self) -> impl Iterator<Item = TaxonId> + '_ {
        self.deleted.iter().copied()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    /// Merge aliases as `(old, new)` pairs in no particular order
    pub fn merged(&self) -> impl Iterator<Item = (TaxonId, TaxonId)> + '_ {
        self.merged.iter().map(|(from, to)| (*from, *to))
    }

    pub fn merged_count(&self) -> usize {
        self.merged.len()
    }

    /// Upper bound on the hops any walk over this store can legitimately take
    pub fn max_hops(&self) -> usize {
        self.nodes.len() + self.merged.len() + 1
    }
}

fn read_optional<T, F>(path: Option<&Path>, read: F) -> TaxkitResult<Option<T>>
where
    F: FnOnce(&Path) -> TaxkitResult<T>,
{
    match path {
        Some(p) if p.exists() => read(p).map(Some),
        Some(p) => {
            warn!("{} not found, treating it as empty", p.display());
            Ok(None)
        }
        None => Ok(None),
    }
}
