//! Per-taxid change history across taxonomy releases
//!
//! Snapshots are ingested oldest first. Each snapshot appends zero or more
//! events per taxid; within one snapshot a taxid's events are ordered by
//! [`ChangeKind`]. The CSV rendering has one row per event:
//!
//! ```text
//! taxid,version,change,change-value,name,rank,lineage,lineage-taxids
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Write;
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{TaxkitError, TaxkitResult};
use crate::taxonomy::lineage::AncestryWalker;
use crate::taxonomy::store::{DumpPaths, TaxonomyStore};
use crate::taxonomy::types::{LineagePath, TaxonId};

/// Event kinds, in their within-snapshot output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeKind {
    New,
    ReuseDeleted,
    ReuseMerged,
    Delete,
    Merge,
    Absorb,
    ChangeName,
    ChangeRank,
    ChangeLinLin,
    ChangeLinTax,
    ChangeLinLen,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::New => "NEW",
            ChangeKind::ReuseDeleted => "REUSE_DELETED",
            ChangeKind::ReuseMerged => "REUSE_MERGED",
            ChangeKind::Delete => "DELETE",
            ChangeKind::Merge => "MERGE",
            ChangeKind::Absorb => "ABSORB",
            ChangeKind::ChangeName => "CHANGE_NAME",
            ChangeKind::ChangeRank => "CHANGE_RANK",
            ChangeKind::ChangeLinLin => "CHANGE_LIN_LIN",
            ChangeKind::ChangeLinTax => "CHANGE_LIN_TAX",
            ChangeKind::ChangeLinLen => "CHANGE_LIN_LEN",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lineage names and taxids of a taxon at one version, root excluded,
/// the taxon itself last
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageSnapshot {
    pub names: Vec<String>,
    pub taxids: Vec<TaxonId>,
}

impl From<&LineagePath> for LineageSnapshot {
    fn from(path: &LineagePath) -> Self {
        Self {
            names: path.nodes.iter().map(|n| n.name.clone()).collect(),
            taxids: path.taxids(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub taxid: TaxonId,
    pub version_index: usize,
    pub version: String,
    pub kind: ChangeKind,
    pub change_value: Vec<TaxonId>,
    pub name: String,
    pub rank: String,
    pub lineage: Option<LineageSnapshot>,
}

/// Everything known about a live taxon in the snapshot being ingested
struct Current {
    name: String,
    rank: String,
    lineage: LineageSnapshot,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    taxid: u32,
    version: &'a str,
    change: &'static str,
    #[serde(rename = "change-value")]
    change_value: String,
    name: &'a str,
    rank: &'a str,
    lineage: String,
    #[serde(rename = "lineage-taxids")]
    lineage_taxids: String,
}

fn join_ids(ids: &[TaxonId]) -> String {
    ids.iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// Append-only per-taxid event log
#[derive(Debug, Default)]
pub struct ChangelogEngine {
    histories: HashMap<TaxonId, Vec<ChangeEvent>>,
    versions: Vec<String>,
}

impl ChangelogEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    pub fn history(&self, taxid: TaxonId) -> &[ChangeEvent] {
        self.histories
            .get(&taxid)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn taxid_count(&self) -> usize {
        self.histories.len()
    }

    /// Ingest the next snapshot, returning the events it produced ordered by
    /// taxid then kind
    pub fn ingest(&mut self, version: &str, store: &TaxonomyStore) -> TaxkitResult<Vec<ChangeEvent>> {
        let version_index = self.versions.len();
        self.versions.push(version.to_string());

        let current = snapshot_lineages(store)?;
        let mut pending: BTreeMap<TaxonId, Vec<ChangeEvent>> = BTreeMap::new();

        let event = |taxid: TaxonId,
                     kind: ChangeKind,
                     change_value: Vec<TaxonId>,
                     name: &str,
                     rank: &str,
                     lineage: Option<LineageSnapshot>| ChangeEvent {
            taxid,
            version_index,
            version: version.to_string(),
            kind,
            change_value,
            name: name.to_string(),
            rank: rank.to_string(),
            lineage,
        };

        for (&taxid, cur) in &current {
            let live = |kind: ChangeKind| {
                event(taxid, kind, vec![], &cur.name, &cur.rank, Some(cur.lineage.clone()))
            };
            let mut events = Vec::new();

            match self.history(taxid).last() {
                None => events.push(live(ChangeKind::New)),
                Some(last) if last.kind == ChangeKind::Delete => {
                    events.push(live(ChangeKind::ReuseDeleted))
                }
                Some(last) if last.kind == ChangeKind::Merge => {
                    events.push(live(ChangeKind::ReuseMerged))
                }
                Some(ChangeEvent { lineage: None, .. }) => events.push(live(ChangeKind::ReuseMerged)),
                Some(ChangeEvent {
                    lineage: Some(prev),
                    name,
                    rank,
                    ..
                }) => {
                    if *name != cur.name {
                        events.push(live(ChangeKind::ChangeName));
                    }
                    if *rank != cur.rank {
                        events.push(live(ChangeKind::ChangeRank));
                    }
                    if let Some(kind) = compare_lineages(prev, &cur.lineage) {
                        events.push(live(kind));
                    }
                }
            }

            if !events.is_empty() {
                pending.insert(taxid, events);
            }
        }

        let mut deleted: Vec<TaxonId> = store.deleted().collect();
        deleted.sort_unstable();
        for taxid in deleted {
            let last_kind = self.last_kind(taxid, &pending);
            if last_kind == Some(ChangeKind::Delete) {
                continue;
            }
            let (name, rank, lineage) = self.last_described(taxid, &pending);
            let ev = event(taxid, ChangeKind::Delete, vec![], &name, &rank, lineage);
            pending.entry(taxid).or_default().push(ev);
        }

        let mut merges: Vec<(TaxonId, TaxonId)> = store.merged().collect();
        merges.sort_unstable();
        for (from, to) in merges {
            let repeated = self
                .last_event(from, &pending)
                .map(|last| last.kind == ChangeKind::Merge && last.change_value.last() == Some(&to))
                .unwrap_or(false);
            if repeated {
                continue;
            }

            let (name, rank, lineage) = self.last_described(from, &pending);
            let ev = event(from, ChangeKind::Merge, vec![to], &name, &rank, lineage);
            pending.entry(from).or_default().push(ev);

            let target = pending.entry(to).or_default();
            match target.iter_mut().find(|e| e.kind == ChangeKind::Absorb) {
                Some(absorb) => absorb.change_value.push(from),
                None => {
                    let ev = match current.get(&to) {
                        Some(cur) => event(
                            to,
                            ChangeKind::Absorb,
                            vec![from],
                            &cur.name,
                            &cur.rank,
                            Some(cur.lineage.clone()),
                        ),
                        None => event(to, ChangeKind::Absorb, vec![from], "", "", None),
                    };
                    target.push(ev);
                }
            }
        }

        let mut produced = Vec::new();
        let mut count = 0usize;
        for (taxid, mut events) in pending {
            events.sort_by_key(|e| e.kind);
            count += events.len();
            produced.extend(events.iter().cloned());
            self.histories.entry(taxid).or_default().extend(events);
        }

        info!("{}: {} events, {} taxids tracked", version, count, self.histories.len());
        Ok(produced)
    }

    /// Load and ingest every version of an archive directory, oldest first
    pub fn ingest_archive(&mut self, archive: &Path) -> TaxkitResult<()> {
        let versions = discover_versions(archive)?;
        for (i, (version, paths)) in versions.iter().enumerate() {
            info!("Parsing archive ({}/{}): {}", i + 1, versions.len(), version);
            let store = TaxonomyStore::load(paths)?;
            self.ingest(version, &store)?;
        }
        Ok(())
    }

    fn last_event<'s>(
        &'s self,
        taxid: TaxonId,
        pending: &'s BTreeMap<TaxonId, Vec<ChangeEvent>>,
    ) -> Option<&'s ChangeEvent> {
        pending
            .get(&taxid)
            .and_then(|p| p.last())
            .or_else(|| self.history(taxid).last())
    }

    fn last_kind(&self, taxid: TaxonId, pending: &BTreeMap<TaxonId, Vec<ChangeEvent>>) -> Option<ChangeKind> {
        self.last_event(taxid, pending).map(|e| e.kind)
    }

    /// Name, rank and lineage of the most recent event carrying a lineage
    fn last_described(
        &self,
        taxid: TaxonId,
        pending: &BTreeMap<TaxonId, Vec<ChangeEvent>>,
    ) -> (String, String, Option<LineageSnapshot>) {
        let pending_events = pending.get(&taxid).map(Vec::as_slice).unwrap_or(&[]);
        self.history(taxid)
            .iter()
            .chain(pending_events)
            .rev()
            .find(|e| e.lineage.is_some())
            .map(|e| (e.name.clone(), e.rank.clone(), e.lineage.clone()))
            .unwrap_or_default()
    }

    /// Write every event as CSV, by taxid then chronologically
    pub fn write_csv<W: Write>(&self, out: W) -> TaxkitResult<usize> {
        let mut writer = csv::Writer::from_writer(out);
        let mut taxids: Vec<&TaxonId> = self.histories.keys().collect();
        taxids.sort_unstable();

        let mut rows = 0;
        for taxid in taxids {
            for e in &self.histories[taxid] {
                let (lineage, lineage_taxids) = match &e.lineage {
                    Some(l) => (l.names.join(";"), join_ids(&l.taxids)),
                    None => (String::new(), String::new()),
                };
                writer.serialize(CsvRow {
                    taxid: taxid.0,
                    version: &e.version,
                    change: e.kind.as_str(),
                    change_value: join_ids(&e.change_value),
                    name: &e.name,
                    rank: &e.rank,
                    lineage,
                    lineage_taxids,
                })?;
                rows += 1;
            }
        }
        writer.flush()?;
        Ok(rows)
    }
}

/// Classify how a lineage changed; `None` when it did not
fn compare_lineages(prev: &LineageSnapshot, cur: &LineageSnapshot) -> Option<ChangeKind> {
    if prev.taxids.len() != cur.taxids.len() {
        return Some(ChangeKind::ChangeLinLen);
    }
    if prev.taxids != cur.taxids {
        return Some(ChangeKind::ChangeLinTax);
    }
    // Ancestors only; the taxon's own name is tracked by CHANGE_NAME
    let n = prev.names.len().saturating_sub(1);
    if prev.names[..n] != cur.names[..n] {
        return Some(ChangeKind::ChangeLinLin);
    }
    None
}

fn snapshot_lineages(store: &TaxonomyStore) -> TaxkitResult<BTreeMap<TaxonId, Current>> {
    let walker = AncestryWalker::new(store);
    let mut taxids: Vec<TaxonId> = store.taxids().collect();
    taxids.sort_unstable();

    let lineages: Vec<TaxkitResult<(TaxonId, Current)>> = taxids
        .par_iter()
        .map(|&taxid| {
            let path = walker.lineage(taxid)?;
            Ok((
                taxid,
                Current {
                    name: store.name(taxid).unwrap_or_default().to_string(),
                    rank: store.rank(taxid).unwrap_or_default().to_string(),
                    lineage: LineageSnapshot::from(&path),
                },
            ))
        })
        .collect();

    let current = lineages.into_iter().collect::<TaxkitResult<BTreeMap<_, _>>>()?;
    debug!("{} lineages computed", current.len());
    Ok(current)
}

/// Versions of an archive: every non-hidden sub-directory, sorted by name,
/// each holding all four dump tables
pub fn discover_versions(archive: &Path) -> TaxkitResult<Vec<(String, DumpPaths)>> {
    if !archive.is_dir() {
        return Err(TaxkitError::InvalidInput(format!(
            "archive path should be a directory: {}",
            archive.display()
        )));
    }

    let mut versions = Vec::new();
    for entry in std::fs::read_dir(archive)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || !entry.file_type()?.is_dir() {
            continue;
        }
        let paths = DumpPaths::from_dir(entry.path());
        paths.require_all()?;
        versions.push((name, paths));
    }

    if versions.is_empty() {
        return Err(TaxkitError::InvalidInput(format!(
            "no version directories found in {}",
            archive.display()
        )));
    }
    versions.sort_by(|a, b| a.0.cmp(&b.0));
    info!("{} versions found in {}", versions.len(), archive.display());
    Ok(versions)
}
