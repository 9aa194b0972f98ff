//! Taxonomy synthesis from ranked tables
//!
//! Custom classifications (GTDB, ICTV, in-house tables) carry names but no
//! stable numeric ids. Each `(rank, name)` is hashed into a 31-bit taxid:
//!
//! ```text
//! candidate = xxh64(rank + lowercase(name)) & 0x7FFF_FFFF    (0 and 1 bump to 2)
//! ```
//!
//! A taxon's identity is `(level, name, parent taxid)`. Levels are bound from
//! the coarsest to the finest so the parent id is always known. A candidate
//! already bound to another identity is probed linearly (`+1`, skipping 0 and
//! 1) up to a configured number of probes. Presenting the same identity again
//! returns the id it got the first time.

use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Write};
use std::path::Path;

use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, info, warn};
use xxhash_rust::xxh64::xxh64;

use crate::error::{TaxkitError, TaxkitResult};
use crate::taxonomy::dump;
use crate::taxonomy::reconcile::Reconciliation;
use crate::taxonomy::store::TaxonomyStore;
use crate::taxonomy::types::{Taxon, TaxonId};
use crate::utils::io::open_output;

/// Number of rank levels in a synthesis row
pub const LEVELS: usize = 8;
/// Index of the species level, the only mandatory column
pub const SPECIES_LEVEL: usize = 6;

pub const DEFAULT_MAX_PROBES: u32 = 4096;
pub const DEFAULT_ACCESSION_PATTERN: &str = r"^\w\w_(.+)$";
pub const GTDB_SUBSPECIES_PATTERN: &str = r"^\w\w_GC[AF]_(.+)\.\d+$";
pub const TAXID_MAP_FILE: &str = "taxid.map";

const ID_MASK: u32 = 0x7FFF_FFFF;
const GTDB_PREFIXES: [&str; 7] = ["d__", "p__", "c__", "o__", "f__", "g__", "s__"];

pub type HashFn = fn(&str) -> u64;

pub fn default_hash(key: &str) -> u64 {
    xxh64(key.as_bytes(), 0)
}

pub fn default_rank_names() -> Vec<String> {
    [
        "superkingdom",
        "phylum",
        "class",
        "order",
        "family",
        "genus",
        "species",
        "strain",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// One classified row: a name per level (coarsest first) and an optional
/// accession attached to the finest present level
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonRow {
    pub accession: Option<String>,
    pub names: [Option<String>; LEVELS],
}

impl TaxonRow {
    pub fn new(names: [Option<String>; LEVELS]) -> Self {
        Self {
            accession: None,
            names,
        }
    }

    pub fn with_accession(mut self, accession: impl Into<String>) -> Self {
        self.accession = Some(accession.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Identity {
    level: usize,
    name: String,
    parent: TaxonId,
}

/// Assigns stable taxids to `(rank, name)` pairs
pub struct IdentitySynthesizer {
    rank_names: Vec<String>,
    max_probes: u32,
    hasher: HashFn,
    slots: HashMap<TaxonId, Identity>,
    assigned: HashMap<Identity, TaxonId>,
    accessions: IndexMap<String, Vec<TaxonId>>,
    reassigned: usize,
}

impl IdentitySynthesizer {
    pub fn new(rank_names: Vec<String>, max_probes: u32) -> TaxkitResult<Self> {
        Self::with_hasher(rank_names, max_probes, default_hash)
    }

    /// Same as [`IdentitySynthesizer::new`] with a custom hash function
    pub fn with_hasher(
        rank_names: Vec<String>,
        max_probes: u32,
        hasher: HashFn,
    ) -> TaxkitResult<Self> {
        if rank_names.len() != LEVELS {
            return Err(TaxkitError::Configuration(format!(
                "exactly {} rank names are needed, got {}",
                LEVELS,
                rank_names.len()
            )));
        }
        if max_probes == 0 {
            return Err(TaxkitError::Configuration(
                "max_probes must be positive".to_string(),
            ));
        }
        Ok(Self {
            rank_names,
            max_probes,
            hasher,
            slots: HashMap::new(),
            assigned: HashMap::new(),
            accessions: IndexMap::new(),
            reassigned: 0,
        })
    }

    /// Initial, unprobed taxid for a name at a level
    pub fn candidate(&self, level: usize, name: &str) -> TaxonId {
        let key = format!("{}{}", self.rank_names[level], name.to_lowercase());
        let id = ((self.hasher)(&key) as u32) & ID_MASK;
        if id <= TaxonId::ROOT.0 {
            TaxonId(2)
        } else {
            TaxonId(id)
        }
    }

    /// Taxid for `name` at `level` under `parent`
    pub fn assign(&mut self, level: usize, name: &str, parent: TaxonId) -> TaxkitResult<TaxonId> {
        let identity = Identity {
            level,
            name: name.to_string(),
            parent,
        };
        if let Some(&taxid) = self.assigned.get(&identity) {
            return Ok(taxid);
        }

        let mut taxid = self.candidate(level, name);
        for probe in 0..self.max_probes {
            match self.slots.get(&taxid) {
                None => {
                    if probe > 0 {
                        self.reassigned += 1;
                    }
                    self.slots.insert(taxid, identity.clone());
                    self.assigned.insert(identity, taxid);
                    return Ok(taxid);
                }
                Some(bound) => {
                    debug!(
                        "Taxid {} is taken by {} \"{}\" (parent {}), probing for {} \"{}\"",
                        taxid,
                        self.rank_names[bound.level],
                        bound.name,
                        bound.parent,
                        self.rank_names[level],
                        name
                    );
                    taxid = next_candidate(taxid);
                }
            }
        }

        Err(TaxkitError::CollisionExhausted {
            rank: self.rank_names[level].clone(),
            name: name.to_string(),
            probes: self.max_probes,
        })
    }

    /// Bind every present level of `row`, returning the finest taxid
    pub fn assign_row(&mut self, row: &TaxonRow) -> TaxkitResult<Option<TaxonId>> {
        let mut parent = TaxonId::ROOT;
        let mut finest = None;
        for (level, name) in row.names.iter().enumerate() {
            let name = match name.as_deref() {
                Some(n) if !n.is_empty() => n,
                _ => continue,
            };
            let taxid = self.assign(level, name, parent)?;
            parent = taxid;
            finest = Some(taxid);
        }

        match (finest, row.accession.as_ref()) {
            (Some(taxid), Some(acc)) => {
                let ids = self.accessions.entry(acc.clone()).or_default();
                if !ids.contains(&taxid) {
                    ids.push(taxid);
                }
            }
            (None, _) => warn!("Skipping a row with no taxon names"),
            _ => {}
        }
        Ok(finest)
    }

    /// Number of identities that needed more than one probe
    pub fn reassigned(&self) -> usize {
        self.reassigned
    }

    pub fn finish(self) -> SynthesizedTaxonomy {
        let mut taxa: Vec<Taxon> = Vec::with_capacity(self.slots.len() + 1);
        taxa.push(Taxon {
            taxid: TaxonId::ROOT,
            parent: TaxonId::ROOT,
            rank: "no rank".to_string(),
            name: "root".to_string(),
        });
        let ordered: BTreeMap<TaxonId, Identity> = self.slots.into_iter().collect();
        for (taxid, identity) in ordered {
            taxa.push(Taxon {
                taxid,
                parent: identity.parent,
                rank: self.rank_names[identity.level].clone(),
                name: identity.name,
            });
        }

        if self.reassigned > 0 {
            info!("{} taxa were given a probed taxid", self.reassigned);
        }

        SynthesizedTaxonomy {
            taxa,
            accessions: self.accessions,
        }
    }
}

fn next_candidate(taxid: TaxonId) -> TaxonId {
    let next = (taxid.0 + 1) & ID_MASK;
    if next <= TaxonId::ROOT.0 {
        TaxonId(2)
    } else {
        TaxonId(next)
    }
}

/// Output of a synthesis run, sorted by taxid with the root first
#[derive(Debug, Clone)]
pub struct SynthesizedTaxonomy {
    pub taxa: Vec<Taxon>,
    pub accessions: IndexMap<String, Vec<TaxonId>>,
}

impl SynthesizedTaxonomy {
    pub fn to_store(&self) -> TaxkitResult<TaxonomyStore> {
        TaxonomyStore::from_taxa(self.taxa.iter().cloned(), Vec::new(), Default::default())
    }

    /// Write nodes/names/merged/delnodes tables and `taxid.map` into `dir`
    pub fn write_taxdump(&self, dir: &Path, diff: Option<&Reconciliation>) -> TaxkitResult<()> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join(dump::NODES_FILE);
        let mut out = open_output(&path)?;
        let n = dump::write_nodes(&mut out, &self.taxa)?;
        out.flush()?;
        info!("{} records saved to {}", n, path.display());

        let path = dir.join(dump::NAMES_FILE);
        let mut out = open_output(&path)?;
        let n = dump::write_names(&mut out, &self.taxa)?;
        out.flush()?;
        info!("{} records saved to {}", n, path.display());

        let path = dir.join(dump::MERGED_FILE);
        let mut out = open_output(&path)?;
        let merged = diff.map(|d| d.merged.clone()).unwrap_or_default();
        let n = dump::write_merged(&mut out, merged)?;
        out.flush()?;
        info!("{} records saved to {}", n, path.display());

        let path = dir.join(dump::DELNODES_FILE);
        let mut out = open_output(&path)?;
        let deleted = diff
            .map(|d| d.deleted.iter().rev().copied().collect::<Vec<_>>())
            .unwrap_or_default();
        let n = dump::write_delnodes(&mut out, deleted)?;
        out.flush()?;
        info!("{} records saved to {}", n, path.display());

        if !self.accessions.is_empty() {
            let path = dir.join(TAXID_MAP_FILE);
            let mut out = open_output(&path)?;
            for (acc, ids) in &self.accessions {
                let ids: Vec<String> = ids.iter().map(|t| t.to_string()).collect();
                writeln!(out, "{}\t{}", acc, ids.join(","))?;
            }
            out.flush()?;
            info!("{} records saved to {}", self.accessions.len(), path.display());
        }

        Ok(())
    }
}

/// Column layout of a tab-delimited classification table (1-based fields)
#[derive(Debug, Clone)]
pub struct TableLayout {
    pub fields: [Option<usize>; LEVELS],
    pub accession_field: Option<usize>,
    pub accession_pattern: Option<Regex>,
    pub null_values: Vec<String>,
}

impl TableLayout {
    pub fn new(
        fields: [Option<usize>; LEVELS],
        accession_field: Option<usize>,
        accession_pattern: Option<&str>,
        null_values: Vec<String>,
    ) -> TaxkitResult<Self> {
        if fields[SPECIES_LEVEL].is_none() {
            return Err(TaxkitError::Configuration(
                "the species field is required".to_string(),
            ));
        }
        if fields.iter().chain([&accession_field]).any(|f| *f == Some(0)) {
            return Err(TaxkitError::Configuration(
                "field indices start at 1".to_string(),
            ));
        }
        let accession_pattern = accession_pattern.map(compile_capture).transpose()?;
        Ok(Self {
            fields,
            accession_field,
            accession_pattern,
            null_values,
        })
    }

    fn width(&self) -> usize {
        self.fields
            .iter()
            .chain([&self.accession_field])
            .filter_map(|f| *f)
            .max()
            .unwrap_or(0)
    }
}

fn compile_capture(pattern: &str) -> TaxkitResult<Regex> {
    let re = Regex::new(pattern).map_err(|e| {
        TaxkitError::Configuration(format!("invalid regular expression {:?}: {}", pattern, e))
    })?;
    if re.captures_len() < 2 {
        return Err(TaxkitError::Configuration(format!(
            "regular expression {:?} needs a capture group",
            pattern
        )));
    }
    Ok(re)
}

/// First capture group of `re` in `value`, or `None` when it does not match
fn capture(re: &Regex, value: &str) -> Option<String> {
    re.captures(value)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Captured value, or the raw value when the pattern does not match (the
/// first such value is kept in `example`)
fn capture_or_raw(re: &Regex, raw: &str, example: &mut Option<String>) -> String {
    match capture(re, raw) {
        Some(v) => v,
        None => {
            if example.is_none() {
                *example = Some(raw.to_string());
            }
            raw.to_string()
        }
    }
}

/// How input rows are laid out
#[derive(Debug, Clone)]
pub enum RowFormat {
    Table(TableLayout),
    /// `accession<TAB>d__...;p__...;c__...;o__...;f__...;g__...;s__...`
    Gtdb {
        accession_pattern: Regex,
        subspecies_pattern: Regex,
    },
}

impl RowFormat {
    pub fn gtdb(accession_pattern: &str, subspecies_pattern: &str) -> TaxkitResult<Self> {
        Ok(RowFormat::Gtdb {
            accession_pattern: compile_capture(accession_pattern)?,
            subspecies_pattern: compile_capture(subspecies_pattern)?,
        })
    }
}

/// Turns text lines into [`TaxonRow`]s, remembering accessions the pattern
/// could not capture
pub struct RowParser {
    format: RowFormat,
    uncaptured: Option<String>,
    skipped: usize,
}

impl RowParser {
    pub fn new(format: RowFormat) -> Self {
        Self {
            format,
            uncaptured: None,
            skipped: 0,
        }
    }

    /// `None` for blank lines and rows too short for the layout
    pub fn parse_line(
        &mut self,
        line: &str,
        origin: &Path,
        line_no: usize,
    ) -> TaxkitResult<Option<TaxonRow>> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Ok(None);
        }
        let items: Vec<&str> = line.split('\t').collect();

        match &self.format {
            RowFormat::Table(layout) => {
                if items.len() < layout.width() {
                    self.skipped += 1;
                    return Ok(None);
                }
                let mut row = TaxonRow::default();
                for (level, field) in layout.fields.iter().enumerate() {
                    if let Some(f) = field {
                        let value = items[f - 1];
                        if !layout.null_values.iter().any(|n| n == value) {
                            row.names[level] = Some(value.to_string());
                        }
                    }
                }
                if let Some(f) = layout.accession_field {
                    let raw = items[f - 1];
                    let acc = match &layout.accession_pattern {
                        Some(re) => capture_or_raw(re, raw, &mut self.uncaptured),
                        None => raw.to_string(),
                    };
                    row.accession = Some(acc);
                }
                Ok(Some(row))
            }
            RowFormat::Gtdb {
                accession_pattern,
                subspecies_pattern,
            } => {
                if items.len() < 2 {
                    self.skipped += 1;
                    return Ok(None);
                }
                let raw = items[0];
                let parts: Vec<&str> = items[1].split(';').collect();
                if parts.len() < GTDB_PREFIXES.len() {
                    return Err(TaxkitError::malformed(
                        origin,
                        line_no,
                        format!("invalid GTDB taxonomy record: {}", items[1]),
                    ));
                }

                let mut row = TaxonRow::default();
                let mut prev = "";
                for (level, prefix) in GTDB_PREFIXES.iter().enumerate() {
                    let value = parts[level].trim();
                    let name = value.strip_prefix(prefix).ok_or_else(|| {
                        TaxkitError::malformed(
                            origin,
                            line_no,
                            format!("expected {} prefix, got {:?}", prefix, value),
                        )
                    })?;
                    // Missing levels repeat the parent name
                    if level == 0 || name != prev {
                        row.names[level] = Some(name.to_string());
                    }
                    prev = name;
                }
                row.names[LEVELS - 1] =
                    Some(capture_or_raw(subspecies_pattern, raw, &mut self.uncaptured));
                row.accession = Some(capture_or_raw(accession_pattern, raw, &mut self.uncaptured));
                Ok(Some(row))
            }
        }
    }

    /// Read all rows of one input
    pub fn read_rows<R: BufRead>(&mut self, reader: R, origin: &Path) -> TaxkitResult<Vec<TaxonRow>> {
        let mut rows = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if let Some(row) = self.parse_line(&line, origin, idx + 1)? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Log a summary of rows that could not be parsed cleanly
    pub fn report(&self) {
        if let Some(example) = &self.uncaptured {
            warn!(
                "Accession pattern failed to capture some values, the original value was used instead, e.g. {}",
                example
            );
        }
        if self.skipped > 0 {
            warn!("{} rows with too few fields were skipped", self.skipped);
        }
    }
}
