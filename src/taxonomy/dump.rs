//! NCBI taxdump table parsing and writing
//!
//! Records are pipe-delimited, usually `\t|\t` with a trailing `\t|`:
//!
//! ```text
//! nodes.dmp     taxid | parent taxid | rank | ...
//! names.dmp     taxid | name | unique name | name class |
//! merged.dmp    old taxid | new taxid |
//! delnodes.dmp  taxid |
//! ```
//!
//! Every reader fails on the first malformed record. A table is either parsed
//! completely or not at all.

use std::collections::{HashMap, HashSet};
use std::io::{BufRead, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{TaxkitError, TaxkitResult};
use crate::taxonomy::types::{TaxonId, Taxon};
use crate::utils::io::open_input;

pub const NODES_FILE: &str = "nodes.dmp";
pub const NAMES_FILE: &str = "names.dmp";
pub const MERGED_FILE: &str = "merged.dmp";
pub const DELNODES_FILE: &str = "delnodes.dmp";

const SCIENTIFIC_NAME: &str = "scientific name";

/// One parsed nodes.dmp record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub taxid: TaxonId,
    pub parent: TaxonId,
    pub rank: String,
}

/// Split a record into trimmed fields, dropping the empty tail after the
/// closing `|`
pub fn split_fields(line: &str) -> Vec<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields: Vec<&str> = line.split('|').map(|f| f.trim()).collect();
    if line.trim_end().ends_with('|') {
        fields.pop();
    }
    fields
}

fn parse_taxid(field: &str, what: &str, file: &Path, line_no: usize) -> TaxkitResult<TaxonId> {
    field
        .parse::<u32>()
        .map(TaxonId)
        .map_err(|_| TaxkitError::malformed(file, line_no, format!("non-numeric {}: {:?}", what, field)))
}

fn require_fields(
    fields: &[&str],
    min: usize,
    file: &Path,
    line_no: usize,
) -> TaxkitResult<()> {
    if fields.len() < min {
        return Err(TaxkitError::malformed(
            file,
            line_no,
            format!("expected at least {} fields, got {}", min, fields.len()),
        ));
    }
    Ok(())
}

pub fn parse_node_line(line: &str, file: &Path, line_no: usize) -> TaxkitResult<NodeRecord> {
    let fields = split_fields(line);
    require_fields(&fields, 3, file, line_no)?;

    Ok(NodeRecord {
        taxid: parse_taxid(fields[0], "taxid", file, line_no)?,
        parent: parse_taxid(fields[1], "parent taxid", file, line_no)?,
        rank: fields[2].to_lowercase(),
    })
}

/// Returns `None` for names of any class other than "scientific name"
pub fn parse_name_line(
    line: &str,
    file: &Path,
    line_no: usize,
) -> TaxkitResult<Option<(TaxonId, String)>> {
    let fields = split_fields(line);
    require_fields(&fields, 4, file, line_no)?;

    let taxid = parse_taxid(fields[0], "taxid", file, line_no)?;
    if fields[3] != SCIENTIFIC_NAME {
        return Ok(None);
    }
    Ok(Some((taxid, fields[1].to_string())))
}

pub fn parse_merged_line(
    line: &str,
    file: &Path,
    line_no: usize,
) -> TaxkitResult<(TaxonId, TaxonId)> {
    let fields = split_fields(line);
    require_fields(&fields, 2, file, line_no)?;

    Ok((
        parse_taxid(fields[0], "old taxid", file, line_no)?,
        parse_taxid(fields[1], "new taxid", file, line_no)?,
    ))
}

pub fn parse_delnode_line(line: &str, file: &Path, line_no: usize) -> TaxkitResult<TaxonId> {
    let fields = split_fields(line);
    require_fields(&fields, 1, file, line_no)?;
    parse_taxid(fields[0], "taxid", file, line_no)
}

/// Feed every non-blank line of a table to `f`, with 1-based line numbers
fn for_each_record<R, F>(reader: R, mut f: F) -> TaxkitResult<()>
where
    R: BufRead,
    F: FnMut(&str, usize) -> TaxkitResult<()>,
{
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        f(&line, idx + 1)?;
    }
    Ok(())
}

pub fn parse_nodes<R: BufRead>(reader: R, origin: &Path) -> TaxkitResult<Vec<NodeRecord>> {
    let mut nodes = Vec::new();
    for_each_record(reader, |line, line_no| {
        nodes.push(parse_node_line(line, origin, line_no)?);
        Ok(())
    })?;
    Ok(nodes)
}

pub fn parse_names<R: BufRead>(reader: R, origin: &Path) -> TaxkitResult<HashMap<TaxonId, String>> {
    let mut names = HashMap::new();
    for_each_record(reader, |line, line_no| {
        if let Some((taxid, name)) = parse_name_line(line, origin, line_no)? {
            names.insert(taxid, name);
        }
        Ok(())
    })?;
    Ok(names)
}

pub fn parse_merged<R: BufRead>(
    reader: R,
    origin: &Path,
) -> TaxkitResult<Vec<(TaxonId, TaxonId)>> {
    let mut merged = Vec::new();
    for_each_record(reader, |line, line_no| {
        merged.push(parse_merged_line(line, origin, line_no)?);
        Ok(())
    })?;
    Ok(merged)
}

pub fn parse_delnodes<R: BufRead>(reader: R, origin: &Path) -> TaxkitResult<HashSet<TaxonId>> {
    let mut deleted = HashSet::new();
    for_each_record(reader, |line, line_no| {
        deleted.insert(parse_delnode_line(line, origin, line_no)?);
        Ok(())
    })?;
    Ok(deleted)
}

pub fn read_nodes(path: &Path) -> TaxkitResult<Vec<NodeRecord>> {
    let nodes = parse_nodes(open_input(path)?, path)?;
    debug!("{} nodes parsed from {}", nodes.len(), path.display());
    Ok(nodes)
}

pub fn read_names(path: &Path) -> TaxkitResult<HashMap<TaxonId, String>> {
    let names = parse_names(open_input(path)?, path)?;
    debug!("{} scientific names parsed from {}", names.len(), path.display());
    Ok(names)
}

pub fn read_merged(path: &Path) -> TaxkitResult<Vec<(TaxonId, TaxonId)>> {
    let merged = parse_merged(open_input(path)?, path)?;
    debug!("{} merged taxids parsed from {}", merged.len(), path.display());
    Ok(merged)
}

pub fn read_delnodes(path: &Path) -> TaxkitResult<HashSet<TaxonId>> {
    let deleted = parse_delnodes(open_input(path)?, path)?;
    debug!("{} deleted taxids parsed from {}", deleted.len(), path.display());
    Ok(deleted)
}

pub fn write_nodes<'a, W, I>(out: &mut W, taxa: I) -> TaxkitResult<usize>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = &'a Taxon>,
{
    let mut n = 0;
    for t in taxa {
        writeln!(
            out,
            "{}\t|\t{}\t|\t{}\t|\t\t|\t0\t|\t1\t|\t11\t|\t1\t|\t0\t|\t1\t|\t1\t|\t0\t|\t\t|",
            t.taxid, t.parent, t.rank
        )?;
        n += 1;
    }
    Ok(n)
}

pub fn write_names<'a, W, I>(out: &mut W, taxa: I) -> TaxkitResult<usize>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = &'a Taxon>,
{
    let mut n = 0;
    for t in taxa {
        writeln!(out, "{}\t|\t{}\t|\t\t|\t{}\t|", t.taxid, t.name, SCIENTIFIC_NAME)?;
        n += 1;
    }
    Ok(n)
}

pub fn write_merged<W, I>(out: &mut W, merged: I) -> TaxkitResult<usize>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = (TaxonId, TaxonId)>,
{
    let mut n = 0;
    for (from, to) in merged {
        writeln!(out, "{}\t|\t{}\t|", from, to)?;
        n += 1;
    }
    Ok(n)
}

pub fn write_delnodes<W, I>(out: &mut W, deleted: I) -> TaxkitResult<usize>
where
    W: Write + ?Sized,
    I: IntoIterator<Item = TaxonId>,
{
    let mut n = 0;
    for taxid in deleted {
        writeln!(out, "{}\t|", taxid)?;
        n += 1;
    }
    Ok(n)
}
