pub mod changelog;
pub mod create_taxdump;
pub mod filter;
pub mod lca;
pub mod lineage;
pub mod list;
pub mod name2taxid;

use anyhow::{bail, Context as _};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::warn;

use crate::taxonomy::types::TaxonId;
use crate::utils::io::open_input;
use crate::utils::parallel::ordered_batches;

/// 1-based tab-delimited field of a line
pub(crate) fn field(line: &str, index: usize) -> Option<&str> {
    line.split('\t').nth(index.checked_sub(1)?)
}

pub(crate) fn check_field(index: usize) -> anyhow::Result<()> {
    if index == 0 {
        bail!("field index should be positive");
    }
    Ok(())
}

/// Taxid in field `index`, warning when it is missing or not a number
pub(crate) fn taxid_field(line: &str, index: usize) -> Option<TaxonId> {
    match field(line, index).map(str::parse::<TaxonId>) {
        Some(Ok(taxid)) => Some(taxid),
        Some(Err(e)) => {
            warn!("{}", e);
            None
        }
        None => {
            warn!("Line has no field {}: {:?}", index, line);
            None
        }
    }
}

/// Map every non-empty input line through `f` in parallel batches and write
/// the results in input order; `None` drops the line
pub(crate) fn map_lines<F>(
    inputs: &[PathBuf],
    batch_size: usize,
    out: &mut dyn Write,
    f: F,
) -> anyhow::Result<usize>
where
    F: Fn(&str) -> Option<String> + Sync,
{
    let batch_size = batch_size.max(1);
    let mut written = 0;
    for path in inputs {
        let reader =
            open_input(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut lines = reader.lines();
        loop {
            let batch = lines
                .by_ref()
                .take(batch_size)
                .collect::<Result<Vec<String>, _>>()
                .with_context(|| format!("Failed to read {}", path.display()))?;
            if batch.is_empty() {
                break;
            }
            ordered_batches(
                &batch,
                batch_size,
                |line| {
                    let line = line.trim_end_matches('\r');
                    if line.is_empty() {
                        None
                    } else {
                        f(line)
                    }
                },
                |_, result| {
                    if let Some(text) = result {
                        writeln!(out, "{}", text)?;
                        written += 1;
                    }
                    Ok(())
                },
            )?;
        }
    }
    out.flush()?;
    Ok(written)
}
