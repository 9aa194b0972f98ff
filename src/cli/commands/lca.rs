use clap::Args;
use std::path::PathBuf;
use tracing::warn;

use super::{check_field, field, map_lines};
use crate::cli::Context;
use crate::taxonomy::lca::LcaCache;
use crate::taxonomy::types::{Resolution, TaxonId};

#[derive(Args)]
pub struct LcaArgs {
    /// Input files, each line holding a group of taxids ("-" for stdin)
    #[arg(value_name = "FILE", default_value = "-")]
    pub input: Vec<PathBuf>,

    /// Field holding the taxids (1-based)
    #[arg(short = 'i', long, default_value = "1")]
    pub taxids_field: usize,

    /// Separator between taxids
    #[arg(short = 's', long, default_value = " ")]
    pub separator: String,

    /// Ignore deleted taxids and compute with the rest
    #[arg(short = 'D', long)]
    pub skip_deleted: bool,

    /// Ignore unknown taxids and compute with the rest
    #[arg(short = 'U', long)]
    pub skip_unfound: bool,
}

pub fn run(args: LcaArgs, ctx: &Context) -> anyhow::Result<()> {
    check_field(args.taxids_field)?;
    if args.separator.is_empty() {
        anyhow::bail!("separator should not be empty");
    }
    let store = ctx.load_store()?;
    let cache = LcaCache::new(&store);
    let mut out = ctx.output()?;

    map_lines(&args.input, ctx.batch_size(), &mut out, |line| {
        let mut taxids = Vec::new();
        for item in field(line, args.taxids_field)
            .unwrap_or_default()
            .split(args.separator.as_str())
            .filter(|s| !s.trim().is_empty())
        {
            let taxid = match item.parse::<TaxonId>() {
                Ok(t) => t,
                Err(e) => {
                    warn!("{}", e);
                    continue;
                }
            };
            match store.resolve(taxid) {
                Resolution::Deleted(_) if args.skip_deleted => continue,
                Resolution::Unknown(_) if args.skip_unfound => continue,
                _ => taxids.push(taxid),
            }
        }

        let lca = if taxids.is_empty() {
            TaxonId::UNCLASSIFIED
        } else {
            cache.lca(&taxids).unwrap_or_else(|e| {
                warn!("No LCA for {:?}: {}", line, e);
                TaxonId::UNCLASSIFIED
            })
        };
        Some(format!("{}\t{}", line, lca))
    })?;
    Ok(())
}
