use clap::Args;
use std::path::PathBuf;

use super::{check_field, map_lines, taxid_field};
use crate::cli::Context;
use crate::taxonomy::lineage::{log_miss, AncestryWalker};
use crate::taxonomy::types::Resolution;

#[derive(Args)]
pub struct LineageArgs {
    /// Input files with one taxid per line ("-" for stdin)
    #[arg(value_name = "FILE", default_value = "-")]
    pub input: Vec<PathBuf>,

    /// Field holding the taxid (1-based)
    #[arg(short = 'i', long, default_value = "1")]
    pub taxid_field: usize,

    /// Separator between lineage elements
    #[arg(short = 'd', long, default_value = ";")]
    pub delimiter: String,

    /// Append the scientific name
    #[arg(short = 'n', long)]
    pub show_name: bool,

    /// Append the rank
    #[arg(short = 'r', long)]
    pub show_rank: bool,

    /// Append the taxids of the lineage
    #[arg(short = 't', long)]
    pub show_lineage_taxids: bool,

    /// Append the ranks of the lineage
    #[arg(short = 'R', long)]
    pub show_lineage_ranks: bool,

    /// Do not print the lineage itself
    #[arg(short = 'L', long)]
    pub no_lineage: bool,

    /// Append a status code: -1 not found, 0 deleted, the new taxid when merged
    #[arg(short = 'c', long)]
    pub show_status_code: bool,
}

pub fn run(args: LineageArgs, ctx: &Context) -> anyhow::Result<()> {
    check_field(args.taxid_field)?;
    let store = ctx.load_store()?;
    let walker = AncestryWalker::new(&store);
    let mut out = ctx.output()?;

    // Empty columns keep unresolved lines aligned with resolved ones
    let padding = [
        !args.no_lineage,
        args.show_lineage_taxids,
        args.show_name,
        args.show_rank,
        args.show_lineage_ranks,
    ]
    .iter()
    .filter(|&&on| on)
    .count();

    map_lines(&args.input, ctx.batch_size(), &mut out, |line| {
        let mut fields = vec![line.to_string()];
        let Some(taxid) = taxid_field(line, args.taxid_field) else {
            if args.show_status_code {
                fields.push("-1".to_string());
            }
            fields.extend(std::iter::repeat(String::new()).take(padding));
            return Some(fields.join("\t"));
        };

        if args.show_status_code {
            let code = match store.resolve(taxid) {
                Resolution::Live(t) | Resolution::Merged { to: t, .. } => t.to_string(),
                Resolution::Deleted(_) => "0".to_string(),
                Resolution::Unknown(_) => "-1".to_string(),
            };
            fields.push(code);
        }

        match walker.lineage(taxid) {
            Ok(path) => {
                let leaf = path.nodes.last();
                if !args.no_lineage {
                    fields.push(path.names().join(&args.delimiter));
                }
                if args.show_lineage_taxids {
                    let taxids: Vec<String> = path.taxids().iter().map(|t| t.to_string()).collect();
                    fields.push(taxids.join(&args.delimiter));
                }
                if args.show_name {
                    fields.push(leaf.map(|n| n.name.clone()).unwrap_or_default());
                }
                if args.show_rank {
                    fields.push(leaf.map(|n| n.rank.clone()).unwrap_or_default());
                }
                if args.show_lineage_ranks {
                    fields.push(path.ranks().join(&args.delimiter));
                }
            }
            Err(e) => {
                log_miss(taxid, &e);
                fields.extend(std::iter::repeat(String::new()).take(padding));
            }
        }
        Some(fields.join("\t"))
    })?;
    Ok(())
}
