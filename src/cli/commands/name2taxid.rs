use clap::Args;
use std::path::PathBuf;

use super::{check_field, field, map_lines};
use crate::cli::Context;
use crate::taxonomy::names::NameIndex;

#[derive(Args)]
pub struct Name2TaxidArgs {
    /// Input files with one scientific name per line ("-" for stdin)
    #[arg(value_name = "FILE", default_value = "-")]
    pub input: Vec<PathBuf>,

    /// Field holding the name (1-based)
    #[arg(short = 'i', long, default_value = "1")]
    pub name_field: usize,

    /// Append the rank
    #[arg(short = 'r', long)]
    pub show_rank: bool,
}

pub fn run(args: Name2TaxidArgs, ctx: &Context) -> anyhow::Result<()> {
    check_field(args.name_field)?;
    let store = ctx.load_store()?;
    let index = NameIndex::new(&store);
    let mut out = ctx.output()?;

    map_lines(&args.input, ctx.batch_size(), &mut out, |line| {
        let name = field(line, args.name_field).unwrap_or_default();
        let hits = index.lookup(name);
        if hits.is_empty() {
            let rank = if args.show_rank { "\t" } else { "" };
            return Some(format!("{}\t{}", line, rank));
        }
        // One output line per homonym
        let rows: Vec<String> = hits
            .iter()
            .map(|&taxid| {
                if args.show_rank {
                    format!("{}\t{}\t{}", line, taxid, store.rank(taxid).unwrap_or_default())
                } else {
                    format!("{}\t{}", line, taxid)
                }
            })
            .collect();
        Some(rows.join("\n"))
    })?;
    Ok(())
}
