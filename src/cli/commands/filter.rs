use clap::Args;
use std::io::Write;
use std::path::PathBuf;

use super::{check_field, map_lines, taxid_field};
use crate::cli::Context;
use crate::taxonomy::filter::{store_ranks, RankFilter};

#[derive(Args)]
pub struct FilterArgs {
    /// Input files with one taxid per line ("-" for stdin)
    #[arg(value_name = "FILE", default_value = "-")]
    pub input: Vec<PathBuf>,

    /// Field holding the taxid (1-based)
    #[arg(short = 'i', long, default_value = "1")]
    pub taxid_field: usize,

    /// Keep taxa with ranks less specific than this rank
    #[arg(short = 'L', long, conflicts_with = "higher_than")]
    pub lower_than: Option<String>,

    /// Keep taxa with ranks more specific than this rank
    #[arg(short = 'H', long)]
    pub higher_than: Option<String>,

    /// Always keep taxa with these ranks
    #[arg(short = 'E', long, value_delimiter = ',')]
    pub equal_to: Vec<String>,

    /// Drop taxa with these ranks (added to the configured list)
    #[arg(short = 'B', long, value_delimiter = ',')]
    pub black_list: Vec<String>,

    /// Drop taxa with unordered ranks such as "no rank" or "clade"
    #[arg(short = 'N', long)]
    pub discard_noranks: bool,

    /// With --discard-noranks, keep unordered taxa whose nearest ordered
    /// ancestor passes --lower-than
    #[arg(short = 'n', long)]
    pub save_predictable_norank: bool,

    /// Drop the root taxid
    #[arg(short = 'R', long)]
    pub discard_root: bool,

    /// Print the rank order and exit
    #[arg(long)]
    pub list_order: bool,

    /// Print the ranks found in the taxonomy, in rank order, and exit
    #[arg(long)]
    pub list_ranks: bool,
}

pub fn run(args: FilterArgs, ctx: &Context) -> anyhow::Result<()> {
    let order = ctx.load_rank_order()?;

    if args.list_order {
        let mut out = ctx.output()?;
        for level in order.levels() {
            writeln!(out, "{}", level.join(", "))?;
        }
        for rank in order.unordered() {
            writeln!(out, "!{}", rank)?;
        }
        out.flush()?;
        return Ok(());
    }

    let store = ctx.load_store()?;

    if args.list_ranks {
        let mut out = ctx.output()?;
        for (rank, level) in store_ranks(&store, &order) {
            match level {
                Some(level) => writeln!(out, "{}\t{}", rank, level)?,
                None if order.is_unordered(&rank) => writeln!(out, "{}\tunordered", rank)?,
                None => writeln!(out, "{}\tundefined", rank)?,
            }
        }
        out.flush()?;
        return Ok(());
    }

    check_field(args.taxid_field)?;
    let mut config = ctx.config.filter.to_rank_filter_config();
    config.lower_than = args.lower_than;
    config.higher_than = args.higher_than;
    config.equal_to = args.equal_to;
    config.black_list.extend(args.black_list);
    config.discard_unordered |= args.discard_noranks;
    config.save_predictable_unordered |= args.save_predictable_norank;
    config.discard_root |= args.discard_root;

    let filter = RankFilter::new(&store, &order, &config)?;
    let mut out = ctx.output()?;
    map_lines(&args.input, ctx.batch_size(), &mut out, |line| {
        let taxid = taxid_field(line, args.taxid_field)?;
        filter.is_passed(taxid).then(|| line.to_string())
    })?;
    Ok(())
}
