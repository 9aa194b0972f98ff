use clap::Args;
use serde_json::{Map, Value};
use std::io::Write;
use tracing::warn;

use crate::cli::Context;
use crate::error::TaxkitError;
use crate::taxonomy::store::TaxonomyStore;
use crate::taxonomy::tree::ChildIndex;
use crate::taxonomy::types::{Resolution, TaxonId};

#[derive(Args)]
pub struct ListArgs {
    /// Taxids to list from, comma separated
    #[arg(long, value_delimiter = ',', default_value = "1")]
    pub ids: Vec<u32>,

    /// Indentation per level
    #[arg(short = 'I', long, default_value = "  ")]
    pub indent: String,

    /// Append the scientific name
    #[arg(short = 'n', long)]
    pub show_name: bool,

    /// Append the rank
    #[arg(short = 'r', long)]
    pub show_rank: bool,

    /// Print nested JSON instead of indented text
    #[arg(long)]
    pub json: bool,
}

fn label(store: &TaxonomyStore, taxid: TaxonId, show_rank: bool, show_name: bool) -> String {
    let mut label = taxid.to_string();
    if show_rank {
        label.push_str(&format!(" [{}]", store.rank(taxid).unwrap_or_default()));
    }
    if show_name {
        label.push(' ');
        label.push_str(store.name(taxid).unwrap_or_default());
    }
    label
}

pub fn run(args: ListArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.load_store()?;
    let index = ChildIndex::new(&store);
    let make_label = |taxid| label(&store, taxid, args.show_rank, args.show_name);

    let mut roots = Vec::new();
    for id in &args.ids {
        match store.resolve(TaxonId(*id)) {
            Resolution::Live(t) => roots.push(t),
            Resolution::Merged { from, to } => {
                warn!("Taxid {} was merged into {}", from, to);
                roots.push(to);
            }
            Resolution::Deleted(t) => warn!("Taxid {} was deleted", t),
            Resolution::Unknown(t) => warn!("Taxid {} not found", t),
        }
    }

    let mut out = ctx.output()?;
    if args.json {
        let mut tree = Map::new();
        for &root in &roots {
            let node = index.subtree_json(root, &make_label).map_err(TaxkitError::from)?;
            tree.insert(make_label(root), node);
        }
        serde_json::to_writer_pretty(&mut out, &Value::Object(tree))?;
        writeln!(out)?;
    } else {
        for &root in &roots {
            for entry in index.subtree(root).map_err(TaxkitError::from)? {
                writeln!(out, "{}{}", args.indent.repeat(entry.depth), make_label(entry.taxid))?;
            }
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}
