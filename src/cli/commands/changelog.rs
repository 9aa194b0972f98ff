use anyhow::Context as _;
use clap::Args;
use std::path::PathBuf;

use crate::cli::{output, Context};
use crate::taxonomy::changelog::ChangelogEngine;

#[derive(Args)]
pub struct ChangelogArgs {
    /// Directory with one sub-directory per taxdump snapshot, named so that
    /// sorting by name gives chronological order
    #[arg(short = 'i', long, value_name = "DIR")]
    pub archive: PathBuf,
}

pub fn run(args: ChangelogArgs, ctx: &Context) -> anyhow::Result<()> {
    let pb = output::spinner(&format!("Reading archive {}...", args.archive.display()))?;
    let mut engine = ChangelogEngine::new();
    engine
        .ingest_archive(&args.archive)
        .with_context(|| format!("Failed to process archive {}", args.archive.display()))?;
    pb.finish_and_clear();

    let out = ctx.output()?;
    let rows = engine.write_csv(out)?;

    output::success(&format!(
        "{} events for {} taxids across {} versions",
        rows,
        engine.taxid_count(),
        engine.versions().len()
    ));
    Ok(())
}
