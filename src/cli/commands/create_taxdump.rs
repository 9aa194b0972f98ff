use anyhow::Context as _;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::cli::{output, Context};
use crate::taxonomy::reconcile::VersionReconciler;
use crate::taxonomy::store::{DumpPaths, TaxonomyStore};
use crate::taxonomy::synthesis::{
    IdentitySynthesizer, RowFormat, RowParser, TableLayout, GTDB_SUBSPECIES_PATTERN, LEVELS,
};
use crate::utils::io::open_input;

#[derive(Args)]
pub struct CreateTaxdumpArgs {
    /// Tab-delimited classification tables ("-" for stdin)
    #[arg(value_name = "FILE", default_value = "-")]
    pub input: Vec<PathBuf>,

    /// Output directory
    #[arg(long, value_name = "DIR", default_value = "taxdump")]
    pub out_dir: PathBuf,

    /// Field of the superkingdom level (1-based)
    #[arg(short = 'K', long)]
    pub field_superkingdom: Option<usize>,

    /// Field of the phylum level
    #[arg(short = 'P', long)]
    pub field_phylum: Option<usize>,

    /// Field of the class level
    #[arg(short = 'C', long)]
    pub field_class: Option<usize>,

    /// Field of the order level
    #[arg(short = 'O', long)]
    pub field_order: Option<usize>,

    /// Field of the family level
    #[arg(short = 'F', long)]
    pub field_family: Option<usize>,

    /// Field of the genus level
    #[arg(short = 'G', long)]
    pub field_genus: Option<usize>,

    /// Field of the species level (required unless --gtdb)
    #[arg(short = 'S', long)]
    pub field_species: Option<usize>,

    /// Field of the strain/subspecies level
    #[arg(short = 'T', long)]
    pub field_strain: Option<usize>,

    /// Field of the accession
    #[arg(short = 'A', long)]
    pub field_accession: Option<usize>,

    /// Regular expression capturing the accession (defaults to the configured one)
    #[arg(long)]
    pub accession_re: Option<String>,

    /// Values treated as missing (replaces the configured set)
    #[arg(long, value_delimiter = ',')]
    pub null: Option<Vec<String>>,

    /// Rank names of the eight levels, comma separated
    #[arg(long, value_delimiter = ',')]
    pub rank_names: Option<Vec<String>>,

    /// Input is GTDB taxonomy: accession<TAB>d__...;p__...;...;s__...
    #[arg(long)]
    pub gtdb: bool,

    /// Regular expression turning a GTDB accession into the subspecies name
    #[arg(long, default_value = GTDB_SUBSPECIES_PATTERN)]
    pub gtdb_re_subs: String,

    /// Previous taxdump of this classification, to derive merged/deleted taxids
    #[arg(short = 'x', long, value_name = "DIR")]
    pub old_taxdump_dir: Option<PathBuf>,
}

impl CreateTaxdumpArgs {
    fn fields(&self) -> [Option<usize>; LEVELS] {
        [
            self.field_superkingdom,
            self.field_phylum,
            self.field_class,
            self.field_order,
            self.field_family,
            self.field_genus,
            self.field_species,
            self.field_strain,
        ]
    }
}

pub fn run(args: CreateTaxdumpArgs, ctx: &Context) -> anyhow::Result<()> {
    let settings = &ctx.config.synthesis;
    let accession_re = args
        .accession_re
        .clone()
        .unwrap_or_else(|| settings.accession_pattern.clone());

    let format = if args.gtdb {
        RowFormat::gtdb(&accession_re, &args.gtdb_re_subs)?
    } else {
        let null_values = args.null.clone().unwrap_or_else(|| settings.null_values.clone());
        let pattern = args.field_accession.map(|_| accession_re.as_str());
        RowFormat::Table(TableLayout::new(
            args.fields(),
            args.field_accession,
            pattern,
            null_values,
        )?)
    };

    let rank_names = args
        .rank_names
        .clone()
        .unwrap_or_else(|| settings.rank_names.clone());
    let mut synthesizer = IdentitySynthesizer::new(rank_names, settings.max_probes)?;
    let mut parser = RowParser::new(format);

    let pb = output::spinner("Assigning taxids...")?;
    let mut rows = 0;
    for path in &args.input {
        let reader =
            open_input(path).with_context(|| format!("Failed to open {}", path.display()))?;
        for row in parser.read_rows(reader, path)? {
            synthesizer.assign_row(&row)?;
            rows += 1;
        }
    }
    parser.report();
    let taxonomy = synthesizer.finish();
    pb.finish_and_clear();
    info!("{} rows read, {} taxa created", rows, taxonomy.taxa.len());

    let diff = match &args.old_taxdump_dir {
        Some(dir) => {
            let paths = DumpPaths::from_dir(dir);
            paths.require_all()?;
            let old = TaxonomyStore::load(&paths)
                .with_context(|| format!("Failed to load old taxdump from {}", dir.display()))?;
            let new = taxonomy.to_store()?;
            Some(VersionReconciler::diff(&old, &new))
        }
        None => None,
    };

    taxonomy.write_taxdump(&args.out_dir, diff.as_ref())?;

    output::success(&format!("Taxdump written to {}", args.out_dir.display()));
    output::info("Taxa", taxonomy.taxa.len());
    if let Some(diff) = &diff {
        output::info("Merged", diff.merged.len());
        output::info("Deleted", diff.deleted.len());
    }
    if !taxonomy.accessions.is_empty() {
        output::info("Accessions", taxonomy.accessions.len());
    }
    Ok(())
}
