pub mod commands;
pub mod output;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

use crate::core::config::{load_config, Config};
use crate::core::paths;
use crate::taxonomy::rank::RankOrder;
use crate::taxonomy::store::{DumpPaths, TaxonomyStore};
use crate::utils::io::open_output;

#[derive(Parser)]
#[command(
    name = "taxkit",
    version,
    about = "Query, filter, synthesize and track taxonomies in NCBI taxdump format",
    long_about = "taxkit loads NCBI-style taxdump snapshots and answers lineage, LCA, \
                  rank filter and name queries. It can also build a taxdump from \
                  tabular classifications with stable taxids, and follow every taxid \
                  across an archive of snapshots."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of threads to use (0 = all available)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    pub threads: usize,

    /// Directory containing nodes.dmp, names.dmp, merged.dmp and delnodes.dmp
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file (defaults to $TAXKIT_HOME/config.toml when present)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output file ("-" for stdout, ".gz" suffix compresses)
    #[arg(short = 'o', long, value_name = "FILE", default_value = "-", global = true)]
    pub out_file: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query the lineage of taxids
    Lineage(commands::lineage::LineageArgs),

    /// Compute the lowest common ancestor of taxids
    Lca(commands::lca::LcaArgs),

    /// Filter taxids by rank
    Filter(commands::filter::FilterArgs),

    /// List taxids below given taxids
    List(commands::list::ListArgs),

    /// Convert scientific names to taxids
    Name2taxid(commands::name2taxid::Name2TaxidArgs),

    /// Build a taxdump from tabular classifications
    CreateTaxdump(commands::create_taxdump::CreateTaxdumpArgs),

    /// Track taxid changes across archived taxdump snapshots
    TaxidChangelog(commands::changelog::ChangelogArgs),
}

/// Settings shared by every command, resolved from flags, the config file
/// and the environment (in that order)
pub struct Context {
    pub config: Config,
    pub data_dir: PathBuf,
    pub rank_file: PathBuf,
    pub out_file: PathBuf,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let config = match &cli.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => {
                let path = paths::default_config_path();
                if path.exists() {
                    debug!("Using config {}", path.display());
                    load_config(&path)?
                } else {
                    Config::default()
                }
            }
        };

        let data_dir = paths::data_dir(cli.data_dir.as_deref().or(config.data.data_dir.as_deref()));
        let rank_file = paths::rank_file(config.data.rank_file.as_deref(), &data_dir);

        Ok(Self {
            config,
            data_dir,
            rank_file,
            out_file: cli.out_file.clone(),
        })
    }

    /// Thread count from the flag, falling back to the config file
    pub fn threads(&self, flag: usize) -> usize {
        if flag == 0 {
            self.config.performance.threads
        } else {
            flag
        }
    }

    pub fn batch_size(&self) -> usize {
        self.config.performance.batch_size.max(1)
    }

    /// Load the taxdump under the data directory, with a spinner
    pub fn load_store(&self) -> anyhow::Result<TaxonomyStore> {
        let pb = output::spinner(&format!("Loading taxonomy from {}...", self.data_dir.display()))?;
        let store = TaxonomyStore::load(&DumpPaths::from_dir(&self.data_dir))
            .with_context(|| format!("Failed to load taxdump from {}", self.data_dir.display()))?;
        pb.finish_and_clear();
        debug!(
            "Loaded {} taxa, {} merged, {} deleted",
            store.len(),
            store.merged_count(),
            store.deleted_count()
        );
        Ok(store)
    }

    pub fn load_rank_order(&self) -> anyhow::Result<RankOrder> {
        Ok(RankOrder::load_or_init(&self.rank_file)?)
    }

    pub fn output(&self) -> anyhow::Result<Box<dyn Write>> {
        open_output(&self.out_file)
            .with_context(|| format!("Failed to open {}", self.out_file.display()))
    }
}
