use clap::Parser;
use colored::*;
use std::process;
use taxkit::cli::{Cli, Commands, Context};
use taxkit::TaxkitError;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins, then TAXKIT_LOG, then the -v count
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let log_level = std::env::var("TAXKIT_LOG").unwrap_or_else(|_| default_level.to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);

        // Use appropriate exit codes based on error type
        let exit_code = match e.chain().find_map(|c| c.downcast_ref::<TaxkitError>()) {
            Some(TaxkitError::Configuration(_)) => 2,
            Some(TaxkitError::Io(_)) => 3,
            Some(TaxkitError::Parse(_)) | Some(TaxkitError::MalformedRecord { .. }) => 4,
            Some(TaxkitError::CollisionExhausted { .. })
            | Some(TaxkitError::CycleDetected { .. })
            | Some(TaxkitError::InconsistentTaxonomy(_)) => 5,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::from_cli(&cli)?;

    let num_threads = taxkit::utils::parallel::configure_thread_pool(ctx.threads(cli.threads))?;
    if cli.verbose > 0 {
        eprintln!("Using {} threads", num_threads);
    }

    match cli.command {
        Commands::Lineage(args) => taxkit::cli::commands::lineage::run(args, &ctx),
        Commands::Lca(args) => taxkit::cli::commands::lca::run(args, &ctx),
        Commands::Filter(args) => taxkit::cli::commands::filter::run(args, &ctx),
        Commands::List(args) => taxkit::cli::commands::list::run(args, &ctx),
        Commands::Name2taxid(args) => taxkit::cli::commands::name2taxid::run(args, &ctx),
        Commands::CreateTaxdump(args) => taxkit::cli::commands::create_taxdump::run(args, &ctx),
        Commands::TaxidChangelog(args) => taxkit::cli::commands::changelog::run(args, &ctx),
    }
}
