//! Main entry point for the de novo filter CLI.

use clap::{command, Parser, Subcommand};

use denovo_filter::{common, count_alleles, filter};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Identification of de novo variant candidates from trio sequencing data"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Filter the calls of a child for de novo candidates.
    Filter(filter::Args),
    /// Count coverage and allele support of one variant.
    CountAlleles(count_alleles::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    tracing::subscriber::with_default(collector, || {
        tracing::info!("denovo-filter {} startup", common::version());

        match &cli.command {
            Commands::Filter(args) => filter::run(&cli.common, args)?,
            Commands::CountAlleles(args) => count_alleles::run(&cli.common, args)?,
        }

        tracing::info!("All done. Have a nice day!");

        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}
