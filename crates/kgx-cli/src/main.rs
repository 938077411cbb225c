//! kgx CLI
//!
//! Tooling around knowledge-graph embedding experiments:
//! - Extracting smallest enclosing subgraphs for entity pairs
//! - Generating hyperparameter grids and batch-job scripts for `pykg2vec-train`
//! - Aggregating training logs into metric tables

use anyhow::Result;
use clap::{Parser, Subcommand};
use kgx_subgraph::CancellationToken;
use tracing_subscriber::EnvFilter;

mod grid;
mod logs;
mod subgraphs;

#[derive(Parser)]
#[command(name = "kgx")]
#[command(author, version, about = "Knowledge-graph embedding experiment tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the smallest enclosing subgraph for every (head, tail) pair.
    ///
    /// Writes one `head,tail,index` row per triple shared by the pair's
    /// neighborhoods at the smallest hop count in `--min-size..=--max-size`.
    /// Pairs with no connecting subgraph emit no rows.
    Subgraphs(subgraphs::SubgraphsArgs),

    /// Write run scripts, configs and array-job files for a hyperparameter grid.
    Grid(grid::GridArgs),

    /// Aggregate `.out` training logs in a folder into one CSV.
    ParseLogs(logs::ParseLogsArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Subgraphs(args) => {
            let cancel = CancellationToken::new();
            // First Ctrl-C stops dispatching new pairs; a second one exits.
            signal_hook::flag::register_conditional_shutdown(
                signal_hook::consts::SIGINT,
                130,
                cancel.flag(),
            )?;
            signal_hook::flag::register(signal_hook::consts::SIGINT, cancel.flag())?;
            subgraphs::cmd_subgraphs(&args, &cancel)
        }
        Commands::Grid(args) => grid::cmd_grid(&args),
        Commands::ParseLogs(args) => logs::cmd_parse_logs(&args),
    }
}
