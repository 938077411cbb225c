use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use kgx_subgraph::{
    load_pairs, subgraphs_with_cancel, unique_pairs, CancellationToken, ExtractConfig,
    TableFormat, TimeoutPolicy, TripleStore,
};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Tsv,
    Csv,
}

impl From<FormatArg> for TableFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Tsv => TableFormat::Tsv,
            FormatArg::Csv => TableFormat::Csv,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnTimeout {
    /// Report the pair as having no connecting subgraph.
    NotFound,
    /// Report the pair as failed.
    Fail,
}

impl From<OnTimeout> for TimeoutPolicy {
    fn from(value: OnTimeout) -> Self {
        match value {
            OnTimeout::NotFound => TimeoutPolicy::NotFound,
            OnTimeout::Fail => TimeoutPolicy::Fail,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SubgraphsArgs {
    /// Triple file (head, relation, tail per row)
    pub input: PathBuf,
    /// Output CSV (head, tail, index)
    pub output: PathBuf,
    /// Pair file (head, tail per row); defaults to the distinct pairs of the input
    #[arg(long)]
    pub pairs: Option<PathBuf>,
    /// Input dialect; inferred from the extension when omitted (`.csv` → csv)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
    /// Smallest hop count tried
    #[arg(long, default_value_t = 2)]
    pub min_size: u32,
    /// Largest hop count tried
    #[arg(long, default_value_t = 4)]
    pub max_size: u32,
    /// Worker threads (default: available CPUs)
    #[arg(long)]
    pub workers: Option<usize>,
    /// Wall-clock cap per pair, in milliseconds
    #[arg(long)]
    pub task_timeout_ms: Option<u64>,
    /// What an expired per-pair cap means
    #[arg(long, value_enum, default_value_t = OnTimeout::NotFound)]
    pub on_timeout: OnTimeout,
    /// Also write a JSON report with per-pair outcomes
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl SubgraphsArgs {
    pub fn config(&self) -> ExtractConfig {
        ExtractConfig {
            min_size: self.min_size,
            max_size: self.max_size,
            workers: self.workers,
            task_timeout: self.task_timeout_ms.map(Duration::from_millis),
            timeout_policy: self.on_timeout.into(),
        }
    }
}

pub fn cmd_subgraphs(args: &SubgraphsArgs, cancel: &CancellationToken) -> Result<()> {
    let config = args.config();
    config.validate()?;
    tracing::debug!(?config, "extraction config");
    let format = args.format.map(TableFormat::from);

    let store = TripleStore::load(&args.input, format)
        .with_context(|| format!("failed to load triples from {}", args.input.display()))?;

    let pairs = match &args.pairs {
        Some(path) => {
            let pairs = load_pairs(path, None)
                .with_context(|| format!("failed to load pairs from {}", path.display()))?;
            println!(
                "Loaded {} distinct query pairs from {}.",
                pairs.len(),
                path.display()
            );
            pairs
        }
        None => {
            let pairs = unique_pairs(&store);
            println!("Dataset has {} unique head-tail pairs.", pairs.len());
            pairs
        }
    };

    let report = subgraphs_with_cancel(&store, &pairs, &config, cancel)?;

    let out = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let rows = report
        .write_rows(BufWriter::new(out))
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    if let Some(path) = &args.report {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        report
            .write_report(BufWriter::new(file))
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    let summary = report.summary();
    eprintln!(
        "{} {} rows → {} ({} found, {} without a connecting subgraph, {} failed, {} cancelled)",
        "ok".green().bold(),
        rows,
        args.output.display().to_string().bold(),
        summary.found,
        summary.not_found,
        summary.failed,
        summary.cancelled,
    );
    if summary.failed > 0 {
        eprintln!(
            "{} {} pair(s) failed; see the log or --report for details",
            "warning".yellow().bold(),
            summary.failed
        );
    }
    if cancel.is_cancelled() {
        anyhow::bail!("interrupted; output is partial");
    }
    Ok(())
}
