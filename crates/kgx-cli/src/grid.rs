use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use kgx_grid::{write_grid, GridSpec, DEFAULT_DATASETS, DEFAULT_MODELS};

#[derive(Args, Debug, Clone)]
pub struct GridArgs {
    /// Models to generate runs for (default: all supported)
    #[arg(short, long, num_args = 1..)]
    pub model: Vec<String>,
    /// Datasets to generate runs for (default: fb15k_237 wn18_rr)
    #[arg(short, long, num_args = 1..)]
    pub dataset: Vec<String>,
    /// Number of array jobs per experiment
    #[arg(short, long, default_value_t = 1)]
    pub partitions: usize,
    /// Output directory
    #[arg(short, long)]
    pub out: PathBuf,
}

impl GridArgs {
    pub fn spec(&self) -> GridSpec {
        let or_default = |given: &[String], default: &[&str]| {
            if given.is_empty() {
                default.iter().map(|s| s.to_string()).collect()
            } else {
                given.to_vec()
            }
        };
        GridSpec {
            models: or_default(&self.model, DEFAULT_MODELS),
            datasets: or_default(&self.dataset, DEFAULT_DATASETS),
            partitions: self.partitions,
            ..GridSpec::default()
        }
    }
}

pub fn cmd_grid(args: &GridArgs) -> Result<()> {
    let summaries = write_grid(&args.spec(), &args.out)?;
    for summary in &summaries {
        println!(
            "{:<10} {:<12} {:>6} runs  {} job(s)  {}",
            summary.model,
            summary.dataset,
            summary.runs,
            summary.partitions.len(),
            summary.dir.display()
        );
    }
    let total: usize = summaries.iter().map(|s| s.runs).sum();
    eprintln!(
        "{} {} runs in {} experiment(s) under {}",
        "wrote".green().bold(),
        total,
        summaries.len(),
        args.out.display().to_string().bold()
    );
    Ok(())
}
