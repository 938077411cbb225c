use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use kgx_logs::aggregate_folder;

#[derive(Args, Debug, Clone)]
pub struct ParseLogsArgs {
    /// Folder containing `.out` training logs and their `.json` configs
    pub folder: PathBuf,
    /// Output CSV (default: <folder>/aggregated.csv)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn cmd_parse_logs(args: &ParseLogsArgs) -> Result<()> {
    let (output, rows) = aggregate_folder(&args.folder, args.out.as_deref())
        .with_context(|| format!("failed to parse logs in {}", args.folder.display()))?;
    eprintln!(
        "{} {} rows → {}",
        "wrote".green().bold(),
        rows,
        output.display().to_string().bold()
    );
    Ok(())
}
