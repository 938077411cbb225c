//! Turn `pykg2vec-train` stdout logs back into metric tables.
//!
//! Each `<run>.out` is scanned for evaluation blocks (`Test Results ...
//! Epoch: n` up to a dashed rule), giving one row of metrics per evaluated
//! epoch. The sibling `<run>.json` written by `kgx-grid` supplies the run's
//! hyperparameters, which are attached to every row.

pub mod line;
pub mod table;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use line::{LineKind, LineParser, MetricValue};
pub use table::{out_files, parse_log, parse_run, EpochMetrics, MetricsTable, RunMetrics};

pub const DEFAULT_OUTPUT: &str = "aggregated.csv";

#[derive(Debug, Error)]
pub enum LogError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid run config {path}: {source}")]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write metrics table: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid line pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl LogError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        LogError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Parse every `.out` file in `folder` and write the aggregated CSV to
/// `output` (default `<folder>/aggregated.csv`). Returns the path written and
/// the number of data rows.
pub fn aggregate_folder(
    folder: &Path,
    output: Option<&Path>,
) -> Result<(PathBuf, usize), LogError> {
    let table = MetricsTable::from_folder(folder)?;
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| folder.join(DEFAULT_OUTPUT));

    let file = File::create(&output).map_err(|source| LogError::io(&output, source))?;
    table.write_csv(BufWriter::new(file))?;

    let rows = table.row_count();
    tracing::info!(
        output = %output.display(),
        runs = table.runs.len(),
        rows,
        "wrote metrics table"
    );
    Ok((output, rows))
}
