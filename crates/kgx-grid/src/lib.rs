//! Hyperparameter grids and batch-job scripts for `pykg2vec-train` runs.
//!
//! For every (model, dataset) combination this crate enumerates the model's
//! hyperparameter grid and writes, under `<out>/<model>/<dataset>/`:
//!
//! - `<model>_<dataset>_<n>.sh`: environment setup + training command
//! - `<model>_<dataset>_<n>.json`: the configuration, for joining metrics later
//! - `<model>_<dataset>_job_<p>.sbatch`: array job over partition `p`'s runs
//!
//! Training output (`<model>_<dataset>_<n>.out`) lands next to the configs,
//! which is what `kgx-logs` expects.

pub mod experiment;
pub mod grid;
pub mod value;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use experiment::{
    partition_ranges, write_experiment, write_grid, ExperimentSummary, GridSpec, JobScript,
    PartitionRange, RunScript,
};
pub use grid::{
    base_grid, command_for, configs_for, expand, flag_for, grid_for, Config, Grid,
    DEFAULT_DATASETS, DEFAULT_MODELS, TRAIN_COMMAND,
};
pub use value::ParamValue;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("parameter `{0}` has no trainer flag")]
    UnknownParameter(String),
    #[error("partitions must be at least 1")]
    ZeroPartitions,
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode config: {0}")]
    Json(#[from] serde_json::Error),
}

impl GridError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        GridError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
