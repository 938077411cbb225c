//! Experiment directories: one run script and config per grid point, plus
//! array-job files that split the runs into partitions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::grid::{command_for, configs_for, DEFAULT_DATASETS, DEFAULT_MODELS};
use crate::GridError;

/// Environment setup wrapped around each training command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunScript {
    pub conda_profile: String,
    pub conda_env: String,
    pub workdir: String,
}

impl Default for RunScript {
    fn default() -> Self {
        Self {
            conda_profile: "/opt/conda/etc/profile.d/conda.sh".to_string(),
            conda_env: "pykg2vec".to_string(),
            workdir: "pykg2vec".to_string(),
        }
    }
}

impl RunScript {
    pub fn render(&self, command: &str) -> String {
        format!(
            "conda init bash\n\
             source {profile}\n\
             conda activate {env}\n\
             cd {workdir}\n\
             \n\
             {command}\n",
            profile = self.conda_profile,
            env = self.conda_env,
            workdir = self.workdir,
        )
    }
}

/// Scheduler directives for the array jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobScript {
    pub partition: String,
    pub time: String,
    pub qos: String,
    pub gres: String,
    pub mem: String,
    pub container: String,
}

impl Default for JobScript {
    fn default() -> Self {
        Self {
            partition: "batch".to_string(),
            time: "21-00:00:00".to_string(),
            qos: "allgpus".to_string(),
            gres: "gpu:1".to_string(),
            mem: "64G".to_string(),
            container: "pytorch.sif".to_string(),
        }
    }
}

impl JobScript {
    /// Array job over run indices `range.start..=range.end` of `name` in `dir`.
    pub fn render(&self, name: &str, part: usize, range: PartitionRange, dir: &Path) -> String {
        let dir = dir.display();
        format!(
            "#!/usr/bin/env bash\n\
             #SBATCH --array={start}-{end}\n\
             #SBATCH --job-name {name}_{part}\n\
             #SBATCH --partition {partition}\n\
             #SBATCH --output {dir}/{name}_%a.out\n\
             #SBATCH --time {time}\n\
             #SBATCH --qos {qos}\n\
             #SBATCH --gres {gres}\n\
             #SBATCH --mem {mem}\n\
             \n\
             srun singularity exec --nv {container} bash {dir}/{name}_\"$SLURM_ARRAY_TASK_ID\".sh\n",
            start = range.start,
            end = range.end,
            partition = self.partition,
            time = self.time,
            qos = self.qos,
            gres = self.gres,
            mem = self.mem,
            container = self.container,
        )
    }
}

/// Inclusive run-index range of one partition. `end < start` when the
/// partition received no runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartitionRange {
    pub start: i64,
    pub end: i64,
}

/// Split `runs` indices into `partitions` contiguous ranges. Boundaries are
/// `round_half_even(runs / partitions * p)`.
pub fn partition_ranges(runs: usize, partitions: usize) -> Vec<PartitionRange> {
    if partitions == 0 {
        return Vec::new();
    }
    let width = runs as f64 / partitions as f64;
    let boundary = |p: usize| (width * p as f64).round_ties_even() as i64;
    (0..partitions)
        .map(|p| PartitionRange {
            start: boundary(p),
            end: boundary(p + 1) - 1,
        })
        .collect()
}

/// What to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub models: Vec<String>,
    pub datasets: Vec<String>,
    pub partitions: usize,
    pub run_script: RunScript,
    pub job_script: JobScript,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            datasets: DEFAULT_DATASETS.iter().map(|d| d.to_string()).collect(),
            partitions: 1,
            run_script: RunScript::default(),
            job_script: JobScript::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperimentSummary {
    pub model: String,
    pub dataset: String,
    pub dir: PathBuf,
    pub runs: usize,
    pub partitions: Vec<PartitionRange>,
}

/// Write every (model, dataset) experiment under `out`.
pub fn write_grid(spec: &GridSpec, out: &Path) -> Result<Vec<ExperimentSummary>, GridError> {
    if spec.partitions == 0 {
        return Err(GridError::ZeroPartitions);
    }
    let mut summaries = Vec::with_capacity(spec.models.len() * spec.datasets.len());
    for model in &spec.models {
        for dataset in &spec.datasets {
            summaries.push(write_experiment(spec, model, dataset, out)?);
        }
    }
    Ok(summaries)
}

/// Write `<out>/<model>/<dataset>/` with run scripts, configs and job files.
pub fn write_experiment(
    spec: &GridSpec,
    model: &str,
    dataset: &str,
    out: &Path,
) -> Result<ExperimentSummary, GridError> {
    let dir = out.join(model).join(dataset);
    fs::create_dir_all(&dir).map_err(|source| GridError::io(&dir, source))?;

    let name = format!("{model}_{dataset}");
    let configs = configs_for(model, dataset);

    for (n, config) in configs.iter().enumerate() {
        let script = spec.run_script.render(&command_for(config)?);
        write_file(&dir.join(format!("{name}_{n}.sh")), &script)?;

        let json = serde_json::to_string(config)?;
        write_file(&dir.join(format!("{name}_{n}.json")), &json)?;
    }

    let partitions = partition_ranges(configs.len(), spec.partitions);
    for (part, range) in partitions.iter().enumerate() {
        let job = spec.job_script.render(&name, part, *range, &dir);
        write_file(&dir.join(format!("{name}_job_{part}.sbatch")), &job)?;
    }

    tracing::info!(
        model,
        dataset,
        runs = configs.len(),
        partitions = partitions.len(),
        dir = %dir.display(),
        "wrote experiment"
    );

    Ok(ExperimentSummary {
        model: model.to_string(),
        dataset: dataset.to_string(),
        dir,
        runs: configs.len(),
        partitions,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), GridError> {
    fs::write(path, contents).map_err(|source| GridError::io(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_cover_all_runs_contiguously() {
        let ranges = partition_ranges(162, 4);
        assert_eq!(ranges.first().unwrap().start, 0);
        assert_eq!(ranges.last().unwrap().end, 161);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start);
        }
    }

    #[test]
    fn partition_boundaries_round_half_to_even() {
        // 5 runs over 2 partitions: boundary 2.5 rounds to 2.
        assert_eq!(
            partition_ranges(5, 2),
            vec![
                PartitionRange { start: 0, end: 1 },
                PartitionRange { start: 2, end: 4 },
            ]
        );
        // 7 runs over 2 partitions: boundary 3.5 rounds to 4.
        assert_eq!(partition_ranges(7, 2)[0], PartitionRange { start: 0, end: 3 });
    }

    #[test]
    fn zero_partitions_produce_no_ranges() {
        assert!(partition_ranges(10, 0).is_empty());
    }

    #[test]
    fn run_script_wraps_the_command() {
        let script = RunScript::default().render("pykg2vec-train -mn TransE");
        assert_eq!(
            script,
            "conda init bash\n\
             source /opt/conda/etc/profile.d/conda.sh\n\
             conda activate pykg2vec\n\
             cd pykg2vec\n\
             \n\
             pykg2vec-train -mn TransE\n"
        );
    }

    #[test]
    fn job_script_points_at_run_scripts() {
        let job = JobScript::default().render(
            "TransE_wn18_rr",
            1,
            PartitionRange { start: 81, end: 161 },
            Path::new("/exp/TransE/wn18_rr"),
        );
        assert!(job.starts_with("#!/usr/bin/env bash\n#SBATCH --array=81-161\n"));
        assert!(job.contains("#SBATCH --job-name TransE_wn18_rr_1\n"));
        assert!(job.contains("#SBATCH --output /exp/TransE/wn18_rr/TransE_wn18_rr_%a.out\n"));
        assert!(job.ends_with(
            "bash /exp/TransE/wn18_rr/TransE_wn18_rr_\"$SLURM_ARRAY_TASK_ID\".sh\n"
        ));
    }
}
