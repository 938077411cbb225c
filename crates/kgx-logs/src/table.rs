//! Per-run and aggregated metric tables.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use kgx_grid::{Config, ParamValue};

use crate::line::{LineKind, LineParser};
use crate::LogError;

/// Epoch → metric → value for one training run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpochMetrics {
    pub epochs: BTreeMap<u64, BTreeMap<String, f64>>,
}

impl EpochMetrics {
    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    fn record(&mut self, epoch: u64, metric: String, value: f64) {
        let previous = self
            .epochs
            .entry(epoch)
            .or_default()
            .insert(metric.clone(), value);
        if let Some(previous) = previous {
            tracing::warn!(
                epoch,
                metric = %metric,
                previous,
                value,
                "metric repeated; keeping last"
            );
        }
    }
}

/// Scan a training log for evaluation blocks.
pub fn parse_log<R: BufRead>(parser: &LineParser, reader: R) -> std::io::Result<EpochMetrics> {
    let mut metrics = EpochMetrics::default();
    let mut current: Option<u64> = None;

    for line in reader.lines() {
        let line = line?;
        match parser.classify(&line, current.is_some()) {
            LineKind::BlockStart { epoch } => current = Some(epoch),
            LineKind::BlockEnd => current = None,
            LineKind::Stop => break,
            LineKind::Metrics(values) => {
                if let Some(epoch) = current {
                    for v in values {
                        metrics.record(epoch, v.metric, v.value);
                    }
                }
            }
            LineKind::Other => {}
        }
    }
    Ok(metrics)
}

/// Metrics of one `.out` file joined with its `.json` config.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMetrics {
    pub name: String,
    pub metrics: EpochMetrics,
    pub config: Config,
}

/// Parse `<stem>.out` and its sibling `<stem>.json`.
pub fn parse_run(parser: &LineParser, path: &Path) -> Result<RunMetrics, LogError> {
    let file = fs::File::open(path).map_err(|source| LogError::io(path, source))?;
    let metrics =
        parse_log(parser, BufReader::new(file)).map_err(|source| LogError::io(path, source))?;

    let config_path = path.with_extension("json");
    let text =
        fs::read_to_string(&config_path).map_err(|source| LogError::io(&config_path, source))?;
    let config: Config = serde_json::from_str(&text).map_err(|source| LogError::Config {
        path: config_path.clone(),
        source,
    })?;

    if metrics.is_empty() {
        tracing::warn!(path = %path.display(), "no evaluation blocks found");
    }

    Ok(RunMetrics {
        name: path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        metrics,
        config,
    })
}

/// `*.out` files directly inside `folder`, sorted by name.
pub fn out_files(folder: &Path) -> Result<Vec<PathBuf>, LogError> {
    let entries = fs::read_dir(folder).map_err(|source| LogError::io(folder, source))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|source| LogError::io(folder, source))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "out") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// All runs of a folder, one row per (run, epoch).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsTable {
    pub runs: Vec<RunMetrics>,
}

impl MetricsTable {
    pub fn from_folder(folder: &Path) -> Result<Self, LogError> {
        let parser = LineParser::new()?;
        let files = out_files(folder)?;
        tracing::info!(folder = %folder.display(), files = files.len(), "parsing training logs");

        let runs = files
            .iter()
            .map(|path| parse_run(&parser, path))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { runs })
    }

    pub fn row_count(&self) -> usize {
        self.runs.iter().map(|run| run.metrics.epochs.len()).sum()
    }

    fn metric_columns(&self) -> BTreeSet<&str> {
        self.runs
            .iter()
            .flat_map(|run| run.metrics.epochs.values())
            .flat_map(|metrics| metrics.keys().map(String::as_str))
            .collect()
    }

    fn config_columns(&self) -> BTreeSet<&str> {
        self.runs
            .iter()
            .flat_map(|run| run.config.keys().map(String::as_str))
            .collect()
    }

    /// CSV with columns `file, epoch, <metrics>, <config keys>`; cells a run
    /// does not have are left empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let metric_columns = self.metric_columns();
        let config_columns: Vec<&str> = self
            .config_columns()
            .into_iter()
            .filter(|key| !metric_columns.contains(key) && !matches!(*key, "file" | "epoch"))
            .collect();

        let mut writer = csv::Writer::from_writer(writer);
        let mut header = vec!["file", "epoch"];
        header.extend(metric_columns.iter().copied());
        header.extend(config_columns.iter().copied());
        writer.write_record(&header)?;

        for run in &self.runs {
            for (epoch, metrics) in &run.metrics.epochs {
                let mut record = vec![run.name.clone(), epoch.to_string()];
                record.extend(
                    metric_columns
                        .iter()
                        .map(|m| metrics.get(*m).map(f64::to_string).unwrap_or_default()),
                );
                record.extend(
                    config_columns
                        .iter()
                        .map(|k| run.config.get(*k).map(ParamValue::to_string).unwrap_or_default()),
                );
                writer.write_record(&record)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
epoch 1 loss 12.0
------Test Results for FB15k: Epoch: 10 --- time: 1.0------------
--# of entities, # of relations: 14951, 1345
--mr,  filtered mr             : 226.0000, 130.0000
--mrr, filtered mrr            : 0.1910, 0.3019
--hits1                        : 0.1000
--filtered hits1               : 0.2000
---------------------------------------------------------
--hits1                        : 0.9999
------Test Results for FB15k: Epoch: 20 --- time: 1.0------------
--hits1                        : 0.1500
---------------------------------------------------------
Stop the training
------Test Results for FB15k: Epoch: 30 --- time: 1.0------------
--hits1                        : 0.1700
---------------------------------------------------------
";

    #[test]
    fn blocks_are_keyed_by_epoch_and_stop_ends_the_scan() {
        let parser = LineParser::new().unwrap();
        let metrics = parse_log(&parser, LOG.as_bytes()).unwrap();

        assert_eq!(metrics.epochs.keys().copied().collect::<Vec<_>>(), vec![10, 20]);
        let ten = &metrics.epochs[&10];
        assert_eq!(ten["mr"], 226.0);
        assert_eq!(ten["mr_filtered"], 130.0);
        assert_eq!(ten["mrr_filtered"], 0.3019);
        assert_eq!(ten["hits1"], 0.1);
        assert_eq!(ten["hits1_filtered"], 0.2);
        assert_eq!(metrics.epochs[&20]["hits1"], 0.15);
    }

    #[test]
    fn repeated_metric_keeps_last_value() {
        let parser = LineParser::new().unwrap();
        let log = "Test Results Epoch: 1\n--hits1 : 0.1\n--hits1 : 0.2\n---\n";
        let metrics = parse_log(&parser, log.as_bytes()).unwrap();
        assert_eq!(metrics.epochs[&1]["hits1"], 0.2);
    }

    #[test]
    fn csv_fills_missing_cells_with_empty_strings() {
        let mut a = EpochMetrics::default();
        a.record(1, "hits1".to_string(), 0.5);
        let mut b = EpochMetrics::default();
        b.record(2, "mrr".to_string(), 0.25);

        let mut config = Config::new();
        config.insert("model_name".to_string(), ParamValue::from("TransE"));
        config.insert("l1_flag".to_string(), ParamValue::Bool(true));

        let table = MetricsTable {
            runs: vec![
                RunMetrics {
                    name: "TransE_wn18_rr_0".to_string(),
                    metrics: a,
                    config,
                },
                RunMetrics {
                    name: "RotatE_wn18_rr_0".to_string(),
                    metrics: b,
                    config: Config::new(),
                },
            ],
        };

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "file,epoch,hits1,mrr,l1_flag,model_name\n\
             TransE_wn18_rr_0,1,0.5,,True,TransE\n\
             RotatE_wn18_rr_0,2,,0.25,,\n"
        );
    }
}
