//! Batch driver: one independent task per pair over a bounded worker pool.
//!
//! Tasks only read the shared [`TripleStore`] and report `(pair index,
//! outcome)` over a channel. A panic or timeout inside one task is recorded
//! against that pair and the rest of the batch keeps going. Outcomes are
//! reassembled in pair order, so the emitted rows are deterministic even
//! though execution order is not.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, ExtractConfig, TimeoutPolicy};
use crate::neighborhood::{search, DeadlineExceeded, SubgraphSearch};
use crate::pairs::{dedup_pairs, Pair};
use crate::store::TripleStore;

const PROGRESS_EVERY: usize = 10_000;

// ============================================================================
// Cancellation
// ============================================================================

/// Shared stop flag. Pairs not yet started when it is set are skipped.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// The underlying flag, for registering with a signal handler.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

// ============================================================================
// Outcomes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("timed out after {elapsed:?} before trying size {size}")]
    TimedOut { size: u32, elapsed: Duration },
    #[error("panicked: {0}")]
    Panicked(String),
    #[error("cancelled before start")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid extraction config: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// One membership row: `index` is the row position in the triple input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub head: String,
    pub tail: String,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairOutcome {
    pub pair: Pair,
    pub result: Result<SubgraphSearch, TaskError>,
}

impl PairOutcome {
    pub fn rows(&self) -> impl Iterator<Item = ResultRow> + '_ {
        self.result
            .as_ref()
            .ok()
            .and_then(SubgraphSearch::rows)
            .into_iter()
            .flat_map(|rows| rows.iter())
            .map(|index| ResultRow {
                head: self.pair.head.clone(),
                tail: self.pair.tail.clone(),
                index,
            })
    }

    pub fn report(&self) -> PairReport {
        let (status, size, error) = match &self.result {
            Ok(SubgraphSearch::Found { size, .. }) => (PairStatus::Found, Some(*size), None),
            Ok(SubgraphSearch::NotFound { max_size }) => {
                (PairStatus::NotFound, Some(*max_size), None)
            }
            Err(TaskError::Cancelled) => (PairStatus::Cancelled, None, None),
            Err(err) => (PairStatus::Failed, None, Some(err.to_string())),
        };
        PairReport {
            head: self.pair.head.clone(),
            tail: self.pair.tail.clone(),
            status,
            size,
            rows: self.result.as_ref().map_or(0, SubgraphSearch::row_count),
            error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    Found,
    NotFound,
    Failed,
    Cancelled,
}

/// Serializable per-pair line of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairReport {
    pub head: String,
    pub tail: String,
    pub status: PairStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    pub rows: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub pairs: usize,
    pub found: usize,
    pub not_found: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub rows: u64,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One outcome per input pair, in input order.
    pub outcomes: Vec<PairOutcome>,
    pub elapsed: Duration,
}

impl BatchReport {
    /// Membership rows, grouped by pair in pair order.
    pub fn rows(&self) -> impl Iterator<Item = ResultRow> + '_ {
        self.outcomes.iter().flat_map(PairOutcome::rows)
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            pairs: self.outcomes.len(),
            ..BatchSummary::default()
        };
        for outcome in &self.outcomes {
            match &outcome.result {
                Ok(found @ SubgraphSearch::Found { .. }) => {
                    summary.found += 1;
                    summary.rows += found.row_count();
                }
                Ok(SubgraphSearch::NotFound { .. }) => summary.not_found += 1,
                Err(TaskError::Cancelled) => summary.cancelled += 1,
                Err(_) => summary.failed += 1,
            }
        }
        summary
    }

    pub fn pair_reports(&self) -> Vec<PairReport> {
        self.outcomes.iter().map(PairOutcome::report).collect()
    }

    /// Write the membership table as CSV (`head,tail,index`). The header is
    /// written even when there are no rows.
    pub fn write_rows<W: Write>(&self, writer: W) -> csv::Result<u64> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(["head", "tail", "index"])?;
        let mut written = 0u64;
        for row in self.rows() {
            let index = row.index.to_string();
            writer.write_record([row.head.as_str(), row.tail.as_str(), index.as_str()])?;
            written += 1;
        }
        writer.flush()?;
        Ok(written)
    }

    /// Write the run summary and per-pair statuses as pretty JSON.
    pub fn write_report<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        #[derive(Serialize)]
        struct Report {
            summary: BatchSummary,
            elapsed_ms: u128,
            pairs: Vec<PairReport>,
        }
        serde_json::to_writer_pretty(
            writer,
            &Report {
                summary: self.summary(),
                elapsed_ms: self.elapsed.as_millis(),
                pairs: self.pair_reports(),
            },
        )
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Run the smallest-subgraph search for every distinct pair.
pub fn subgraphs(
    store: &TripleStore,
    pairs: &[Pair],
    config: &ExtractConfig,
) -> Result<BatchReport, BatchError> {
    subgraphs_with_cancel(store, pairs, config, &CancellationToken::new())
}

/// Like [`subgraphs`], stopping early once `cancel` is set.
///
/// Repeated pairs are searched once; the report holds one outcome per
/// distinct pair, in first-seen order.
pub fn subgraphs_with_cancel(
    store: &TripleStore,
    pairs: &[Pair],
    config: &ExtractConfig,
    cancel: &CancellationToken,
) -> Result<BatchReport, BatchError> {
    config.validate()?;
    let pairs = dedup_pairs(pairs.iter().cloned());
    run_batch(&pairs, config, cancel, |pair, deadline| {
        search(
            store,
            &pair.head,
            &pair.tail,
            config.min_size,
            config.max_size,
            deadline,
        )
    })
}

/// Fan `pairs` out over a worker pool, one `search_pair` call per pair.
fn run_batch<F>(
    pairs: &[Pair],
    config: &ExtractConfig,
    cancel: &CancellationToken,
    search_pair: F,
) -> Result<BatchReport, BatchError>
where
    F: Fn(&Pair, Option<Instant>) -> Result<SubgraphSearch, DeadlineExceeded> + Sync,
{
    let started = Instant::now();
    let workers = config.worker_count();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("kgx-subgraph-{i}"))
        .build()?;

    tracing::info!(
        pairs = pairs.len(),
        workers,
        min_size = config.min_size,
        max_size = config.max_size,
        "extracting subgraphs"
    );

    let mut results: Vec<Option<Result<SubgraphSearch, TaskError>>> =
        (0..pairs.len()).map(|_| None).collect();

    let search_pair = &search_pair;
    let (tx, rx) = mpsc::channel();
    pool.in_place_scope(|scope| {
        for (i, pair) in pairs.iter().enumerate() {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let result = if cancel.is_cancelled() {
                    Err(TaskError::Cancelled)
                } else {
                    run_pair(pair, config, search_pair)
                };
                let _ = tx.send((i, result));
            });
        }
        drop(tx);

        for (done, (i, result)) in rx.iter().enumerate() {
            results[i] = Some(result);
            if (done + 1) % PROGRESS_EVERY == 0 {
                tracing::info!(done = done + 1, total = pairs.len(), "progress");
            }
        }
    });

    let outcomes: Vec<PairOutcome> = pairs
        .iter()
        .zip(results)
        .map(|(pair, result)| PairOutcome {
            pair: pair.clone(),
            // A task that never reported can only have been dropped by the pool.
            result: result.unwrap_or(Err(TaskError::Cancelled)),
        })
        .collect();

    for outcome in &outcomes {
        if let Err(err @ (TaskError::TimedOut { .. } | TaskError::Panicked(_))) = &outcome.result {
            tracing::warn!(
                head = %outcome.pair.head,
                tail = %outcome.pair.tail,
                error = %err,
                "pair failed"
            );
        }
    }

    let report = BatchReport {
        outcomes,
        elapsed: started.elapsed(),
    };
    let summary = report.summary();
    tracing::info!(
        pairs = summary.pairs,
        found = summary.found,
        not_found = summary.not_found,
        failed = summary.failed,
        cancelled = summary.cancelled,
        rows = summary.rows,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "subgraph extraction finished"
    );
    Ok(report)
}

fn run_pair<F>(
    pair: &Pair,
    config: &ExtractConfig,
    search_pair: &F,
) -> Result<SubgraphSearch, TaskError>
where
    F: Fn(&Pair, Option<Instant>) -> Result<SubgraphSearch, DeadlineExceeded>,
{
    let started = Instant::now();
    let deadline = config.task_timeout.map(|timeout| started + timeout);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| search_pair(pair, deadline)));

    match outcome {
        Ok(Ok(found)) => {
            tracing::debug!(
                head = %pair.head,
                tail = %pair.tail,
                size = found.size(),
                rows = found.row_count(),
                found = found.is_found(),
                "pair done"
            );
            Ok(found)
        }
        Ok(Err(expired)) => match config.timeout_policy {
            TimeoutPolicy::NotFound => Ok(SubgraphSearch::NotFound {
                max_size: config.max_size,
            }),
            TimeoutPolicy::Fail => Err(TaskError::TimedOut {
                size: expired.size,
                elapsed: started.elapsed(),
            }),
        },
        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
