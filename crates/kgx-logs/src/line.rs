//! Single-line recognizers for the trainer's evaluation blocks.
//!
//! An evaluation block looks like:
//!
//! ```text
//! ------Test Results for FB15k: Epoch: 100 --- time: 12.34------------
//! --mr,  filtered mr             : 226.0000, 130.0000
//! --mrr, filtered mrr            : 0.1910, 0.3019
//! --hits1                        : 0.1000
//! --filtered hits1               : 0.2000
//! ---------------------------------------------------------
//! ```

use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub struct MetricValue {
    pub metric: String,
    pub value: f64,
}

impl MetricValue {
    fn new(metric: impl Into<String>, value: f64) -> Self {
        Self {
            metric: metric.into(),
            value,
        }
    }
}

/// What a log line means to the block scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// `Test Results ... Epoch: n`
    BlockStart { epoch: u64 },
    /// A line made only of dashes.
    BlockEnd,
    /// Early stopping; nothing after this is read.
    Stop,
    Metrics(Vec<MetricValue>),
    Other,
}

#[derive(Debug, Clone)]
pub struct LineParser {
    epoch: Regex,
    rank: Regex,
    hits: Regex,
}

impl LineParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            epoch: Regex::new(r"Epoch:\s*(?P<epoch>\d+)")?,
            rank: Regex::new(
                r"^\s*--(?P<metric>mrr?)\b.*?(?P<value>\d+\.\d+),\s*(?P<filtered>\d+\.\d+)",
            )?,
            hits: Regex::new(r"(?P<metric>hits\d+)\D*?(?P<value>\d+\.\d+)")?,
        })
    }

    /// Classify one line. `in_block` says whether an evaluation block is open;
    /// metrics are only recognized inside one and `Stop` only outside.
    pub fn classify(&self, line: &str, in_block: bool) -> LineKind {
        let line = line.trim_end_matches(['\r', '\n']);

        if line.contains("Test Results") {
            if let Some(epoch) = self
                .epoch
                .captures(line)
                .and_then(|c| c["epoch"].parse().ok())
            {
                return LineKind::BlockStart { epoch };
            }
            tracing::warn!(line, "evaluation header without an epoch");
            return LineKind::BlockEnd;
        }
        if !line.is_empty() && line.bytes().all(|b| b == b'-') {
            return LineKind::BlockEnd;
        }
        if !in_block {
            if line.contains("Stop the training") {
                return LineKind::Stop;
            }
            return LineKind::Other;
        }

        match self.metrics(line) {
            Some(values) => LineKind::Metrics(values),
            None => LineKind::Other,
        }
    }

    /// Metric values on an evaluation line, if it is one.
    pub fn metrics(&self, line: &str) -> Option<Vec<MetricValue>> {
        if line.contains("mr") {
            let caps = self.rank.captures(line)?;
            let metric = &caps["metric"];
            let value = caps["value"].parse().ok()?;
            let filtered = caps["filtered"].parse().ok()?;
            return Some(vec![
                MetricValue::new(metric, value),
                MetricValue::new(format!("{metric}_filtered"), filtered),
            ]);
        }

        let caps = self.hits.captures(line)?;
        let value = caps["value"].parse().ok()?;
        let metric = if line.contains("filtered") {
            format!("{}_filtered", &caps["metric"])
        } else {
            caps["metric"].to_string()
        };
        Some(vec![MetricValue::new(metric, value)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> LineParser {
        LineParser::new().unwrap()
    }

    #[test]
    fn rank_lines_yield_raw_and_filtered() {
        let values = parser()
            .metrics("--mr,  filtered mr             : 226.0000, 130.5000")
            .unwrap();
        assert_eq!(
            values,
            vec![
                MetricValue::new("mr", 226.0),
                MetricValue::new("mr_filtered", 130.5),
            ]
        );

        let values = parser()
            .metrics("--mrr, filtered mrr            : 0.1910, 0.3019")
            .unwrap();
        assert_eq!(values[0], MetricValue::new("mrr", 0.1910));
        assert_eq!(values[1], MetricValue::new("mrr_filtered", 0.3019));
    }

    #[test]
    fn hits_lines_mark_filtered() {
        assert_eq!(
            parser().metrics("--hits10                       : 0.4512").unwrap(),
            vec![MetricValue::new("hits10", 0.4512)]
        );
        assert_eq!(
            parser().metrics("--filtered hits3               : 0.3000").unwrap(),
            vec![MetricValue::new("hits3_filtered", 0.3)]
        );
    }

    #[test]
    fn unrelated_lines_are_not_metrics() {
        assert!(parser().metrics("--# of entities, # of relations: 14951, 1345").is_none());
        assert!(parser().metrics("training loss: 12.5").is_none());
    }

    #[test]
    fn block_markers() {
        let p = parser();
        assert_eq!(
            p.classify("------Test Results for FB15k: Epoch: 100 --- time: 1.2------\n", false),
            LineKind::BlockStart { epoch: 100 }
        );
        assert_eq!(p.classify("--------------\r\n", true), LineKind::BlockEnd);
        assert_eq!(p.classify("Stop the training at epoch 7", false), LineKind::Stop);
        assert_eq!(p.classify("Stop the training at epoch 7", true), LineKind::Other);
        assert_eq!(p.classify("--hits1 : 0.5", false), LineKind::Other);
    }
}
