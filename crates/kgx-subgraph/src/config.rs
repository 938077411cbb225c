//! Extraction settings shared by the batch driver and the CLI.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What an expired per-pair deadline turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Same terminal outcome as an exhausted search range.
    #[default]
    NotFound,
    /// Record the pair as failed.
    Fail,
}

/// Parameters of one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Smallest hop count tried (>= 1).
    pub min_size: u32,
    /// Largest hop count tried (>= `min_size`).
    pub max_size: u32,
    /// Worker threads; `None` uses the available parallelism.
    pub workers: Option<usize>,
    /// Wall-clock cap per pair, checked between expansion rounds.
    pub task_timeout: Option<Duration>,
    pub timeout_policy: TimeoutPolicy,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_size: 2,
            max_size: 4,
            workers: None,
            task_timeout: None,
            timeout_policy: TimeoutPolicy::NotFound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("min_size must be at least 1")]
    MinSizeZero,
    #[error("max_size ({max_size}) must not be smaller than min_size ({min_size})")]
    InvertedRange { min_size: u32, max_size: u32 },
    #[error("workers must be at least 1")]
    ZeroWorkers,
}

impl ExtractConfig {
    pub fn with_sizes(min_size: u32, max_size: u32) -> Self {
        Self {
            min_size,
            max_size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_size == 0 {
            return Err(ConfigError::MinSizeZero);
        }
        if self.max_size < self.min_size {
            return Err(ConfigError::InvertedRange {
                min_size: self.min_size,
                max_size: self.max_size,
            });
        }
        if self.workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_cli() {
        let config = ExtractConfig::default();
        assert_eq!((config.min_size, config.max_size), (2, 4));
        assert!(config.validate().is_ok());
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn rejects_bad_ranges() {
        assert_eq!(
            ExtractConfig::with_sizes(0, 3).validate(),
            Err(ConfigError::MinSizeZero)
        );
        assert_eq!(
            ExtractConfig::with_sizes(3, 2).validate(),
            Err(ConfigError::InvertedRange {
                min_size: 3,
                max_size: 2
            })
        );
        let config = ExtractConfig {
            workers: Some(0),
            ..ExtractConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroWorkers));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ExtractConfig =
            serde_json::from_str(r#"{"max_size": 6, "timeout_policy": "fail"}"#).unwrap();
        assert_eq!(config.min_size, 2);
        assert_eq!(config.max_size, 6);
        assert_eq!(config.timeout_policy, TimeoutPolicy::Fail);
    }
}
