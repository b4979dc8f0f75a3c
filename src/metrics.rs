//! Metrics describing the evolution of the training process.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reason a training run terminated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// The configured target vocabulary size was reached.
    TargetVocabReached,
    /// The configured maximum merge iterations was reached.
    MaxIterationsReached,
    /// No adjacent pair is left, or none reaches the minimum frequency.
    NoMergeablePairs,
}

/// Metrics captured for each learned merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IterationMetrics {
    /// Sequential iteration number (1-indexed).
    pub iteration: usize,
    /// Frequency of the winning pair.
    pub best_frequency: usize,
    /// Total number of pair occurrences replaced within the corpus.
    pub merges_applied: usize,
    /// Count of distinct candidate tokens seen while selecting the winner.
    pub distinct_pairs: usize,
    /// Vocabulary size after the merge was learned.
    pub vocab_size: usize,
    /// Execution time for the iteration.
    pub elapsed_iteration: Duration,
    /// Total time elapsed since training started.
    pub elapsed_total: Duration,
}

/// Aggregate metrics produced by a training session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingMetrics {
    /// Per-iteration snapshots accrued during training.
    pub iterations: Vec<IterationMetrics>,
    /// Merge steps whose winner was already a known token and so allocated no id.
    pub absorbed_merges: usize,
    /// Total duration of the training session.
    pub total_duration: Duration,
    /// Reason training terminated.
    pub stop_reason: StopReason,
}

impl TrainingMetrics {
    /// Creates an empty metrics container with pre-allocated capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            iterations: Vec::with_capacity(capacity),
            absorbed_merges: 0,
            total_duration: Duration::ZERO,
            stop_reason: StopReason::TargetVocabReached,
        }
    }

    /// Number of tokens learned during the session.
    #[must_use]
    pub fn learned(&self) -> usize {
        self.iterations.len()
    }
}
