//! Core training loop that grows a [`Vocabulary`] by iterative pair merging.

use std::cmp::Ordering;
use std::time::Instant;
use std::fmt;

use log::{debug, info};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::TrainerConfig;
use crate::error::{BpeError, Result};
use crate::metrics::{IterationMetrics, StopReason, TrainingMetrics};
use crate::tokenizer::Tokenizer;
use crate::vocab::{TokenId, Vocabulary, BYTE_TOKEN_COUNT};
use crate::word::Word;

/// Merge pair encoded as `(left, right)` token identifiers.
pub type Pair = (TokenId, TokenId);

/// Receives a notification after every learned token.
///
/// Observers are purely informational and cannot influence training.
pub trait MergeObserver {
    /// Called with the number of tokens learned so far and the number the run is aiming for.
    fn on_merge(&mut self, completed: usize, target: usize);
}

impl<F> MergeObserver for F
where
    F: FnMut(usize, usize),
{
    fn on_merge(&mut self, completed: usize, target: usize) {
        self(completed, target);
    }
}

/// High-level façade configuring and executing BPE training runs.
#[derive(Debug, Clone)]
pub struct Trainer {
    cfg: TrainerConfig,
}

/// Artifacts returned after a training session completes.
#[must_use]
#[derive(Debug, Clone)]
pub struct TrainerArtifacts {
    /// Trained vocabulary, including any configured special tokens.
    pub vocab: Vocabulary,
    /// Detailed metrics captured during training.
    pub metrics: TrainingMetrics,
}

impl TrainerArtifacts {
    /// Builds a [`Tokenizer`] over the trained vocabulary.
    pub fn into_tokenizer(self) -> Result<Tokenizer> {
        Tokenizer::new(self.vocab)
    }
}

impl Trainer {
    /// Creates a new trainer for the supplied configuration.
    #[must_use]
    pub fn new(cfg: TrainerConfig) -> Self {
        Self { cfg }
    }

    /// Returns an immutable reference to the underlying configuration.
    #[must_use]
    pub fn config(&self) -> &TrainerConfig {
        &self.cfg
    }

    /// Trains a vocabulary from in-memory texts.
    pub fn train<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Result<TrainerArtifacts> {
        self.train_with_observer(texts, &mut |_: usize, _: usize| {})
    }

    /// Trains a vocabulary, reporting each learned token to `observer`.
    ///
    /// Every text is merged independently; no token spans two texts. Running
    /// out of pairs is a normal way to finish and yields a smaller vocabulary.
    pub fn train_with_observer<S, O>(&self, texts: &[S], observer: &mut O) -> Result<TrainerArtifacts>
    where
        S: AsRef<str> + Sync,
        O: MergeObserver + ?Sized,
    {
        self.cfg.validate()?;

        let mut vocab = Vocabulary::new();
        vocab.register_byte_tokens()?;

        let mut words: Vec<Word> = texts
            .par_iter()
            .map(|text| Word::from_bytes(text.as_ref().as_bytes()))
            .collect();

        let mut merge_budget = self.cfg.target_vocab_size.saturating_sub(BYTE_TOKEN_COUNT);
        if let Some(limit) = self.cfg.max_merge_iterations {
            merge_budget = merge_budget.min(limit);
        }

        let mut metrics = TrainingMetrics::new(merge_budget.min(16_384));
        let training_start = Instant::now();

        loop {
            if vocab.size() >= self.cfg.target_vocab_size {
                metrics.stop_reason = StopReason::TargetVocabReached;
                break;
            }
            if metrics.learned() >= merge_budget {
                metrics.stop_reason = StopReason::MaxIterationsReached;
                break;
            }

            let iteration_start = Instant::now();
            let pair_stats = compute_pair_stats(&words);
            let candidates = collect_candidates(&pair_stats, &vocab);
            let distinct_pairs = candidates.len();

            let Some((token, stat)) = select_best(candidates) else {
                debug!("no adjacent pairs remain after {} merges", metrics.learned());
                metrics.stop_reason = StopReason::NoMergeablePairs;
                break;
            };
            if stat.count < self.cfg.min_frequency {
                debug!(
                    "best pair frequency {} is below min_frequency {}",
                    stat.count, self.cfg.min_frequency
                );
                metrics.stop_reason = StopReason::NoMergeablePairs;
                break;
            }

            let (token_id, absorbed) = match vocab.lookup_id(&token) {
                Some(existing) => (existing, true),
                None => (vocab.learn(token.clone())?, false),
            };

            let merges_applied = apply_merge(&mut words, &token, token_id, &vocab);
            if merges_applied == 0 {
                return Err(BpeError::Internal(format!(
                    "selected pair for token {token_id} matched nothing"
                )));
            }

            if absorbed {
                // Two id pairs spelled an existing token; fold them into it.
                debug!(
                    "absorbed {} occurrences into existing token {}",
                    merges_applied, token_id
                );
                metrics.absorbed_merges += 1;
                continue;
            }

            let iteration = metrics.learned() + 1;
            if self.cfg.show_progress {
                info!(
                    "iter {:>6} freq {:>8} merges {:>8} distinct_pairs {:>8} vocab {:>8}",
                    iteration,
                    stat.count,
                    merges_applied,
                    distinct_pairs,
                    vocab.size()
                );
            }

            metrics.iterations.push(IterationMetrics {
                iteration,
                best_frequency: stat.count,
                merges_applied,
                distinct_pairs,
                vocab_size: vocab.size(),
                elapsed_iteration: iteration_start.elapsed(),
                elapsed_total: training_start.elapsed(),
            });
            observer.on_merge(iteration, merge_budget);
        }

        let added = vocab.add_special_tokens(&self.cfg.special_tokens)?;
        let total_duration = training_start.elapsed();
        metrics.total_duration = total_duration;

        if self.cfg.show_progress {
            info!(
                "completed {} merges in {:.2?}; vocab size {} ({} special tokens)",
                metrics.learned(),
                total_duration,
                vocab.size(),
                added
            );
        }

        Ok(TrainerArtifacts { vocab, metrics })
    }
}

/// Occurrence count of a candidate plus where it was first seen as `(text, position)`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct PairStat {
    count: usize,
    first_seen: (usize, usize),
}

impl PairStat {
    fn absorb(&mut self, other: PairStat) {
        self.count += other.count;
        self.first_seen = self.first_seen.min(other.first_seen);
    }

    /// Higher count wins; ties go to the candidate seen first in the corpus.
    fn rank(&self, other: &Self) -> Ordering {
        self.count
            .cmp(&other.count)
            .then_with(|| other.first_seen.cmp(&self.first_seen))
    }
}

fn compute_pair_stats(words: &[Word]) -> FxHashMap<Pair, PairStat> {
    words
        .par_iter()
        .enumerate()
        .map(|(text_idx, word)| {
            let mut local: FxHashMap<Pair, PairStat> = FxHashMap::default();
            if !word.has_pairs() {
                return local;
            }
            word.for_each_pair(|pos, left, right| {
                local
                    .entry((left, right))
                    .and_modify(|stat| stat.count += 1)
                    .or_insert(PairStat {
                        count: 1,
                        first_seen: (text_idx, pos),
                    });
            });
            local
        })
        .reduce(FxHashMap::default, |mut acc, local| {
            for (pair, stat) in local {
                acc.entry(pair)
                    .and_modify(|existing| existing.absorb(stat))
                    .or_insert(stat);
            }
            acc
        })
}

/// Folds id pairs into candidate tokens keyed by their concatenated bytes.
fn collect_candidates(
    pair_stats: &FxHashMap<Pair, PairStat>,
    vocab: &Vocabulary,
) -> FxHashMap<Vec<u8>, PairStat> {
    let mut candidates: FxHashMap<Vec<u8>, PairStat> = FxHashMap::default();
    candidates.reserve(pair_stats.len());
    for (&(left, right), &stat) in pair_stats {
        let left = vocab.lookup_token(left).unwrap_or_default();
        let right = vocab.lookup_token(right).unwrap_or_default();
        let mut token = Vec::with_capacity(left.len() + right.len());
        token.extend_from_slice(left);
        token.extend_from_slice(right);
        candidates
            .entry(token)
            .and_modify(|existing| existing.absorb(stat))
            .or_insert(stat);
    }
    candidates
}

fn select_best(candidates: FxHashMap<Vec<u8>, PairStat>) -> Option<(Vec<u8>, PairStat)> {
    candidates
        .into_iter()
        .max_by(|(_, a), (_, b)| a.rank(b))
}

fn apply_merge(words: &mut [Word], token: &[u8], token_id: TokenId, vocab: &Vocabulary) -> usize {
    words
        .par_iter_mut()
        .map(|word| word.merge(token, token_id, |id| vocab.lookup_token(id).unwrap_or_default()))
        .sum()
}

impl fmt::Display for TrainerArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BPE vocabulary with {} ids", self.vocab.size())?;
        writeln!(f, "Learned merges: {}", self.metrics.learned())?;
        writeln!(f, "Stop reason: {:?}", self.metrics.stop_reason)?;
        writeln!(f, "Total duration: {:?}", self.metrics.total_duration)?;
        Ok(())
    }
}
