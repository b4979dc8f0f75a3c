//! Configuration builders controlling training and corpus ingestion.

use std::collections::HashSet;

use crate::error::{BpeError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for BPE vocabulary training.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainerConfig {
    /// Number of ids to allocate through training, including the 256 byte tokens.
    ///
    /// Values below 256 are accepted and yield the bare byte vocabulary.
    /// Special tokens are registered after training and sit above this budget.
    pub target_vocab_size: usize,
    /// Minimum number of pair occurrences required before a merge is learned.
    pub min_frequency: usize,
    /// Enables per-iteration logging through the `log` facade.
    pub show_progress: bool,
    /// Special tokens registered, in order, once training completes.
    pub special_tokens: Vec<String>,
    /// Hard cap on learned merges; `None` leaves the target vocabulary size as the only bound.
    pub max_merge_iterations: Option<usize>,
}

impl TrainerConfig {
    /// Returns a builder initialised with [`TrainerConfig::default`].
    #[must_use]
    pub fn builder() -> TrainerBuilder {
        TrainerBuilder::default()
    }

    /// Validates the invariants required for training.
    pub fn validate(&self) -> Result<()> {
        let max_vocab = usize::try_from(u32::MAX).unwrap_or(usize::MAX);
        if self.target_vocab_size.saturating_add(self.special_tokens.len()) > max_vocab {
            return Err(BpeError::InvalidConfig(format!(
                "target_vocab_size ({}) plus special tokens exceeds {max_vocab}, the maximum representable TokenId",
                self.target_vocab_size
            )));
        }
        if self.min_frequency == 0 {
            return Err(BpeError::InvalidConfig(
                "min_frequency must be greater than zero".into(),
            ));
        }
        if self.special_tokens.iter().any(String::is_empty) {
            return Err(BpeError::InvalidConfig(
                "special tokens must not be empty strings".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            target_vocab_size: 1024,
            min_frequency: 1,
            show_progress: true,
            special_tokens: Vec::new(),
            max_merge_iterations: None,
        }
    }
}

/// Builder for [`TrainerConfig`].
#[derive(Debug, Default, Clone)]
pub struct TrainerBuilder {
    cfg: TrainerConfig,
}

impl TrainerBuilder {
    /// Creates a builder with [`TrainerConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the desired vocabulary size (including base byte tokens).
    #[must_use]
    pub fn target_vocab_size(mut self, value: usize) -> Self {
        self.cfg.target_vocab_size = value;
        self
    }

    /// Sets the minimum merge frequency.
    #[must_use]
    pub fn min_frequency(mut self, value: usize) -> Self {
        self.cfg.min_frequency = value;
        self
    }

    /// Enables or disables per-iteration logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Overrides the special tokens registered after training.
    #[must_use]
    pub fn special_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cfg.special_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Sets a hard merge iteration limit.
    #[must_use]
    pub fn max_merge_iterations(mut self, value: Option<usize>) -> Self {
        self.cfg.max_merge_iterations = value;
        self
    }

    /// Finalises the builder, returning a validated [`TrainerConfig`].
    pub fn build(mut self) -> Result<TrainerConfig> {
        let mut seen = HashSet::with_capacity(self.cfg.special_tokens.len());
        self.cfg
            .special_tokens
            .retain(|token| seen.insert(token.clone()));
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration controlling how text corpora are discovered on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestConfig {
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
        }
    }
}

impl IngestConfig {
    /// Returns a builder initialised with [`IngestConfig::default`].
    #[must_use]
    pub fn builder() -> IngestBuilder {
        IngestBuilder::default()
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug, Default, Clone)]
pub struct IngestBuilder {
    cfg: IngestConfig,
}

impl IngestBuilder {
    /// Creates a new builder with [`IngestConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables recursive directory traversal.
    #[must_use]
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.cfg.recursive = enabled;
        self
    }

    /// Enables or disables following of symlinks when traversing directories.
    #[must_use]
    pub fn follow_symlinks(mut self, enabled: bool) -> Self {
        self.cfg.follow_symlinks = enabled;
        self
    }

    /// Finalises the builder, returning the [`IngestConfig`].
    pub fn build(self) -> IngestConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_deduplicates_special_tokens_in_order() {
        let cfg = TrainerConfig::builder()
            .special_tokens(["<e>", "<s>", "<e>"])
            .show_progress(false)
            .build()
            .expect("config should be valid");
        assert_eq!(cfg.special_tokens, vec!["<e>".to_string(), "<s>".to_string()]);
    }

    #[test]
    fn validate_accepts_vocab_below_byte_alphabet() {
        let cfg = TrainerConfig {
            target_vocab_size: 100,
            ..TrainerConfig::default()
        };
        cfg.validate().expect("small targets are clamped during training");
    }

    #[test]
    fn validate_rejects_empty_special_token() {
        let err = TrainerConfig::builder()
            .special_tokens(["<s>", ""])
            .build()
            .expect_err("empty special token must be rejected");
        assert!(matches!(err, BpeError::InvalidConfig(_)));
    }

    #[test]
    fn validate_rejects_zero_min_frequency() {
        let err = TrainerConfig::builder()
            .min_frequency(0)
            .build()
            .expect_err("zero min_frequency must be rejected");
        assert!(matches!(err, BpeError::InvalidConfig(_)));
    }

    #[test]
    fn ingest_builder_overrides_defaults() {
        let cfg = IngestConfig::builder()
            .recursive(false)
            .follow_symlinks(true)
            .build();
        assert!(!cfg.recursive);
        assert!(cfg.follow_symlinks);
    }
}
