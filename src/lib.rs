//! Byte-level byte pair encoding (BPE) tokenizer library and CLI.
//!
//! The crate learns a vocabulary of byte sequences from UTF-8 training texts
//! by repeatedly merging the most frequent adjacent pair, then uses it to map
//! text to token ids and back. Literal special tokens (control markers such as
//! `<|endoftext|>`) can be registered on top of the learned vocabulary; they
//! are always encoded as a single id.
//!
//! ```no_run
//! use textbpe::{Trainer, TrainerConfig};
//!
//! # fn main() -> textbpe::Result<()> {
//! let cfg = TrainerConfig::builder()
//!     .target_vocab_size(512)
//!     .special_tokens(["<|im_start|>", "<|im_end|>"])
//!     .show_progress(false)
//!     .build()?;
//! let tokenizer = Trainer::new(cfg)
//!     .train(&["some training text", "and some more"])?
//!     .into_tokenizer()?;
//!
//! let ids = tokenizer.encode_ids("<|im_start|>more text<|im_end|>");
//! assert_eq!(tokenizer.decode(&ids)?, "<|im_start|>more text<|im_end|>");
//! tokenizer.save("vocab.json", true)?;
//! # Ok(())
//! # }
//! ```
//!
//! The CLI is enabled by default through the `cli` feature. Users targeting the
//! library portion only can disable default features to avoid the CLI
//! dependencies: `textbpe = { version = "...", default-features = false }`.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    clippy::all,
    rust_2018_idioms,
    future_incompatible,
    unused_lifetimes,
    unreachable_pub
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::doc_markdown
)]

pub mod bytes;
pub mod config;
pub mod corpus;
pub mod error;
pub mod metrics;
pub mod serialization;
pub mod tokenizer;
pub mod trainer;
pub mod vocab;
mod word;

pub use config::{IngestConfig, TrainerBuilder, TrainerConfig};
pub use error::{BpeError, Result};
pub use metrics::{IterationMetrics, StopReason, TrainingMetrics};
pub use tokenizer::{Encoding, Tokenizer};
pub use trainer::{MergeObserver, Trainer, TrainerArtifacts};
pub use vocab::{TokenId, Vocabulary, VocabularyState};
