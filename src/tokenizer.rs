//! Encoding text to token ids and decoding ids back to text.

use std::path::Path;

use aho_corasick::{AhoCorasick, MatchKind};
use log::debug;

use crate::error::{BpeError, Result};
use crate::serialization;
use crate::vocab::{TokenId, Vocabulary};
use crate::word::Word;

/// Output of [`Tokenizer::encode`]: ids plus the bytes each id stands for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Encoding {
    ids: Vec<TokenId>,
    tokens: Vec<Vec<u8>>,
}

impl Encoding {
    /// Token ids in text order.
    #[must_use]
    pub fn ids(&self) -> &[TokenId] {
        &self.ids
    }

    /// Token bytes aligned with [`Encoding::ids`]; special tokens appear as their UTF-8.
    #[must_use]
    pub fn tokens(&self) -> &[Vec<u8>] {
        &self.tokens
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true when nothing was encoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Consumes the encoding, returning only the ids.
    #[must_use]
    pub fn into_ids(self) -> Vec<TokenId> {
        self.ids
    }
}

/// Byte-level BPE codec over a trained [`Vocabulary`].
///
/// Reads (`encode`, `decode`) take `&self` and may run concurrently.
/// Registering special tokens takes `&mut self`, so it cannot overlap with them.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    vocab: Vocabulary,
    specials: Option<SpecialMatcher>,
}

/// Automaton over the special tokens; `ids[i]` is the id of pattern `i`.
#[derive(Debug, Clone)]
struct SpecialMatcher {
    automaton: AhoCorasick,
    ids: Vec<TokenId>,
}

impl Tokenizer {
    /// Wraps a vocabulary, preparing the special-token matcher.
    ///
    /// Fails with [`BpeError::InvalidConfig`] unless ids `0..=255` hold the
    /// single bytes, since every encoding starts from one id per byte.
    pub fn new(vocab: Vocabulary) -> Result<Self> {
        if !vocab.has_byte_alphabet() {
            return Err(BpeError::InvalidConfig(format!(
                "vocabulary of {} ids does not start with the 256 byte tokens",
                vocab.size()
            )));
        }
        let specials = build_special_matcher(&vocab)?;
        Ok(Self { vocab, specials })
    }

    /// Loads a tokenizer from a vocabulary JSON file written by [`Tokenizer::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(serialization::load_vocabulary(path)?)
    }

    /// Persists the vocabulary as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P, pretty: bool) -> Result<()> {
        serialization::save_vocabulary(&self.vocab, path, pretty)
    }

    /// Underlying vocabulary.
    #[must_use]
    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Total number of ids, special tokens included.
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.vocab.size()
    }

    /// Registers special tokens and rebuilds the matcher; returns how many were new.
    pub fn add_special_tokens<I, S>(&mut self, tokens: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let added = self.vocab.add_special_tokens(tokens)?;
        if added > 0 {
            self.specials = build_special_matcher(&self.vocab)?;
        }
        Ok(added)
    }

    /// Encodes `text`, isolating special tokens and merging everything else.
    #[must_use]
    pub fn encode(&self, text: &str) -> Encoding {
        let mut encoding = Encoding::default();
        let Some(matcher) = &self.specials else {
            self.encode_ordinary(text, &mut encoding);
            return encoding;
        };

        let mut cursor = 0usize;
        for found in matcher.automaton.find_iter(text) {
            self.encode_ordinary(&text[cursor..found.start()], &mut encoding);
            encoding.ids.push(matcher.ids[found.pattern().as_usize()]);
            encoding
                .tokens
                .push(text.as_bytes()[found.start()..found.end()].to_vec());
            cursor = found.end();
        }
        self.encode_ordinary(&text[cursor..], &mut encoding);
        encoding
    }

    /// Encodes `text` and returns only the ids.
    #[must_use]
    pub fn encode_ids(&self, text: &str) -> Vec<TokenId> {
        self.encode(text).into_ids()
    }

    fn encode_ordinary(&self, chunk: &str, encoding: &mut Encoding) {
        if chunk.is_empty() {
            return;
        }
        let word = self.merge_chunk(chunk.as_bytes());
        for &id in word.ids() {
            encoding.ids.push(id);
            encoding
                .tokens
                .push(self.vocab.lookup_token(id).unwrap_or_default().to_vec());
        }
    }

    /// Applies the earliest-learned applicable merge until none applies.
    fn merge_chunk(&self, bytes: &[u8]) -> Word {
        let mut word = Word::from_bytes(bytes);
        let mut scratch = Vec::new();
        while word.has_pairs() {
            let mut best: Option<TokenId> = None;
            word.for_each_pair(|_, left, right| {
                scratch.clear();
                scratch.extend_from_slice(self.vocab.lookup_token(left).unwrap_or_default());
                scratch.extend_from_slice(self.vocab.lookup_token(right).unwrap_or_default());
                if let Some(id) = self.vocab.lookup_id(&scratch) {
                    if best.map_or(true, |current| id < current) {
                        best = Some(id);
                    }
                }
            });
            let Some(best) = best else {
                break;
            };
            let target = self.vocab.lookup_token(best).unwrap_or_default();
            word.merge(target, best, |id| {
                self.vocab.lookup_token(id).unwrap_or_default()
            });
        }
        word
    }

    /// Decodes ids into text.
    ///
    /// Fails with [`BpeError::UnknownId`] for ids outside the vocabulary and
    /// [`BpeError::InvalidUtf8`] when the bytes are not UTF-8 (for example a
    /// multi-byte character cut between separately decoded id runs).
    pub fn decode(&self, ids: &[TokenId]) -> Result<String> {
        let bytes = self.decode_to_bytes(ids, false)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Decodes ids into raw bytes without UTF-8 validation.
    pub fn decode_to_bytes(&self, ids: &[TokenId], skip_special_tokens: bool) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(ids.len() * 2);
        for &id in ids {
            if skip_special_tokens && self.vocab.is_special(id) {
                continue;
            }
            bytes.extend_from_slice(self.vocab.token_bytes(id)?);
        }
        Ok(bytes)
    }
}

/// Literal matcher over special tokens. `LeftmostFirst` picks the earliest
/// start and, among tokens starting there, the one registered first.
fn build_special_matcher(vocab: &Vocabulary) -> Result<Option<SpecialMatcher>> {
    let (patterns, ids): (Vec<&str>, Vec<TokenId>) = vocab.special_tokens().unzip();
    if patterns.is_empty() {
        return Ok(None);
    }
    debug!("building special token matcher over {} tokens", patterns.len());
    let automaton = AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostFirst)
        .build(&patterns)
        .map_err(|err| BpeError::Internal(format!("special token matcher: {err}")))?;
    Ok(Some(SpecialMatcher { automaton, ids }))
}
