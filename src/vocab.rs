//! The id arena shared by learned byte tokens and the special-token overlay.
//!
//! Ids are handed out by a single monotone counter. Ids `0..=255` are the raw
//! bytes in byte order, later ids follow learning order, and special tokens
//! take whatever id is next at the time they are registered. Because merge
//! priority during encoding is "lowest id first", the id order of learned
//! tokens *is* the merge order.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::bytes::{bytes_to_latin1, latin1_to_bytes, printable};
use crate::error::{BpeError, Result};

/// Token identifier used throughout the crate.
pub type TokenId = u32;

/// Number of single-byte tokens seeded before any merge is learned.
pub const BYTE_TOKEN_COUNT: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Bytes(Vec<u8>),
    Special(String),
}

/// Bidirectional mapping between tokens and ids.
///
/// `slots` is the owning id -> token table; the two hash maps are derived
/// from it and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    slots: Vec<Slot>,
    byte_ids: FxHashMap<Vec<u8>, TokenId>,
    special_ids: FxHashMap<String, TokenId>,
    special_order: Vec<TokenId>,
}

impl Vocabulary {
    /// Creates an empty vocabulary with no ids allocated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a vocabulary holding only the 256 single-byte tokens.
    #[must_use]
    pub fn with_byte_tokens() -> Self {
        let mut vocab = Self::new();
        vocab.seed_bytes();
        vocab
    }

    /// Total number of ids allocated so far (byte tokens and special tokens).
    #[must_use]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Returns true when no id has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of byte tokens (raw bytes plus learned merges).
    #[must_use]
    pub fn byte_token_count(&self) -> usize {
        self.byte_ids.len()
    }

    /// Number of registered special tokens.
    #[must_use]
    pub fn special_token_count(&self) -> usize {
        self.special_order.len()
    }

    /// Seeds ids `0..=255` with the single-byte tokens.
    ///
    /// Must be the first allocation; seeding a non-empty vocabulary is rejected.
    pub fn register_byte_tokens(&mut self) -> Result<()> {
        if !self.is_empty() {
            return Err(BpeError::InvalidConfig(format!(
                "byte tokens must be registered into an empty vocabulary (size is {})",
                self.size()
            )));
        }
        self.seed_bytes();
        Ok(())
    }

    fn seed_bytes(&mut self) {
        self.slots.reserve(BYTE_TOKEN_COUNT);
        self.byte_ids.reserve(BYTE_TOKEN_COUNT);
        for byte in 0u8..=u8::MAX {
            self.byte_ids.insert(vec![byte], TokenId::from(byte));
            self.slots.push(Slot::Bytes(vec![byte]));
        }
    }

    /// Assigns the next id to a composite token that is not yet known.
    pub fn learn(&mut self, token: Vec<u8>) -> Result<TokenId> {
        if token.is_empty() {
            return Err(BpeError::InvalidConfig("cannot learn an empty token".into()));
        }
        if self.byte_ids.contains_key(&token) {
            return Err(BpeError::DuplicateToken {
                token: printable(&token),
            });
        }
        let id = self.allocate()?;
        self.byte_ids.insert(token.clone(), id);
        self.slots.push(Slot::Bytes(token));
        Ok(id)
    }

    /// Registers special tokens in input order, skipping ones already present.
    ///
    /// Returns the number of newly allocated ids.
    pub fn add_special_tokens<I, S>(&mut self, tokens: I) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0usize;
        for token in tokens {
            let token = token.as_ref();
            if token.is_empty() {
                return Err(BpeError::InvalidConfig(
                    "special tokens must not be empty strings".into(),
                ));
            }
            if self.special_ids.contains_key(token) {
                continue;
            }
            let id = self.allocate()?;
            self.special_ids.insert(token.to_owned(), id);
            self.special_order.push(id);
            self.slots.push(Slot::Special(token.to_owned()));
            added += 1;
        }
        Ok(added)
    }

    fn allocate(&self) -> Result<TokenId> {
        TokenId::try_from(self.slots.len())
            .map_err(|_| BpeError::Internal("vocabulary size exceeded u32::MAX".into()))
    }

    /// Id of a byte token, if it has been seeded or learned.
    #[must_use]
    pub fn lookup_id(&self, token: &[u8]) -> Option<TokenId> {
        self.byte_ids.get(token).copied()
    }

    /// Bytes of the byte token with the given id; `None` for special ids.
    #[must_use]
    pub fn lookup_token(&self, id: TokenId) -> Option<&[u8]> {
        match self.slots.get(id as usize)? {
            Slot::Bytes(bytes) => Some(bytes),
            Slot::Special(_) => None,
        }
    }

    /// Id of a registered special token.
    #[must_use]
    pub fn lookup_special_id(&self, token: &str) -> Option<TokenId> {
        self.special_ids.get(token).copied()
    }

    /// String of the special token with the given id; `None` for byte ids.
    #[must_use]
    pub fn lookup_special_string(&self, id: TokenId) -> Option<&str> {
        match self.slots.get(id as usize)? {
            Slot::Special(token) => Some(token),
            Slot::Bytes(_) => None,
        }
    }

    /// Returns true when `id` belongs to the special-token overlay.
    #[must_use]
    pub fn is_special(&self, id: TokenId) -> bool {
        matches!(self.slots.get(id as usize), Some(Slot::Special(_)))
    }

    /// Bytes contributed by `id` when decoding: token bytes or the UTF-8 of a special token.
    pub fn token_bytes(&self, id: TokenId) -> Result<&[u8]> {
        match self.slots.get(id as usize) {
            Some(Slot::Bytes(bytes)) => Ok(bytes),
            Some(Slot::Special(token)) => Ok(token.as_bytes()),
            None => Err(BpeError::UnknownId { id }),
        }
    }

    /// Special tokens paired with their ids, in registration order.
    pub fn special_tokens(&self) -> impl Iterator<Item = (&str, TokenId)> + '_ {
        self.special_order
            .iter()
            .filter_map(move |&id| self.lookup_special_string(id).map(|token| (token, id)))
    }

    /// Byte tokens paired with their ids, in id (learning) order.
    pub fn byte_tokens(&self) -> impl Iterator<Item = (&[u8], TokenId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| match slot {
                Slot::Bytes(bytes) => Some((bytes.as_slice(), idx as TokenId)),
                Slot::Special(_) => None,
            })
    }

    /// Snapshot of every token's serialized bytes mapped to its id.
    ///
    /// Special tokens appear as their UTF-8 encoding and shadow a byte token
    /// with identical bytes. Intended for inspection and export only.
    #[must_use]
    pub fn full_vocab(&self) -> FxHashMap<Vec<u8>, TokenId> {
        let mut out = self.byte_ids.clone();
        for (token, id) in self.special_tokens() {
            out.insert(token.as_bytes().to_vec(), id);
        }
        out
    }

    /// Captures the persistable state of the vocabulary.
    #[must_use]
    pub fn to_state(&self) -> VocabularyState {
        VocabularyState {
            tokens: self
                .byte_tokens()
                .map(|(bytes, id)| TokenEntry {
                    token: bytes_to_latin1(bytes),
                    id,
                })
                .collect(),
            special_tokens: self
                .special_tokens()
                .map(|(content, id)| SpecialEntry {
                    content: content.to_owned(),
                    id,
                })
                .collect(),
            next_id: self.slots.len() as TokenId,
        }
    }

    /// Rebuilds a vocabulary, including both lookup directions, from persisted state.
    pub fn from_state(state: VocabularyState) -> Result<Self> {
        let size = state.next_id as usize;
        if size < BYTE_TOKEN_COUNT {
            return Err(BpeError::Serialization(format!(
                "next_id is {size} but the {BYTE_TOKEN_COUNT} byte tokens are required"
            )));
        }
        let assigned = state.tokens.len() + state.special_tokens.len();
        if assigned != size {
            return Err(BpeError::Serialization(format!(
                "next_id is {size} but {assigned} ids are assigned"
            )));
        }

        let mut slots: Vec<Option<Slot>> = vec![None; size];
        let mut place = |id: TokenId, slot: Slot| -> Result<()> {
            let Some(entry) = slots.get_mut(id as usize) else {
                return Err(BpeError::Serialization(format!(
                    "id {id} is not below next_id {size}"
                )));
            };
            if entry.is_some() {
                return Err(BpeError::Serialization(format!(
                    "id {id} is assigned more than once"
                )));
            }
            *entry = Some(slot);
            Ok(())
        };

        let mut byte_ids = FxHashMap::default();
        byte_ids.reserve(state.tokens.len());
        for entry in state.tokens {
            let bytes = latin1_to_bytes(&entry.token)?;
            if bytes.is_empty() {
                return Err(BpeError::Serialization(format!(
                    "id {} maps to an empty token",
                    entry.id
                )));
            }
            if byte_ids.insert(bytes.clone(), entry.id).is_some() {
                return Err(BpeError::Serialization(format!(
                    "token {:?} appears more than once",
                    printable(&bytes)
                )));
            }
            place(entry.id, Slot::Bytes(bytes))?;
        }

        let mut special_ids = FxHashMap::default();
        let mut special_order = Vec::with_capacity(state.special_tokens.len());
        for entry in state.special_tokens {
            if entry.content.is_empty() {
                return Err(BpeError::Serialization(format!(
                    "special id {} maps to an empty string",
                    entry.id
                )));
            }
            if special_ids.insert(entry.content.clone(), entry.id).is_some() {
                return Err(BpeError::Serialization(format!(
                    "special token {:?} appears more than once",
                    entry.content
                )));
            }
            special_order.push(entry.id);
            place(entry.id, Slot::Special(entry.content))?;
        }
        // Registration order is id order.
        special_order.sort_unstable();

        let slots: Vec<Slot> = slots.into_iter().flatten().collect();
        let vocab = Self {
            slots,
            byte_ids,
            special_ids,
            special_order,
        };
        if let Some(byte) = vocab.first_misplaced_byte() {
            return Err(BpeError::Serialization(format!(
                "id {byte} must hold the single byte 0x{byte:02x}"
            )));
        }
        Ok(vocab)
    }

    /// Returns true when ids `0..=255` hold the single bytes in byte order.
    ///
    /// Encoding starts from one id per byte, so a codec needs this to hold.
    #[must_use]
    pub fn has_byte_alphabet(&self) -> bool {
        self.first_misplaced_byte().is_none()
    }

    fn first_misplaced_byte(&self) -> Option<u8> {
        (0u8..=u8::MAX).find(|&byte| self.lookup_token(TokenId::from(byte)) != Some(&[byte][..]))
    }
}

/// Persisted form of a [`Vocabulary`]. Only forward directions are stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VocabularyState {
    /// Byte tokens in learning order; bytes are stored as Latin-1 strings.
    pub tokens: Vec<TokenEntry>,
    /// Special tokens in registration order.
    pub special_tokens: Vec<SpecialEntry>,
    /// The id the next allocation would receive.
    pub next_id: TokenId,
}

/// A persisted byte token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenEntry {
    /// Token bytes, one Latin-1 char per byte.
    pub token: String,
    /// Assigned id.
    pub id: TokenId,
}

/// A persisted special token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpecialEntry {
    /// Literal special-token text.
    pub content: String,
    /// Assigned id.
    pub id: TokenId,
}
