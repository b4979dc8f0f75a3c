//! JSON persistence of the logical vocabulary record built on `serde_json`.
//!
//! Only the forward tables and `next_id` are written; lookups in the other
//! direction are rebuilt by [`Vocabulary::from_state`] on load.

use std::fs;
use std::path::Path;

use crate::error::{BpeError, Result};
use crate::vocab::{Vocabulary, VocabularyState};

/// Serialises the vocabulary to a JSON string.
pub fn to_json_string(vocab: &Vocabulary, pretty: bool) -> Result<String> {
    let state = vocab.to_state();
    let json = if pretty {
        serde_json::to_string_pretty(&state)?
    } else {
        serde_json::to_string(&state)?
    };
    Ok(json)
}

/// Parses and validates a vocabulary from JSON produced by [`to_json_string`].
pub fn from_json_str(json: &str) -> Result<Vocabulary> {
    let state: VocabularyState = serde_json::from_str(json)?;
    Vocabulary::from_state(state)
}

/// Writes the vocabulary to `path` as JSON.
pub fn save_vocabulary<P: AsRef<Path>>(vocab: &Vocabulary, path: P, pretty: bool) -> Result<()> {
    let json = to_json_string(vocab, pretty)?;
    fs::write(path.as_ref(), json)
        .map_err(|err| BpeError::io(err, Some(path.as_ref().to_path_buf())))
}

/// Reads a vocabulary previously written by [`save_vocabulary`].
pub fn load_vocabulary<P: AsRef<Path>>(path: P) -> Result<Vocabulary> {
    let json = fs::read_to_string(path.as_ref())
        .map_err(|err| BpeError::io(err, Some(path.as_ref().to_path_buf())))?;
    from_json_str(&json)
}
