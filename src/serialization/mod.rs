//! Helpers for (de)serialising vocabularies.

pub mod json;

pub use json::{from_json_str, load_vocabulary, save_vocabulary, to_json_string};
