//! Utilities for converting between raw token bytes and string representations.

use crate::error::{BpeError, Result};

/// Maps each byte to the code point with the same value (U+0000..=U+00FF).
///
/// The mapping is total and reversible, which makes it suitable for storing
/// arbitrary token bytes inside JSON strings.
#[must_use]
pub fn bytes_to_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`bytes_to_latin1`].
///
/// Fails when the text contains a code point above U+00FF, since such a string
/// cannot have been produced by [`bytes_to_latin1`].
pub fn latin1_to_bytes(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                BpeError::Serialization(format!(
                    "code point U+{:04X} is outside the Latin-1 byte range",
                    u32::from(c)
                ))
            })
        })
        .collect()
}

/// Renders token bytes for humans: valid UTF-8 is shown as text with control
/// characters escaped, anything else byte-by-byte as `\xNN`.
#[must_use]
pub fn printable(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.escape_debug().to_string(),
        Err(_) => bytes
            .iter()
            .flat_map(|&b| std::ascii::escape_default(b))
            .map(char::from)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_round_trips_every_byte() {
        let all: Vec<u8> = (0u8..=255).collect();
        let text = bytes_to_latin1(&all);
        assert_eq!(text.chars().count(), 256);
        assert_eq!(latin1_to_bytes(&text).expect("latin1"), all);
    }

    #[test]
    fn latin1_rejects_wide_code_points() {
        let err = latin1_to_bytes("a\u{4e2d}").expect_err("wide char must fail");
        assert!(matches!(err, BpeError::Serialization(_)));
    }

    #[test]
    fn printable_escapes_controls_and_partial_utf8() {
        assert_eq!(printable(b"a\nb"), "a\\nb");
        assert_eq!(printable(&[0xE4, 0xB8]), "\\xe4\\xb8");
        assert_eq!(printable("天".as_bytes()), "天");
    }
}
