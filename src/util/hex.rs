//! # Hex Encoding/Decoding Utilities
//!
//! Hex helpers used for frame logging and test fixtures, wrapping the
//! `hex` crate with the error handling and pretty-printing this crate
//! needs.
//!
//! ## Usage
//!
//! ```rust
//! use audiomodem::util::hex::{encode_hex, decode_hex};
//!
//! let data = [0x01, 0x01, 0xFE, 0x00];
//! assert_eq!(encode_hex(&data), "0101fe00");
//! assert_eq!(decode_hex("0101FE00").unwrap(), data);
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to a lowercase hex string.
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode a hex string to bytes.
///
/// Accepts both cases; whitespace is stripped first.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    if hex_str.is_empty() {
        return Err(HexError::EmptyString);
    }

    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format bytes as space-separated hex pairs for log output.
pub fn pretty_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
