//! # Hex Encoding/Decoding Utilities
//!
//! LoRaRAW gateways hand frames around as hex strings: device addresses are
//! 8 hex characters, radio frames arrive from the serial bridge as one long
//! hex line, and legacy devices never leave hex at all. These helpers wrap the
//! `hex` crate with the normalisation those inputs need.
//!
//! ## Usage
//!
//! ```rust
//! use loraraw_rs::util::hex::{decode_hex, encode_hex_upper};
//!
//! let address = decode_hex("cbb272ea").unwrap();
//! assert_eq!(address, [0xCB, 0xB2, 0x72, 0xEA]);
//! assert_eq!(encode_hex_upper(&address), "CBB272EA");
//! ```

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to uppercase hex, the form the serial bridge emits
pub fn encode_hex_upper(data: &[u8]) -> String {
    hex::encode_upper(data)
}

/// Decode a hex string. Either case is accepted and whitespace is stripped.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }
    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Decode a hex string that must hold exactly `N` bytes
pub fn decode_hex_array<const N: usize>(hex_str: &str) -> Result<[u8; N], HexError> {
    let bytes = decode_hex(hex_str)?;
    bytes.as_slice().try_into().map_err(|_| HexError::WrongLength {
        expected: N,
        actual: bytes.len(),
    })
}

/// Format bytes as "cb b2 72 ea" for logs
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode hex with arbitrary separators ("CB:B2-72 EA"), keeping only hex digits
pub fn parse_hex_lenient(input: &str) -> Result<Vec<u8>, HexError> {
    let hex_chars: String = input.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    decode_hex(&hex_chars)
}
