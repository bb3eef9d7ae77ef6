//! # Utility Modules
//!
//! Hex helpers and throttled logging shared by the codec, the envelope and
//! the legacy decoders.

pub mod hex;
pub mod logging;

pub use hex::{decode_hex, decode_hex_array, encode_hex_upper, format_hex_compact, HexError};
pub use logging::{log_frame_hex, LogThrottle};
