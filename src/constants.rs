//! LoRaRAW Wire Constants
//!
//! This module defines the constants shared by the bit-packed payload codec
//! and the encryption envelope deployed on LoRaRAW field devices.

/// Width of the flags byte at the start of every payload
pub const FRAME_FLAGS_BITS: usize = 8;

/// Width of the message-ID byte that follows the flags on requests/responses
pub const MESSAGE_ID_BITS: usize = 8;

/// Width of the field-type key that prefixes every field
pub const FIELD_KEY_BITS: usize = 6;

/// Width of the explicit position byte (positional addressing only)
pub const FIELD_POSITION_BITS: usize = 8;

/// Width of the length prefix of a string field
pub const TEXT_LENGTH_BITS: usize = 8;

/// Highest key the field registry assigns
pub const MAX_FIELD_KEY: u8 = 43;

/// End-of-data sentinel key
pub const END_OF_DATA_KEY: u8 = 0;

/// AES block size in bytes
pub const AES_BLOCK_SIZE: usize = 16;

/// AES-128 key length in bytes
pub const AES_KEY_LEN: usize = 16;

/// Device address length in bytes (8 hex characters on the wire)
pub const ADDRESS_LEN: usize = 4;

/// Envelope header length: address(4) + opts(1) + nonce(1) + length(1)
pub const ENVELOPE_HEADER_LEN: usize = ADDRESS_LEN + 3;

/// Truncated CMAC tag length in bytes
pub const CMAC_LEN: usize = 4;

/// Smallest valid envelope: address + one cipher block + tag
pub const MIN_ENVELOPE_LEN: usize = ADDRESS_LEN + AES_BLOCK_SIZE + CMAC_LEN;

/// Bytes the transport appends after the envelope (RSSI, SNR)
pub const RADIO_METRICS_LEN: usize = 2;
