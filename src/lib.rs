//! # loraraw-rs - Bit-Packed Telemetry Codec for LoRaRAW Field Sensors
//!
//! LoRaRAW devices report sensor readings as a stream of variable-width
//! fields packed MSB-first, wrapped in an AES-128-CBC envelope with a
//! truncated CMAC. This crate decodes and builds both layers.
//!
//! ## Features
//!
//! - Bit-level reader/writer for fields that straddle byte boundaries
//! - A fixed registry of 43 field types (fixed-point, raw scalars, text)
//! - Frame decoding into named points (`temp_1`, `rh_1`, ...) through a sink
//! - Frame building for outbound writes, with request/response message IDs
//! - Envelope sealing and opening with a thread-safe rolling nonce
//! - Plain-hex decoders for legacy Droplet sensors
//! - JSON configuration and a `loraraw-cli` command-line tool
//!
//! ## Usage
//!
//! ```rust
//! use loraraw_rs::{decode_frame, EncryptionSession, FrameEncoder, UplinkDecoder, EnvelopeKey};
//! use loraraw_rs::payload::registry::keys;
//!
//! // Build a payload
//! let mut encoder = FrameEncoder::uplink();
//! encoder.push(keys::TEMPERATURE, 1, 21.5)?;
//! let payload = encoder.finish();
//!
//! // Seal and open it again
//! let key = EnvelopeKey::from_hex("2B7E151628AED2A6ABF7158809CF4F3C")?;
//! let session = EncryptionSession::new();
//! let envelope = session.seal(&[0xCB, 0xB2, 0x72, 0xEA], &payload, &key, 0)?;
//!
//! let (_summary, fields) = UplinkDecoder::new(key).decode_all(&envelope)?;
//! assert_eq!(fields[0].name, "temp_1");
//! assert_eq!(fields[0].value, 21.5);
//! assert_eq!(decode_frame(&payload).fields, fields);
//! # Ok::<(), loraraw_rs::LoRaRawError>(())
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod legacy;
pub mod logging;
pub mod loraraw;
pub mod payload;
pub mod util;

pub use crate::config::{CodecConfig, ConfigError};
pub use crate::error::LoRaRawError;
pub use crate::logging::init_logger;

pub use legacy::{decode_droplet, DropletModel, LegacyError, LegacyFrame};
pub use loraraw::{
    decrypt, open, EncryptionSession, EnvelopeError, EnvelopeKey, OpenedEnvelope, RadioMetrics,
    UplinkDecoder, UplinkSummary,
};
pub use payload::{
    decode_frame, encode_frame, CodecError, DecodeSummary, DecodedField, FieldValue, FieldWrite,
    Flow, FrameDecoder, FrameEncoder, FrameEnd, FrameHeader, FrameSink, Scalar,
};

use payload::decoder::DecodedFrame;

/// Open an envelope and decode its payload.
///
/// # Arguments
/// * `envelope` - Envelope bytes, without radio metrics
/// * `key` - 16-byte AES key
///
/// # Returns
/// * `Ok(DecodedFrame)` - All fields of the payload
/// * `Err(LoRaRawError)` - The envelope failed validation or authentication
pub fn open_and_decode(envelope: &[u8], key: &[u8]) -> Result<DecodedFrame, LoRaRawError> {
    let opened = open(envelope, key)?;
    Ok(decode_frame(&opened.payload))
}

/// Encode `fields` behind `header` and seal the result.
///
/// # Arguments
/// * `session` - Supplies the nonce
/// * `address_hex` - Device address, 8 hex characters
/// * `key` - 16-byte AES key
/// * `opts` - Envelope opts byte
///
/// # Returns
/// * `Ok(Vec<u8>)` - Envelope ready for the transport
/// * `Err(LoRaRawError)` - A field could not be encoded, or the key/address is invalid
pub fn encode_and_seal(
    session: &EncryptionSession,
    address_hex: &str,
    key: &[u8],
    opts: u8,
    header: FrameHeader,
    fields: &[FieldWrite],
) -> Result<Vec<u8>, LoRaRawError> {
    let payload = encode_frame(header, fields)?;
    Ok(session.encrypt(address_hex, &payload, key, opts)?)
}
