//! # Error Handling
//!
//! `LoRaRawError` is the crate-level error. Each layer keeps its own error
//! type and converts into this one with `?`.

use crate::config::ConfigError;
use crate::legacy::LegacyError;
use crate::loraraw::crypto::EnvelopeError;
use crate::payload::field::CodecError;
use crate::util::hex::HexError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoRaRawError {
    /// A field could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Envelope validation, authentication or key failure.
    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("Legacy frame error: {0}")]
    Legacy(#[from] LegacyError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Hex error: {0}")]
    Hex(#[from] HexError),
}

impl LoRaRawError {
    /// The frame failed authentication and must be discarded whole
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::Envelope(EnvelopeError::AuthenticationError))
    }
}

pub type Result<T> = std::result::Result<T, LoRaRawError>;
