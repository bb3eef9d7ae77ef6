//! Decoders for device families that predate LoRaRAW and send their
//! readings as plain hex with a fixed byte layout.

pub mod droplet;

use crate::constants::ADDRESS_LEN;
use crate::loraraw::uplink::RadioMetrics;
use crate::util::hex::{encode_hex_upper, HexError};
use thiserror::Error;

pub use droplet::{decode_droplet, decode_droplet_bytes, DropletModel};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LegacyError {
    #[error("Invalid hex payload: {0}")]
    InvalidHex(#[from] HexError),

    #[error("Frame too short: need {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("Unknown device model: {0}")]
    UnknownModel(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One named reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub label: &'static str,
    pub value: f64,
}

impl Reading {
    pub fn new(label: &'static str, value: f64) -> Self {
        Self { label, value }
    }
}

/// A decoded legacy frame
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyFrame {
    pub address: [u8; ADDRESS_LEN],
    pub readings: Vec<Reading>,
    pub radio: RadioMetrics,
}

impl LegacyFrame {
    pub fn address_hex(&self) -> String {
        encode_hex_upper(&self.address)
    }

    /// Value of the reading called `label`
    pub fn get(&self, label: &str) -> Option<f64> {
        self.readings
            .iter()
            .find(|r| r.label == label)
            .map(|r| r.value)
    }
}
