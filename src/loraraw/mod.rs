//! LoRaRAW transport layer: the authenticated envelope and uplink handling.

pub mod crypto;
pub mod uplink;

pub use crypto::{
    compute_cmac, decrypt, decrypt_with_key, open, open_with_key, EncryptionSession,
    EnvelopeError, EnvelopeKey, OpenedEnvelope,
};
pub use uplink::{split_radio_metrics, RadioMetrics, UplinkDecoder, UplinkSummary};
