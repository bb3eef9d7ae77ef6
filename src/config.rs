//! # Codec Configuration
//!
//! Per-deployment settings, read from a JSON file:
//!
//! ```json
//! {
//!     "aes_key": "2B7E151628AED2A6ABF7158809CF4F3C",
//!     "default_opts": 0,
//!     "initial_nonce": 0,
//!     "positional": false,
//!     "radio_metrics": true,
//!     "legacy_model": "THLM"
//! }
//! ```
//!
//! Every field is optional. The key is validated when the file is loaded so
//! a typo surfaces at startup rather than on the first frame.

use crate::legacy::DropletModel;
use crate::loraraw::crypto::{EncryptionSession, EnvelopeError, EnvelopeKey};
use crate::payload::header::FrameHeader;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid aes_key: {0}")]
    Key(EnvelopeError),

    #[error("No aes_key configured")]
    MissingKey,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// 32 hex characters
    pub aes_key: Option<String>,
    /// Opts byte written into outbound envelopes
    pub default_opts: u8,
    /// First nonce a fresh session hands out
    pub initial_nonce: u8,
    /// Build outbound frames with positional addressing
    pub positional: bool,
    /// Uplinks carry trailing RSSI/SNR bytes
    pub radio_metrics: bool,
    pub legacy_model: Option<DropletModel>,
}

impl CodecConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded codec configuration from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(hex) = &self.aes_key {
            EnvelopeKey::from_hex(hex).map_err(ConfigError::Key)?;
        }
        Ok(())
    }

    pub fn key(&self) -> Result<EnvelopeKey, ConfigError> {
        let hex = self.aes_key.as_deref().ok_or(ConfigError::MissingKey)?;
        EnvelopeKey::from_hex(hex).map_err(ConfigError::Key)
    }

    /// Fresh session starting at `initial_nonce`
    pub fn session(&self) -> EncryptionSession {
        EncryptionSession::starting_at(self.initial_nonce)
    }

    /// Header for plain uplink-style outbound frames
    pub fn frame_header(&self) -> FrameHeader {
        if self.positional {
            FrameHeader::positional()
        } else {
            FrameHeader::uplink()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CodecConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CodecConfig::default());
        assert!(matches!(config.key(), Err(ConfigError::MissingKey)));
        assert_eq!(config.session().next_nonce(), 0);
        assert!(!config.frame_header().flags.is_positional());
    }

    #[test]
    fn test_full_config() {
        let config = CodecConfig::from_json_str(
            r#"{
                "aes_key": "2B7E151628AED2A6ABF7158809CF4F3C",
                "default_opts": 3,
                "initial_nonce": 200,
                "positional": true,
                "radio_metrics": true,
                "legacy_model": "THL"
            }"#,
        )
        .unwrap();

        assert_eq!(config.key().unwrap().as_bytes()[0], 0x2B);
        assert_eq!(config.default_opts, 3);
        assert_eq!(config.session().next_nonce(), 200);
        assert!(config.frame_header().flags.is_positional());
        assert_eq!(config.legacy_model, Some(DropletModel::Thl));
    }

    #[test]
    fn test_bad_key_rejected_at_load() {
        let err = CodecConfig::from_json_str(r#"{"aes_key": "0011"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Key(EnvelopeError::KeyError { .. })));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            CodecConfig::from_json_str(r#"{"aes": "x"}"#),
            Err(ConfigError::Json(_))
        ));
    }
}
