//! Display formatting of the crate's error types.

use loraraw_rs::error::LoRaRawError;
use loraraw_rs::legacy::LegacyError;
use loraraw_rs::loraraw::crypto::EnvelopeError;
use loraraw_rs::payload::field::CodecError;
use loraraw_rs::payload::registry::ScalarKind;
use loraraw_rs::util::hex::HexError;

/// The authentication failure message is matched on by operators' alerting.
#[test]
fn test_authentication_error() {
    assert_eq!(
        EnvelopeError::AuthenticationError.to_string(),
        "incorrect CMAC or Key"
    );
}

#[test]
fn test_invalid_field_key_error() {
    assert_eq!(CodecError::InvalidFieldKey(0).to_string(), "Invalid field key: 0");
}

#[test]
fn test_device_fault_error() {
    assert_eq!(
        CodecError::DeviceReportedFault(12).to_string(),
        "Device reported fault code 12"
    );
}

#[test]
fn test_unsupported_target_error() {
    let err = CodecError::UnsupportedTarget {
        label: "temp",
        target: ScalarKind::U8,
    };
    assert!(err.to_string().contains("temp"));
}

#[test]
fn test_value_out_of_range_error() {
    let err = CodecError::ValueOutOfRange {
        label: "uint8",
        value: 300.0,
    };
    assert_eq!(err.to_string(), "Value 300 does not fit field 'uint8'");
}

#[test]
fn test_envelope_length_errors() {
    assert_eq!(
        EnvelopeError::InvalidLength { actual: 10 }.to_string(),
        "Invalid envelope length: 10 bytes"
    );
    assert_eq!(
        EnvelopeError::LengthMismatch {
            declared: 30,
            available: 13
        }
        .to_string(),
        "Length byte declares 30 payload bytes, only 13 decrypted"
    );
}

#[test]
fn test_legacy_errors() {
    assert_eq!(
        LegacyError::TooShort {
            expected: 15,
            actual: 4
        }
        .to_string(),
        "Frame too short: need 15 bytes, got 4"
    );
    assert_eq!(
        LegacyError::from(HexError::OddLength(3)).to_string(),
        "Invalid hex payload: Odd number of hex characters: 3"
    );
}

#[test]
fn test_crate_error_wraps_layers() {
    let err: LoRaRawError = EnvelopeError::AuthenticationError.into();
    assert_eq!(err.to_string(), "Envelope error: incorrect CMAC or Key");
    assert!(err.is_authentication_failure());

    let err: LoRaRawError = CodecError::InvalidFieldKey(50).into();
    assert_eq!(err.to_string(), "Codec error: Invalid field key: 50");
    assert!(!err.is_authentication_failure());
}
