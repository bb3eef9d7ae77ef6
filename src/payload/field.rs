//! # Field Codec
//!
//! Reads and writes one field at the stream's cursor. The field registry
//! decides how many bits the field occupies and how they map to a value:
//!
//! - **FixedPoint**: `ceil(log2((high - low) * 10^decimals))` bits holding
//!   `round((value - low) * 10^decimals)`; out-of-range values saturate.
//!   Numbers written to raw fields must convert without loss.
//! - **RawDataPoint**: `byte_width * 8` bits reinterpreted bit-for-bit as the
//!   descriptor's scalar type (IEEE-754 bit casts for floats).
//! - **Text**: an 8-bit length followed by that many Latin-1 characters.
//!
//! The field header written in front of every field is the optional 8-bit
//! position byte followed by the 6-bit field-type key.

use crate::constants::{FIELD_KEY_BITS, FIELD_POSITION_BITS, TEXT_LENGTH_BITS};
use crate::payload::bitstream::BitStream;
use crate::payload::registry::{self, keys, Encoding, FieldDescriptor, ScalarKind};
use thiserror::Error;

/// Field-level codec errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Invalid field key: {0}")]
    InvalidFieldKey(u8),

    #[error("Unsupported decode target {target:?} for field '{label}'")]
    UnsupportedTarget {
        label: &'static str,
        target: ScalarKind,
    },

    #[error("Device reported fault code {0}")]
    DeviceReportedFault(u8),

    #[error("Width mismatch for field '{label}': expected {expected} bytes, got {actual}")]
    WidthMismatch {
        label: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Field '{label}' cannot carry a {supplied} value")]
    WrongValueKind {
        label: &'static str,
        supplied: &'static str,
    },

    #[error("Text too long for field '{label}': {len} bytes (max 255)")]
    TextTooLong { label: &'static str, len: usize },

    #[error("Character {0:?} is outside Latin-1")]
    NonLatin1Char(char),

    #[error("Value {value} does not fit field '{label}'")]
    ValueOutOfRange { label: &'static str, value: f64 },
}

/// A scalar value of one of the supported wire types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Char(char),
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::I8(_) => ScalarKind::I8,
            Self::U8(_) => ScalarKind::U8,
            Self::I16(_) => ScalarKind::I16,
            Self::U16(_) => ScalarKind::U16,
            Self::I32(_) => ScalarKind::I32,
            Self::U32(_) => ScalarKind::U32,
            Self::I64(_) => ScalarKind::I64,
            Self::U64(_) => ScalarKind::U64,
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
            Self::Bool(_) => ScalarKind::Bool,
            Self::Char(_) => ScalarKind::Char,
        }
    }

    /// In-memory width of this value. A character outside Latin-1 does not
    /// fit the 1-byte wire slot and reports the width of a `char`.
    pub fn byte_width(&self) -> usize {
        match self {
            Self::Char(c) if u8::try_from(*c).is_err() => std::mem::size_of::<char>(),
            other => other.kind().byte_width(),
        }
    }

    /// Reinterpret right-aligned raw bits as a value of `kind`.
    ///
    /// Integer kinds truncate to their width and reinterpret two's complement;
    /// floats use `from_bits`, never a numeric conversion.
    pub fn from_bits(kind: ScalarKind, bits: u64) -> Self {
        match kind {
            ScalarKind::I8 => Self::I8(bits as u8 as i8),
            ScalarKind::U8 => Self::U8(bits as u8),
            ScalarKind::I16 => Self::I16(bits as u16 as i16),
            ScalarKind::U16 => Self::U16(bits as u16),
            ScalarKind::I32 => Self::I32(bits as u32 as i32),
            ScalarKind::U32 => Self::U32(bits as u32),
            ScalarKind::I64 => Self::I64(bits as i64),
            ScalarKind::U64 => Self::U64(bits),
            ScalarKind::F32 => Self::F32(f32::from_bits(bits as u32)),
            ScalarKind::F64 => Self::F64(f64::from_bits(bits)),
            ScalarKind::Bool => Self::Bool(bits as u8 != 0),
            ScalarKind::Char => Self::Char(char::from(bits as u8)),
        }
    }

    /// Raw wire bits of this value, right-aligned
    pub fn to_bits(&self) -> u64 {
        match *self {
            Self::I8(v) => v as u8 as u64,
            Self::U8(v) => v as u64,
            Self::I16(v) => v as u16 as u64,
            Self::U16(v) => v as u64,
            Self::I32(v) => v as u32 as u64,
            Self::U32(v) => v as u64,
            Self::I64(v) => v as u64,
            Self::U64(v) => v,
            Self::F32(v) => v.to_bits() as u64,
            Self::F64(v) => v.to_bits(),
            Self::Bool(v) => v as u64,
            Self::Char(c) => c as u64 & 0xFF,
        }
    }

    /// Convert a number into `kind` without loss.
    ///
    /// Returns `None` for non-finite input, for a fractional value aimed at an
    /// integer, bool or char kind, and for anything outside the kind's range.
    /// Bools take only 0 and 1, chars only 0..=255. `F32` rounds to the
    /// nearest representable value but rejects magnitudes beyond `f32::MAX`.
    pub fn try_from_f64(kind: ScalarKind, value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        match kind {
            ScalarKind::F64 => return Some(Self::F64(value)),
            ScalarKind::F32 => {
                return (value.abs() <= f32::MAX as f64).then_some(Self::F32(value as f32))
            }
            _ if value.fract() != 0.0 => return None,
            _ => {}
        }

        // upper bounds are exclusive so 2^63 and 2^64 stay out of the 64-bit kinds
        let signed = |bits: i32| value >= -(2f64.powi(bits - 1)) && value < 2f64.powi(bits - 1);
        let unsigned = |bits: i32| value >= 0.0 && value < 2f64.powi(bits);
        let scalar = match kind {
            ScalarKind::I8 if signed(8) => Self::I8(value as i8),
            ScalarKind::U8 if unsigned(8) => Self::U8(value as u8),
            ScalarKind::I16 if signed(16) => Self::I16(value as i16),
            ScalarKind::U16 if unsigned(16) => Self::U16(value as u16),
            ScalarKind::I32 if signed(32) => Self::I32(value as i32),
            ScalarKind::U32 if unsigned(32) => Self::U32(value as u32),
            ScalarKind::I64 if signed(64) => Self::I64(value as i64),
            ScalarKind::U64 if unsigned(64) => Self::U64(value as u64),
            ScalarKind::Bool if value == 0.0 || value == 1.0 => Self::Bool(value == 1.0),
            ScalarKind::Char if unsigned(8) => Self::Char(char::from(value as u8)),
            _ => return None,
        };
        Some(scalar)
    }

    pub fn to_f64(&self) -> f64 {
        match *self {
            Self::I8(v) => v as f64,
            Self::U8(v) => v as f64,
            Self::I16(v) => v as f64,
            Self::U16(v) => v as f64,
            Self::I32(v) => v as f64,
            Self::U32(v) => v as f64,
            Self::I64(v) => v as f64,
            Self::U64(v) => v as f64,
            Self::F32(v) => v as f64,
            Self::F64(v) => v,
            Self::Bool(v) => u8::from(v) as f64,
            Self::Char(c) => c as u32 as f64,
        }
    }
}

/// A decoded (or to-be-encoded) field body
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Scalar(Scalar),
    Text(String),
}

impl FieldValue {
    /// Numeric point value; text fields report their length
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Number(v) => *v,
            Self::Scalar(s) => s.to_f64(),
            Self::Text(t) => t.chars().count() as f64,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Scalar(_) => "scalar",
            Self::Text(_) => "text",
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Scalar> for FieldValue {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Quantize `value` for a FixedPoint field of `bits` width.
///
/// Out-of-range input saturates at `low`/`high`; NaN maps to `low`.
pub fn quantize(value: f64, low: f64, high: f64, decimals: u8, bits: usize) -> u64 {
    let clamped = if value.is_nan() { low } else { value.clamp(low, high) };
    let steps = ((clamped - low) * scale(decimals)).round();
    let max = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
    (steps as u64).min(max)
}

/// Inverse of [`quantize`], rounded to the descriptor's precision
pub fn dequantize(raw: u64, low: f64, decimals: u8) -> f64 {
    let scale = scale(decimals);
    ((raw as f64 / scale + low) * scale).round() / scale
}

fn scale(decimals: u8) -> f64 {
    10f64.powi(decimals as i32)
}

/// Decode the body of the field identified by `key`.
///
/// The key header must already have been consumed. Key 0 and unassigned keys
/// fail with [`CodecError::InvalidFieldKey`] without touching the stream. The
/// dedicated error field consumes its bits and reports a nonzero code as
/// [`CodecError::DeviceReportedFault`].
pub fn decode_field(stream: &mut BitStream, key: u8) -> Result<FieldValue, CodecError> {
    let descriptor = registry::lookup(key);
    let value = match descriptor.encoding {
        Encoding::Unassigned => return Err(CodecError::InvalidFieldKey(key)),
        Encoding::FixedPoint { low, high, decimals } => {
            let bits = registry::fixed_point_bits(low, high, decimals);
            FieldValue::Number(dequantize(stream.read_uint(bits), low, decimals))
        }
        Encoding::RawDataPoint(kind) => {
            FieldValue::Scalar(Scalar::from_bits(kind, stream.read_uint(kind.bit_width())))
        }
        Encoding::Text => {
            let len = stream.read_uint(TEXT_LENGTH_BITS) as usize;
            let text = (0..len)
                .map(|_| char::from(stream.read_uint(8) as u8))
                .collect();
            FieldValue::Text(text)
        }
    };

    if key == keys::ERROR {
        if let FieldValue::Scalar(Scalar::U8(code)) = value {
            if code != 0 {
                return Err(CodecError::DeviceReportedFault(code));
            }
        }
    }

    Ok(value)
}

/// Decode the field identified by `key` into a caller-chosen scalar type.
///
/// FixedPoint fields decode into `F32` or `F64`; raw fields only into their
/// own kind. A mismatch fails with [`CodecError::UnsupportedTarget`] before
/// any bits are consumed.
pub fn decode_field_as(
    stream: &mut BitStream,
    key: u8,
    target: ScalarKind,
) -> Result<Scalar, CodecError> {
    let descriptor = registry::lookup(key);
    let supported = match descriptor.encoding {
        Encoding::Unassigned => return Err(CodecError::InvalidFieldKey(key)),
        Encoding::FixedPoint { .. } => matches!(target, ScalarKind::F32 | ScalarKind::F64),
        Encoding::RawDataPoint(kind) => kind == target,
        Encoding::Text => false,
    };
    if !supported {
        return Err(CodecError::UnsupportedTarget {
            label: descriptor.label,
            target,
        });
    }

    match decode_field(stream, key)? {
        FieldValue::Number(v) => {
            Scalar::try_from_f64(target, v).ok_or(CodecError::ValueOutOfRange {
                label: descriptor.label,
                value: v,
            })
        }
        FieldValue::Scalar(s) => Ok(s),
        FieldValue::Text(_) => Err(CodecError::UnsupportedTarget {
            label: descriptor.label,
            target,
        }),
    }
}

/// Append one field (header and body) at the stream's write cursor.
///
/// `position` is written as the explicit position byte when present; pass
/// `None` for sequential addressing. The body is validated before anything
/// is written, so a failed call leaves the stream untouched.
pub fn encode_field(
    stream: &mut BitStream,
    value: &FieldValue,
    key: u8,
    position: Option<u8>,
) -> Result<(), CodecError> {
    let descriptor = registry::lookup(key);
    let body = encode_body(descriptor, value)?;

    let mut header = BitStream::new();
    let mut header_bits = FIELD_KEY_BITS;
    if let Some(position) = position {
        header.write_uint(position as u64, FIELD_POSITION_BITS);
        header_bits += FIELD_POSITION_BITS;
    }
    header.write_uint(key as u64, FIELD_KEY_BITS);

    stream.write_bits(header.as_bytes(), header_bits);
    for (bits, width) in body {
        stream.write_uint(bits, width);
    }
    Ok(())
}

/// Body of a field as (value, width) chunks of at most 64 bits
fn encode_body(
    descriptor: &FieldDescriptor,
    value: &FieldValue,
) -> Result<Vec<(u64, usize)>, CodecError> {
    let label = descriptor.label;
    match (descriptor.encoding, value) {
        (Encoding::Unassigned, _) => Err(CodecError::InvalidFieldKey(descriptor.key)),

        (Encoding::FixedPoint { low, high, decimals }, FieldValue::Number(_))
        | (Encoding::FixedPoint { low, high, decimals }, FieldValue::Scalar(_)) => {
            let bits = registry::fixed_point_bits(low, high, decimals);
            Ok(vec![(quantize(value.as_f64(), low, high, decimals, bits), bits)])
        }

        (Encoding::RawDataPoint(kind), FieldValue::Scalar(scalar)) => {
            if scalar.byte_width() != kind.byte_width() {
                return Err(CodecError::WidthMismatch {
                    label,
                    expected: kind.byte_width(),
                    actual: scalar.byte_width(),
                });
            }
            Ok(vec![(scalar.to_bits(), kind.bit_width())])
        }

        (Encoding::RawDataPoint(kind), FieldValue::Number(number)) => {
            let scalar = Scalar::try_from_f64(kind, *number).ok_or(CodecError::ValueOutOfRange {
                label,
                value: *number,
            })?;
            Ok(vec![(scalar.to_bits(), kind.bit_width())])
        }

        (Encoding::Text, FieldValue::Text(text)) => {
            let bytes = text
                .chars()
                .map(|c| u8::try_from(c).map_err(|_| CodecError::NonLatin1Char(c)))
                .collect::<Result<Vec<u8>, _>>()?;
            if bytes.len() > u8::MAX as usize {
                return Err(CodecError::TextTooLong {
                    label,
                    len: bytes.len(),
                });
            }

            let mut body = Vec::with_capacity(bytes.len() + 1);
            body.push((bytes.len() as u64, TEXT_LENGTH_BITS));
            body.extend(bytes.into_iter().map(|b| (b as u64, 8)));
            Ok(body)
        }

        (_, other) => Err(CodecError::WrongValueKind {
            label,
            supplied: other.kind_name(),
        }),
    }
}
