//! # Frame Encoder
//!
//! Builds an outbound payload field by field. Fields are written in the order
//! they are pushed; no reordering or de-duplication happens here. Producing a
//! sequence the firmware accepts is the caller's job.
//!
//! ## Usage
//!
//! ```rust
//! use loraraw_rs::payload::encoder::FrameEncoder;
//! use loraraw_rs::payload::registry::keys;
//!
//! let mut encoder = FrameEncoder::uplink();
//! encoder.push(keys::TEMPERATURE, 1, 66.66)?;
//! encoder.push(keys::RELATIVE_HUMIDITY, 1, 55.55)?;
//! encoder.push(keys::LUX, 1, 26262.0)?;
//! assert_eq!(encoder.finish(), vec![0, 5, 92, 240, 74, 217, 134, 205, 44]);
//! # Ok::<(), loraraw_rs::payload::field::CodecError>(())
//! ```

use crate::constants::{END_OF_DATA_KEY, FIELD_KEY_BITS, FIELD_POSITION_BITS};
use crate::payload::bitstream::BitStream;
use crate::payload::field::{encode_field, CodecError, FieldValue, Scalar};
use crate::payload::header::FrameHeader;

/// One field of an outbound write
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    pub key: u8,
    /// Written only when the frame uses positional addressing
    pub position: u8,
    pub value: FieldValue,
}

impl FieldWrite {
    pub fn new(key: u8, position: u8, value: impl Into<FieldValue>) -> Self {
        Self {
            key,
            position,
            value: value.into(),
        }
    }
}

/// Incremental payload builder
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    stream: BitStream,
    header: FrameHeader,
}

impl FrameEncoder {
    /// Start a payload with `header` already written
    pub fn new(header: FrameHeader) -> Self {
        let mut stream = BitStream::with_capacity(32);
        header.write(&mut stream);
        Self { stream, header }
    }

    pub fn uplink() -> Self {
        Self::new(FrameHeader::uplink())
    }

    pub fn positional() -> Self {
        Self::new(FrameHeader::positional())
    }

    pub fn request(message_id: u8) -> Self {
        Self::new(FrameHeader::request(message_id))
    }

    pub fn response(message_id: u8) -> Self {
        Self::new(FrameHeader::response(message_id))
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    fn position(&self, position: u8) -> Option<u8> {
        self.header.flags.is_positional().then_some(position)
    }

    /// Append any field value
    pub fn push_value(
        &mut self,
        key: u8,
        position: u8,
        value: &FieldValue,
    ) -> Result<&mut Self, CodecError> {
        let position = self.position(position);
        encode_field(&mut self.stream, value, key, position)?;
        Ok(self)
    }

    /// Append a numeric field; raw fields accept only values they hold exactly
    pub fn push(&mut self, key: u8, position: u8, value: f64) -> Result<&mut Self, CodecError> {
        self.push_value(key, position, &FieldValue::Number(value))
    }

    /// Append a raw scalar; its width must match the field's
    pub fn push_scalar(
        &mut self,
        key: u8,
        position: u8,
        value: Scalar,
    ) -> Result<&mut Self, CodecError> {
        self.push_value(key, position, &FieldValue::Scalar(value))
    }

    pub fn push_text(&mut self, key: u8, position: u8, text: &str) -> Result<&mut Self, CodecError> {
        self.push_value(key, position, &FieldValue::from(text))
    }

    /// Write the end-of-data sentinel
    pub fn end_marker(&mut self) -> &mut Self {
        if self.header.flags.is_positional() {
            self.stream.write_uint(0, FIELD_POSITION_BITS);
        }
        self.stream.write_uint(END_OF_DATA_KEY as u64, FIELD_KEY_BITS);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.stream.into_bytes()
    }
}

/// Encode a whole field list behind `header`
pub fn encode_frame(header: FrameHeader, fields: &[FieldWrite]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = FrameEncoder::new(header);
    for field in fields {
        encoder.push_value(field.key, field.position, &field.value)?;
    }
    Ok(encoder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::decoder::{decode_frame, FrameEnd};
    use crate::payload::registry::keys;

    #[test]
    fn test_reference_payload() -> Result<(), CodecError> {
        let mut encoder = FrameEncoder::uplink();
        encoder
            .push(keys::TEMPERATURE, 1, 66.66)?
            .push(keys::RELATIVE_HUMIDITY, 1, 55.55)?
            .push(keys::LUX, 1, 26262.0)?;
        assert_eq!(encoder.finish(), vec![0, 5, 92, 240, 74, 217, 134, 205, 44]);
        Ok(())
    }

    #[test]
    fn test_positional_round_trip() {
        let fields = [
            FieldWrite::new(keys::UO, 3, 42.5),
            FieldWrite::new(keys::DO, 7, Scalar::Bool(true)),
            FieldWrite::new(keys::UO, 1, 12.0),
        ];
        let bytes = encode_frame(FrameHeader::positional(), &fields).unwrap();
        assert_eq!(bytes[0], 0x01);

        let frame = decode_frame(&bytes);
        let names: Vec<_> = frame.fields.iter().map(|f| (f.name.as_str(), f.value)).collect();
        assert_eq!(names, [("uo_3", 42.5), ("do_7", 1.0), ("uo_1", 12.0)]);
        assert!(frame.summary.is_clean());
    }

    #[test]
    fn test_sequential_counters_per_key() {
        let fields = [
            FieldWrite::new(keys::TEMPERATURE, 9, 20.0),
            FieldWrite::new(keys::RELATIVE_HUMIDITY, 9, 40.0),
            FieldWrite::new(keys::TEMPERATURE, 9, 21.0),
        ];
        let bytes = encode_frame(FrameHeader::uplink(), &fields).unwrap();
        let frame = decode_frame(&bytes);
        let names: Vec<_> = frame.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["temp_1", "rh_1", "temp_2"]);
    }

    #[test]
    fn test_request_header_and_end_marker() {
        let mut encoder = FrameEncoder::request(0x11);
        encoder.push(keys::PUSH_FREQUENCY, 1, 900.0).unwrap();
        encoder.end_marker();
        let bytes = encoder.finish();
        assert_eq!(&bytes[..2], &[0x02, 0x11]);

        let frame = decode_frame(&bytes);
        assert_eq!(frame.summary.header.message_id, Some(0x11));
        assert_eq!(frame.fields[0].name, "push_frequency_1");
        assert_eq!(frame.fields[0].value, 900.0);
        assert_eq!(frame.summary.end, FrameEnd::EndMarker);
    }

    #[test]
    fn test_failed_push_leaves_frame_intact() {
        let mut encoder = FrameEncoder::uplink();
        encoder.push(keys::CO2, 1, 800.0).unwrap();
        let before = encoder.clone().finish();
        assert!(encoder.push_scalar(keys::UINT8, 1, Scalar::U16(1)).is_err());
        assert_eq!(encoder.clone().finish(), before);

        assert_eq!(
            encoder.push(keys::UINT16, 1, 70000.0).unwrap_err(),
            CodecError::ValueOutOfRange {
                label: "uint16",
                value: 70000.0
            }
        );
        assert!(encoder.push(keys::INT32, 1, 0.5).is_err());
        assert_eq!(encoder.finish(), before);
    }

    #[test]
    fn test_every_raw_kind_round_trips() {
        let fields = [
            FieldWrite::new(keys::INT8, 1, Scalar::I8(-7)),
            FieldWrite::new(keys::UINT8, 1, Scalar::U8(200)),
            FieldWrite::new(keys::INT16, 1, Scalar::I16(-1234)),
            FieldWrite::new(keys::UINT16, 1, Scalar::U16(65000)),
            FieldWrite::new(keys::INT32, 1, Scalar::I32(-70000)),
            FieldWrite::new(keys::UINT32, 1, Scalar::U32(4_000_000_000)),
            FieldWrite::new(keys::INT64, 1, Scalar::I64(-5)),
            FieldWrite::new(keys::UINT64, 1, Scalar::U64(1 << 40)),
            FieldWrite::new(keys::BOOL, 1, Scalar::Bool(true)),
            FieldWrite::new(keys::CHAR, 1, Scalar::Char('Z')),
            FieldWrite::new(keys::FLOAT, 1, Scalar::F32(0.25)),
            FieldWrite::new(keys::DOUBLE, 1, Scalar::F64(-1e-3)),
        ];
        let bytes = encode_frame(FrameHeader::uplink(), &fields).unwrap();
        let frame = decode_frame(&bytes);
        let values: Vec<f64> = frame.fields.iter().map(|f| f.value).collect();
        assert_eq!(
            values,
            [-7.0, 200.0, -1234.0, 65000.0, -70000.0, 4e9, -5.0, (1u64 << 40) as f64, 1.0, 90.0, 0.25, -1e-3]
        );
    }

    #[test]
    fn test_text_field_in_frame() {
        let mut encoder = FrameEncoder::uplink();
        encoder.push_text(keys::STRING, 1, "ok").unwrap();
        encoder.push(keys::BATTERY_VOLTAGE, 1, 3.61).unwrap();
        let frame = decode_frame(&encoder.finish());
        assert_eq!(frame.fields[0].text.as_deref(), Some("ok"));
        assert_eq!(frame.fields[0].value, 2.0);
        assert_eq!(frame.fields[1].value, 3.61);
    }
}
