//! # Frame Decoder
//!
//! Drives the field codec over a decrypted payload and streams each decoded
//! field to a [`FrameSink`] in wire order:
//!
//! ```text
//! ReadHeaderFlags -> [ReadMessageId] -> DecodeField* -> Done
//! ```
//!
//! The loop runs while at least one field header's worth of bits remains
//! (see [`BitStream::can_continue`]). Field-level errors are delivered to the
//! sink paired with the field name; the sink decides whether decoding goes on.
//! How the loop ended is reported explicitly in [`DecodeSummary::end`] so a
//! caller can tell a clean end of frame from a truncated one.
//!
//! ## Usage
//!
//! ```rust
//! use loraraw_rs::payload::decoder::{decode_frame, FrameEnd};
//!
//! let payload = [0, 5, 92, 240, 74, 217, 134, 205, 44];
//! let frame = decode_frame(&payload);
//! let names: Vec<_> = frame.fields.iter().map(|f| f.name.as_str()).collect();
//! assert_eq!(names, ["temp_1", "rh_1", "lux_1"]);
//! assert!(matches!(frame.summary.end, FrameEnd::Exhausted { .. }));
//! ```

use crate::constants::{FIELD_KEY_BITS, FIELD_POSITION_BITS};
use crate::payload::bitstream::BitStream;
use crate::payload::field::{decode_field, CodecError, FieldValue};
use crate::payload::header::{FrameHeader, MessageIdFraming};
use crate::payload::registry;
use crate::util::logging::LogThrottle;
use once_cell::sync::Lazy;
use std::sync::Mutex;

static TRUNCATION_THROTTLE: Lazy<Mutex<LogThrottle>> =
    Lazy::new(|| Mutex::new(LogThrottle::new(1000, 5)));

/// One decoded point, as handed to the sink
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedField {
    /// `<label>_<index>`, e.g. `temp_1`
    pub name: String,
    pub key: u8,
    /// Explicit position byte, or the 1-based per-key counter
    pub index: u32,
    /// Point value; 0.0 when `error` is set
    pub value: f64,
    /// Text body for string fields
    pub text: Option<String>,
    pub error: Option<CodecError>,
}

impl DecodedField {
    fn from_result(name: String, key: u8, index: u32, result: Result<FieldValue, CodecError>) -> Self {
        match result {
            Ok(FieldValue::Text(text)) => Self {
                name,
                key,
                index,
                value: text.chars().count() as f64,
                text: Some(text),
                error: None,
            },
            Ok(value) => Self {
                name,
                key,
                index,
                value: value.as_f64(),
                text: None,
                error: None,
            },
            Err(error) => Self {
                name,
                key,
                index,
                value: 0.0,
                text: None,
                error: Some(error),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Whether the decode loop should keep going after a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Receiver of decoded fields
pub trait FrameSink {
    /// Called once per field, in wire order
    fn on_field(&mut self, field: DecodedField) -> Flow;

    /// Called before the first field when the frame carries a message ID, so
    /// the write queue can retire the matching outbound write
    fn on_message_id(&mut self, _header: &FrameHeader) {}
}

impl<F> FrameSink for F
where
    F: FnMut(DecodedField) -> Flow,
{
    fn on_field(&mut self, field: DecodedField) -> Flow {
        self(field)
    }
}

/// How the decode loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEnd {
    /// Fewer than a field header's worth of bits left
    Exhausted { trailing_bits: usize },
    /// Key 0 read
    EndMarker,
    /// An unassigned key was read; decoding stops
    UnknownKey(u8),
    /// The sink asked to stop
    Aborted,
    /// A read ran past the end of the buffer; the zero-filled value was emitted
    Truncated { missing_bits: usize },
}

/// Outcome of one frame decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSummary {
    pub header: FrameHeader,
    pub fields: usize,
    pub errors: usize,
    pub end: FrameEnd,
}

impl DecodeSummary {
    /// The frame ended on a boundary and every field decoded
    pub fn is_clean(&self) -> bool {
        self.errors == 0 && matches!(self.end, FrameEnd::Exhausted { .. } | FrameEnd::EndMarker)
    }
}

/// Fields and summary of a fully collected frame
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedFrame {
    pub summary: DecodeSummary,
    pub fields: Vec<DecodedField>,
}

/// Decoder for one decrypted payload
#[derive(Debug)]
pub struct FrameDecoder {
    stream: BitStream,
    framing: MessageIdFraming,
}

impl FrameDecoder {
    pub fn new(payload: &[u8]) -> Self {
        Self {
            stream: BitStream::from_bytes(payload),
            framing: MessageIdFraming::FromFlags,
        }
    }

    pub fn with_framing(mut self, framing: MessageIdFraming) -> Self {
        self.framing = framing;
        self
    }

    /// Decode every field into `sink`
    pub fn run<S: FrameSink + ?Sized>(mut self, sink: &mut S) -> DecodeSummary {
        let header = FrameHeader::read(&mut self.stream, self.framing);
        if header.flags.has_reserved_bits() {
            log::warn!("Reserved frame flag bits set: 0x{:02X}", header.flags.to_byte());
        }
        if header.message_id.is_some() {
            sink.on_message_id(&header);
        }

        let positional = header.flags.is_positional();
        let header_bits = FIELD_KEY_BITS + if positional { FIELD_POSITION_BITS } else { 0 };

        let mut counters = [0u32; 1 << FIELD_KEY_BITS];
        let mut fields = 0;
        let mut errors = 0;
        let mut end = None;

        if self.stream.overran() {
            end = Some(self.truncated());
        }

        while end.is_none() && self.stream.can_continue(header_bits) {
            let position = positional.then(|| self.stream.read_uint(FIELD_POSITION_BITS) as u32);
            let key = self.stream.read_uint(FIELD_KEY_BITS) as u8;
            let descriptor = registry::lookup(key);

            if !descriptor.is_assigned() {
                end = Some(if key == registry::keys::END_OF_DATA {
                    FrameEnd::EndMarker
                } else {
                    FrameEnd::UnknownKey(key)
                });
                break;
            }

            let index = position.unwrap_or_else(|| {
                let counter = &mut counters[key as usize];
                *counter += 1;
                *counter
            });
            let name = format!("{}_{}", descriptor.label, index);
            let field = DecodedField::from_result(name, key, index, decode_field(&mut self.stream, key));

            log::trace!("Decoded field {} = {} ({:?})", field.name, field.value, field.error);
            fields += 1;
            if field.error.is_some() {
                errors += 1;
            }

            let flow = sink.on_field(field);
            if self.stream.overran() {
                end = Some(self.truncated());
            } else if flow == Flow::Stop {
                end = Some(FrameEnd::Aborted);
            }
        }

        let end = end.unwrap_or(FrameEnd::Exhausted {
            trailing_bits: self.stream.remaining_bits(),
        });
        log::debug!("Frame decoded: {fields} fields, {errors} errors, end {end:?}");

        DecodeSummary {
            header,
            fields,
            errors,
            end,
        }
    }

    fn truncated(&self) -> FrameEnd {
        let missing_bits = self.stream.read_bit_pos() - self.stream.len_bits();
        if TRUNCATION_THROTTLE.lock().map(|mut t| t.allow()).unwrap_or(true) {
            log::warn!("Truncated frame: last field read {missing_bits} bits past the end");
        }
        FrameEnd::Truncated { missing_bits }
    }
}

/// Decode a whole payload, following the flags byte for message-ID framing
pub fn decode_frame(payload: &[u8]) -> DecodedFrame {
    decode_frame_with(payload, MessageIdFraming::FromFlags)
}

/// Decode a whole payload with explicit message-ID framing
pub fn decode_frame_with(payload: &[u8], framing: MessageIdFraming) -> DecodedFrame {
    let mut fields = Vec::new();
    let summary = FrameDecoder::new(payload)
        .with_framing(framing)
        .run(&mut |field: DecodedField| {
            fields.push(field);
            Flow::Continue
        });
    DecodedFrame { summary, fields }
}
