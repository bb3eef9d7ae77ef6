//! The payload module contains the bit-packed field codec that turns a
//! decrypted LoRaRAW payload into named point values and back.

pub mod bitstream;
pub mod decoder;
pub mod encoder;
pub mod field;
pub mod header;
pub mod registry;

pub use bitstream::BitStream;
pub use decoder::{
    decode_frame, decode_frame_with, DecodeSummary, DecodedField, DecodedFrame, FrameDecoder,
    FrameEnd, FrameSink, Flow,
};
pub use encoder::{encode_frame, FieldWrite, FrameEncoder};
pub use field::{decode_field, decode_field_as, encode_field, CodecError, FieldValue, Scalar};
pub use header::{FrameFlags, FrameHeader, MessageIdFraming};
pub use registry::{lookup, lookup_label, Encoding, FieldDescriptor, ScalarKind};
