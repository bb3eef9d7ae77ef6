//! Frame header: the flags byte and the optional message-ID byte that open
//! every decrypted LoRaRAW payload.

use crate::constants::{FRAME_FLAGS_BITS, MESSAGE_ID_BITS};
use crate::payload::bitstream::BitStream;
use bitflags::bitflags;

bitflags! {
    /// Flags byte at the start of every payload
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FrameFlags: u8 {
        /// Every field is preceded by an explicit position byte
        const POSITIONAL = 0b0000_0001;

        /// Controller-to-device request, a message-ID byte follows
        const REQUEST = 0b0000_0010;

        /// Device-to-controller response, a message-ID byte follows
        const RESPONSE = 0b0000_0100;

        /// Reserved, must be zero
        const RESERVED = 0b1111_1000;
    }
}

impl FrameFlags {
    /// Infallible: unknown bits are retained so they can be reported
    pub const fn from_byte(byte: u8) -> Self {
        Self::from_bits_retain(byte)
    }

    pub const fn to_byte(self) -> u8 {
        self.bits()
    }

    pub fn is_positional(self) -> bool {
        self.contains(Self::POSITIONAL)
    }

    /// Request or response: the frame carries a message ID
    pub fn has_message_id(self) -> bool {
        self.intersects(Self::REQUEST | Self::RESPONSE)
    }

    pub fn has_reserved_bits(self) -> bool {
        self.intersects(Self::RESERVED)
    }
}

impl Default for FrameFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Whether the decoder should expect a message-ID byte after the flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageIdFraming {
    /// Follow the request/response bits of the flags byte
    #[default]
    FromFlags,
    /// Fire-and-forget telemetry: never read a message ID
    Uplink,
    /// Reply to an outbound write: always read a message ID
    Response,
}

/// Parsed frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    pub flags: FrameFlags,
    pub message_id: Option<u8>,
}

impl FrameHeader {
    pub fn uplink() -> Self {
        Self::default()
    }

    pub fn positional() -> Self {
        Self {
            flags: FrameFlags::POSITIONAL,
            message_id: None,
        }
    }

    pub fn request(message_id: u8) -> Self {
        Self {
            flags: FrameFlags::REQUEST,
            message_id: Some(message_id),
        }
    }

    pub fn response(message_id: u8) -> Self {
        Self {
            flags: FrameFlags::RESPONSE,
            message_id: Some(message_id),
        }
    }

    /// Switch on positional addressing
    pub fn with_positional(mut self) -> Self {
        self.flags |= FrameFlags::POSITIONAL;
        self
    }

    /// Read the header, leaving the cursor on the first field
    pub fn read(stream: &mut BitStream, framing: MessageIdFraming) -> Self {
        let flags = FrameFlags::from_byte(stream.read_uint(FRAME_FLAGS_BITS) as u8);
        let has_message_id = match framing {
            MessageIdFraming::FromFlags => flags.has_message_id(),
            MessageIdFraming::Uplink => false,
            MessageIdFraming::Response => true,
        };
        let message_id = has_message_id.then(|| stream.read_uint(MESSAGE_ID_BITS) as u8);
        Self { flags, message_id }
    }

    pub fn write(&self, stream: &mut BitStream) {
        stream.write_uint(self.flags.to_byte() as u64, FRAME_FLAGS_BITS);
        if let Some(id) = self.message_id {
            stream.write_uint(id as u64, MESSAGE_ID_BITS);
        }
    }
}
