//! # BitStream - Bit-Granular Payload Buffer
//!
//! LoRaRAW payload fields are packed back to back with no byte alignment, so a
//! field may start and end in the middle of a byte. `BitStream` keeps an
//! appendable byte buffer with two independent cursors:
//!
//! - a read cursor counted in bits from the start of the buffer
//! - a write cursor counted in bits inside the trailing byte (0-7)
//!
//! All values are packed MSB-first: the first bit written lands in bit 7 of
//! the trailing byte.
//!
//! ## Usage
//!
//! ```rust
//! use loraraw_rs::payload::bitstream::BitStream;
//!
//! let mut stream = BitStream::new();
//! stream.write_uint(1, 6);
//! stream.write_uint(11166, 15);
//!
//! let mut reader = BitStream::from_bytes(stream.as_bytes());
//! assert_eq!(reader.read_uint(6), 1);
//! assert_eq!(reader.read_uint(15), 11166);
//! ```

/// Largest value width handled by the integer helpers
pub const MAX_VALUE_BITS: usize = 64;

/// Appendable byte buffer with independent read and write bit cursors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitStream {
    buffer: Vec<u8>,
    /// Bits consumed from the start of the buffer; never decreases
    read_bit_pos: usize,
    /// Bits already used in the trailing byte
    write_bit_pos: u8,
}

impl BitStream {
    /// Create an empty stream for building a frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty stream with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Wrap received bytes for decoding, read cursor at bit 0
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            buffer: bytes.to_vec(),
            read_bit_pos: 0,
            write_bit_pos: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Total number of bits held by the buffer
    pub fn len_bits(&self) -> usize {
        self.buffer.len() * 8
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn read_bit_pos(&self) -> usize {
        self.read_bit_pos
    }

    pub fn write_bit_pos(&self) -> u8 {
        self.write_bit_pos
    }

    /// Bits left between the read cursor and the end of the buffer
    pub fn remaining_bits(&self) -> usize {
        self.len_bits().saturating_sub(self.read_bit_pos)
    }

    /// True once a read has run past the end of the buffer
    pub fn overran(&self) -> bool {
        self.read_bit_pos > self.len_bits()
    }

    /// Advance the read cursor without looking at the bits
    pub fn skip_bits(&mut self, count: usize) {
        self.read_bit_pos += count;
    }

    /// Return the whole bytes covering `[read_bit_pos, read_bit_pos + count)`.
    ///
    /// Bytes beyond the end of the buffer read as zero; deployed firmware emits
    /// short trailing frames and the decoder must not fail on them. The read
    /// cursor advances by `count` unconditionally.
    pub fn read_bits(&mut self, count: usize) -> Vec<u8> {
        let first = self.read_bit_pos / 8;
        let shift = self.read_bit_pos % 8;
        let window = (first..first + bytes_required(shift, count))
            .map(|index| self.buffer.get(index).copied().unwrap_or(0))
            .collect();

        self.read_bit_pos += count;
        window
    }

    /// Read `count` bits (at most 64) as a right-aligned unsigned integer
    pub fn read_uint(&mut self, count: usize) -> u64 {
        let shift = self.read_bit_pos % 8;
        let vector = self.read_bits(count);
        bits_from_vector(&vector, count, shift, vector.len())
    }

    /// Merge `count` bits from a left-aligned byte vector into the stream.
    ///
    /// The trailing byte is only ever OR-ed: bits behind the write cursor are
    /// kept, the new bits fill the free low bits and any remainder is appended
    /// as new bytes. Missing vector bytes count as zero.
    pub fn write_bits(&mut self, vector: &[u8], count: usize) {
        let mut remaining = count;
        let mut index = 0;

        while remaining > 0 {
            let take = remaining.min(8);
            let byte = vector.get(index).copied().unwrap_or(0) & high_mask(take);
            let used = self.write_bit_pos as usize;

            if used == 0 {
                self.buffer.push(byte);
            } else {
                let free = 8 - used;
                if let Some(last) = self.buffer.last_mut() {
                    *last |= byte >> used;
                }
                if take > free {
                    self.buffer.push(byte << free);
                }
            }

            self.write_bit_pos = ((used + take) % 8) as u8;
            remaining -= take;
            index += 1;
        }
    }

    /// Append the low `count` bits (at most 64) of `value`, MSB first
    pub fn write_uint(&mut self, value: u64, count: usize) {
        let vector = to_bit_vector(value, count);
        self.write_bits(&vector, count);
    }

    /// Loop guard for the field decoder.
    ///
    /// True while `read_bit_pos < len_bits - header_bit_count`. Up to
    /// `header_bit_count` unread trailing bits are treated as padding, not as a
    /// truncated field.
    pub fn can_continue(&self, header_bit_count: usize) -> bool {
        self.read_bit_pos < self.len_bits().saturating_sub(header_bit_count)
    }
}

/// Number of whole bytes spanned by `count` bits starting `shift` bits into a byte
pub fn bytes_required(shift: usize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    (shift + count + 7) / 8
}

/// Rebuild a right-aligned integer from a byte window.
///
/// `vector` holds `bytes_required` bytes read big-endian; the value starts
/// `shift` bits into the first byte and is `count` bits wide (at most 64).
/// Missing bytes read as zero.
pub fn bits_from_vector(vector: &[u8], count: usize, shift: usize, bytes_required: usize) -> u64 {
    debug_assert!(count <= MAX_VALUE_BITS, "value wider than 64 bits");
    if count == 0 || bytes_required == 0 {
        return 0;
    }

    // 64 value bits plus a 7-bit shift never need more than 9 bytes
    let window = bytes_required.min(16);
    let accumulator = (0..window).fold(0u128, |acc, index| {
        (acc << 8) | vector.get(index).copied().unwrap_or(0) as u128
    });

    let tail = (window * 8).saturating_sub(shift + count);
    (accumulator >> tail) as u64 & low_mask(count)
}

/// Left-align the low `count` bits of `value` into `ceil(count / 8)` bytes
pub fn to_bit_vector(value: u64, count: usize) -> Vec<u8> {
    debug_assert!(count <= MAX_VALUE_BITS, "value wider than 64 bits");
    if count == 0 {
        return Vec::new();
    }

    let aligned = ((value & low_mask(count)) as u128) << (128 - count);
    aligned.to_be_bytes()[..(count + 7) / 8].to_vec()
}

fn low_mask(count: usize) -> u64 {
    if count >= 64 {
        u64::MAX
    } else {
        (1u64 << count) - 1
    }
}

fn high_mask(bits: usize) -> u8 {
    if bits >= 8 {
        0xFF
    } else {
        !(0xFFu8 >> bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_from_vector_reference_values() {
        // 6-bit key at the start of a byte
        assert_eq!(bits_from_vector(&[0x05], 6, 0, 1), 1);
        // 15-bit temperature starting 6 bits into 0x05 0x5C 0xF0
        assert_eq!(bits_from_vector(&[0x05, 0x5C, 0xF0], 15, 6, 3), 11166);
        // 6-bit key straddling 0xF0 0x4A
        assert_eq!(bits_from_vector(&[0xF0, 0x4A], 6, 5, 2), 2);
        // full byte at an offset
        assert_eq!(bits_from_vector(&[0x0F, 0xF0], 8, 4, 2), 0xFF);
        // full 64-bit value shifted across nine bytes
        let vector = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0x00];
        assert_eq!(bits_from_vector(&vector, 64, 4, 9), 0x1234_5678_9ABC_DEF0);
    }

    #[test]
    fn test_bits_from_vector_missing_bytes_are_zero() {
        assert_eq!(bits_from_vector(&[0xFF], 16, 0, 2), 0xFF00);
        assert_eq!(bits_from_vector(&[], 8, 0, 1), 0);
    }

    #[test]
    fn test_read_bits_window() {
        let mut stream = BitStream::from_bytes(&[0x00, 0x05, 0x5C, 0xF0]);
        stream.skip_bits(8);
        assert_eq!(stream.read_bits(6), vec![0x05]);
        assert_eq!(stream.read_bits(15), vec![0x05, 0x5C, 0xF0]);
        assert_eq!(stream.read_bit_pos(), 29);
    }

    #[test]
    fn test_read_past_end_returns_zero() {
        let mut stream = BitStream::from_bytes(&[0xFF]);
        assert_eq!(stream.read_uint(4), 0x0F);
        assert_eq!(stream.read_uint(12), 0xF00);
        assert!(stream.overran());
        assert_eq!(stream.read_bits(8), vec![0x00]);
        assert_eq!(stream.read_bit_pos(), 24);
    }

    #[test]
    fn test_write_merges_into_trailing_byte() {
        let mut stream = BitStream::new();
        stream.write_uint(0b101, 3);
        assert_eq!(stream.as_bytes(), &[0b1010_0000]);
        assert_eq!(stream.write_bit_pos(), 3);

        stream.write_uint(0b11111, 5);
        assert_eq!(stream.as_bytes(), &[0b1011_1111]);
        assert_eq!(stream.write_bit_pos(), 0);

        stream.write_uint(0b1, 1);
        assert_eq!(stream.as_bytes(), &[0b1011_1111, 0b1000_0000]);
    }

    #[test]
    fn test_write_bits_straddles_bytes() {
        let mut stream = BitStream::new();
        stream.write_bits(&[0x00], 8);
        stream.write_bits(&[0x04], 6);
        stream.write_bits(&to_bit_vector(11166, 15), 15);
        assert_eq!(stream.as_bytes(), &[0x00, 0x05, 0x5C, 0xF0]);
        assert_eq!(stream.write_bit_pos(), 5);
    }

    #[test]
    fn test_write_keeps_existing_bits() {
        let mut stream = BitStream::from_bytes(&[0xAA]);
        stream.write_uint(0x55, 8);
        assert_eq!(stream.as_bytes(), &[0xAA, 0x55]);
    }

    #[test]
    fn test_write_then_read_mixed_widths() {
        let widths = [1usize, 3, 6, 7, 8, 9, 13, 15, 16, 17, 31, 32, 33, 63, 64];
        let mut stream = BitStream::new();
        let values: Vec<u64> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| (0x9E37_79B9_7F4A_7C15u64.rotate_left(i as u32 * 7)) & low_mask(w))
            .collect();

        for (&value, &width) in values.iter().zip(widths.iter()) {
            stream.write_uint(value, width);
        }

        let mut reader = BitStream::from_bytes(stream.as_bytes());
        for (&value, &width) in values.iter().zip(widths.iter()) {
            assert_eq!(reader.read_uint(width), value, "width {width}");
        }
    }

    #[test]
    fn test_to_bit_vector_left_aligns() {
        assert_eq!(to_bit_vector(1, 6), vec![0b0000_0100]);
        assert_eq!(to_bit_vector(0x1FF, 9), vec![0xFF, 0x80]);
        assert!(to_bit_vector(7, 0).is_empty());
    }

    #[test]
    fn test_can_continue_leaves_header_bits() {
        let mut stream = BitStream::from_bytes(&[0x00, 0x00]);
        stream.skip_bits(8);
        assert!(stream.can_continue(6));
        stream.skip_bits(3);
        assert!(!stream.can_continue(6));
        assert!(stream.can_continue(0));
    }

    #[test]
    fn test_can_continue_on_tiny_buffer() {
        let stream = BitStream::from_bytes(&[0x00]);
        assert!(!stream.can_continue(14));
        assert!(!BitStream::new().can_continue(0));
    }

    #[test]
    fn test_bytes_required() {
        assert_eq!(bytes_required(0, 8), 1);
        assert_eq!(bytes_required(6, 15), 3);
        assert_eq!(bytes_required(7, 64), 9);
        assert_eq!(bytes_required(3, 0), 0);
    }
}
