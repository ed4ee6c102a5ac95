//! Bit layout constants for the RFC 6455 frame header.

use super::Kind;

/// FIN bit of byte 0. Always set: this crate never fragments messages.
pub const FIN: u8 = 0x80;

/// Low nibble of byte 0 carries the opcode.
pub const OPCODE_BITS: u8 = 0x0F;

/// High bit of byte 1 signals that a mask key follows the length field.
pub const MASK_BIT: u8 = 0x80;

/// Low 7 bits of byte 1 carry the length code.
pub const LEN_BITS: u8 = 0x7F;

/// Largest payload length that fits the 7-bit literal form.
pub const MAX_LITERAL_LEN: usize = 125;

/// Length code announcing a 2-byte big-endian extended length.
pub const LEN_16: u8 = 126;

/// Length code announcing an 8-byte big-endian extended length.
pub const LEN_64: u8 = 127;

pub const MASK_KEY_LEN: usize = 4;

/// Bidirectional kind/opcode table. Indexed by `Kind as usize`.
pub const OPCODES: [(Kind, u8); 5] = [
    (Kind::Text, 0x1),
    (Kind::Binary, 0x2),
    (Kind::Close, 0x8),
    (Kind::Ping, 0x9),
    (Kind::Pong, 0xA),
];
