//! RFC 6455 frame codec.
//!
//! One [`FrameCodec`] covers both directions. Its [`Masking`] policy only
//! affects encoding: clients mask every frame they send, servers never do.
//! Decoding always branches on the mask bit of the received header, so the
//! same codec reads masked and plain frames.

pub(crate) mod consts;
mod decoder;
mod encoder;
mod mask;

use bytes::{Bytes, BytesMut};

use crate::error::FrameError;
use consts::OPCODES;

pub use decoder::{decode, frame_len};
pub use encoder::encode_frame;
pub use mask::{apply_mask, FixedMask, MaskGenerator, RandomMask};

/// Default upper bound for a single payload (64 MiB).
pub const DEFAULT_MAX_PAYLOAD: u64 = 64 * 1024 * 1024;

/// Frame kinds this crate sends and understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl Kind {
    /// Wire opcode (low nibble of byte 0).
    pub const fn opcode(self) -> u8 {
        OPCODES[self as usize].1
    }

    /// Reverse lookup; `None` for opcodes outside the table.
    pub fn from_opcode(opcode: u8) -> Option<Kind> {
        OPCODES
            .iter()
            .find(|(_, op)| *op == opcode)
            .map(|(kind, _)| *kind)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Close => "close",
            Self::Ping => "ping",
            Self::Pong => "pong",
        };
        f.write_str(name)
    }
}

/// A single, complete frame with its payload already unmasked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub kind: Kind,
    pub payload: Vec<u8>,
    /// Key the payload was masked with on the wire, if any.
    pub mask_key: Option<[u8; 4]>,
}

impl Frame {
    pub fn new(kind: Kind, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
            mask_key: None,
        }
    }

    pub fn is_masked(&self) -> bool {
        self.mask_key.is_some()
    }

    /// Payload as text, one character per byte (Latin-1). No UTF-8 decoding
    /// is attempted, so this never fails.
    pub fn to_text(&self) -> String {
        self.payload.iter().map(|&b| b as char).collect()
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// Whether encoded frames carry a mask, and where keys come from.
#[derive(Clone, Debug)]
pub enum Masking<G> {
    Off,
    On(G),
}

/// Encodes and decodes single frames.
#[derive(Clone, Debug)]
pub struct FrameCodec<G = RandomMask> {
    masking: Masking<G>,
    max_payload: u64,
}

impl FrameCodec<RandomMask> {
    /// Codec that writes unmasked frames.
    pub fn plain() -> Self {
        Self {
            masking: Masking::Off,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Codec that masks every frame with a fresh random key.
    pub fn masked() -> Self {
        Self::masked_with(RandomMask)
    }
}

impl Default for FrameCodec<RandomMask> {
    fn default() -> Self {
        Self::masked()
    }
}

impl<G: MaskGenerator> FrameCodec<G> {
    /// Codec that masks every frame with keys drawn from `generator`.
    pub fn masked_with(generator: G) -> Self {
        Self {
            masking: Masking::On(generator),
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Reject decoded frames whose declared payload exceeds `max` bytes.
    pub fn with_max_payload(mut self, max: u64) -> Self {
        self.max_payload = max;
        self
    }

    pub fn max_payload(&self) -> u64 {
        self.max_payload
    }

    pub fn is_masking(&self) -> bool {
        matches!(self.masking, Masking::On(_))
    }

    /// Encode one frame. Masked codecs take a new key for every call.
    pub fn encode(&self, kind: Kind, payload: &[u8]) -> Bytes {
        let mut out = BytesMut::new();
        self.encode_into(kind, payload, &mut out);
        out.freeze()
    }

    /// Like [`encode`](Self::encode) but appends to an existing buffer.
    pub fn encode_into(&self, kind: Kind, payload: &[u8], out: &mut BytesMut) {
        let key = match &self.masking {
            Masking::On(generator) => Some(generator.generate()),
            Masking::Off => None,
        };
        encode_frame(out, kind, payload, key);
    }

    /// Decode the frame at the start of `data`, masked or not.
    pub fn decode(&self, data: &[u8]) -> Result<Frame, FrameError> {
        decode(data, self.max_payload)
    }

    /// Size of the frame at the start of `data` once its header is available.
    pub fn frame_len(&self, data: &[u8]) -> Result<Option<usize>, FrameError> {
        frame_len(data, self.max_payload)
    }
}
