//! Frame reader.
//! The mask bit of byte 1 alone decides whether a key precedes the payload.

use crate::error::FrameError;

use super::consts::{LEN_16, LEN_64, LEN_BITS, MASK_BIT, MASK_KEY_LEN, OPCODE_BITS};
use super::mask::apply_mask;
use super::{Frame, Kind};

type Result<T> = std::result::Result<T, FrameError>;

/// Everything before the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Header {
    pub kind: Kind,
    pub mask_key: Option<[u8; MASK_KEY_LEN]>,
    pub payload_len: usize,
    /// Offset of the first payload byte.
    pub header_len: usize,
}

impl Header {
    pub fn frame_len(&self) -> Result<usize> {
        self.header_len
            .checked_add(self.payload_len)
            .ok_or(FrameError::TooLarge {
                len: self.payload_len as u64,
                max: (usize::MAX - self.header_len) as u64,
            })
    }
}

fn check_eos(data: &[u8], position: usize, len: usize) -> Result<()> {
    match position.checked_add(len) {
        Some(end) if end <= data.len() => Ok(()),
        Some(end) => Err(FrameError::Incomplete {
            needed: end,
            available: data.len(),
        }),
        None => Err(FrameError::TooLarge {
            len: len as u64,
            max: (usize::MAX - position) as u64,
        }),
    }
}

/// Decode one complete frame from the start of `data`. Trailing bytes are
/// ignored; use [`frame_len`] to find where the next frame starts.
pub fn decode(data: &[u8], max_payload: u64) -> Result<Frame> {
    let mut d = Decoder::new(data);
    let header = d.read_header(max_payload)?;
    header.frame_len()?;
    let mut payload = d.read_bytes(header.payload_len)?.to_vec();
    if let Some(key) = header.mask_key {
        apply_mask(&mut payload, &key);
    }
    Ok(Frame {
        kind: header.kind,
        payload,
        mask_key: header.mask_key,
    })
}

/// Total size of the frame at the start of `data`, or `None` while the header
/// itself is still incomplete.
pub fn frame_len(data: &[u8], max_payload: u64) -> Result<Option<usize>> {
    match Decoder::new(data).read_header(max_payload) {
        Ok(header) => header.frame_len().map(Some),
        Err(FrameError::Incomplete { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read_u8(&mut self) -> Result<u8> {
        check_eos(self.data, self.pos, 1)?;
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_u16_be(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u64_be(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read_bytes(8)?);
        Ok(u64::from_be_bytes(buf))
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        check_eos(self.data, self.pos, len)?;
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn read_header(&mut self, max_payload: u64) -> Result<Header> {
        let b0 = self.read_u8()?;
        let opcode = b0 & OPCODE_BITS;
        let kind = Kind::from_opcode(opcode).ok_or(FrameError::UnknownOpcode(opcode))?;

        let b1 = self.read_u8()?;
        let masked = b1 & MASK_BIT != 0;
        let len = match b1 & LEN_BITS {
            LEN_16 => self.read_u16_be()? as u64,
            LEN_64 => self.read_u64_be()?,
            code => code as u64,
        };
        if len > max_payload {
            return Err(FrameError::TooLarge {
                len,
                max: max_payload,
            });
        }
        let payload_len = usize::try_from(len).map_err(|_| FrameError::TooLarge {
            len,
            max: usize::MAX as u64,
        })?;

        let mask_key = if masked {
            let mut key = [0u8; MASK_KEY_LEN];
            key.copy_from_slice(self.read_bytes(MASK_KEY_LEN)?);
            Some(key)
        } else {
            None
        };

        Ok(Header {
            kind,
            mask_key,
            payload_len,
            header_len: self.pos,
        })
    }
}
