//! Frame writer.
//! Header is FIN|opcode, then MASK|length code, extended length, optional key, payload.

use bytes::{BufMut, BytesMut};

use super::consts::{FIN, LEN_16, LEN_64, MASK_BIT, MASK_KEY_LEN, MAX_LITERAL_LEN};
use super::mask::apply_mask;
use super::Kind;

/// 7-bit length code for a payload of `len` bytes.
pub(super) fn length_code(len: usize) -> u8 {
    if len > u16::MAX as usize {
        LEN_64
    } else if len > MAX_LITERAL_LEN {
        LEN_16
    } else {
        len as u8
    }
}

/// Bytes occupied by the header (both fixed bytes, extended length and key).
pub(super) fn header_len(len: usize, masked: bool) -> usize {
    let ext = match length_code(len) {
        LEN_64 => 8,
        LEN_16 => 2,
        _ => 0,
    };
    2 + ext + if masked { MASK_KEY_LEN } else { 0 }
}

/// Append one complete frame to `out`. When `mask_key` is set the payload is
/// XORed with it and the key is written right before the payload.
pub fn encode_frame(
    out: &mut BytesMut,
    kind: Kind,
    payload: &[u8],
    mask_key: Option<[u8; MASK_KEY_LEN]>,
) {
    let len = payload.len();
    out.reserve(header_len(len, mask_key.is_some()) + len);

    out.put_u8(FIN | kind.opcode());

    let code = length_code(len);
    out.put_u8(if mask_key.is_some() { MASK_BIT | code } else { code });
    match code {
        LEN_16 => out.put_u16(len as u16),
        LEN_64 => out.put_u64(len as u64),
        _ => {}
    }

    match mask_key {
        Some(key) => {
            out.put_slice(&key);
            let start = out.len();
            out.put_slice(payload);
            apply_mask(&mut out[start..], &key);
        }
        None => out.put_slice(payload),
    }
}
