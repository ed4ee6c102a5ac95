//! Mask key sources for client-to-server frames.
//!
//! Every masked frame takes a fresh key from a [`MaskGenerator`]. The default
//! [`RandomMask`] draws from the OS CSPRNG; [`FixedMask`] replays a known
//! sequence so encoded bytes can be compared against fixtures.

use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::consts::MASK_KEY_LEN;

/// Produces the 4-byte key used to XOR a frame payload.
pub trait MaskGenerator {
    fn generate(&self) -> [u8; MASK_KEY_LEN];
}

impl<G: MaskGenerator + ?Sized> MaskGenerator for Arc<G> {
    fn generate(&self) -> [u8; MASK_KEY_LEN] {
        (**self).generate()
    }
}

impl<G: MaskGenerator + ?Sized> MaskGenerator for Box<G> {
    fn generate(&self) -> [u8; MASK_KEY_LEN] {
        (**self).generate()
    }
}

/// New random key on every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomMask;

impl MaskGenerator for RandomMask {
    fn generate(&self) -> [u8; MASK_KEY_LEN] {
        let mut key = [0u8; MASK_KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }
}

/// Cycles through a fixed list of keys. For reproducible tests.
#[derive(Debug)]
pub struct FixedMask {
    keys: Vec<[u8; MASK_KEY_LEN]>,
    next: AtomicUsize,
}

impl FixedMask {
    /// Always returns `key`.
    pub fn new(key: [u8; MASK_KEY_LEN]) -> Self {
        Self {
            keys: vec![key],
            next: AtomicUsize::new(0),
        }
    }

    /// Returns the keys in order, wrapping around. `None` for an empty list,
    /// which would leave payloads unmasked.
    pub fn sequence(keys: impl IntoIterator<Item = [u8; MASK_KEY_LEN]>) -> Option<Self> {
        let keys: Vec<_> = keys.into_iter().collect();
        if keys.is_empty() {
            return None;
        }
        Some(Self {
            keys,
            next: AtomicUsize::new(0),
        })
    }
}

impl MaskGenerator for FixedMask {
    fn generate(&self) -> [u8; MASK_KEY_LEN] {
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        self.keys[i % self.keys.len()]
    }
}

/// XOR `payload` in place with the repeating key. Applying it twice restores
/// the original bytes.
#[inline]
pub fn apply_mask(payload: &mut [u8], key: &[u8; MASK_KEY_LEN]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i % MASK_KEY_LEN];
    }
}
