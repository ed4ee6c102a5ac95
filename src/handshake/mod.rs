//! Opening handshake: client nonce and `Sec-WebSocket-Accept` validation
//! (RFC 6455 section 4.1/4.2.2).

pub mod http;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::{Digest, Sha1};
use sha2::Sha256;

/// GUID the server appends to the client nonce before hashing.
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Protocol version sent in `Sec-WebSocket-Version`.
pub const WS_VERSION: &str = "13";

/// Decoded nonce length. Servers expect 16 bytes once base64 is stripped.
const NONCE_LEN: usize = 16;

/// Nonce sent as `Sec-WebSocket-Key` for one handshake attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeKey {
    nonce: String,
}

impl HandshakeKey {
    /// Fresh nonce from OS randomness.
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    /// Fresh nonce from the given RNG: base64 of a truncated SHA-256 digest
    /// over 32 random bytes.
    pub fn generate_with<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        let digest = Sha256::digest(seed);
        Self {
            nonce: BASE64.encode(&digest[..NONCE_LEN]),
        }
    }

    /// Wrap a nonce produced elsewhere.
    pub fn from_nonce(nonce: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
        }
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn expected_accept(&self) -> String {
        expected_accept(&self.nonce)
    }

    pub fn validate(&self, received: &str) -> bool {
        validate(&self.nonce, received)
    }
}

/// `base64(SHA-1(nonce + GUID))`.
pub fn expected_accept(nonce: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// True iff `received` is exactly the accept value derived from `nonce`.
pub fn validate(nonce: &str, received: &str) -> bool {
    received == expected_accept(nonce)
}
