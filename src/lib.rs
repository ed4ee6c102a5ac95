//! # wsframe
//!
//! Blocking client for the RFC 6455 WebSocket wire protocol.
//!
//! ## Features
//!
//! - Frame codec with 7/16/64-bit length fields and client masking
//! - Pluggable mask key source (random by default, fixed for tests)
//! - `Sec-WebSocket-Key` generation and `Sec-WebSocket-Accept` validation
//! - Connection state machine over `ws://` and `wss://` (rustls, `tls` feature)
//! - Transport trait so the connection can run over any byte stream
//!
//! Fragmentation, compression and server-side framing are not supported.
//!
//! ## Example
//!
//! ```no_run
//! use wsframe::{Connection, Kind};
//!
//! fn main() -> wsframe::Result<()> {
//!     let mut conn = Connection::open("ws://example.org/chat", None)?;
//!     conn.send_text("hello")?;
//!     let frame = conn.receive()?;
//!     if frame.kind == Kind::Text {
//!         println!("{}", frame.to_text());
//!     }
//!     conn.close()
//! }
//! ```

pub mod client;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod socket;
pub mod transport;

pub use client::{Config, Connection, State, Uri};
pub use error::{ConnectionError, Error, FrameError, HandshakeError, Result};
pub use frame::{FixedMask, Frame, FrameCodec, Kind, MaskGenerator, RandomMask};
pub use handshake::HandshakeKey;
pub use socket::TcpTransport;
pub use transport::Transport;
