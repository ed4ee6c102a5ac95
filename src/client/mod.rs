//! Client connection: URI, transport lifecycle, upgrade handshake and frame I/O.

mod config;
#[cfg(test)]
mod mock;
mod uri;

use bytes::BytesMut;
use tracing::{debug, trace, warn};

use crate::error::{ConnectionError, HandshakeError};
use crate::frame::{Frame, FrameCodec, Kind, MaskGenerator, RandomMask};
use crate::handshake::http::{self, Request, Response};
use crate::handshake::{HandshakeKey, WS_VERSION};
use crate::socket::TcpTransport;
use crate::transport::Transport;
use crate::Result;

pub use config::{Config, DEFAULT_READ_BUFFER_SIZE, EXTENSIONS_OFFER};
pub use uri::{Scheme, Uri};

/// Upper bound on the upgrade response head.
const MAX_RESPONSE_HEAD: usize = 16 * 1024;

/// Lifecycle of a [`Connection`]. `Closed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    Unconnected,
    Connected,
    Handshaken,
    Closed,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unconnected => "unconnected",
            Self::Connected => "connected",
            Self::Handshaken => "handshaken",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A client WebSocket connection over an exclusively owned transport.
///
/// Every call blocks until the transport finishes. Frames sent are always
/// masked; frames received may be either.
pub struct Connection<T: Transport = TcpTransport, G: MaskGenerator = RandomMask> {
    uri: Uri,
    config: Config,
    transport: T,
    codec: FrameCodec<G>,
    state: State,
    /// Bytes read from the transport but not yet decoded.
    buf: BytesMut,
    protocol: Option<String>,
}

impl Connection {
    /// Parse `uri` and prepare a TCP connection with default options. Nothing
    /// is opened yet.
    pub fn new(uri: &str) -> Result<Self> {
        Self::with_config(uri, Config::default())
    }

    pub fn with_config(uri: &str, config: Config) -> Result<Self> {
        let transport = TcpTransport::from_config(&config);
        Self::with_transport(uri, transport, config)
    }

    /// Parse, connect and handshake in one go.
    pub fn open(uri: &str, protocols: Option<&str>) -> Result<Self> {
        let mut conn = Self::new(uri)?;
        conn.connect()?;
        conn.handshake(protocols)?;
        Ok(conn)
    }
}

impl<T: Transport> Connection<T, RandomMask> {
    /// Connection over a caller-supplied transport.
    pub fn with_transport(uri: &str, transport: T, config: Config) -> Result<Self> {
        let uri: Uri = uri.parse()?;
        let codec = FrameCodec::masked().with_max_payload(config.max_frame_size);
        Ok(Self {
            uri,
            config,
            transport,
            codec,
            state: State::Unconnected,
            buf: BytesMut::new(),
            protocol: None,
        })
    }
}

impl<T: Transport, G: MaskGenerator> Connection<T, G> {
    /// Replace the mask key source used for outgoing frames.
    pub fn with_mask_generator<G2: MaskGenerator>(self, generator: G2) -> Connection<T, G2> {
        Connection {
            codec: FrameCodec::masked_with(generator).with_max_payload(self.config.max_frame_size),
            uri: self.uri,
            config: self.config,
            transport: self.transport,
            state: self.state,
            buf: self.buf,
            protocol: self.protocol,
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn host(&self) -> &str {
        &self.uri.host
    }

    pub fn port(&self) -> u16 {
        self.uri.port
    }

    pub fn path(&self) -> &str {
        &self.uri.path
    }

    pub fn is_secure(&self) -> bool {
        self.uri.is_secure()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Subprotocol the server selected, if any.
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    fn expect_state(&self, expected: State, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ConnectionError::InvalidState {
                operation,
                state: self.state,
            }
            .into())
        }
    }

    /// Open the transport to the URI's host and port.
    pub fn connect(&mut self) -> Result<()> {
        self.expect_state(State::Unconnected, "connect")?;
        let secure = self.uri.is_secure();
        debug!(host = %self.uri.host, port = self.uri.port, secure, "connecting");
        if let Err(e) = self.transport.open(&self.uri.host, self.uri.port, secure) {
            warn!(error = %e, kind = e.kind(), "connect failed");
            self.abort();
            return Err(e);
        }
        self.state = State::Connected;
        Ok(())
    }

    /// Run the HTTP upgrade. `protocols` is sent verbatim as
    /// `Sec-WebSocket-Protocol`. On failure the transport is closed before
    /// the error is returned.
    pub fn handshake(&mut self, protocols: Option<&str>) -> Result<()> {
        self.expect_state(State::Connected, "handshake")?;
        match self.upgrade(protocols) {
            Ok(()) => {
                debug!(path = %self.uri.path, protocol = ?self.protocol, "handshake complete");
                self.state = State::Handshaken;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "handshake failed");
                self.abort();
                Err(e)
            }
        }
    }

    fn upgrade_request(&self, key: &HandshakeKey, protocols: Option<&str>) -> Request {
        let origin = self
            .config
            .origin
            .clone()
            .unwrap_or_else(|| format!("http://{}", self.uri.host));
        let req = Request::new("GET", self.uri.path.as_str())
            .with_header("Host", self.uri.authority())
            .with_header("Upgrade", "websocket")
            .with_header("Origin", origin)
            .with_header("Connection", "Upgrade")
            .with_header("User-Agent", self.config.user_agent.as_str())
            .with_header("Sec-WebSocket-Key", key.nonce())
            .with_header("Sec-WebSocket-Version", WS_VERSION)
            .with_header("Sec-WebSocket-Extensions", EXTENSIONS_OFFER);
        match protocols {
            Some(p) => req.with_header("Sec-WebSocket-Protocol", p),
            None => req,
        }
    }

    fn upgrade(&mut self, protocols: Option<&str>) -> Result<()> {
        let key = HandshakeKey::generate();
        let request = self.upgrade_request(&key, protocols);
        self.transport.write_all(&request.encode())?;

        let head_len = loop {
            if let Some(n) = http::head_len(&self.buf) {
                break n;
            }
            if self.buf.len() > MAX_RESPONSE_HEAD {
                return Err(HandshakeError::MalformedResponse(
                    "response head too large".to_string(),
                )
                .into());
            }
            self.fill_buf()?;
        };
        // Anything after the head already belongs to the frame stream.
        let head = self.buf.split_to(head_len);
        let response = Response::parse(&head)?;

        if !response.is_success() {
            return Err(HandshakeError::Rejected {
                status: response.status,
                reason: response.reason,
            }
            .into());
        }
        match response.header("Sec-WebSocket-Accept") {
            Some(accept) if key.validate(accept) => {}
            _ => return Err(HandshakeError::KeyMismatch.into()),
        }
        self.protocol = response
            .header("Sec-WebSocket-Protocol")
            .map(str::to_string);
        Ok(())
    }

    /// Send one masked frame.
    pub fn send(&mut self, payload: &[u8], kind: Kind) -> Result<()> {
        self.expect_state(State::Handshaken, "send")?;
        let bytes = self.codec.encode(kind, payload);
        trace!(%kind, len = payload.len(), "sending frame");
        self.transport.write_all(&bytes)
    }

    pub fn send_text(&mut self, text: &str) -> Result<()> {
        self.send(text.as_bytes(), Kind::Text)
    }

    /// Block until one complete frame is available and return it.
    pub fn receive(&mut self) -> Result<Frame> {
        self.expect_state(State::Handshaken, "receive")?;
        loop {
            if let Some(len) = self.codec.frame_len(&self.buf)? {
                if self.buf.len() >= len {
                    let bytes = self.buf.split_to(len);
                    let frame = self.codec.decode(&bytes)?;
                    trace!(
                        kind = %frame.kind,
                        len = frame.payload.len(),
                        masked = frame.is_masked(),
                        "received frame"
                    );
                    return Ok(frame);
                }
            }
            self.fill_buf()?;
        }
    }

    /// Release the transport. Safe to call in any state, any number of times.
    pub fn close(&mut self) -> Result<()> {
        if self.state == State::Closed {
            return Ok(());
        }
        debug!(host = %self.uri.host, state = %self.state, "closing");
        self.state = State::Closed;
        self.buf.clear();
        self.transport.close()
    }

    /// One transport read appended to the buffer. Zero bytes means the peer
    /// is gone.
    fn fill_buf(&mut self) -> Result<()> {
        let chunk = self.transport.read(self.config.read_buffer_size.max(1))?;
        if chunk.is_empty() {
            return Err(ConnectionError::Closed.into());
        }
        self.buf.extend_from_slice(&chunk);
        Ok(())
    }

    /// Close after a failure, keeping the original error.
    fn abort(&mut self) {
        if let Err(e) = self.close() {
            debug!(error = %e, "close after failure also failed");
        }
    }
}

impl<T: Transport, G: MaskGenerator> std::fmt::Debug for Connection<T, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("uri", &self.uri)
            .field("state", &self.state)
            .field("buffered", &self.buf.len())
            .field("protocol", &self.protocol)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use super::mock::{MockTransport, Reply};
    use crate::frame::FixedMask;
    use crate::Error;

    fn conn(replies: Vec<Reply>) -> Connection<MockTransport> {
        Connection::with_transport(
            "ws://example.org/chat",
            MockTransport::new(replies),
            Config::default(),
        )
        .unwrap()
    }

    fn handshaken(frames: Vec<Reply>) -> Connection<MockTransport> {
        let mut replies = vec![Reply::accept()];
        replies.extend(frames);
        let mut c = conn(replies);
        c.connect().unwrap();
        c.handshake(None).unwrap();
        c
    }

    fn server_frame(kind: Kind, payload: &[u8]) -> Vec<u8> {
        FrameCodec::plain().encode(kind, payload).to_vec()
    }

    #[test]
    fn parses_uri_on_construction() {
        let c = conn(vec![]);
        assert_eq!(c.host(), "example.org");
        assert_eq!(c.port(), 80);
        assert_eq!(c.path(), "/chat");
        assert!(!c.is_secure());
        assert_eq!(c.state(), State::Unconnected);

        let c = Connection::with_transport(
            "wss://example.org:8443/x",
            MockTransport::new(vec![]),
            Config::default(),
        )
        .unwrap();
        assert_eq!(c.port(), 8443);
        assert!(c.is_secure());
    }

    #[test]
    fn invalid_scheme_rejected() {
        let err = Connection::new("http://example.org/chat").unwrap_err();
        assert!(matches!(err, Error::InvalidUri(_)));
    }

    #[test]
    fn connect_opens_transport() {
        let mut c = conn(vec![]);
        c.connect().unwrap();
        assert_eq!(c.state(), State::Connected);
        assert_eq!(
            c.transport().opened,
            Some(("example.org".to_string(), 80, false))
        );
    }

    #[test]
    fn connect_uses_secure_transport_for_wss() {
        let mut c = Connection::with_transport(
            "wss://example.org:8443/x",
            MockTransport::new(vec![]),
            Config::default(),
        )
        .unwrap();
        c.connect().unwrap();
        assert_eq!(
            c.transport().opened,
            Some(("example.org".to_string(), 8443, true))
        );
    }

    #[test]
    fn failed_connect_closes() {
        let mut c = conn(vec![]);
        c.transport.fail_open = true;
        assert!(matches!(c.connect(), Err(Error::Transport(_))));
        assert_eq!(c.state(), State::Closed);
    }

    #[test]
    fn handshake_sends_upgrade_request() {
        let c = handshaken(vec![]);
        assert_eq!(c.state(), State::Handshaken);

        let written = String::from_utf8(c.transport().written.clone()).unwrap();
        let mut lines = written.split("\r\n");
        assert_eq!(lines.next(), Some("GET /chat HTTP/1.1"));
        let headers: Vec<&str> = lines.take_while(|l| !l.is_empty()).collect();
        let names: Vec<&str> = headers
            .iter()
            .map(|h| h.split_once(": ").unwrap().0)
            .collect();
        assert_eq!(
            names,
            [
                "Host",
                "Upgrade",
                "Origin",
                "Connection",
                "User-Agent",
                "Sec-WebSocket-Key",
                "Sec-WebSocket-Version",
                "Sec-WebSocket-Extensions",
            ]
        );
        assert!(headers.contains(&"Host: example.org"));
        assert!(headers.contains(&"Origin: http://example.org"));
        assert!(headers.contains(&"Sec-WebSocket-Version: 13"));
        assert!(headers.contains(&"Sec-WebSocket-Extensions: permessage-deflate; client_max_window_bits"));
        assert!(written.ends_with("\r\n\r\n"));
    }

    #[test]
    fn handshake_with_protocols() {
        let mut c = conn(vec![Reply::accept_with("Sec-WebSocket-Protocol: chat\r\n")]);
        c.connect().unwrap();
        c.handshake(Some("chat, superchat")).unwrap();
        let written = String::from_utf8(c.transport().written.clone()).unwrap();
        assert!(written.contains("\r\nSec-WebSocket-Protocol: chat, superchat\r\n"));
        assert_eq!(c.protocol(), Some("chat"));
    }

    #[test]
    fn handshake_rejected_closes_transport() {
        let mut c = conn(vec![Reply::Data(
            b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\n\r\n".to_vec(),
        )]);
        c.connect().unwrap();
        let err = c.handshake(None).unwrap_err();
        assert!(matches!(
            err,
            Error::Handshake(HandshakeError::Rejected { status: 403, .. })
        ));
        assert_eq!(c.state(), State::Closed);
        assert_eq!(c.transport().close_calls, 1);
    }

    #[test]
    fn handshake_key_mismatch_closes_transport() {
        let mut c = conn(vec![Reply::Data(
            b"HTTP/1.1 101 Switching Protocols\r\n\
              Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n\r\n"
                .to_vec(),
        )]);
        c.connect().unwrap();
        let err = c.handshake(None).unwrap_err();
        assert!(matches!(err, Error::Handshake(HandshakeError::KeyMismatch)));
        assert_eq!(c.state(), State::Closed);
        assert_eq!(c.transport().close_calls, 1);
    }

    #[test]
    fn missing_accept_header_is_a_mismatch() {
        let mut c = conn(vec![Reply::Data(
            b"HTTP/1.1 101 Switching Protocols\r\n\r\n".to_vec(),
        )]);
        c.connect().unwrap();
        assert!(matches!(
            c.handshake(None),
            Err(Error::Handshake(HandshakeError::KeyMismatch))
        ));
    }

    #[test]
    fn handshake_response_split_across_reads() {
        let mut c = conn(vec![Reply::accept_in_pieces(7)]);
        c.connect().unwrap();
        c.handshake(None).unwrap();
        assert_eq!(c.state(), State::Handshaken);
    }

    #[test]
    fn operations_require_the_right_state() {
        let mut c = conn(vec![]);
        assert!(matches!(
            c.send_text("hi"),
            Err(Error::Connection(ConnectionError::InvalidState {
                operation: "send",
                state: State::Unconnected
            }))
        ));
        assert!(matches!(
            c.handshake(None),
            Err(Error::Connection(ConnectionError::InvalidState { .. }))
        ));
        c.connect().unwrap();
        assert!(matches!(
            c.receive(),
            Err(Error::Connection(ConnectionError::InvalidState { .. }))
        ));
        assert!(matches!(
            c.connect(),
            Err(Error::Connection(ConnectionError::InvalidState { .. }))
        ));
    }

    #[test]
    fn send_writes_masked_frame() {
        let mut c = handshaken(vec![]).with_mask_generator(FixedMask::new([37, 234, 102, 179]));
        let before = c.transport().written.len();
        c.send_text("Foo Bar").unwrap();
        let frame = &c.transport().written[before..];
        assert_eq!(
            frame,
            &[0x81, 135, 37, 234, 102, 179, 0x63, 0x85, 0x09, 0x93, 0x67, 0x8B, 0x14]
        );
    }

    #[test]
    fn send_drains_partial_writes() {
        let mut c = handshaken(vec![]);
        c.transport.max_write = Some(3);
        let before = c.transport().written.len();
        c.send(&[7u8; 300], Kind::Binary).unwrap();
        let frame = FrameCodec::plain()
            .decode(&c.transport().written[before..])
            .unwrap();
        assert_eq!(frame.kind, Kind::Binary);
        assert_eq!(frame.payload, vec![7u8; 300]);
        assert!(frame.is_masked());
    }

    #[test]
    fn receive_plain_and_masked() {
        let masked = FrameCodec::masked().encode(Kind::Ping, b"masked").to_vec();
        let mut c = handshaken(vec![
            Reply::Data(server_frame(Kind::Text, b"hello")),
            Reply::Data(masked),
        ]);
        let first = c.receive().unwrap();
        assert_eq!((first.kind, first.to_text().as_str()), (Kind::Text, "hello"));
        assert!(!first.is_masked());
        let second = c.receive().unwrap();
        assert_eq!((second.kind, second.payload.as_slice()), (Kind::Ping, &b"masked"[..]));
        assert!(second.is_masked());
    }

    #[test]
    fn receive_zero_bytes_is_connection_closed() {
        let mut c = handshaken(vec![]);
        assert!(matches!(
            c.receive(),
            Err(Error::Connection(ConnectionError::Closed))
        ));
    }

    #[test]
    fn receive_unknown_opcode() {
        let mut c = handshaken(vec![Reply::Data(vec![0x83, 0x00])]);
        assert!(matches!(
            c.receive(),
            Err(Error::Frame(crate::error::FrameError::UnknownOpcode(3)))
        ));
    }

    #[test]
    fn receive_transport_error() {
        let mut c = handshaken(vec![Reply::Fail(io::ErrorKind::ConnectionReset)]);
        assert!(matches!(c.receive(), Err(Error::Transport(e)) if e.kind() == io::ErrorKind::ConnectionReset));
    }

    #[test]
    fn two_frames_in_one_read_come_out_in_order() {
        let mut both = server_frame(Kind::Text, b"one");
        both.extend(server_frame(Kind::Text, b"two"));
        let mut c = handshaken(vec![Reply::Data(both)]);
        assert_eq!(c.receive().unwrap().to_text(), "one");
        assert_eq!(c.receive().unwrap().to_text(), "two");
    }

    #[test]
    fn frame_after_handshake_head_is_kept() {
        let mut c = conn(vec![Reply::accept_then(server_frame(Kind::Text, b"early"))]);
        c.connect().unwrap();
        c.handshake(None).unwrap();
        assert_eq!(c.receive().unwrap().to_text(), "early");
    }

    #[test]
    fn large_frame_spans_many_reads() {
        let payload: Vec<u8> = (0..70_000u32).map(|i| (i % 251) as u8).collect();
        let bytes = server_frame(Kind::Binary, &payload);
        let replies = bytes
            .chunks(DEFAULT_READ_BUFFER_SIZE)
            .map(|c| Reply::Data(c.to_vec()))
            .collect();
        let mut c = handshaken(replies);
        let frame = c.receive().unwrap();
        assert_eq!(frame.kind, Kind::Binary);
        assert_eq!(frame.payload, payload);
    }

    #[test]
    fn oversized_frame_rejected() {
        let config = Config::default().with_max_frame_size(10);
        let mut c = Connection::with_transport(
            "ws://example.org/chat",
            MockTransport::new(vec![
                Reply::accept(),
                Reply::Data(server_frame(Kind::Text, b"far too long")),
            ]),
            config,
        )
        .unwrap();
        c.connect().unwrap();
        c.handshake(None).unwrap();
        assert!(matches!(
            c.receive(),
            Err(Error::Frame(crate::error::FrameError::TooLarge { len: 12, max: 10 }))
        ));
    }

    #[test]
    fn unbounded_max_length_header_is_too_large() {
        let config = Config::default().with_max_frame_size(u64::MAX);
        let mut header = vec![0x82, 127];
        header.extend_from_slice(&u64::MAX.to_be_bytes());
        let mut c = Connection::with_transport(
            "ws://example.org/chat",
            MockTransport::new(vec![Reply::accept(), Reply::Data(header)]),
            config,
        )
        .unwrap();
        c.connect().unwrap();
        c.handshake(None).unwrap();
        assert!(matches!(
            c.receive(),
            Err(Error::Frame(crate::error::FrameError::TooLarge { .. }))
        ));
    }

    #[test]
    fn close_is_idempotent() {
        let mut c = handshaken(vec![]);
        c.close().unwrap();
        c.close().unwrap();
        assert_eq!(c.state(), State::Closed);
        assert_eq!(c.transport().close_calls, 1);
        assert!(matches!(
            c.send_text("late"),
            Err(Error::Connection(ConnectionError::InvalidState { .. }))
        ));
    }

    #[test]
    fn close_before_connect() {
        let mut c = conn(vec![]);
        c.close().unwrap();
        assert_eq!(c.state(), State::Closed);
    }
}
