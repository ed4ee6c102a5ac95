//! In-memory transport for driving a [`Connection`](super::Connection) in tests.

use std::collections::VecDeque;
use std::io;

use crate::handshake::expected_accept;
use crate::transport::Transport;
use crate::Result;

/// What the fake peer does on the next read.
pub(crate) enum Reply {
    /// Return these bytes.
    Data(Vec<u8>),
    /// Answer the upgrade request already written with a valid 101.
    Accept {
        extra_headers: String,
        trailing: Vec<u8>,
        piece: Option<usize>,
    },
    Fail(io::ErrorKind),
}

impl Reply {
    pub fn accept() -> Self {
        Self::Accept {
            extra_headers: String::new(),
            trailing: Vec::new(),
            piece: None,
        }
    }

    pub fn accept_with(extra_headers: &str) -> Self {
        Self::Accept {
            extra_headers: extra_headers.to_string(),
            trailing: Vec::new(),
            piece: None,
        }
    }

    /// Valid 101 followed by bytes the server sent straight after it.
    pub fn accept_then(trailing: Vec<u8>) -> Self {
        Self::Accept {
            extra_headers: String::new(),
            trailing,
            piece: None,
        }
    }

    /// Valid 101 delivered `size` bytes per read.
    pub fn accept_in_pieces(size: usize) -> Self {
        Self::Accept {
            extra_headers: String::new(),
            trailing: Vec::new(),
            piece: Some(size),
        }
    }
}

pub(crate) struct MockTransport {
    replies: VecDeque<Reply>,
    /// Bytes queued by a reply but not handed out yet.
    pending: VecDeque<Vec<u8>>,
    pub written: Vec<u8>,
    pub opened: Option<(String, u16, bool)>,
    pub close_calls: usize,
    pub fail_open: bool,
    /// Cap on bytes accepted per write, to exercise partial writes.
    pub max_write: Option<usize>,
}

impl MockTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: replies.into(),
            pending: VecDeque::new(),
            written: Vec::new(),
            opened: None,
            close_calls: 0,
            fail_open: false,
            max_write: None,
        }
    }

    fn request_key(&self) -> String {
        let text = String::from_utf8_lossy(&self.written);
        text.split("\r\n")
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("Sec-WebSocket-Key"))
            .map(|(_, v)| v.trim().to_string())
            .unwrap_or_default()
    }

    fn upgrade_response(&self, extra_headers: &str) -> Vec<u8> {
        let accept = expected_accept(&self.request_key());
        format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {accept}\r\n\
             {extra_headers}\r\n"
        )
        .into_bytes()
    }
}

impl Transport for MockTransport {
    fn open(&mut self, host: &str, port: u16, secure: bool) -> Result<()> {
        if self.fail_open {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused").into());
        }
        self.opened = Some((host.to_string(), port, secure));
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let n = self.max_write.map_or(data.len(), |max| data.len().min(max));
        self.written.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>> {
        if self.pending.is_empty() {
            match self.replies.pop_front() {
                None => return Ok(Vec::new()),
                Some(Reply::Fail(kind)) => return Err(io::Error::new(kind, "mock failure").into()),
                Some(Reply::Data(bytes)) => self.pending.push_back(bytes),
                Some(Reply::Accept {
                    extra_headers,
                    trailing,
                    piece,
                }) => {
                    let mut bytes = self.upgrade_response(&extra_headers);
                    bytes.extend(trailing);
                    match piece {
                        Some(size) => self
                            .pending
                            .extend(bytes.chunks(size.max(1)).map(<[u8]>::to_vec)),
                        None => self.pending.push_back(bytes),
                    }
                }
            }
        }

        let Some(mut chunk) = self.pending.pop_front() else {
            return Ok(Vec::new());
        };
        if chunk.len() > max {
            let rest = chunk.split_off(max);
            self.pending.push_front(rest);
        }
        Ok(chunk)
    }

    fn close(&mut self) -> Result<()> {
        self.close_calls += 1;
        Ok(())
    }
}
