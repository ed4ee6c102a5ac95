//! Blocking TCP transport, with TLS for `wss://` when the `tls` feature is on.

#[cfg(feature = "tls")]
mod tls;

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::client::Config;
use crate::transport::Transport;
use crate::Result;

/// Either a raw socket or a TLS session over one.
enum Stream {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<rustls::StreamOwned<rustls::ClientConnection, TcpStream>>),
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => match s.read(buf) {
                // Peers that drop the socket without close_notify.
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(0),
                other => other,
            },
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.flush(),
        }
    }
}

impl Stream {
    fn shutdown(self) -> io::Result<()> {
        match self {
            Stream::Plain(s) => s.shutdown(Shutdown::Both),
            #[cfg(feature = "tls")]
            Stream::Tls(mut s) => {
                s.conn.send_close_notify();
                // Best effort: the peer may already be gone.
                let _ = s.flush();
                s.sock.shutdown(Shutdown::Both)
            }
        }
    }
}

#[cfg(feature = "tls")]
fn secure_stream(host: &str, tcp: TcpStream) -> io::Result<Stream> {
    Ok(Stream::Tls(Box::new(tls::connect(host, tcp)?)))
}

#[cfg(not(feature = "tls"))]
fn secure_stream(_host: &str, tcp: TcpStream) -> io::Result<Stream> {
    let _ = tcp.shutdown(Shutdown::Both);
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "secure transport requires the `tls` feature",
    ))
}

fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport is not open")
}

/// [`Transport`] over `std::net::TcpStream`.
#[derive(Default)]
pub struct TcpTransport {
    stream: Option<Stream>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport using the socket timeouts from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            stream: None,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn stream(&mut self) -> io::Result<&mut Stream> {
        self.stream.as_mut().ok_or_else(not_open)
    }
}

impl Transport for TcpTransport {
    fn open(&mut self, host: &str, port: u16, secure: bool) -> Result<()> {
        let tcp = TcpStream::connect((host, port))?;
        tcp.set_read_timeout(self.read_timeout)?;
        tcp.set_write_timeout(self.write_timeout)?;
        tcp.set_nodelay(true)?;

        let stream = if secure {
            secure_stream(host, tcp)?
        } else {
            Stream::Plain(tcp)
        };
        self.stream = Some(stream);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let stream = self.stream()?;
        let n = stream.write(data)?;
        stream.flush()?;
        Ok(n)
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max];
        let n = self.stream()?.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    fn close(&mut self) -> Result<()> {
        match self.stream.take() {
            Some(stream) => match stream.shutdown() {
                // Already torn down by the peer.
                Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
                other => Ok(other?),
            },
            None => Ok(()),
        }
    }
}
