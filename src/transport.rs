//! Transport abstraction for the connection layer.
//!
//! A transport is a blocking byte stream owned by exactly one
//! [`Connection`](crate::Connection). [`TcpTransport`](crate::socket::TcpTransport)
//! is the real implementation; tests plug in an in-memory one.

use crate::Result;
use std::io;

/// Blocking byte-stream transport (plain TCP, TLS, or a test double).
pub trait Transport: Send {
    /// Connect to `host:port`, wrapping the stream in TLS when `secure` is set.
    fn open(&mut self, host: &str, port: u16, secure: bool) -> Result<()>;

    /// Write some of `data`, returning how many bytes were accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Read at most `max` bytes. An empty result means the peer closed.
    fn read(&mut self, max: usize) -> Result<Vec<u8>>;

    /// Release the underlying stream. Closing twice is not an error.
    fn close(&mut self) -> Result<()>;

    /// Write all of `data`, retrying partial writes.
    fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            match self.write(data)? {
                0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "transport accepted no bytes",
                    )
                    .into())
                }
                n => data = &data[n..],
            }
        }
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, host: &str, port: u16, secure: bool) -> Result<()> {
        (**self).open(host, port, secure)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        (**self).write(data)
    }

    fn read(&mut self, max: usize) -> Result<Vec<u8>> {
        (**self).read(max)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
