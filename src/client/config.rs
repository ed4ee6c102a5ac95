//! Connection options.

use std::time::Duration;

use crate::frame::DEFAULT_MAX_PAYLOAD;

/// Bytes requested from the transport per read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 2048;

/// Value of `Sec-WebSocket-Extensions` sent with every upgrade request.
pub const EXTENSIONS_OFFER: &str = "permessage-deflate; client_max_window_bits";

/// Optional parameters for a [`Connection`](super::Connection).
#[derive(Clone, Debug)]
pub struct Config {
    /// `Origin` header. Defaults to `http://{host}`.
    pub origin: Option<String>,
    pub user_agent: String,
    pub read_buffer_size: usize,
    /// Largest payload accepted from the peer.
    pub max_frame_size: u64,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: None,
            user_agent: concat!("wsframe/", env!("CARGO_PKG_VERSION")).to_string(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_frame_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl Config {
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Zero is bumped to one so reads always make progress.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    pub fn with_max_frame_size(mut self, max: u64) -> Self {
        self.max_frame_size = max;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }
}
