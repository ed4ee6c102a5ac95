//! `ws://` / `wss://` URI parsing.

use std::fmt;
use std::str::FromStr;

use url::{Host, Url};

use crate::error::Error;

/// The two schemes a connection can be built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scheme {
    Ws,
    Wss,
}

impl Scheme {
    pub fn default_port(self) -> u16 {
        match self {
            Self::Ws => 80,
            Self::Wss => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ws => "ws",
            Self::Wss => "wss",
        })
    }
}

/// Parsed connection target: `scheme://host[:port][/path][?query]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Uri {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    /// Request target; always starts with `/` and keeps any query string.
    pub path: String,
}

fn invalid(uri: &str, why: &str) -> Error {
    Error::InvalidUri(format!("{why}: {uri:?}"))
}

impl Uri {
    /// TLS is used for `wss` and for anything on port 443.
    pub fn is_secure(&self) -> bool {
        self.scheme == Scheme::Wss || self.port == 443
    }

    /// Value for the `Host` header; the port is omitted when it is the
    /// scheme's default.
    pub fn authority(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if self.port == self.scheme.default_port() {
            host
        } else {
            format!("{host}:{}", self.port)
        }
    }
}

impl FromStr for Uri {
    type Err = Error;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(uri).map_err(|e| invalid(uri, &e.to_string()))?;
        let scheme = match url.scheme() {
            "ws" => Scheme::Ws,
            "wss" => Scheme::Wss,
            _ => return Err(invalid(uri, "scheme must be ws or wss")),
        };
        if !url.username().is_empty() || url.password().is_some() {
            return Err(invalid(uri, "userinfo is not supported"));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(invalid(uri, "missing host")),
        };
        let port = url
            .port_or_known_default()
            .unwrap_or_else(|| scheme.default_port());
        let path = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };

        Ok(Self {
            scheme,
            host,
            port,
            path,
        })
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority(), self.path)
    }
}
