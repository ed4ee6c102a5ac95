//! Just enough HTTP/1.1 for the upgrade exchange: serialise a request head and
//! parse a response head.

use crate::error::HandshakeError;

const CRLF: &str = "\r\n";
const HEAD_END: &[u8] = b"\r\n\r\n";

/// Ordered header list. Lookups are case-insensitive.
pub type Headers = Vec<(String, String)>;

fn find_header<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Request line plus headers. Upgrade requests carry no body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub headers: Headers,
}

impl Request {
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            headers: Headers::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// `METHOD target HTTP/1.1`, one `Name: value` line per header, blank line.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = format!("{} {} HTTP/1.1\r\n", self.method, self.target);
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str(CRLF);
        }
        out.push_str(CRLF);
        out.into_bytes()
    }
}

/// Status line and headers of a response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub headers: Headers,
}

impl Response {
    /// Parse a response head (everything up to, and optionally including, the
    /// blank line).
    pub fn parse(head: &[u8]) -> Result<Self, HandshakeError> {
        let text = std::str::from_utf8(head)
            .map_err(|e| HandshakeError::MalformedResponse(e.to_string()))?;
        let mut lines = text.split(CRLF);

        let status_line = lines.next().unwrap_or_default();
        let mut parts = status_line.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("HTTP/") {
            return Err(HandshakeError::MalformedResponse(format!(
                "bad status line: {status_line:?}"
            )));
        }
        let status = parts
            .next()
            .and_then(|s| s.trim().parse::<u16>().ok())
            .ok_or_else(|| {
                HandshakeError::MalformedResponse(format!("bad status code: {status_line:?}"))
            })?;
        let reason = parts.next().unwrap_or_default().trim().to_string();

        let mut headers = Headers::new();
        for line in lines.take_while(|l| !l.is_empty()) {
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        Ok(Self {
            status,
            reason,
            headers,
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// 101 Switching Protocols or any 2xx.
    pub fn is_success(&self) -> bool {
        self.status == 101 || (200..300).contains(&self.status)
    }
}

/// Length of the response head including the terminating blank line, once
/// `buf` contains it.
pub fn head_len(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_END.len())
        .position(|w| w == HEAD_END)
        .map(|i| i + HEAD_END.len())
}
