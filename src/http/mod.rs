//! Minimal HTTP/1.1 request handling.
//!
//! Only the request line is parsed. Everything after it is handed to the
//! interpreters as raw lines; headers are never interpreted.

pub mod response;

pub use response::{Response, Status};

use crate::error::GatewayError;

const VERSION_SUFFIX: &str = " HTTP/1.1";

/// Request method. Anything but GET and POST is kept verbatim for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl Method {
    fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Other(other) => other,
        }
    }
}

/// `METHOD SP PATH SP HTTP/1.1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub path: String,
}

impl RequestLine {
    /// Parse a request line, with or without its trailing `\r`.
    pub fn parse(line: &str) -> Result<Self, GatewayError> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let head = line
            .strip_suffix(VERSION_SUFFIX)
            .ok_or(GatewayError::TransportParse)?;
        let (method, path) = head.split_once(' ').ok_or(GatewayError::TransportParse)?;

        Ok(Self {
            method: Method::parse(method),
            path: path.to_string(),
        })
    }
}

/// Split a raw request into its first line and the remaining lines.
///
/// The request ends at the first NUL byte. Lines are split on `\n` only, so a
/// CRLF header section leaves its `\r` in place; the POST body separator is
/// the line consisting of a lone `\r`.
pub fn split_request(raw: &[u8]) -> (String, Vec<String>) {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let text = String::from_utf8_lossy(&raw[..end]);

    let mut lines = text.split_terminator('\n').map(str::to_string);
    let first = lines.next().unwrap_or_default();

    (first, lines.collect())
}
