//! HTTP request and response values exchanged with a `Transport`.
//!
//! # Design
//! Requests and responses are plain data. Endpoint groups build an
//! `HttpRequest`, a `Transport` turns it into a `RawResponse`, and the
//! normalizer interprets the response. Nothing here touches the network, so
//! every stage can be tested on its own.
//!
//! Header lists are ordered `Vec`s rather than maps: duplicates are legal and
//! a deterministic header-line order keeps the wire format reproducible.

use std::fmt;

use crate::error::{ApiError, Result};

/// Sentinel status used when a response carries no parseable status line.
pub const UNKNOWN_STATUS: i32 = -1;

/// HTTP method for a request. The platform only uses these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }

    /// Whether a request body is written to the wire for this method.
    pub fn carries_body(self) -> bool {
        matches!(self, HttpMethod::Post)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved request: absolute URL, method, ordered headers and the
/// already-serialized body (empty for GET).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// First value of the named header, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Every header must fit on one `name: value` line of the frame.
    pub fn check_headers(&self) -> Result<()> {
        let breaks_line = |text: &str| text.contains(['\r', '\n', '\0']);
        for (name, value) in &self.headers {
            if name.is_empty() || name.contains(':') || breaks_line(name) || breaks_line(value) {
                return Err(ApiError::Config(format!(
                    "header {name:?} is empty or contains a colon, line break or NUL"
                )));
            }
        }
        Ok(())
    }
}

/// Status code, headers and body exactly as read from the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Three-digit status, or `UNKNOWN_STATUS`.
    pub status: i32,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: i32, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
