//! Blocking HTTP/1.1 over a raw socket.
//!
//! # Design
//! Every call opens its own connection, writes one `Connection: Close`
//! request frame, reads until the peer closes, and drops the socket before
//! returning. There is no pooling, no keep-alive and no chunked decoding: the
//! platform answers with a `Content-Length` body and hangs up.
//!
//! The status code is found by scanning the response head for the first line
//! that starts with `HTTP`; a response without one gets `UNKNOWN_STATUS`
//! and is left for the normalizer to reject.
//!
//! Sockets get a write deadline equal to the connect timeout, and the whole
//! response must arrive within that same timeout, so a peer that accepts and
//! then stalls or trickles cannot block the caller forever.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use regex::Regex;
use rustls::pki_types::ServerName;
use rustls::{ClientConnection, RootCertStore, StreamOwned};
use tracing::debug;
use url::{Host, Url};

use crate::config::{Scheme, DEFAULT_TIMEOUT};
use crate::error::{ApiError, Result};
use crate::headers::{AUTHORIZATION, CLIENT_ID, CLIENT_SECRET, CONTENT_LENGTH, CONTENT_TYPE};
use crate::http::{HttpMethod, HttpRequest, RawResponse, UNKNOWN_STATUS};

pub const MAX_REDIRECTS: usize = 10;

/// Executes a request and returns the raw response. Implementations must not
/// retry; retry policy belongs to the caller.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<RawResponse>;
}

/// The socket-level transport used in production.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    timeout: Duration,
    max_redirects: usize,
    tls: Arc<rustls::ClientConfig>,
}

impl TcpTransport {
    /// Transport trusting the Mozilla root set from `webpki-roots`.
    pub fn new(timeout: Duration) -> Self {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Self::with_tls_config(timeout, Arc::new(tls))
    }

    pub fn with_tls_config(timeout: Duration, tls: Arc<rustls::ClientConfig>) -> Self {
        Self {
            timeout,
            max_redirects: MAX_REDIRECTS,
            tls,
        }
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    fn round_trip(&self, url: &Url, method: HttpMethod, headers: &[(String, String)], body: &[u8]) -> Result<RawResponse> {
        let target = Target::resolve(url)?;
        debug!(%method, %url, "opening connection");

        let tcp = connect(&target.host, target.port, self.timeout)?;
        let mut stream = match target.scheme {
            Scheme::Http => Stream::Plain(tcp),
            Scheme::Https => {
                let name = ServerName::try_from(target.host.clone())
                    .map_err(|e| ApiError::Transport(format!("invalid TLS server name {}: {e}", target.host)))?;
                let conn = ClientConnection::new(Arc::clone(&self.tls), name)
                    .map_err(|e| ApiError::Transport(format!("TLS setup failed: {e}")))?;
                Stream::Tls(Box::new(StreamOwned::new(conn, tcp)))
            }
        };

        let frame = encode_request(url, method, headers, body);
        stream
            .write_all(&frame)
            .and_then(|()| stream.flush())
            .map_err(|e| ApiError::Transport(format!("write failed: {e}")))?;

        let raw = read_until_close(&mut stream, self.timeout)?;
        let response = parse_response(&raw);
        debug!(status = response.status, bytes = raw.len(), "received response");
        Ok(response)
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for TcpTransport {
    fn send(&self, request: &HttpRequest) -> Result<RawResponse> {
        request.check_headers()?;
        let mut url = Url::parse(&request.url)?;
        let mut method = request.method;
        let mut headers = request.headers.clone();
        let mut body: &[u8] = &request.body;

        for hop in 0..=self.max_redirects {
            let response = self.round_trip(&url, method, &headers, body)?;
            let Some(location) = redirect_location(&response) else {
                return Ok(response);
            };
            if hop == self.max_redirects {
                break;
            }

            let next = url
                .join(location)
                .map_err(|e| ApiError::Transport(format!("invalid redirect location {location:?}: {e}")))?;
            Target::resolve(&next)
                .map_err(|e| ApiError::Transport(format!("unusable redirect location {location:?}: {e}")))?;
            debug!(status = response.status, from = %url, to = %next, "following redirect");

            if response.status == 303 || (method == HttpMethod::Post && matches!(response.status, 301 | 302)) {
                method = HttpMethod::Get;
                body = &[];
                headers.retain(|(name, _)| {
                    !name.eq_ignore_ascii_case(CONTENT_LENGTH) && !name.eq_ignore_ascii_case(CONTENT_TYPE)
                });
            }
            if next.origin() != url.origin() {
                headers.retain(|(name, _)| {
                    ![CLIENT_ID, CLIENT_SECRET, AUTHORIZATION]
                        .iter()
                        .any(|secret| name.eq_ignore_ascii_case(secret))
                });
            }
            url = next;
        }

        Err(ApiError::Transport(format!(
            "maximum of {} redirects exceeded",
            self.max_redirects
        )))
    }
}

/// Where to connect and how.
#[derive(Debug, PartialEq, Eq)]
struct Target {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl Target {
    fn resolve(url: &Url) -> Result<Self> {
        let scheme: Scheme = url.scheme().parse()?;
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(ApiError::Config(format!("url has no host: {url}"))),
        };
        let port = url.port().unwrap_or_else(|| scheme.default_port());
        Ok(Self { scheme, host, port })
    }
}

fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| ApiError::Transport(format!("cannot resolve {host}:{port}: {e}")))?;

    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(ApiError::Transport(match last_error {
        Some(e) => format!("cannot connect to {host}:{port}: {e}"),
        None => format!("no addresses found for {host}:{port}"),
    }))
}

enum Stream {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            Stream::Tls(s) => s.flush(),
        }
    }
}

impl Stream {
    fn set_read_timeout(&self, timeout: Duration) -> io::Result<()> {
        match self {
            Stream::Plain(s) => s.set_read_timeout(Some(timeout)),
            Stream::Tls(s) => s.sock.set_read_timeout(Some(timeout)),
        }
    }
}

/// Read until the peer hangs up, giving the whole response `budget` to
/// arrive. Each read waits at most for what is left of the budget, so a
/// peer trickling bytes cannot extend the call.
///
/// Servers commonly close TLS without `close_notify`; once bytes have arrived
/// that truncation is treated as the end of the response.
fn read_until_close(stream: &mut Stream, budget: Duration) -> Result<Vec<u8>> {
    let deadline = Instant::now() + budget;
    let mut raw = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ApiError::Transport(format!(
                "response not complete after {budget:?} ({} bytes read)",
                raw.len()
            )));
        }
        stream
            .set_read_timeout(remaining)
            .map_err(|e| ApiError::Transport(format!("cannot set read deadline: {e}")))?;
        match stream.read(&mut chunk) {
            Ok(0) => return Ok(raw),
            Ok(n) => raw.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && !raw.is_empty() => return Ok(raw),
            Err(e) => return Err(ApiError::Transport(format!("read failed: {e}"))),
        }
    }
}

/// Serialize a request into a single HTTP/1.1 frame.
pub fn encode_request(url: &Url, method: HttpMethod, headers: &[(String, String)], body: &[u8]) -> Vec<u8> {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };

    let mut head = format!("{method} {target} HTTP/1.1\r\n");
    head.push_str(&format!("Host: {host}\r\n"));
    head.push_str("Accept: */*\r\n");
    head.push_str("Accept-Encoding: *\r\n");
    for (name, value) in headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("Connection: Close\r\n\r\n");

    let mut frame = head.into_bytes();
    if method.carries_body() {
        frame.extend_from_slice(body);
    }
    frame
}

fn status_line() -> &'static Regex {
    static STATUS_LINE: OnceLock<Regex> = OnceLock::new();
    STATUS_LINE.get_or_init(|| Regex::new(r"^HTTP/\S+\s+(\d{3})(?:\s|$)").expect("status line pattern is valid"))
}

/// Split a raw response on the first blank line and extract status, headers
/// and body.
pub fn parse_response(raw: &[u8]) -> RawResponse {
    let (head, body) = match raw.windows(4).position(|w| w == b"\r\n\r\n") {
        Some(at) => (&raw[..at], &raw[at + 4..]),
        None => (raw, &raw[raw.len()..]),
    };
    let head = String::from_utf8_lossy(head);

    let mut lines = head.split("\r\n").skip_while(|line| !line.starts_with("HTTP"));
    let status = lines
        .next()
        .and_then(|line| status_line().captures(line))
        .and_then(|caps| caps[1].parse::<i32>().ok())
        .unwrap_or(UNKNOWN_STATUS);

    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();

    RawResponse {
        status,
        headers,
        body: body.to_vec(),
    }
}

fn redirect_location(response: &RawResponse) -> Option<&str> {
    match response.status {
        301 | 302 | 303 | 307 | 308 => response.header("Location").filter(|l| !l.is_empty()),
        _ => None,
    }
}
