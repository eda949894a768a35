//! Blocking client core for the kevin. open-banking platform API.
//!
//! # Overview
//! Builds authenticated requests for the platform's auth, payment and account
//! endpoints, sends them over a hand-rolled HTTP/1.1 transport, normalizes
//! responses into success payloads or structured failures, and verifies the
//! signatures of inbound webhooks.
//!
//! # Design
//! - `sanitize` filters caller data against allow-list schemas before it
//!   reaches the wire.
//! - `headers` assembles credential, plugin and content headers.
//! - `transport` opens one socket per call (TLS for `https`), writes a single
//!   `Connection: Close` frame and reads until the peer hangs up.
//! - `normalize` applies the fixed status-code policy.
//! - `signature` is independent of the rest and performs no I/O.
//! - `Client` composes configuration and transport; what happens to a failure
//!   is decided by the injected `FailureMode`, never by the core.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod headers;
pub mod http;
pub mod normalize;
pub mod sanitize;
pub mod signature;
pub mod transport;

pub use client::{AccountApi, AuthApi, Client, PaymentApi};
pub use config::{ApiVersion, ClientConfig, ClientConfigBuilder, FailureMode, PluginInfo, Scheme};
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, RawResponse};
pub use normalize::{normalize, ApiFailure, NormalizedResult};
pub use sanitize::sanitize;
pub use signature::{verify, SignatureContext};
pub use transport::{TcpTransport, Transport};
