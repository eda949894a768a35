//! Client configuration, validated once at construction.
//!
//! # Design
//! Every value that used to live in a global allow-list (API versions,
//! schemes) is an enum here, and `ClientConfigBuilder::build` rejects anything
//! it cannot represent instead of falling back to a default. The resulting
//! `ClientConfig` is immutable and shared by every endpoint group of a client.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::normalize::ApiFailure;

pub const DEFAULT_DOMAIN: &str = "api.getkevin.eu";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Path segment every API version lives under.
pub const PLATFORM_PREFIX: &str = "/platform";

/// Supported platform API versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ApiVersion {
    V0_1,
    V0_2,
    #[default]
    V0_3,
}

impl ApiVersion {
    pub fn latest() -> Self {
        ApiVersion::V0_3
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApiVersion::V0_1 => "0.1",
            ApiVersion::V0_2 => "0.2",
            ApiVersion::V0_3 => "0.3",
        }
    }

    /// Path segment appended after `PLATFORM_PREFIX`.
    pub fn base_path(self) -> &'static str {
        match self {
            ApiVersion::V0_1 => "/v0.1",
            ApiVersion::V0_2 => "/v0.2",
            ApiVersion::V0_3 => "/v0.3",
        }
    }

    /// Versions that accept the PSU device headers (`PSU-IP-Port`,
    /// `PSU-User-Agent`, `PSU-Device-ID`).
    pub fn accepts_psu_device_headers(self) -> bool {
        matches!(self, ApiVersion::V0_2 | ApiVersion::V0_3)
    }
}

impl FromStr for ApiVersion {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "0.1" => Ok(ApiVersion::V0_1),
            "0.2" => Ok(ApiVersion::V0_2),
            "0.3" => Ok(ApiVersion::V0_3),
            other => Err(ApiError::Config(format!("unsupported API version: {other}"))),
        }
    }
}

impl TryFrom<String> for ApiVersion {
    type Error = ApiError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// URL scheme used to reach the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl FromStr for Scheme {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(ApiError::Config(format!("unsupported scheme: {other}"))),
        }
    }
}

impl TryFrom<String> for Scheme {
    type Error = ApiError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata identifying the integration that embeds this library. Each field
/// becomes a header only when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub version: Option<String>,
    pub platform: Option<String>,
    pub platform_version: Option<String>,
}

/// Callback deciding what a normalized failure turns into.
pub type FailureHandler = Arc<dyn Fn(ApiFailure) -> Result<Value> + Send + Sync>;

/// What endpoint calls do with a normalized failure.
#[derive(Clone, Default)]
pub enum FailureMode {
    /// Return `Err(ApiError::Api(failure))`.
    #[default]
    Raise,
    /// Return `Ok` with the `{"error": {...}, "data": ...}` envelope.
    Envelope,
    /// Hand the failure to a caller-supplied handler.
    Custom(FailureHandler),
}

impl FailureMode {
    pub fn apply(&self, failure: ApiFailure) -> Result<Value> {
        match self {
            FailureMode::Raise => Err(ApiError::Api(failure)),
            FailureMode::Envelope => Ok(failure.to_envelope()),
            FailureMode::Custom(handler) => handler(failure),
        }
    }
}

impl fmt::Debug for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureMode::Raise => f.write_str("Raise"),
            FailureMode::Envelope => f.write_str("Envelope"),
            FailureMode::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl FromStr for FailureMode {
    type Err = ApiError;

    /// Accepts the option names `exception` and `array`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exception" => Ok(FailureMode::Raise),
            "array" => Ok(FailureMode::Envelope),
            other => Err(ApiError::Config(format!("unsupported failure mode: {other}"))),
        }
    }
}

/// Immutable per-client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    client_id: String,
    client_secret: String,
    version: ApiVersion,
    scheme: Scheme,
    domain: String,
    port: Option<u16>,
    timeout: Duration,
    plugin: PluginInfo,
    failure_mode: FailureMode,
}

impl ClientConfig {
    pub fn builder(client_id: impl Into<String>, client_secret: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            version: ApiVersion::default(),
            scheme: Scheme::default(),
            domain: DEFAULT_DOMAIN.to_string(),
            port: None,
            timeout: DEFAULT_TIMEOUT,
            plugin: PluginInfo::default(),
            failure_mode: FailureMode::default(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Connect timeout, also applied as the socket read/write deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn plugin(&self) -> &PluginInfo {
        &self.plugin
    }

    pub fn failure_mode(&self) -> &FailureMode {
        &self.failure_mode
    }

    /// `scheme://domain[:port]/platform/v0.x`, without a trailing slash.
    pub fn base_url(&self) -> String {
        let authority = match self.port {
            Some(port) => format!("{}:{port}", self.domain),
            None => self.domain.clone(),
        };
        format!(
            "{}://{authority}{PLATFORM_PREFIX}{}",
            self.scheme,
            self.version.base_path()
        )
    }
}

/// Builder for `ClientConfig`; `build` performs all validation.
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    client_id: String,
    client_secret: String,
    version: ApiVersion,
    scheme: Scheme,
    domain: String,
    port: Option<u16>,
    timeout: Duration,
    plugin: PluginInfo,
    failure_mode: FailureMode,
}

impl ClientConfigBuilder {
    pub fn version(mut self, version: ApiVersion) -> Self {
        self.version = version;
        self
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn plugin(mut self, plugin: PluginInfo) -> Self {
        self.plugin = plugin;
        self
    }

    pub fn failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        if self.client_id.trim().is_empty() || self.client_secret.trim().is_empty() {
            return Err(ApiError::Config(
                "client id and client secret are required".to_string(),
            ));
        }
        validate_domain(&self.domain)?;
        if self.port == Some(0) {
            return Err(ApiError::Config("port must be non-zero".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ApiError::Config("timeout must be non-zero".to_string()));
        }
        Ok(ClientConfig {
            client_id: self.client_id,
            client_secret: self.client_secret,
            version: self.version,
            scheme: self.scheme,
            domain: self.domain,
            port: self.port,
            timeout: self.timeout,
            plugin: self.plugin,
            failure_mode: self.failure_mode,
        })
    }
}

/// A domain is a bare host: no scheme, port, path or whitespace.
fn validate_domain(domain: &str) -> Result<()> {
    if domain.is_empty() || domain.contains(['/', ':', '?', '#', '@']) || domain.contains(char::is_whitespace) {
        return Err(ApiError::Config(format!("invalid domain: {domain:?}")));
    }
    url::Host::parse(domain).map_err(|e| ApiError::Config(format!("invalid domain {domain:?}: {e}")))?;
    Ok(())
}
