//! Authentication and content headers shared by every endpoint.

use crate::config::ClientConfig;

pub const CLIENT_ID: &str = "Client-Id";
pub const CLIENT_SECRET: &str = "Client-Secret";
pub const PLUGIN_VERSION: &str = "Plugin-Version";
pub const PLUGIN_PLATFORM: &str = "Plugin-Platform";
pub const PLUGIN_PLATFORM_VERSION: &str = "Plugin-Platform-Version";
pub const AUTHORIZATION: &str = "Authorization";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Header list in wire order.
pub type Headers = Vec<(String, String)>;

/// Client credentials followed by whatever plugin metadata is configured.
pub fn build_auth_headers(config: &ClientConfig) -> Headers {
    let mut headers = vec![
        (CLIENT_ID.to_string(), config.client_id().to_string()),
        (CLIENT_SECRET.to_string(), config.client_secret().to_string()),
    ];
    headers.extend(build_plugin_headers(config));
    headers
}

/// Plugin metadata only; unset (or blank) values produce no header at all.
pub fn build_plugin_headers(config: &ClientConfig) -> Headers {
    let plugin = config.plugin();
    [
        (PLUGIN_VERSION, &plugin.version),
        (PLUGIN_PLATFORM, &plugin.platform),
        (PLUGIN_PLATFORM_VERSION, &plugin.platform_version),
    ]
    .into_iter()
    .filter_map(|(name, value)| {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(|v| (name.to_string(), v.to_string()))
    })
    .collect()
}

/// `Content-Type` and `Content-Length` for an already-serialized body.
pub fn build_content_headers(body: &[u8]) -> Headers {
    vec![
        (CONTENT_TYPE.to_string(), "application/json".to_string()),
        (CONTENT_LENGTH.to_string(), body.len().to_string()),
    ]
}

/// Normalize an access token into an `Authorization` value.
pub fn bearer(token: &str) -> String {
    let token = token.trim();
    let has_prefix = token
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("bearer"));
    if has_prefix {
        token.to_string()
    } else {
        format!("Bearer {token}")
    }
}
