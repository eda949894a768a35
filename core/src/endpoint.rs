//! Endpoint paths and URL assembly.
//!
//! Paths are relative to `ClientConfig::base_url` and may contain
//! `{placeholder}` tokens, filled positionally by `glue_path`.

use std::sync::OnceLock;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::{NoExpand, Regex};
use serde_json::Value;
use url::form_urlencoded;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};

pub mod paths {
    pub const COUNTRIES: &str = "/auth/countries";
    pub const BANKS: &str = "/auth/banks";
    pub const BANK: &str = "/auth/banks/{bankId}";
    pub const BANK_BY_CARD_NUMBER_PIECE: &str = "/auth/banks/cards/{cardNumberPiece}";
    pub const PAYMENT_METHODS: &str = "/auth/paymentMethods";
    pub const AUTH: &str = "/auth";
    pub const TOKEN: &str = "/auth/token";
    pub const TOKEN_CONTENT: &str = "/auth/token/content";

    pub const INIT_PAYMENT: &str = "/pis/payment";
    pub const PAYMENT: &str = "/pis/payment/{paymentId}";
    pub const PAYMENT_STATUS: &str = "/pis/payment/{paymentId}/status";
    pub const PAYMENT_REFUNDS: &str = "/pis/payment/{paymentId}/refunds";

    pub const ACCOUNTS: &str = "/ais/accounts";
    pub const ACCOUNT: &str = "/ais/accounts/{accountId}";
    pub const ACCOUNT_TRANSACTIONS: &str = "/ais/accounts/{accountId}/transactions";
    pub const ACCOUNT_BALANCE: &str = "/ais/accounts/{accountId}/balance";
}

/// Everything except RFC 3986 unreserved characters is escaped.
const PATH_PARAM: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{[^}]*\}").expect("placeholder pattern is valid"))
}

/// Trim and percent-encode a value destined for a path segment.
pub fn escape_param(value: &str) -> String {
    utf8_percent_encode(value.trim(), PATH_PARAM).to_string()
}

/// Substitute `params` into the `{...}` tokens of `template`, in order.
///
/// The number of parameters must equal the number of tokens.
pub fn glue_path(template: &str, params: &[&str]) -> Result<String> {
    let expected = placeholder().find_iter(template).count();
    if expected != params.len() {
        return Err(ApiError::Config(format!(
            "parameter mismatch: {template} takes {expected} parameter(s), got {}",
            params.len()
        )));
    }
    let path = params.iter().fold(template.to_string(), |path, param| {
        placeholder()
            .replacen(&path, 1, NoExpand(&escape_param(param)))
            .into_owned()
    });
    Ok(path)
}

/// Absolute URL of an already-glued path.
pub fn endpoint_url(config: &ClientConfig, path: &str) -> String {
    format!("{}{path}", config.base_url())
}

/// Append the string members of a flat JSON object as a form-encoded query.
/// Nothing is appended when no member qualifies.
pub fn with_query(url: String, query: &Value) -> String {
    let Some(members) = query.as_object() else {
        return url;
    };
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in members {
        if let Some(value) = value.as_str() {
            serializer.append_pair(key, value);
            any = true;
        }
    }
    if !any {
        return url;
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{}", serializer.finish())
}
