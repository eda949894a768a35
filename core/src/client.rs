//! Endpoint groups of the platform API.
//!
//! # Design
//! `Client` owns an immutable `ClientConfig` and a `Transport`, both behind
//! `Arc`, and hands out borrowed views per endpoint group (`auth()`,
//! `payment()`, `account()`). Each operation is split in two, as in the rest
//! of the crate:
//!
//! - `build_*` sanitizes caller attributes and produces an `HttpRequest`
//!   without touching the network;
//! - the operation itself sends that request, normalizes the response and
//!   resolves failures through the configured `FailureMode`.
//!
//! Caller attributes are a JSON object mixing body fields, query fields and
//! header values (`"Authorization"`, `"PSU-IP-Address"`, ...). Anything an
//! endpoint does not accept is dropped.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::warn;

use crate::config::ClientConfig;
use crate::endpoint::{endpoint_url, glue_path, paths, with_query};
use crate::error::{ApiError, Result};
use crate::headers::{bearer, build_auth_headers, build_content_headers, build_plugin_headers, Headers, AUTHORIZATION};
use crate::http::{HttpMethod, HttpRequest};
use crate::normalize::{normalize, ApiFailure, NormalizedResult};
use crate::sanitize::{sanitize, schemas};
use crate::transport::{TcpTransport, Transport};

const REDIRECT_PREFERRED: &str = "redirectPreferred";

/// Entry point: configuration plus transport.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Client using the socket transport with the configured timeout.
    pub fn new(config: ClientConfig) -> Self {
        let transport = TcpTransport::new(config.timeout());
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi { client: self }
    }

    pub fn payment(&self) -> PaymentApi<'_> {
        PaymentApi { client: self }
    }

    pub fn account(&self) -> AccountApi<'_> {
        AccountApi { client: self }
    }

    /// Send and normalize. Transport errors become a connection failure;
    /// configuration errors are returned as `Err`.
    pub fn execute(&self, request: &HttpRequest) -> Result<NormalizedResult> {
        request.check_headers()?;
        match self.transport.send(request) {
            Ok(raw) => Ok(normalize(&raw)),
            Err(e @ ApiError::Config(_)) => Err(e),
            Err(e) => {
                warn!(url = %request.url, error = %e, "transport failure");
                Ok(NormalizedResult::Failure(ApiFailure::connection_failure()))
            }
        }
    }

    fn call(&self, request: Result<HttpRequest>) -> Result<Value> {
        let request = request?;
        self.execute(&request)?.resolve(self.config.failure_mode())
    }

    fn url(&self, template: &str, params: &[&str]) -> Result<String> {
        Ok(endpoint_url(&self.config, &glue_path(template, params)?))
    }

    fn get(&self, url: String, headers: Headers) -> HttpRequest {
        finish(url, HttpMethod::Get, headers, Vec::new())
    }

    fn post(&self, url: String, headers: Headers, body: &Value) -> Result<HttpRequest> {
        let body = serde_json::to_vec(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(finish(url, HttpMethod::Post, headers, body))
    }

    /// Client credentials plus the named optional headers present in `attrs`.
    fn credential_headers(&self, attrs: &Value, optional: &[&str]) -> Headers {
        let mut headers = build_auth_headers(&self.config);
        push_attrs(&mut headers, attrs, optional);
        headers
    }

    fn psu_device_headers<'a>(&self, names: &'a [&'a str]) -> &'a [&'a str] {
        if self.config.version().accepts_psu_device_headers() {
            names
        } else {
            &[]
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("config", &self.config).finish_non_exhaustive()
    }
}

fn finish(url: String, method: HttpMethod, mut headers: Headers, body: Vec<u8>) -> HttpRequest {
    headers.extend(build_content_headers(&body));
    HttpRequest {
        url,
        method,
        headers,
        body,
    }
}

/// Text form of an attribute usable as a header value.
fn attr_text(attrs: &Value, name: &str) -> Option<String> {
    match attrs.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn push_attrs(headers: &mut Headers, attrs: &Value, names: &[&str]) {
    for name in names {
        if let Some(value) = attr_text(attrs, name) {
            headers.push((name.to_string(), value));
        }
    }
}

/// Sanitize query attributes and spell `redirectPreferred` as `true`/`false`.
fn query(schema: &Value, attrs: &Value) -> Value {
    let mut query = sanitize(schema, attrs);
    if let Some(flag) = query.get_mut(REDIRECT_PREFERRED) {
        let truthy = flag
            .as_str()
            .is_some_and(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes"));
        *flag = Value::String(truthy.to_string());
    }
    query
}

/// Authentication and bank discovery endpoints.
#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    client: &'a Client,
}

impl AuthApi<'_> {
    pub fn build_countries(&self) -> Result<HttpRequest> {
        let c = self.client;
        Ok(c.get(c.url(paths::COUNTRIES, &[])?, build_auth_headers(&c.config)))
    }

    pub fn countries(&self) -> Result<Value> {
        self.client.call(self.build_countries())
    }

    /// Attributes: `countryCode`.
    pub fn build_banks(&self, attrs: &Value) -> Result<HttpRequest> {
        let c = self.client;
        let url = with_query(c.url(paths::BANKS, &[])?, &query(&schemas::bank_query(), attrs));
        Ok(c.get(url, build_auth_headers(&c.config)))
    }

    pub fn banks(&self, attrs: &Value) -> Result<Value> {
        self.client.call(self.build_banks(attrs))
    }

    pub fn build_bank(&self, bank_id: &str) -> Result<HttpRequest> {
        let c = self.client;
        Ok(c.get(c.url(paths::BANK, &[bank_id])?, build_auth_headers(&c.config)))
    }

    pub fn bank(&self, bank_id: &str) -> Result<Value> {
        self.client.call(self.build_bank(bank_id))
    }

    pub fn build_bank_by_card_number_piece(&self, card_number_piece: &str) -> Result<HttpRequest> {
        let c = self.client;
        let url = c.url(paths::BANK_BY_CARD_NUMBER_PIECE, &[card_number_piece])?;
        Ok(c.get(url, build_auth_headers(&c.config)))
    }

    pub fn bank_by_card_number_piece(&self, card_number_piece: &str) -> Result<Value> {
        self.client.call(self.build_bank_by_card_number_piece(card_number_piece))
    }

    pub fn build_payment_methods(&self) -> Result<HttpRequest> {
        let c = self.client;
        Ok(c.get(c.url(paths::PAYMENT_METHODS, &[])?, build_auth_headers(&c.config)))
    }

    pub fn payment_methods(&self) -> Result<Value> {
        self.client.call(self.build_payment_methods())
    }

    /// Attributes: `bankId`, `redirectPreferred`, `scopes` (query), `email`
    /// (body), `Request-Id`, `Redirect-URL` (headers).
    pub fn build_start_auth(&self, attrs: &Value) -> Result<HttpRequest> {
        let c = self.client;
        let url = with_query(c.url(paths::AUTH, &[])?, &query(&schemas::auth_query(), attrs));
        let headers = c.credential_headers(attrs, &["Request-Id", "Redirect-URL"]);
        let body = match sanitize(&schemas::start_auth(), attrs) {
            Value::Object(members) => Value::Object(members),
            _ => json!({}),
        };
        c.post(url, headers, &body)
    }

    pub fn start_auth(&self, attrs: &Value) -> Result<Value> {
        self.client.call(self.build_start_auth(attrs))
    }

    pub fn build_receive_token(&self, code: &str) -> Result<HttpRequest> {
        let c = self.client;
        let body = json!({ "grantType": "authorizationCode", "code": code });
        c.post(c.url(paths::TOKEN, &[])?, build_auth_headers(&c.config), &body)
    }

    /// Exchange an authorization code for tokens.
    pub fn receive_token(&self, code: &str) -> Result<Value> {
        self.client.call(self.build_receive_token(code))
    }

    pub fn build_refresh_token(&self, refresh_token: &str) -> Result<HttpRequest> {
        let c = self.client;
        let body = json!({ "grantType": "refreshToken", "refreshToken": refresh_token });
        c.post(c.url(paths::TOKEN, &[])?, build_auth_headers(&c.config), &body)
    }

    pub fn refresh_token(&self, refresh_token: &str) -> Result<Value> {
        self.client.call(self.build_refresh_token(refresh_token))
    }

    pub fn build_token_content(&self, access_token: &str) -> Result<HttpRequest> {
        let c = self.client;
        let mut headers = build_auth_headers(&c.config);
        headers.push((AUTHORIZATION.to_string(), bearer(access_token)));
        Ok(c.get(c.url(paths::TOKEN_CONTENT, &[])?, headers))
    }

    pub fn token_content(&self, access_token: &str) -> Result<Value> {
        self.client.call(self.build_token_content(access_token))
    }
}

/// Payment initiation endpoints.
#[derive(Debug, Clone, Copy)]
pub struct PaymentApi<'a> {
    client: &'a Client,
}

impl PaymentApi<'_> {
    /// Attributes: query `bankId`, `redirectPreferred`,
    /// `paymentMethodPreferred`; the body follows `schemas::init_payment`;
    /// headers `Authorization` (replaces client credentials), `Redirect-URL`,
    /// `Webhook-URL`.
    pub fn build_init_payment(&self, attrs: &Value) -> Result<HttpRequest> {
        let c = self.client;
        let url = with_query(c.url(paths::INIT_PAYMENT, &[])?, &query(&schemas::payment_query(), attrs));

        let mut headers = match attr_text(attrs, AUTHORIZATION) {
            Some(token) => {
                let mut headers = vec![(AUTHORIZATION.to_string(), bearer(&token))];
                headers.extend(build_plugin_headers(&c.config));
                headers
            }
            None => build_auth_headers(&c.config),
        };
        push_attrs(&mut headers, attrs, &["Redirect-URL", "Webhook-URL"]);

        c.post(url, headers, &sanitize(&schemas::init_payment(), attrs))
    }

    pub fn init_payment(&self, attrs: &Value) -> Result<Value> {
        self.client.call(self.build_init_payment(attrs))
    }

    /// Attributes: `PSU-IP-Address`; from API 0.2 also `PSU-IP-Port`,
    /// `PSU-User-Agent`, `PSU-Device-ID`.
    pub fn build_payment(&self, payment_id: &str, attrs: &Value) -> Result<HttpRequest> {
        let c = self.client;
        let mut headers = c.credential_headers(attrs, &["PSU-IP-Address"]);
        push_attrs(
            &mut headers,
            attrs,
            c.psu_device_headers(&["PSU-IP-Port", "PSU-User-Agent", "PSU-Device-ID"]),
        );
        Ok(c.get(c.url(paths::PAYMENT, &[payment_id])?, headers))
    }

    pub fn payment(&self, payment_id: &str, attrs: &Value) -> Result<Value> {
        self.client.call(self.build_payment(payment_id, attrs))
    }

    pub fn build_payment_status(&self, payment_id: &str, attrs: &Value) -> Result<HttpRequest> {
        let c = self.client;
        let mut headers = c.credential_headers(attrs, &["PSU-IP-Address"]);
        push_attrs(
            &mut headers,
            attrs,
            c.psu_device_headers(&["PSU-User-Agent", "PSU-IP-Port", "PSU-Device-ID"]),
        );
        Ok(c.get(c.url(paths::PAYMENT_STATUS, &[payment_id])?, headers))
    }

    pub fn payment_status(&self, payment_id: &str, attrs: &Value) -> Result<Value> {
        self.client.call(self.build_payment_status(payment_id, attrs))
    }

    /// Attributes: `amount` (body), `Webhook-URL` (header).
    pub fn build_init_refund(&self, payment_id: &str, attrs: &Value) -> Result<HttpRequest> {
        let c = self.client;
        let headers = c.credential_headers(attrs, &["Webhook-URL"]);
        let url = c.url(paths::PAYMENT_REFUNDS, &[payment_id])?;
        c.post(url, headers, &sanitize(&schemas::payment_refund(), attrs))
    }

    pub fn init_refund(&self, payment_id: &str, attrs: &Value) -> Result<Value> {
        self.client.call(self.build_init_refund(payment_id, attrs))
    }
}

/// Account information endpoints.
#[derive(Debug, Clone, Copy)]
pub struct AccountApi<'a> {
    client: &'a Client,
}

impl AccountApi<'_> {
    /// Credentials, bearer token and PSU headers shared by every account call.
    fn headers(&self, attrs: &Value) -> Headers {
        let c = self.client;
        let mut headers = build_auth_headers(&c.config);
        if let Some(token) = attr_text(attrs, AUTHORIZATION) {
            headers.push((AUTHORIZATION.to_string(), bearer(&token)));
        }
        push_attrs(
            &mut headers,
            attrs,
            &["PSU-IP-Address", "PSU-IP-Port", "PSU-User-Agent", "PSU-Http-Method"],
        );
        push_attrs(&mut headers, attrs, c.psu_device_headers(&["PSU-Device-ID"]));
        headers
    }

    pub fn build_list(&self, attrs: &Value) -> Result<HttpRequest> {
        let c = self.client;
        Ok(c.get(c.url(paths::ACCOUNTS, &[])?, self.headers(attrs)))
    }

    pub fn list(&self, attrs: &Value) -> Result<Value> {
        self.client.call(self.build_list(attrs))
    }

    pub fn build_details(&self, account_id: &str, attrs: &Value) -> Result<HttpRequest> {
        let c = self.client;
        Ok(c.get(c.url(paths::ACCOUNT, &[account_id])?, self.headers(attrs)))
    }

    pub fn details(&self, account_id: &str, attrs: &Value) -> Result<Value> {
        self.client.call(self.build_details(account_id, attrs))
    }

    /// Additional attributes: `dateFrom`, `dateTo`.
    pub fn build_transactions(&self, account_id: &str, attrs: &Value) -> Result<HttpRequest> {
        let c = self.client;
        let url = with_query(
            c.url(paths::ACCOUNT_TRANSACTIONS, &[account_id])?,
            &query(&schemas::transactions_query(), attrs),
        );
        Ok(c.get(url, self.headers(attrs)))
    }

    pub fn transactions(&self, account_id: &str, attrs: &Value) -> Result<Value> {
        self.client.call(self.build_transactions(account_id, attrs))
    }

    pub fn build_balance(&self, account_id: &str, attrs: &Value) -> Result<HttpRequest> {
        let c = self.client;
        Ok(c.get(c.url(paths::ACCOUNT_BALANCE, &[account_id])?, self.headers(attrs)))
    }

    pub fn balance(&self, account_id: &str, attrs: &Value) -> Result<Value> {
        self.client.call(self.build_balance(account_id, attrs))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::config::{ApiVersion, FailureMode, PluginInfo};
    use crate::http::RawResponse;

    /// Records requests and answers every one with the same response.
    struct Scripted {
        response: std::result::Result<RawResponse, String>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn ok(status: i32, body: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(RawResponse::new(status, body)),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: Err("connection refused".to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> HttpRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for Scripted {
        fn send(&self, request: &HttpRequest) -> Result<RawResponse> {
            self.seen.lock().unwrap().push(request.clone());
            self.response.clone().map_err(ApiError::Transport)
        }
    }

    fn config(version: ApiVersion, mode: FailureMode) -> ClientConfig {
        ClientConfig::builder("id", "secret")
            .version(version)
            .failure_mode(mode)
            .plugin(PluginInfo {
                version: Some("2.0".to_string()),
                ..PluginInfo::default()
            })
            .build()
            .unwrap()
    }

    fn client(transport: Arc<Scripted>) -> Client {
        Client::with_transport(config(ApiVersion::V0_3, FailureMode::Raise), transport)
    }

    fn names(request: &HttpRequest) -> Vec<&str> {
        request.headers.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[test]
    fn countries_request_shape() {
        let c = client(Scripted::ok(200, "{}"));
        let req = c.auth().build_countries().unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://api.getkevin.eu/platform/v0.3/auth/countries");
        assert_eq!(
            names(&req),
            vec!["Client-Id", "Client-Secret", "Plugin-Version", "Content-Type", "Content-Length"]
        );
        assert_eq!(req.header("Content-Length"), Some("0"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn start_auth_splits_attributes() {
        let c = client(Scripted::ok(200, "{}"));
        let attrs = json!({
            "bankId": "SWEDBANK_LT",
            "redirectPreferred": "yes",
            "scopes": "payments",
            "email": "user@example.test",
            "Request-Id": "req-1",
            "Redirect-URL": "https://shop.example.test/back",
            "unknown": "dropped",
        });
        let req = c.auth().build_start_auth(&attrs).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.url,
            "https://api.getkevin.eu/platform/v0.3/auth?bankId=SWEDBANK_LT&redirectPreferred=true&scopes=payments"
        );
        assert_eq!(req.header("Request-Id"), Some("req-1"));
        assert_eq!(req.header("Redirect-URL"), Some("https://shop.example.test/back"));
        let body: Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(body, json!({ "email": "user@example.test" }));
        assert_eq!(req.header("Content-Length"), Some(req.body.len().to_string().as_str()));
    }

    #[test]
    fn start_auth_without_email_sends_empty_object() {
        let c = client(Scripted::ok(200, "{}"));
        let req = c.auth().build_start_auth(&json!({ "redirectPreferred": false })).unwrap();
        assert_eq!(req.body, b"{}");
        assert!(req.url.ends_with("/auth?redirectPreferred=false"));
    }

    #[test]
    fn token_requests() {
        let c = client(Scripted::ok(200, "{}"));
        let req = c.auth().build_receive_token("code-1").unwrap();
        let body: Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(body, json!({ "grantType": "authorizationCode", "code": "code-1" }));

        let req = c.auth().build_refresh_token("r-1").unwrap();
        let body: Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(body, json!({ "grantType": "refreshToken", "refreshToken": "r-1" }));

        let req = c.auth().build_token_content("abc").unwrap();
        assert_eq!(req.header("Authorization"), Some("Bearer abc"));
        assert_eq!(req.method, HttpMethod::Get);
    }

    #[test]
    fn bank_path_parameter_is_escaped() {
        let c = client(Scripted::ok(200, "{}"));
        let req = c.auth().build_bank(" SEB LT ").unwrap();
        assert!(req.url.ends_with("/auth/banks/SEB%20LT"));
        let req = c.auth().build_bank_by_card_number_piece("5193 45").unwrap();
        assert!(req.url.ends_with("/auth/banks/cards/5193%2045"));
    }

    #[test]
    fn init_payment_with_bearer_skips_client_credentials() {
        let c = client(Scripted::ok(200, "{}"));
        let attrs: Value = serde_json::from_str(
            r#"{
                "Authorization": "token-1",
                "Webhook-URL": "https://shop.example.test/hook",
                "bankId": "SEB",
                "amount": 10.50,
                "currencyCode": "EUR",
                "creditorAccount": { "iban": "LT1", "owner": "dropped" }
            }"#,
        )
        .unwrap();
        let req = c.payment().build_init_payment(&attrs).unwrap();
        assert_eq!(
            names(&req),
            vec!["Authorization", "Plugin-Version", "Webhook-URL", "Content-Type", "Content-Length"]
        );
        assert_eq!(req.header("Authorization"), Some("Bearer token-1"));
        assert!(req.url.ends_with("/pis/payment?bankId=SEB"));
        let body: Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(
            body,
            json!({ "amount": "10.50", "currencyCode": "EUR", "creditorAccount": { "iban": "LT1" } })
        );
    }

    #[test]
    fn init_payment_without_bearer_uses_client_credentials() {
        let c = client(Scripted::ok(200, "{}"));
        let req = c.payment().build_init_payment(&json!({ "amount": "1.00" })).unwrap();
        assert_eq!(req.header("Client-Id"), Some("id"));
        assert_eq!(req.header("Authorization"), None);
    }

    #[test]
    fn psu_device_headers_depend_on_version() {
        let attrs = json!({
            "PSU-IP-Address": "10.0.0.1",
            "PSU-IP-Port": 443,
            "PSU-User-Agent": "agent",
            "PSU-Device-ID": "dev",
        });

        let c = client(Scripted::ok(200, "{}"));
        let req = c.payment().build_payment("p1", &attrs).unwrap();
        assert_eq!(req.header("PSU-IP-Port"), Some("443"));
        assert_eq!(req.header("PSU-Device-ID"), Some("dev"));

        let old = Client::with_transport(config(ApiVersion::V0_1, FailureMode::Raise), Scripted::ok(200, "{}"));
        let req = old.payment().build_payment_status("p1", &attrs).unwrap();
        assert_eq!(req.header("PSU-IP-Address"), Some("10.0.0.1"));
        assert_eq!(req.header("PSU-IP-Port"), None);
        assert_eq!(req.header("PSU-Device-ID"), None);
        assert!(req.url.ends_with("/platform/v0.1/pis/payment/p1/status"));
    }

    #[test]
    fn refund_body_only_carries_amount() {
        let c = client(Scripted::ok(200, "{}"));
        let req = c
            .payment()
            .build_init_refund("p1", &json!({ "amount": 5, "currencyCode": "EUR", "Webhook-URL": "w" }))
            .unwrap();
        assert!(req.url.ends_with("/pis/payment/p1/refunds"));
        assert_eq!(req.body, br#"{"amount":"5"}"#);
        assert_eq!(req.header("Webhook-URL"), Some("w"));
    }

    #[test]
    fn account_headers_and_transaction_query() {
        let c = client(Scripted::ok(200, "{}"));
        let attrs = json!({
            "Authorization": "Bearer t",
            "PSU-Http-Method": "GET",
            "PSU-Device-ID": "dev",
            "dateFrom": "2024-01-01",
            "dateTo": "2024-01-31",
        });
        let req = c.account().build_transactions("acc 1", &attrs).unwrap();
        assert!(req
            .url
            .ends_with("/ais/accounts/acc%201/transactions?dateFrom=2024-01-01&dateTo=2024-01-31"));
        assert_eq!(
            names(&req),
            vec![
                "Client-Id",
                "Client-Secret",
                "Plugin-Version",
                "Authorization",
                "PSU-Http-Method",
                "PSU-Device-ID",
                "Content-Type",
                "Content-Length",
            ]
        );
        assert!(c.account().build_balance("a", &json!({})).unwrap().url.ends_with("/ais/accounts/a/balance"));
        assert!(c.account().build_details("a", &json!({})).unwrap().url.ends_with("/ais/accounts/a"));
        assert!(c.account().build_list(&json!({})).unwrap().url.ends_with("/ais/accounts"));
    }

    #[test]
    fn success_payload_is_returned() {
        let transport = Scripted::ok(200, r#"{"data":["LT","LV"]}"#);
        let c = client(transport.clone());
        assert_eq!(c.auth().countries().unwrap(), json!({ "data": ["LT", "LV"] }));
        assert!(transport.last().url.ends_with("/auth/countries"));
    }

    #[test]
    fn failures_raise_by_default() {
        let c = client(Scripted::ok(401, ""));
        let err = c.auth().banks(&json!({ "countryCode": "LT" })).unwrap_err();
        assert_eq!(err.failure(), Some(&ApiFailure::new(401, "Unauthorized", "Unauthorized")));
    }

    #[test]
    fn envelope_mode_returns_failure_as_value() {
        let c = Client::with_transport(config(ApiVersion::V0_3, FailureMode::Envelope), Scripted::ok(503, ""));
        let value = c.payment().payment("p1", &json!({})).unwrap();
        assert_eq!(value["error"]["code"], 503);
        assert_eq!(value["error"]["description"], "Service unavailable.");
    }

    #[test]
    fn custom_handler_sees_connection_failure() {
        let mode = FailureMode::Custom(Arc::new(|failure: ApiFailure| -> Result<Value> {
            Ok(json!({ "handled": failure.description }))
        }));
        let c = Client::with_transport(config(ApiVersion::V0_3, mode), Scripted::failing());
        let value = c.account().list(&json!({})).unwrap();
        assert_eq!(value, json!({ "handled": "Connection failure." }));
    }

    #[test]
    fn config_errors_bypass_failure_mode() {
        let transport = Scripted::ok(200, "{}");
        let c = Client::with_transport(config(ApiVersion::V0_3, FailureMode::Envelope), transport.clone());
        let url = c.url(paths::PAYMENT, &["a", "b"]);
        assert!(matches!(url, Err(ApiError::Config(_))));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn line_breaks_in_attributes_never_reach_the_transport() {
        let transport = Scripted::ok(200, "{}");
        let c = Client::with_transport(config(ApiVersion::V0_3, FailureMode::Envelope), transport.clone());
        let attrs = json!({ "amount": "1", "Redirect-URL": "https://shop.test/\r\nX-Injected: 1" });
        let err = c.payment().init_payment(&attrs).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
        assert!(transport.seen.lock().unwrap().is_empty());
    }
}
