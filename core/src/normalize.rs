//! Maps raw responses onto success payloads or structured failures.
//!
//! | status | outcome |
//! |---|---|
//! | 200 | decoded JSON body |
//! | 400 | failure taken from the body's `error` envelope |
//! | 401 | fixed `Unauthorized` failure |
//! | 500, 502, 503, 504 | fixed failure per status, body ignored |
//! | anything else | `Unknown error.` with code -1 |
//!
//! A 200 or 400 whose body is not the JSON we expect is a protocol failure and
//! is reported as `Unknown error.` as well.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use crate::config::FailureMode;
use crate::error::Result;
use crate::http::RawResponse;

const EXCEPTION: &str = "Exception";
const UNKNOWN_ERROR: &str = "Unknown error.";

/// A failure as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFailure {
    pub code: i64,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiFailure {
    pub fn new(code: i64, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            description: description.into(),
            data: None,
        }
    }

    pub fn unknown() -> Self {
        Self::new(-1, EXCEPTION, UNKNOWN_ERROR)
    }

    /// The transport could not complete the round trip.
    pub fn connection_failure() -> Self {
        Self::new(-1, EXCEPTION, "Connection failure.")
    }

    /// `{"error": {"code", "name", "description"}, "data": ...}`; `data` is an
    /// empty list when the failure carries none.
    pub fn to_envelope(&self) -> Value {
        json!({
            "error": {
                "code": self.code,
                "name": self.name,
                "description": self.description,
            },
            "data": self.data.clone().unwrap_or_else(|| json!([])),
        })
    }
}

/// Outcome of a single API call.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    Success(Value),
    Failure(ApiFailure),
}

impl NormalizedResult {
    pub fn is_success(&self) -> bool {
        matches!(self, NormalizedResult::Success(_))
    }

    /// Resolve a failure through the configured policy.
    pub fn resolve(self, mode: &FailureMode) -> Result<Value> {
        match self {
            NormalizedResult::Success(payload) => Ok(payload),
            NormalizedResult::Failure(failure) => mode.apply(failure),
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: i64,
    name: String,
    description: String,
}

/// Apply the status-code policy to a raw response.
pub fn normalize(raw: &RawResponse) -> NormalizedResult {
    match raw.status {
        200 => match serde_json::from_slice::<Value>(&raw.body) {
            Ok(payload) => NormalizedResult::Success(payload),
            Err(e) => protocol_failure(raw.status, &e.to_string()),
        },
        400 => match serde_json::from_slice::<ErrorEnvelope>(&raw.body) {
            Ok(envelope) => NormalizedResult::Failure(ApiFailure {
                code: envelope.error.code,
                name: envelope.error.name,
                description: envelope.error.description,
                data: envelope.data,
            }),
            Err(e) => protocol_failure(raw.status, &e.to_string()),
        },
        401 => NormalizedResult::Failure(ApiFailure::new(401, "Unauthorized", "Unauthorized")),
        500 => fixed(500, "Internal server error."),
        502 => fixed(502, "Bad gateway."),
        503 => fixed(503, "Service unavailable."),
        504 => fixed(504, "Gateway timeout."),
        _ => NormalizedResult::Failure(ApiFailure::unknown()),
    }
}

fn fixed(code: i64, description: &str) -> NormalizedResult {
    NormalizedResult::Failure(ApiFailure::new(code, EXCEPTION, description))
}

fn protocol_failure(status: i32, reason: &str) -> NormalizedResult {
    warn!(status, reason, "response body is not the expected JSON");
    NormalizedResult::Failure(ApiFailure::unknown())
}
