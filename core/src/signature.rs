//! Verification of inbound webhook signatures.
//!
//! The platform signs `"POST" + webhook URL + timestamp header + raw body`
//! with HMAC-SHA256 and sends the lowercase hex digest alongside the
//! millisecond timestamp it used. Verification is a pure function of its
//! inputs; `verify_at` takes the clock as a parameter for tests.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::http::find_header;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "X-Kevin-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-Kevin-Signature";

/// Everything needed to check one webhook delivery.
#[derive(Debug, Clone, Copy)]
pub struct SignatureContext<'a> {
    /// Endpoint secret shared with the platform.
    pub secret: &'a [u8],
    /// Request body exactly as received.
    pub body: &'a [u8],
    /// The webhook URL registered with the platform.
    pub webhook_url: &'a str,
    /// Received headers; names are matched case-insensitively.
    pub headers: &'a [(String, String)],
    /// Reject deliveries whose timestamp is further than this from now.
    pub max_skew_millis: Option<u64>,
}

/// Verify against the system clock.
pub fn verify(ctx: &SignatureContext<'_>) -> bool {
    verify_at(ctx, chrono::Utc::now().timestamp_millis())
}

/// Verify with an explicit "now" in milliseconds since the epoch.
pub fn verify_at(ctx: &SignatureContext<'_>, now_millis: i64) -> bool {
    let Some(timestamp) = find_header(ctx.headers, TIMESTAMP_HEADER) else {
        return false;
    };

    if let Some(max_skew) = ctx.max_skew_millis {
        let Ok(sent_at) = timestamp.trim().parse::<i64>() else {
            return false;
        };
        if now_millis.abs_diff(sent_at) > max_skew {
            return false;
        }
    }

    let Some(received) = find_header(ctx.headers, SIGNATURE_HEADER) else {
        return false;
    };
    // The platform sends lowercase hex; any other spelling is not its digest.
    if received.bytes().any(|b| b.is_ascii_uppercase()) {
        return false;
    }
    let Ok(received) = hex::decode(received) else {
        return false;
    };
    signer(ctx.secret, ctx.webhook_url, timestamp, ctx.body)
        .verify_slice(&received)
        .is_ok()
}

/// Hex HMAC-SHA256 of the signed payload.
pub fn sign(secret: &[u8], webhook_url: &str, timestamp: &str, body: &[u8]) -> String {
    hex::encode(signer(secret, webhook_url, timestamp, body).finalize().into_bytes())
}

/// MAC fed with `"POST" + webhook URL + timestamp + body`.
fn signer(secret: &[u8], webhook_url: &str, timestamp: &str, body: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(b"POST");
    mac.update(webhook_url.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body);
    mac
}
