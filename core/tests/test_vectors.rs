//! Verify request building, response handling and webhook signatures against
//! the JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs and expected outputs. Request bodies are
//! compared as parsed JSON, not raw strings; `Content-Length` in the expected
//! headers still pins the exact serialized size.

use kevin_core::transport::parse_response;
use kevin_core::{
    normalize, ApiFailure, ApiVersion, Client, ClientConfig, HttpMethod, HttpRequest, NormalizedResult, PluginInfo,
    SignatureContext,
};
use serde_json::Value;

fn client(case: &Value) -> Client {
    let version: ApiVersion = case["version"].as_str().unwrap().parse().unwrap();
    let plugin: PluginInfo = match case.get("plugin") {
        Some(plugin) => serde_json::from_value(plugin.clone()).unwrap(),
        None => PluginInfo::default(),
    };
    let config = ClientConfig::builder("id", "secret")
        .version(version)
        .plugin(plugin)
        .build()
        .unwrap();
    Client::new(config)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        other => panic!("unknown method: {other}"),
    }
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

fn build(c: &Client, case: &Value) -> HttpRequest {
    let attrs = case.get("attrs").cloned().unwrap_or(Value::Null);
    let arg = |i: usize| case["args"][i].as_str().unwrap();
    match case["operation"].as_str().unwrap() {
        "countries" => c.auth().build_countries(),
        "banks" => c.auth().build_banks(&attrs),
        "bank" => c.auth().build_bank(arg(0)),
        "start_auth" => c.auth().build_start_auth(&attrs),
        "receive_token" => c.auth().build_receive_token(arg(0)),
        "init_payment" => c.payment().build_init_payment(&attrs),
        "payment" => c.payment().build_payment(arg(0), &attrs),
        "payment_status" => c.payment().build_payment_status(arg(0), &attrs),
        "init_refund" => c.payment().build_init_refund(arg(0), &attrs),
        "transactions" => c.account().build_transactions(arg(0), &attrs),
        other => panic!("unknown operation: {other}"),
    }
    .unwrap()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected_request"];
        let req = build(&client(case), case);

        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(req.headers, pairs(&expected["headers"]), "{name}: headers");

        if expected["body"].is_null() {
            assert!(req.body.is_empty(), "{name}: body should be empty");
        } else {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            assert_eq!(body, expected["body"], "{name}: body");
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = parse_response(case["raw"].as_str().unwrap().as_bytes());
        assert_eq!(
            i64::from(response.status),
            case["expected_status"].as_i64().unwrap(),
            "{name}: status"
        );

        let expected = &case["expected"];
        let outcome = normalize(&response);
        match (outcome, expected.get("success"), expected.get("failure")) {
            (NormalizedResult::Success(payload), Some(want), None) => {
                assert_eq!(&payload, want, "{name}: payload");
            }
            (NormalizedResult::Failure(failure), None, Some(want)) => {
                let want: ApiFailure = serde_json::from_value(want.clone()).unwrap();
                assert_eq!(failure, want, "{name}: failure");
            }
            (other, _, _) => panic!("{name}: unexpected outcome {other:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

#[test]
fn signature_test_vectors() {
    let raw = include_str!("../../test-vectors/signature.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let headers = pairs(&case["headers"]);
        let ctx = SignatureContext {
            secret: case["secret"].as_str().unwrap().as_bytes(),
            body: case["body"].as_str().unwrap().as_bytes(),
            webhook_url: case["webhook_url"].as_str().unwrap(),
            headers: &headers,
            max_skew_millis: case["max_skew_millis"].as_u64(),
        };
        let now = case["now_millis"].as_i64().unwrap();
        assert_eq!(
            kevin_core::signature::verify_at(&ctx, now),
            case["expected"].as_bool().unwrap(),
            "{name}"
        );
    }
}
