//! Schema-driven payload filtering.
//!
//! # Design
//! A schema is a JSON object whose *shape* is the allow-list: every key that
//! may reach the wire is present, nested objects describe nested payloads, and
//! leaf values are ignored placeholders. Sanitizing intersects caller data with
//! that shape. Unknown keys vanish silently, so callers may pass richer
//! structures than the endpoint accepts.
//!
//! A `null` value counts as "not set" and is dropped wherever it appears.

use serde_json::{Map, Value};

/// Intersect `input` with `schema`, recursively.
///
/// - keys missing from `schema` are dropped;
/// - when `schema[k]` is an object, `input[k]` is sanitized against it, unless
///   `input[k]` is not an object, in which case it passes through unchanged;
/// - leaf scalars are coerced to strings (`10.50` becomes `"10.50"`), leaf
///   arrays and objects are copied as-is.
///
/// A non-object `input` is returned unchanged.
pub fn sanitize(schema: &Value, input: &Value) -> Value {
    let (Some(schema), Some(input)) = (schema.as_object(), input.as_object()) else {
        return input.clone();
    };
    Value::Object(sanitize_map(schema, input))
}

fn sanitize_map(schema: &Map<String, Value>, input: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in input {
        if value.is_null() {
            continue;
        }
        let Some(rule) = schema.get(key) else {
            continue;
        };
        let kept = match (rule, value) {
            (Value::Object(nested), Value::Object(inner)) => Value::Object(sanitize_map(nested, inner)),
            (Value::Object(_), other) => other.clone(),
            (_, leaf) => coerce_leaf(leaf),
        };
        out.insert(key.clone(), kept);
    }
    out
}

fn coerce_leaf(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => other.clone(),
    }
}

/// Allow-lists for the request bodies the platform accepts.
pub mod schemas {
    use serde_json::{json, Value};

    /// Body of `POST /pis/payment`.
    pub fn init_payment() -> Value {
        json!({
            "creditorName": "",
            "creditorAccount": {
                "iban": "",
                "bban": "",
                "sortCodeAccountNumber": "",
            },
            "debtorAccount": {
                "iban": "",
                "bban": "",
                "sortCodeAccountNumber": "",
            },
            "bankPaymentMethod": {
                "creditorName": "",
                "endToEndId": "",
                "informationStructured": {
                    "reference": "",
                },
                "creditorAccount": {
                    "iban": "",
                },
            },
            "cardPaymentMethod": {
                "cvc": "",
                "expMonth": "",
                "expYear": "",
                "number": "",
                "holderName": "",
            },
            "amount": "",
            "currencyCode": "",
            "description": "",
            "endToEndId": "",
            "informationUnstructured": "",
            "informationStructured": {
                "reference": "",
                "referenceType": "",
            },
            "requestedExecutionDate": "",
            "identifier": {
                "email": "",
            },
        })
    }

    /// Body of `POST /pis/payment/{paymentId}/refunds`.
    pub fn payment_refund() -> Value {
        json!({ "amount": "" })
    }

    /// Body of `POST /auth`.
    pub fn start_auth() -> Value {
        json!({ "email": "" })
    }

    /// Query of `GET /auth/banks`.
    pub fn bank_query() -> Value {
        json!({ "countryCode": "" })
    }

    /// Query of `POST /auth`.
    pub fn auth_query() -> Value {
        json!({ "bankId": "", "redirectPreferred": "", "scopes": "" })
    }

    /// Query of `POST /pis/payment`.
    pub fn payment_query() -> Value {
        json!({ "bankId": "", "redirectPreferred": "", "paymentMethodPreferred": "" })
    }

    /// Query of `GET /ais/accounts/{accountId}/transactions`.
    pub fn transactions_query() -> Value {
        json!({ "dateFrom": "", "dateTo": "" })
    }
}
