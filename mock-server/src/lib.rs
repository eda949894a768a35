use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub amount: String,
    pub currency_code: String,
    pub status_group: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bank {
    pub id: &'static str,
    pub name: &'static str,
    pub country_code: &'static str,
}

static BANKS: [Bank; 3] = [
    Bank { id: "SWEDBANK_LT", name: "Swedbank", country_code: "LT" },
    Bank { id: "SEB_LT", name: "SEB", country_code: "LT" },
    Bank { id: "CITADELE_LV", name: "Citadele", country_code: "LV" },
];

pub type Db = Arc<RwLock<HashMap<Uuid, Payment>>>;

fn api() -> Router<Db> {
    Router::new()
        .route("/auth/countries", get(countries))
        .route("/auth/banks", get(banks))
        .route("/auth/banks/{bank_id}", get(bank))
        .route("/pis/payment", post(init_payment))
        .route("/pis/payment/{payment_id}", get(get_payment))
        .route("/pis/payment/{payment_id}/status", get(payment_status))
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .nest("/platform/v0.1", api())
        .nest("/platform/v0.2", api())
        .nest("/platform/v0.3", api())
        .route("/legacy/countries", get(legacy_countries))
        .route("/exports/latest", get(exports_latest))
        .route("/maintenance", get(maintenance))
        .route("/not-json", get(not_json))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    info!(addr = ?listener.local_addr()?, "mock platform listening");
    axum::serve(listener, app()).await
}

/// 400 with the platform's error envelope.
fn error_envelope(code: i64, name: &str, description: &str, data: Value) -> Response {
    let body = json!({
        "error": { "code": code, "name": name, "description": description },
        "data": data,
    });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn authorize(headers: &HeaderMap) -> Result<(), StatusCode> {
    let value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    if value("client-id") == Some(CLIENT_ID) && value("client-secret") == Some(CLIENT_SECRET) {
        return Ok(());
    }
    if value("authorization").is_some_and(|v| v.starts_with("Bearer ")) {
        return Ok(());
    }
    Err(StatusCode::UNAUTHORIZED)
}

async fn countries(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    authorize(&headers)?;
    Ok(Json(json!({ "data": ["LT", "LV", "EE"] })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankQuery {
    country_code: Option<String>,
}

async fn banks(headers: HeaderMap, Query(query): Query<BankQuery>) -> Result<Json<Value>, StatusCode> {
    authorize(&headers)?;
    let banks: Vec<&Bank> = BANKS
        .iter()
        .filter(|b| query.country_code.as_deref().map_or(true, |c| c == b.country_code))
        .collect();
    Ok(Json(json!({ "data": banks })))
}

async fn bank(headers: HeaderMap, Path(bank_id): Path<String>) -> Response {
    if let Err(status) = authorize(&headers) {
        return status.into_response();
    }
    match BANKS.iter().find(|b| b.id == bank_id) {
        Some(bank) => Json(json!(bank)).into_response(),
        None => error_envelope(40401, "BankNotFound", &format!("Bank {bank_id} is not supported."), Value::Null),
    }
}

async fn init_payment(State(db): State<Db>, headers: HeaderMap, body: String) -> Response {
    if let Err(status) = authorize(&headers) {
        return status.into_response();
    }
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared != Some(body.len()) {
        return error_envelope(40001, "InvalidContentLength", "Content-Length mismatch.", Value::Null);
    }
    let Ok(input) = serde_json::from_str::<Value>(&body) else {
        return error_envelope(40002, "InvalidJson", "Body is not valid JSON.", Value::Null);
    };
    let Some(amount) = input.get("amount").and_then(Value::as_str) else {
        return error_envelope(40003, "ValidationError", "amount is required", json!({ "field": "amount" }));
    };
    let payment = Payment {
        id: Uuid::new_v4(),
        amount: amount.to_string(),
        currency_code: input
            .get("currencyCode")
            .and_then(Value::as_str)
            .unwrap_or("EUR")
            .to_string(),
        status_group: "started".to_string(),
    };
    db.write().await.insert(payment.id, payment.clone());
    Json(json!({ "id": payment.id, "statusGroup": payment.status_group, "amount": payment.amount }))
        .into_response()
}

async fn get_payment(State(db): State<Db>, headers: HeaderMap, Path(payment_id): Path<String>) -> Response {
    if let Err(status) = authorize(&headers) {
        return status.into_response();
    }
    match lookup(&db, &payment_id).await {
        Some(payment) => Json(json!(payment)).into_response(),
        None => payment_not_found(&payment_id),
    }
}

async fn payment_status(State(db): State<Db>, headers: HeaderMap, Path(payment_id): Path<String>) -> Response {
    if let Err(status) = authorize(&headers) {
        return status.into_response();
    }
    match lookup(&db, &payment_id).await {
        Some(payment) => Json(json!({ "statusGroup": payment.status_group })).into_response(),
        None => payment_not_found(&payment_id),
    }
}

async fn lookup(db: &Db, payment_id: &str) -> Option<Payment> {
    let id = Uuid::parse_str(payment_id).ok()?;
    db.read().await.get(&id).cloned()
}

fn payment_not_found(payment_id: &str) -> Response {
    error_envelope(
        40402,
        "PaymentNotFound",
        &format!("Payment {payment_id} does not exist."),
        Value::Null,
    )
}

async fn legacy_countries() -> Redirect {
    Redirect::permanent("/platform/v0.3/auth/countries")
}

async fn exports_latest() -> Redirect {
    Redirect::temporary("ftp://files.example.test/exports/latest.csv")
}

async fn maintenance() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance")
}

async fn not_json() -> (StatusCode, [(header::HeaderName, &'static str); 1], &'static str) {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")], "<html>ok</html>")
}
