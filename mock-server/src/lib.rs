use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

/// Request body shape posted by API clients.
#[derive(Debug, Default, Deserialize)]
pub struct ApiBody {
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub store_params: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Stats {
    pub status_hits: u64,
}

pub const BAD_CREDENTIALS: i32 = 42;

pub type Hits = Arc<AtomicU64>;

pub fn app() -> Router {
    let hits: Hits = Arc::new(AtomicU64::new(0));
    Router::new()
        .route("/status", get(status))
        .route("/stats", get(stats))
        .route("/echo", post(echo))
        .route("/login", post(login))
        .route("/empty", get(empty).post(empty))
        .route("/garbage", get(garbage).post(garbage))
        .with_state(hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn status(State(hits): State<Hits>) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

async fn stats(State(hits): State<Hits>) -> Json<Stats> {
    Json(Stats {
        status_hits: hits.load(Ordering::SeqCst),
    })
}

/// Returns the posted namespaces under a fresh `request_id`.
async fn echo(Json(body): Json<ApiBody>) -> Json<Value> {
    Json(json!({
        "request_id": Uuid::new_v4(),
        "params": body.params,
        "store_params": body.store_params,
    }))
}

/// Accepts `params.password == "secret"`; anything else is rejected with an
/// API error in the body.
async fn login(Json(body): Json<ApiBody>) -> (StatusCode, Json<Value>) {
    let password = body.params.get("password").and_then(Value::as_str);
    if password == Some("secret") {
        let login = body.params.get("login").cloned().unwrap_or(Value::Null);
        (
            StatusCode::OK,
            Json(json!({ "token": Uuid::new_v4(), "login": login })),
        )
    } else {
        let error = ApiErrorBody {
            code: BAD_CREDENTIALS,
            message: "bad token".to_string(),
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": error })),
        )
    }
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

async fn garbage() -> &'static str {
    "<html>not json</html>"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_body_defaults_missing_namespaces() {
        let body: ApiBody = serde_json::from_str(r#"{"params":{"a":"1"}}"#).unwrap();
        assert_eq!(body.params["a"], "1");
        assert!(body.store_params.is_empty());
    }

    #[test]
    fn api_body_accepts_empty_object() {
        let body: ApiBody = serde_json::from_str("{}").unwrap();
        assert!(body.params.is_empty());
        assert!(body.store_params.is_empty());
    }

    #[test]
    fn error_body_serializes_code_and_message() {
        let json = serde_json::to_value(ApiErrorBody {
            code: 42,
            message: "bad token".to_string(),
        })
        .unwrap();
        assert_eq!(json, json!({"code": 42, "message": "bad token"}));
    }
}
