use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Stats};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- status ---

#[tokio::test]
async fn status_has_no_error_field() {
    let resp = app().oneshot(get_request("/status")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert!(body.get("error").is_none());
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn stats_count_status_hits() {
    use tower::Service;

    let mut app = app().into_service();

    for _ in 0..2 {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(get_request("/status"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/stats"))
        .await
        .unwrap();
    let stats: Stats = body_json(resp).await;
    assert_eq!(stats.status_hits, 2);
}

// --- echo ---

#[tokio::test]
async fn echo_returns_namespaces() {
    let resp = app()
        .oneshot(json_request(
            "/echo",
            r#"{"params":{"a":"1","b":2},"store_params":{"token":"t"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["params"]["a"], "1");
    assert_eq!(body["params"]["b"], 2);
    assert_eq!(body["store_params"]["token"], "t");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn echo_accepts_empty_object() {
    let resp = app().oneshot(json_request("/echo", "{}")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["params"], serde_json::json!({}));
}

// --- login ---

#[tokio::test]
async fn login_with_correct_password() {
    let resp = app()
        .oneshot(json_request(
            "/login",
            r#"{"params":{"login":"olena","password":"secret"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["login"], "olena");
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn login_with_wrong_password_returns_api_error() {
    let resp = app()
        .oneshot(json_request("/login", r#"{"params":{"password":"nope"}}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], 42);
    assert_eq!(body["error"]["message"], "bad token");
}

#[tokio::test]
async fn login_rejects_non_json_body() {
    let resp = app()
        .oneshot(json_request("/login", "not json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- fixtures for body handling ---

#[tokio::test]
async fn empty_has_no_body() {
    let resp = app().oneshot(get_request("/empty")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn garbage_is_not_json() {
    let resp = app().oneshot(get_request("/garbage")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body_bytes(resp).await;
    assert!(serde_json::from_slice::<Value>(&bytes).is_err());
}
