// HTTP bridge routes, and the reqwest proxy against a local backend
#![cfg(feature = "http_transport")]

mod common;

use axum::{
    body::{to_bytes, Body},
    extract::Query,
    http::{HeaderMap, Request, StatusCode},
    routing::get,
    Json, Router,
};
use common::{json_response, service_with, ScriptedTransport};
use cooltrade_bridge::config::{ProxyConfig, RateLimitConfig};
use cooltrade_bridge::messages::Target;
use cooltrade_bridge::proxy::ProxyRequest;
use cooltrade_bridge::transport::http::router;
use cooltrade_bridge::{ApiProxy, BackgroundService, Message};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn bridge() -> (Router, Arc<BackgroundService>) {
    let service = service_with(ScriptedTransport::always(json_response(200, json!({}))));
    (router(service.clone()), service)
}

#[tokio::test]
async fn test_message_route_sets_symbol() {
    let (app, service) = bridge();

    let (status, body) = call(
        app.clone(),
        post_json(
            "/message",
            json!({ "type": "MANUAL_SET_SYMBOL", "data": { "symbol": "DOGEUSDT" } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success", "symbol": "DOGEUSDT" }));
    assert_eq!(service.current_symbol(), "DOGEUSDT");

    let (status, body) = call(
        app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["symbol"], json!("DOGEUSDT"));
}

#[tokio::test]
async fn test_message_route_rejections() {
    let (app, _) = bridge();

    let (status, body) = call(
        app.clone(),
        post_json("/message", json!({ "type": "SYMBOL_UPDATED", "data": { "symbol": "X" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_type"], json!("unsupported_message"));

    let request = Request::builder()
        .method("POST")
        .uri("/message")
        .header("content-type", "application/json")
        .header("x-tab-id", "not-a-tab")
        .body(Body::from(json!({ "type": "GET_CURRENT_SYMBOL" }).to_string()))
        .unwrap();
    let (status, body) = call(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!("error"));
}

#[tokio::test]
async fn test_trading_page_from_tab_header() {
    let (app, service) = bridge();
    let mut rx = service.subscribe();

    let request = Request::builder()
        .method("POST")
        .uri("/message")
        .header("content-type", "application/json")
        .header("x-tab-id", "12")
        .body(Body::from(
            json!({ "type": "TRADING_PAGE_LOADED", "data": { "symbol": "ARB" } }).to_string(),
        ))
        .unwrap();
    let (status, body) = call(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success" }));
    assert_eq!(service.current_symbol(), "ARBUSDT");
    assert_eq!(rx.try_recv().unwrap().target, Target::Runtime);
}

#[tokio::test]
async fn test_tab_complete_pushes_page_updated() {
    let (app, service) = bridge();
    let mut rx = service.subscribe();

    let (status, _) = call(
        app,
        post_json(
            "/tabs/5/complete",
            json!({ "url": "https://www.kraken.com/trade/btc-usd" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let pushed = rx.try_recv().unwrap();
    assert_eq!(pushed.target, Target::Tab(5));
    assert_eq!(
        pushed.message,
        Message::PageUpdated {
            url: Some("https://www.kraken.com/trade/btc-usd".into()),
            symbol: None,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_tab_removal_route_resets_rate_limit() {
    let (app, service) = bridge();
    let mut rx = service.subscribe();

    let loaded = || {
        Request::builder()
            .method("POST")
            .uri("/message")
            .header("content-type", "application/json")
            .header("x-tab-id", "9")
            .body(Body::from(
                json!({ "type": "TRADING_PAGE_LOADED", "data": { "symbol": "ARB" } }).to_string(),
            ))
            .unwrap()
    };

    for _ in 0..10 {
        let (status, _) = call(app.clone(), loaded()).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(
        app.clone(),
        Request::builder()
            .method("DELETE")
            .uri("/tabs/9")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success" }));

    let (status, _) = call(app, loaded()).await;
    assert_eq!(status, StatusCode::OK);

    let mut limited = 0;
    while let Ok(out) = rx.try_recv() {
        if matches!(out.message, Message::RateLimitError { .. }) {
            limited += 1;
        }
    }
    assert_eq!(limited, 0);
}

async fn echo(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(json!({ "query": query, "authorization": auth, "body": body }))
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/api/echo/", get(echo).post(echo))
        .route(
            "/api/crypto/favorites/",
            get(|| async { (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api", addr)
}

#[tokio::test]
async fn test_reqwest_proxy_against_local_backend() {
    let mut config = ProxyConfig::default();
    config.base_url = spawn_backend().await;
    let proxy = Arc::new(ApiProxy::from_config(config).unwrap());
    let service = BackgroundService::new(proxy.clone(), RateLimitConfig::default());

    let request = ProxyRequest::get("/echo/")
        .with_header("Authorization", "abc123")
        .with_param("language", "en-US");
    let response = match service.handle(Message::ProxyApiRequest(request), None).await.unwrap() {
        cooltrade_bridge::MessageResponse::Proxy(response) => response,
        other => panic!("unexpected response {:?}", other),
    };
    assert!(response.success);
    assert_eq!(response.status, 200);
    assert_eq!(response.data["authorization"], json!("Token abc123"));
    assert_eq!(response.data["query"]["language"], json!("en-US"));

    let response = proxy
        .proxy_request(ProxyRequest::post("/echo/", json!({ "symbol": "BTCUSDT" })))
        .await;
    assert!(response.success);
    assert_eq!(response.data["body"], json!("{\"symbol\":\"BTCUSDT\"}"));

    let response = proxy.proxy_request(ProxyRequest::get("/crypto/favorites/")).await;
    assert!(response.success);
    assert_eq!(response.status, 404);
    assert_eq!(response.status_text, "Not Found");
}

#[tokio::test]
async fn test_unreachable_backend_exhausts_retries() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = ProxyConfig::default();
    config.base_url = format!("http://{}/api", addr);
    config.max_attempts = 1;
    let proxy = ApiProxy::from_config(config).unwrap();

    let response = proxy.proxy_request(ProxyRequest::get("/echo/")).await;
    assert!(!response.success);
    assert_eq!(response.status, 500);
    assert!(response.error.unwrap().starts_with("Fetch failed"));
}
