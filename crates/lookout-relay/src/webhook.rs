//! HTTP webhook bridge: lets external services reach the current
//! broadcaster through the relay.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lookout_common::RelayError;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::dispatcher::Relay;

/// Shared state passed to Axum handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub relay: Relay,
    pub frame_timeout: Duration,
}

/// Build the webhook router.
pub fn build_router(state: WebhookState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/frame-request", post(frame_request_handler))
        .route("/instruction", post(instruction_handler))
        .with_state(state)
        .layer(cors_layer(allowed_origins))
}

/// Any origin when the allowlist is empty, otherwise exactly the listed ones.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

async fn index_handler() -> impl IntoResponse {
    Json(json!({
        "name": "Lookout Signaling Relay",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "frameRequest": "/frame-request",
            "instruction": "/instruction",
        },
    }))
}

async fn health_handler(State(state): State<WebhookState>) -> impl IntoResponse {
    let health = state.relay.health().await;
    let broadcaster = match health.broadcaster {
        Some(_) => "connected",
        None => "disconnected",
    };
    Json(json!({
        "status": "ok",
        "broadcaster": broadcaster,
        "watcherCount": health.watcher_count,
        "broadcasterId": health.broadcaster,
        "connections": health.connection_count,
        "mode": health.mode.as_str(),
    }))
}

/// Ask the broadcaster for a frame and return it.
async fn frame_request_handler(State(state): State<WebhookState>, body: Bytes) -> Response {
    info!(bytes = body.len(), "Frame requested via webhook");

    match state.relay.request_frame(state.frame_timeout).await {
        Ok(frame) => {
            let data = frame.get("imageBase64").cloned().unwrap_or(frame);
            Json(json!({
                "data": data,
                "isannotated": false,
                "xyxy": [],
                "timestamp": 0,
            }))
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Forward an instruction payload to the broadcaster.
async fn instruction_handler(State(state): State<WebhookState>, body: Bytes) -> Response {
    let payload: Value = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"success": false, "message": format!("invalid JSON body: {e}")})),
                )
                    .into_response()
            }
        }
    };
    info!("Instruction received via webhook");

    match state.relay.send_instruction(payload).await {
        Ok(()) => Json(json!({"success": true, "message": "Instruction sent"})).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(err: RelayError) -> Response {
    match err {
        RelayError::NoBroadcaster => (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "message": err.to_string()})),
        )
            .into_response(),
        other => {
            warn!(error = %other, "Webhook request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": other.to_string()})),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ClientEvent, ServerEvent};
    use lookout_config::ProtocolMode;

    async fn spawn(relay: Relay, timeout: Duration, origins: &[String]) -> String {
        let router = build_router(
            WebhookState {
                relay,
                frame_timeout: timeout,
            },
            origins,
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn index_lists_endpoints() {
        let base = spawn(Relay::new(ProtocolMode::FanOut, 16), Duration::from_secs(1), &[]).await;
        let body: Value = reqwest::get(&base).await.unwrap().json().await.unwrap();
        assert_eq!(body["endpoints"]["health"], "/health");
        assert_eq!(body["endpoints"]["frameRequest"], "/frame-request");
    }

    #[tokio::test]
    async fn health_without_broadcaster() {
        let base = spawn(Relay::new(ProtocolMode::FanOut, 16), Duration::from_secs(1), &[]).await;
        let resp = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["broadcaster"], "disconnected");
        assert_eq!(body["watcherCount"], 0);
        assert!(body["broadcasterId"].is_null());
        assert_eq!(body["mode"], "fan-out");
    }

    #[tokio::test]
    async fn health_reports_broadcaster_and_watchers() {
        let relay = Relay::new(ProtocolMode::FanOut, 16);
        let (a, _ra) = relay.connect().await;
        let (b, _rb) = relay.connect().await;
        relay.handle(&a, ClientEvent::StartBroadcast).await;
        relay.handle(&b, ClientEvent::Watch).await;

        let base = spawn(relay, Duration::from_secs(1), &[]).await;
        let body: Value = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["broadcaster"], "connected");
        assert_eq!(body["broadcasterId"], a.as_str());
        assert_eq!(body["watcherCount"], 1);
    }

    #[tokio::test]
    async fn frame_request_without_broadcaster_is_404() {
        let base = spawn(Relay::new(ProtocolMode::FanOut, 16), Duration::from_secs(1), &[]).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/frame-request"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "No active broadcaster");
    }

    #[tokio::test]
    async fn frame_request_with_silent_broadcaster_is_500() {
        let relay = Relay::new(ProtocolMode::FanOut, 16);
        let (a, _ra) = relay.connect().await;
        relay.handle(&a, ClientEvent::StartBroadcast).await;

        let base = spawn(relay, Duration::from_millis(100), &[]).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/frame-request"))
            .json(&json!({"source": "module-x"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Frame response timeout");
    }

    #[tokio::test]
    async fn frame_request_returns_captured_image() {
        let relay = Relay::new(ProtocolMode::FanOut, 16);
        let (a, mut ra) = relay.connect().await;
        relay.handle(&a, ClientEvent::StartBroadcast).await;

        let responder = relay.clone();
        tokio::spawn(async move {
            while let Some(ev) = ra.recv().await {
                if let ServerEvent::FrameRequest { request_id } = ev {
                    let frame = json!({"requestId": request_id, "imageBase64": "ZnJhbWU="});
                    responder.handle(&a, ClientEvent::FrameResponse(frame)).await;
                }
            }
        });

        let base = spawn(relay, Duration::from_secs(2), &[]).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/frame-request"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"], "ZnJhbWU=");
        assert_eq!(body["isannotated"], false);
        assert_eq!(body["xyxy"], json!([]));
        assert_eq!(body["timestamp"], 0);
    }

    #[tokio::test]
    async fn instruction_without_broadcaster_is_404() {
        let base = spawn(Relay::new(ProtocolMode::FanOut, 16), Duration::from_secs(1), &[]).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/instruction"))
            .json(&json!({"instruction": "zoom"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn instruction_is_forwarded() {
        let relay = Relay::new(ProtocolMode::FanOut, 16);
        let (a, mut ra) = relay.connect().await;
        relay.handle(&a, ClientEvent::StartBroadcast).await;
        let _ = ra.recv().await;

        let base = spawn(relay, Duration::from_secs(1), &[]).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/instruction"))
            .json(&json!({"instruction": "zoom", "level": 2}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);

        assert_eq!(
            ra.recv().await.unwrap(),
            ServerEvent::Instruction {
                instruction: json!("zoom"),
                data: json!({"instruction": "zoom", "level": 2}),
            }
        );
    }

    #[tokio::test]
    async fn instruction_with_invalid_json_is_400() {
        let base = spawn(Relay::new(ProtocolMode::FanOut, 16), Duration::from_secs(1), &[]).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/instruction"))
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }

    #[tokio::test]
    async fn cors_allowlist_echoes_allowed_origin() {
        let origins = vec!["http://localhost:5173".to_string()];
        let base = spawn(
            Relay::new(ProtocolMode::FanOut, 16),
            Duration::from_secs(1),
            &origins,
        )
        .await;
        let client = reqwest::Client::new();

        let resp = client
            .get(format!("{base}/health"))
            .header("Origin", "http://localhost:5173")
            .send()
            .await
            .unwrap();
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );

        let resp = client
            .get(format!("{base}/health"))
            .header("Origin", "http://evil.example")
            .send()
            .await
            .unwrap();
        assert!(resp.headers().get("access-control-allow-origin").is_none());
    }
}
