//! HTTP request handlers for the bridge endpoints
//!
//! - POST /message: deliver one protocol message to the background service
//! - POST /tabs/{tab_id}/complete: report a finished navigation
//! - DELETE /tabs/{tab_id}: report a closed tab
//! - GET /events: server-sent stream of outbound pushes
//! - GET /health: liveness and current symbol

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use super::error::{Result, TransportError};
use crate::background::BackgroundService;
use crate::messages::{Message, MessageResponse, Outbound, TabId};

/// Header carrying the sending tab's id
pub const TAB_ID_HEADER: &str = "x-tab-id";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BackgroundService>,
}

#[derive(Debug, Deserialize)]
pub struct TabCompleteRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub symbol: String,
    pub updated_at: String,
    pub version: String,
}

/// POST /message
/// Content-Type: application/json
/// x-tab-id: <u32> (optional)
pub async fn handle_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(message): Json<Message>,
) -> Result<Json<MessageResponse>> {
    let tab = extract_tab_id(&headers)?;
    tracing::debug!(kind = message.kind(), ?tab, "Received bridge message");

    let response = state.service.handle(message, tab).await?;
    Ok(Json(response))
}

/// POST /tabs/{tab_id}/complete
pub async fn handle_tab_complete(
    State(state): State<AppState>,
    Path(tab_id): Path<TabId>,
    Json(request): Json<TabCompleteRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    state.service.on_tab_updated(tab_id, &request.url);
    (StatusCode::ACCEPTED, Json(MessageResponse::success()))
}

/// DELETE /tabs/{tab_id}
pub async fn handle_tab_removed(
    State(state): State<AppState>,
    Path(tab_id): Path<TabId>,
) -> Json<MessageResponse> {
    tracing::debug!(tab_id, "Tab closed");
    state.service.on_tab_removed(tab_id);
    Json(MessageResponse::success())
}

/// GET /events
pub async fn handle_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    tracing::debug!("Event stream subscriber connected");
    Sse::new(outbound_stream(state.service.subscribe())).keep_alive(KeepAlive::default())
}

/// GET /health
pub async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.service.snapshot();
    Json(HealthResponse {
        status: "ok".to_string(),
        symbol: snapshot.symbol,
        updated_at: snapshot.updated_at.to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// SSE events for every outbound push, named after the message type.
fn outbound_stream(
    rx: broadcast::Receiver<Outbound>,
) -> impl Stream<Item = std::result::Result<Event, Infallible>> {
    stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(outbound) => match Event::default()
                    .event(outbound.message.kind())
                    .json_data(&outbound)
                {
                    Ok(event) => return Some((Ok(event), rx)),
                    Err(err) => {
                        tracing::warn!(error = %err, "Failed to encode outbound event");
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged, dropping messages");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

fn extract_tab_id(headers: &HeaderMap) -> Result<Option<TabId>> {
    let Some(value) = headers.get(TAB_ID_HEADER) else {
        return Ok(None);
    };
    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<TabId>().ok())
        .map(Some)
        .ok_or_else(|| TransportError::BadRequest(format!("{} must be an integer", TAB_ID_HEADER)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_tab_id() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_tab_id(&headers).unwrap(), None);

        headers.insert(TAB_ID_HEADER, HeaderValue::from_static(" 17 "));
        assert_eq!(extract_tab_id(&headers).unwrap(), Some(17));

        headers.insert(TAB_ID_HEADER, HeaderValue::from_static("tab-17"));
        assert!(extract_tab_id(&headers).is_err());
    }
}
