//! Socket Transport
//!
//! `GET /socket` upgrades to a WebSocket that carries virtual requests:
//!
//! ```text
//! -> {"method": "get", "url": "/user?limit=2"}
//! <- {"statusCode": 200, "headers": {"X-Total-Count": "5", ...}, "body": [...]}
//! ```
//!
//! Finds made over this transport subscribe the connection to the returned
//! records. Every subscription is dropped when the socket closes.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::blueprint_routes::BlueprintState;
use crate::blueprint::{FindResponse, RequestContext, Transport};
use crate::observability::{log_event_with_fields, Event};

// ==================
// Message Types
// ==================

/// Virtual request sent by a socket client
#[derive(Debug, Deserialize)]
pub struct VirtualRequest {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    /// Echoed back so clients can match replies
    #[serde(default)]
    pub id: Option<Value>,
}

fn default_method() -> String {
    "get".to_string()
}

/// Reply to a virtual request
#[derive(Debug, Serialize)]
pub struct VirtualResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(flatten)]
    pub response: FindResponse,
}

// ==================
// Router
// ==================

/// Create socket routes
pub fn socket_routes(state: Arc<BlueprintState>) -> Router {
    Router::new()
        .route("/socket", get(websocket_handler))
        .with_state(state)
}

/// Handle WebSocket upgrade request
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<BlueprintState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_websocket(socket: WebSocket, state: Arc<BlueprintState>) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = Uuid::new_v4().to_string();

    state.finder.metrics().increment_socket_connections();
    log_event_with_fields(Event::SocketConnected, &[("connection_id", connection_id.as_str())]);

    let welcome = json!({ "event": "connected", "connectionId": connection_id });
    let _ = sender.send(Message::Text(welcome.to_string())).await;

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let reply = answer(&state, &connection_id, &text).await;
                if sender.send(Message::Text(reply)).await.is_err() {
                    break;
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = sender.send(Message::Pong(data)).await;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    let rooms = state.subscriptions.unsubscribe_all(&connection_id).to_string();
    log_event_with_fields(
        Event::SocketClosed,
        &[("connection_id", connection_id.as_str()), ("rooms_left", rooms.as_str())],
    );
}

/// Answer one raw socket message with a serialized [`VirtualResponse`]
pub async fn answer(state: &BlueprintState, connection_id: &str, text: &str) -> String {
    let reply = match serde_json::from_str::<VirtualRequest>(text) {
        Ok(request) => dispatch(state, connection_id, request).await,
        Err(e) => VirtualResponse {
            id: None,
            response: status_response(StatusCode::BAD_REQUEST, format!("Invalid message format: {}", e)),
        },
    };

    serde_json::to_string(&reply).unwrap_or_else(|_| {
        r#"{"statusCode":500,"headers":{},"body":{"error":"Failed to serialize response","code":500}}"#
            .to_string()
    })
}

async fn dispatch(state: &BlueprintState, connection_id: &str, request: VirtualRequest) -> VirtualResponse {
    if !request.method.eq_ignore_ascii_case("get") {
        return VirtualResponse {
            id: request.id,
            response: status_response(
                StatusCode::METHOD_NOT_ALLOWED,
                format!("Unsupported method: {}", request.method),
            ),
        };
    }

    let transport = Transport::Socket {
        connection_id: connection_id.to_string(),
    };
    let response = match RequestContext::from_url(&request.url, transport) {
        Ok(ctx) => FindResponse::from(state.finder.find(&ctx).await),
        Err(e) => FindResponse::error(&e),
    };

    VirtualResponse {
        id: request.id,
        response,
    }
}

fn status_response(status: StatusCode, message: String) -> FindResponse {
    FindResponse {
        status_code: status.as_u16(),
        headers: BTreeMap::new(),
        body: json!({ "error": message, "code": status.as_u16() }),
    }
}
