//! A2A JSON-RPC over HTTP
//!
//! `POST /` takes JSON-RPC 2.0 requests; the agent card is served from the
//! well-known paths.

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handler::RequestHandler;
use super::types::{A2aError, AgentCard, JsonRpcRequest, JsonRpcResponse};

pub const AGENT_CARD_PATH: &str = "/.well-known/agent-card.json";
pub const LEGACY_AGENT_CARD_PATH: &str = "/.well-known/agent.json";

pub struct A2aState {
    pub card: AgentCard,
    pub handler: Arc<dyn RequestHandler>,
}

pub fn router(card: AgentCard, handler: Arc<dyn RequestHandler>) -> Router {
    let state = Arc::new(A2aState { card, handler });

    Router::new()
        .route("/", post(handle_rpc))
        .route(AGENT_CARD_PATH, get(agent_card))
        .route(LEGACY_AGENT_CARD_PATH, get(agent_card))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn agent_card(State(state): State<Arc<A2aState>>) -> Json<AgentCard> {
    Json(state.card.clone())
}

async fn handle_rpc(State(state): State<Arc<A2aState>>, body: Bytes) -> Json<JsonRpcResponse> {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("Rejecting unparseable body: {}", e);
            return Json(JsonRpcResponse::failure(Value::Null, &A2aError::Parse));
        }
    };

    let id = raw.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match serde_json::from_value(raw) {
        Ok(r) => r,
        Err(e) => {
            return Json(JsonRpcResponse::failure(
                id,
                &A2aError::InvalidRequest(e.to_string()),
            ))
        }
    };
    if request.jsonrpc != "2.0" {
        return Json(JsonRpcResponse::failure(
            id,
            &A2aError::InvalidRequest("jsonrpc must be \"2.0\"".to_string()),
        ));
    }

    let id = request.id.clone().unwrap_or(Value::Null);
    tracing::debug!(method = %request.method, "A2A request");

    match dispatch(state.handler.as_ref(), request).await {
        Ok(result) => Json(JsonRpcResponse::success(id, result)),
        Err(e) => {
            tracing::warn!(code = e.code(), "A2A request failed: {}", e);
            Json(JsonRpcResponse::failure(id, &e))
        }
    }
}

async fn dispatch(handler: &dyn RequestHandler, request: JsonRpcRequest) -> Result<Value, A2aError> {
    let task = match request.method.as_str() {
        "message/send" => handler.on_message_send(params(request.params)?).await?,
        "tasks/get" => handler.on_get_task(params(request.params)?).await?,
        "tasks/cancel" => handler.on_cancel_task(params(request.params)?).await?,
        "message/stream"
        | "tasks/resubscribe"
        | "tasks/pushNotificationConfig/set"
        | "tasks/pushNotificationConfig/get"
        | "tasks/pushNotificationConfig/list"
        | "tasks/pushNotificationConfig/delete"
        | "agent/getAuthenticatedExtendedCard" => {
            return Err(A2aError::UnsupportedOperation(request.method))
        }
        other => return Err(A2aError::MethodNotFound(other.to_string())),
    };

    serde_json::to_value(task).map_err(|e| A2aError::Internal(e.to_string()))
}

fn params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, A2aError> {
    let params = params.ok_or_else(|| A2aError::InvalidParams("missing params".to_string()))?;
    serde_json::from_value(params).map_err(|e| A2aError::InvalidParams(e.to_string()))
}

/// Serve until Ctrl-C.
pub async fn serve(host: &str, port: u16, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("A2A server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down A2A server");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::types::{Message, MessageSendParams, Task, TaskIdParams, TaskQueryParams};
    use async_trait::async_trait;
    use axum::{body::Body, http::Request};
    use serde_json::json;
    use tower::ServiceExt;

    struct Fixed;

    #[async_trait]
    impl RequestHandler for Fixed {
        async fn on_message_send(&self, params: MessageSendParams) -> Result<Task, A2aError> {
            let mut task = Task::new("t-1", "ctx-1");
            task.history.push(params.message);
            Ok(task)
        }

        async fn on_get_task(&self, params: TaskQueryParams) -> Result<Task, A2aError> {
            Err(A2aError::TaskNotFound(params.id))
        }

        async fn on_cancel_task(&self, params: TaskIdParams) -> Result<Task, A2aError> {
            Err(A2aError::TaskNotCancelable(params.id))
        }
    }

    fn app() -> Router {
        router(
            crate::a2a::weather_agent_card("http://localhost:8888/"),
            Arc::new(Fixed),
        )
    }

    async fn post_raw(body: &str) -> Value {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let out = post_raw("{not json").await;
        assert_eq!(out["error"]["code"], -32700);
        assert_eq!(out["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_wrong_version_is_invalid_request() {
        let out = post_raw(r#"{"jsonrpc":"1.0","id":4,"method":"tasks/get"}"#).await;
        assert_eq!(out["error"]["code"], -32600);
        assert_eq!(out["id"], 4);
    }

    #[tokio::test]
    async fn test_missing_params() {
        let out = post_raw(r#"{"jsonrpc":"2.0","id":"a","method":"tasks/get"}"#).await;
        assert_eq!(out["error"]["code"], -32602);
        assert_eq!(out["id"], "a");
    }

    #[tokio::test]
    async fn test_dispatch_routes_methods() {
        let send = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "message/send",
            "params": {"message": Message::user_text("hi")}
        });
        let out = post_raw(&send.to_string()).await;
        assert_eq!(out["result"]["id"], "t-1");
        assert_eq!(out["result"]["kind"], "task");

        let stream = json!({"jsonrpc": "2.0", "id": 2, "method": "message/stream", "params": {}});
        assert_eq!(post_raw(&stream.to_string()).await["error"]["code"], -32004);

        let unknown = json!({"jsonrpc": "2.0", "id": 3, "method": "tasks/explode"});
        assert_eq!(post_raw(&unknown.to_string()).await["error"]["code"], -32601);

        let cancel = json!({"jsonrpc": "2.0", "id": 4, "method": "tasks/cancel", "params": {"id": "x"}});
        assert_eq!(post_raw(&cancel.to_string()).await["error"]["code"], -32002);
    }

    #[tokio::test]
    async fn test_card_paths() {
        for path in [AGENT_CARD_PATH, LEGACY_AGENT_CARD_PATH] {
            let request = Request::builder().uri(path).body(Body::empty()).unwrap();
            let response = app().oneshot(request).await.unwrap();
            assert!(response.status().is_success());
            let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
                .await
                .unwrap();
            let card: AgentCard = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(card.name, "Weather Agent");
        }
    }
}
