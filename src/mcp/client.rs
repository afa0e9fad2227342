//! MCP client over the Streamable HTTP transport

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

use super::protocol::*;
use super::sse;
use crate::config::McpServerConfig;

pub const SESSION_HEADER: &str = "mcp-session-id";
pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

#[derive(Debug, Error)]
pub enum McpError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("MCP error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid JSON from server: {0}")]
    Json(#[from] serde_json::Error),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("invalid header '{0}'")]
    InvalidHeader(String),

    #[error("tool '{0}' not found")]
    UnknownTool(String),
}

/// MCP Client for one remote server
pub struct McpClient {
    name: String,
    url: String,
    http: reqwest::Client,
    request_id: AtomicU64,
    session_id: RwLock<Option<String>>,
    protocol_version: RwLock<Option<String>>,
    server_info: Option<ServerInfo>,
    tools: Vec<McpTool>,
}

impl McpClient {
    pub fn new_http(name: &str, url: &str) -> Result<Self, McpError> {
        Self::from_config(&McpServerConfig::new(name, url))
    }

    pub fn from_config(config: &McpServerConfig) -> Result<Self, McpError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| McpError::InvalidHeader(key.clone()))?;
            let value =
                HeaderValue::from_str(value).map_err(|_| McpError::InvalidHeader(key.clone()))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            name: config.name.clone(),
            url: config.url.clone(),
            http,
            request_id: AtomicU64::new(1),
            session_id: RwLock::new(None),
            protocol_version: RwLock::new(None),
            server_info: None,
            tools: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    pub async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    /// Handshake and tool discovery.
    pub async fn connect(&mut self) -> Result<(), McpError> {
        let init = self.initialize().await?;
        tracing::info!(
            server = %self.name,
            remote = %init.server_info.name,
            version = %init.protocol_version,
            "MCP server initialized"
        );
        self.server_info = Some(init.server_info);

        self.tools = self.list_tools().await?;
        tracing::debug!(server = %self.name, tools = self.tools.len(), "MCP tools discovered");
        Ok(())
    }

    pub async fn initialize(&self) -> Result<InitializeResult, McpError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: ClientInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        let result: InitializeResult = self
            .send_request("initialize", Some(serde_json::to_value(params)?))
            .await?;

        *self.protocol_version.write().await = Some(result.protocol_version.clone());

        self.send_notification("notifications/initialized", None)
            .await?;

        Ok(result)
    }

    /// List every tool, following pagination cursors.
    pub async fn list_tools(&self) -> Result<Vec<McpTool>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let page: ListToolsResult = self.send_request("tools/list", params).await?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if Some(&next) != cursor.as_ref() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(tools)
    }

    pub async fn call_tool(&self, name: &str, arguments: &Value) -> Result<ToolCallResult, McpError> {
        let arguments = match arguments {
            Value::Object(map) => map.clone(),
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(McpError::Protocol(format!(
                    "tool arguments must be an object, got {}",
                    other
                )))
            }
        };

        let params = ToolCallRequest {
            name: name.to_string(),
            arguments,
        };

        self.send_request("tools/call", Some(serde_json::to_value(params)?))
            .await
    }

    /// End the session. Servers may answer 405 when they do not support it.
    pub async fn close(&self) {
        let Some(session) = self.session_id.write().await.take() else {
            return;
        };

        let result = self
            .http
            .delete(&self.url)
            .header(SESSION_HEADER, session)
            .send()
            .await;
        if let Err(e) = result {
            tracing::debug!(server = %self.name, "MCP session close failed: {}", e);
        }
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, McpError> {
        let mut request = self.http.post(&self.url).json(body);

        if let Some(session) = self.session_id.read().await.as_ref() {
            request = request.header(SESSION_HEADER, session);
        }
        if let Some(version) = self.protocol_version.read().await.as_ref() {
            request = request.header(PROTOCOL_VERSION_HEADER, version);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn send_request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, McpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = McpRequest::new(id, method, params);
        tracing::debug!(server = %self.name, id, method, "MCP request");

        let response = self.post(&serde_json::to_value(&request)?).await?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            let mut current = self.session_id.write().await;
            if current.as_deref() != Some(session) {
                *current = Some(session.to_string());
            }
        }

        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("text/event-stream"))
            .unwrap_or(false);

        let body = response.text().await?;
        let rpc = if is_stream {
            response_from_stream(&body, id)?
        } else {
            let rpc: McpResponse = serde_json::from_str(&body)?;
            if !rpc.is_for(id) {
                return Err(McpError::Protocol(format!(
                    "response id {:?} does not match request {}",
                    rpc.id, id
                )));
            }
            rpc
        };

        if let Some(error) = rpc.error {
            return Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = rpc
            .result
            .ok_or_else(|| McpError::Protocol("no result in response".to_string()))?;
        Ok(serde_json::from_value(result)?)
    }

    /// Send a notification (no response expected)
    async fn send_notification(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let notification = McpNotification::new(method, params);
        self.post(&serde_json::to_value(notification)?).await?;
        Ok(())
    }
}

/// Pick the reply to request `id` out of an event stream. The server may
/// interleave its own notifications and requests, which are skipped.
fn response_from_stream(body: &str, id: u64) -> Result<McpResponse, McpError> {
    for event in sse::parse_events(body) {
        let Ok(value) = serde_json::from_str::<Value>(&event.data) else {
            continue;
        };
        if value.get("method").is_some() {
            continue;
        }
        let response: McpResponse = serde_json::from_value(value)?;
        if response.is_for(id) {
            return Ok(response);
        }
    }

    Err(McpError::Protocol(format!(
        "event stream ended without a response to request {}",
        id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_header_rejected() {
        let mut config = McpServerConfig::new("bad", "http://localhost:1/mcp");
        config
            .headers
            .insert("bad header".to_string(), "x".to_string());
        assert!(matches!(
            McpClient::from_config(&config),
            Err(McpError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_stream_skips_server_messages() {
        let body = concat!(
            "data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\",\"params\":{}}\n\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":4,\"result\":{\"tools\":[]}}\n\n",
        );
        let response = response_from_stream(body, 4).unwrap();
        assert!(response.result.is_some());
    }

    #[test]
    fn test_stream_without_match_is_error() {
        let body = "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n\n";
        assert!(matches!(
            response_from_stream(body, 2),
            Err(McpError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_non_object_arguments_rejected() {
        let client = McpClient::new_http("test", "http://localhost:1/mcp").unwrap();
        let err = client
            .call_tool("get_weather", &json!(["London"]))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Protocol(_)));
    }
}
