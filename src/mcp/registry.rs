//! MCP Server Registry
//!
//! Holds the connected tool servers and routes tool calls by name.

use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::HashMap;

use super::client::{McpClient, McpError};
use super::protocol::{McpTool, ToolCallResult};
use crate::config::McpServerConfig;
use crate::llm::ToolDefinition;

/// Registry for managing MCP server connections
#[derive(Default)]
pub struct McpRegistry {
    clients: Vec<McpClient>,
    tool_map: HashMap<String, usize>, // tool_name -> index into clients
    failures: Vec<(String, String)>,
}

impl McpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect every enabled server concurrently. A server that cannot be
    /// reached is logged and left out; the rest stay usable.
    pub async fn connect(configs: &[McpServerConfig]) -> Self {
        let attempts = join_all(configs.iter().filter(|c| c.enabled).map(|config| async move {
            let result = async {
                let mut client = McpClient::from_config(config)?;
                client.connect().await?;
                Ok::<_, McpError>(client)
            }
            .await;
            (config.name.clone(), result)
        }))
        .await;

        let mut registry = Self::new();
        for (name, result) in attempts {
            match result {
                Ok(client) => registry.add_client(client),
                Err(e) => {
                    tracing::warn!("Failed to connect to MCP server '{}': {}", name, e);
                    registry.failures.push((name, e.to_string()));
                }
            }
        }
        registry
    }

    /// Register a connected client. On a name clash the earlier server keeps the tool.
    pub fn add_client(&mut self, client: McpClient) {
        let index = self.clients.len();
        for tool in client.tools() {
            match self.tool_map.get(&tool.name) {
                Some(&owner) => tracing::warn!(
                    "Tool '{}' from '{}' shadowed by '{}'",
                    tool.name,
                    client.name(),
                    self.clients[owner].name()
                ),
                None => {
                    self.tool_map.insert(tool.name.clone(), index);
                }
            }
        }
        self.clients.push(client);
    }

    pub fn connected_servers(&self) -> Vec<&str> {
        self.clients.iter().map(|c| c.name()).collect()
    }

    /// Servers that failed to connect, with the reason.
    pub fn failures(&self) -> &[(String, String)] {
        &self.failures
    }

    pub fn find_tool_server(&self, tool_name: &str) -> Option<&str> {
        self.tool_map
            .get(tool_name)
            .map(|&index| self.clients[index].name())
    }

    /// Routable tools in server order, paired with their server name.
    pub fn list_all_tools(&self) -> Vec<(&str, &McpTool)> {
        self.clients
            .iter()
            .enumerate()
            .flat_map(|(index, client)| {
                client
                    .tools()
                    .iter()
                    .filter(move |tool| self.tool_map.get(&tool.name) == Some(&index))
                    .map(move |tool| (client.name(), tool))
            })
            .collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.list_all_tools()
            .into_iter()
            .map(|(_, tool)| to_definition(tool))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tool_map.is_empty()
    }

    /// Call a tool (automatically routes to correct server)
    pub async fn call_tool(&self, tool_name: &str, arguments: &Value) -> Result<ToolCallResult, McpError> {
        let index = self
            .tool_map
            .get(tool_name)
            .ok_or_else(|| McpError::UnknownTool(tool_name.to_string()))?;

        self.clients[*index].call_tool(tool_name, arguments).await
    }

    pub async fn shutdown(&self) {
        join_all(self.clients.iter().map(|c| c.close())).await;
    }
}

fn to_definition(tool: &McpTool) -> ToolDefinition {
    ToolDefinition {
        name: tool.name.clone(),
        description: tool.description.clone().unwrap_or_default(),
        input_schema: tool
            .input_schema
            .clone()
            .unwrap_or_else(|| json!({"type": "object", "properties": {}})),
    }
}
