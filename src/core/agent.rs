use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use super::instructions::SYSTEM_INSTRUCTIONS;
use super::thread::Thread;
use crate::config::Settings;
use crate::llm::{LlmClient, Message, ToolCall};
use crate::mcp::McpRegistry;

const DEFAULT_MAX_TOOL_ITERATIONS: usize = 10;

/// A tool call made while answering, with what the tool returned.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
    pub output: String,
    pub is_error: bool,
}

#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub text: String,
    pub tool_invocations: Vec<ToolInvocation>,
}

/// A chat model with instructions and a set of MCP tools.
pub struct ChatAgent {
    name: String,
    instructions: String,
    llm: LlmClient,
    tools: McpRegistry,
    max_tool_iterations: usize,
}

impl ChatAgent {
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        llm: LlmClient,
        tools: McpRegistry,
    ) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            llm,
            tools,
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }

    /// Build the time & weather agent: model client from settings, tools from
    /// every enabled MCP server that answers.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let llm = LlmClient::new(settings)?;
        let tools = McpRegistry::connect(&settings.mcp_servers).await;

        let instructions = settings
            .agent
            .instructions
            .clone()
            .unwrap_or_else(|| SYSTEM_INSTRUCTIONS.to_string());

        Ok(Self::new(settings.agent.name.clone(), instructions, llm, tools)
            .with_max_tool_iterations(settings.agent.max_tool_iterations))
    }

    pub fn with_max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    pub fn tools(&self) -> &McpRegistry {
        &self.tools
    }

    pub fn get_new_thread(&self) -> Thread {
        Thread::new()
    }

    /// Answer `input` in the context of `thread`, calling tools as the model
    /// asks. The turn is committed to the thread only once it completes, so
    /// an error or a dropped future leaves the thread as it was.
    pub async fn run(&self, input: &str, thread: &mut Thread) -> Result<AgentResponse> {
        let mut turn = vec![Message::user(input)];
        let response = self.run_turn(thread.messages(), &mut turn).await?;
        thread.extend(turn);
        Ok(response)
    }

    async fn run_turn(
        &self,
        history: &[Message],
        turn: &mut Vec<Message>,
    ) -> Result<AgentResponse> {
        let definitions = self.tools.definitions();
        let mut invocations = Vec::new();
        let mut last_text = String::new();

        for iteration in 1..=self.max_tool_iterations {
            let mut messages = Vec::with_capacity(history.len() + turn.len() + 1);
            messages.push(Message::system(&self.instructions));
            messages.extend(history.iter().cloned());
            messages.extend(turn.iter().cloned());

            let response = self.llm.complete(&messages, &definitions).await?;

            if response.tool_calls.is_empty() {
                turn.push(Message::assistant(&response.content));
                return Ok(AgentResponse {
                    text: response.content,
                    tool_invocations: invocations,
                });
            }

            tracing::debug!(
                agent = %self.name,
                iteration,
                calls = response.tool_calls.len(),
                "Model requested tools"
            );
            last_text = response.content.clone();
            turn.push(Message::assistant_with_tools(
                response.content,
                response.tool_calls.clone(),
            ));

            for call in &response.tool_calls {
                let invocation = self.invoke(call).await;
                turn.push(Message::tool_result(&call.id, &invocation.output));
                invocations.push(invocation);
            }
        }

        tracing::warn!(
            agent = %self.name,
            "Max tool iterations ({}) reached",
            self.max_tool_iterations
        );
        turn.push(Message::assistant(&last_text));
        Ok(AgentResponse {
            text: last_text,
            tool_invocations: invocations,
        })
    }

    /// Tool failures go back to the model as text instead of ending the turn.
    async fn invoke(&self, call: &ToolCall) -> ToolInvocation {
        let (output, is_error) = match self.tools.call_tool(&call.name, &call.arguments).await {
            Ok(result) => (result.text(), result.is_error),
            Err(e) => (format!("Error: {}", e), true),
        };

        if is_error {
            tracing::warn!(tool = %call.name, "Tool call failed: {}", output);
        } else {
            tracing::info!(tool = %call.name, "Tool call completed");
        }

        ToolInvocation {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            output,
            is_error,
        }
    }

    pub async fn shutdown(&self) {
        self.tools.shutdown().await;
    }
}
