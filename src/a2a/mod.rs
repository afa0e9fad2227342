//! A2A (Agent-to-Agent) server side
//!
//! - Types: JSON-RPC envelopes, tasks, messages and the agent card
//! - Executor: bridges a task request to the chat agent
//! - Handler: task lifecycle on top of an executor and a store
//! - Server: axum router and listener

pub mod executor;
pub mod handler;
pub mod server;
pub mod store;
pub mod types;

pub use executor::{weather_agent_card, AgentExecutor, RequestContext, WeatherAgentExecutor};
pub use handler::{DefaultRequestHandler, RequestHandler};
pub use server::{router, serve, AGENT_CARD_PATH, LEGACY_AGENT_CARD_PATH};
pub use store::{InMemoryTaskStore, TaskStore};
pub use types::*;

use anyhow::Result;
use std::sync::Arc;

use crate::core::ChatAgent;

/// Expose `agent` as an A2A server on `host:port` until Ctrl-C.
pub async fn serve_agent(agent: Arc<ChatAgent>, host: &str, port: u16) -> Result<()> {
    let executor = Arc::new(WeatherAgentExecutor::new(agent));
    let store = Arc::new(InMemoryTaskStore::new());
    let handler = Arc::new(DefaultRequestHandler::new(executor, store));
    let card = weather_agent_card(format!("http://{}:{}/", host, port));

    serve(host, port, router(card, handler)).await
}
