//! Time & weather chat agent
//!
//! An LLM chat agent whose tools come from remote MCP servers (user time
//! and weather), usable from a terminal REPL or exposed as an A2A agent.

pub mod a2a;
pub mod cli;
pub mod config;
pub mod core;
pub mod llm;
pub mod mcp;
pub mod ui;
