//! MCP (Model Context Protocol) client side
//!
//! - Client: talks to one remote tool server over Streamable HTTP
//! - Registry: the set of connected servers, routing tool calls by name

pub mod client;
pub mod protocol;
pub mod registry;
pub mod sse;

pub use client::{McpClient, McpError};
pub use protocol::*;
pub use registry::McpRegistry;
