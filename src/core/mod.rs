mod agent;
mod instructions;
mod orchestrator;
pub mod smoke;
mod thread;

pub use agent::{AgentResponse, ChatAgent, ToolInvocation};
pub use instructions::{SUPPORTED_CITIES, SYSTEM_INSTRUCTIONS};
pub use orchestrator::{parse_command, Orchestrator, ReplCommand};
pub use thread::Thread;
