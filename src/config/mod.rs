mod settings;

pub use settings::{
    AgentConfig, McpServerConfig, ModelConfig, ProviderKind, ServerConfig, Settings,
    DEFAULT_USER_MCP_URL, DEFAULT_WEATHER_MCP_URL, USER_SERVER_NAME, WEATHER_SERVER_NAME,
};
