use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const USER_SERVER_NAME: &str = "User Time Server";
pub const WEATHER_SERVER_NAME: &str = "Weather Server";

pub const DEFAULT_USER_MCP_URL: &str = "http://localhost:8002/mcp";
pub const DEFAULT_WEATHER_MCP_URL: &str = "http://localhost:8001/mcp";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default = "default_mcp_servers")]
    pub mcp_servers: Vec<McpServerConfig>,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Azure,
    Ollama,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" | "openai_compatible" => Ok(Self::OpenAI),
            "azure" | "azure_openai" => Ok(Self::Azure),
            "ollama" => Ok(Self::Ollama),
            other => bail!("Unknown model provider: {}", other),
        }
    }

    fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Azure => Some("AZURE_OPENAI_API_KEY"),
            Self::Ollama => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
            Self::Azure => write!(f, "azure"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Unset means: azure when an Azure endpoint is configured, openai otherwise.
    #[serde(default)]
    pub provider: Option<ProviderKind>,
    #[serde(default)]
    pub completion_model: Option<String>,
    #[serde(default)]
    pub medium_model: Option<String>,
    #[serde(default)]
    pub small_model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: None,
            completion_model: None,
            medium_model: None,
            small_model: None,
            api_key: None,
            api_key_env: None,
            base_url: None,
            api_version: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    pub name: String,
    pub url: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra headers sent with every request (e.g. auth tokens)
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl McpServerConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            enabled: true,
            timeout_secs: default_timeout_secs(),
            headers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,

    /// Replaces the built-in system instructions when set
    #[serde(default)]
    pub instructions: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            max_tool_iterations: default_max_tool_iterations(),
            instructions: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_agent_name() -> String {
    "TimeWeatherAgent".to_string()
}
fn default_max_tool_iterations() -> usize {
    10
}
fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    8888
}
fn default_mcp_servers() -> Vec<McpServerConfig> {
    vec![
        McpServerConfig::new(USER_SERVER_NAME, DEFAULT_USER_MCP_URL),
        McpServerConfig::new(WEATHER_SERVER_NAME, DEFAULT_WEATHER_MCP_URL),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            mcp_servers: default_mcp_servers(),
            agent: AgentConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings: defaults, then the TOML file, then `.env` and the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::config_path() {
                Ok(path) if path.exists() => Self::from_file(&path)?,
                _ => Settings::default(),
            },
        };

        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings: Settings =
            toml::from_str(&content).context("Failed to parse config file")?;
        Ok(settings)
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("dev", "weather-agent", "weather-agent")
            .context("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay environment variables. `lookup` abstracts the environment so
    /// callers can inject a fixed map.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(name) = get("COMPLETION_DEPLOYMENT_NAME") {
            self.model.completion_model = Some(name);
        }
        if let Some(name) = get("MEDIUM_DEPLOYMENT_MODEL_NAME") {
            self.model.medium_model = Some(name);
        }
        if let Some(name) = get("SMALL_DEPLOYMENT_MODEL_NAME") {
            self.model.small_model = Some(name);
        }

        if let Some(provider) = get("MODEL_PROVIDER") {
            self.model.provider = Some(ProviderKind::parse(&provider)?);
        }
        let azure_endpoint = get("AZURE_OPENAI_ENDPOINT");
        if self.model.provider.is_none() {
            self.model.provider = Some(if azure_endpoint.is_some() {
                ProviderKind::Azure
            } else {
                ProviderKind::OpenAI
            });
        }

        let base_url = match self.provider() {
            ProviderKind::OpenAI => get("OPENAI_BASE_URL"),
            ProviderKind::Azure => azure_endpoint,
            ProviderKind::Ollama => get("OLLAMA_BASE_URL"),
        };
        if base_url.is_some() {
            self.model.base_url = base_url;
        }
        if let Some(version) = get("AZURE_OPENAI_API_VERSION") {
            self.model.api_version = Some(version);
        }

        if let Some(url) = get("USER_MCP_URL") {
            self.set_server_url(USER_SERVER_NAME, url);
        }
        if let Some(url) = get("WEATHER_MCP_URL") {
            self.set_server_url(WEATHER_SERVER_NAME, url);
        }

        if let Some(host) = get("A2A_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("A2A_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid A2A_PORT: {}", port))?;
        }

        Ok(())
    }

    fn set_server_url(&mut self, name: &str, url: String) {
        match self.mcp_servers.iter_mut().find(|s| s.name == name) {
            Some(server) => server.url = url,
            None => self.mcp_servers.push(McpServerConfig::new(name, url)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for server in self.mcp_servers.iter().filter(|s| s.enabled) {
            let url = url::Url::parse(&server.url).with_context(|| {
                format!("Invalid URL for MCP server '{}': {}", server.name, server.url)
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                bail!(
                    "MCP server '{}' must use http or https, got {}",
                    server.name,
                    url.scheme()
                );
            }
        }

        if self.server.port == 0 {
            bail!("A2A server port must be non-zero");
        }

        Ok(())
    }

    pub fn provider(&self) -> ProviderKind {
        self.model.provider.unwrap_or(ProviderKind::OpenAI)
    }

    /// Model used by the agent: the medium deployment, else the completion one.
    pub fn chat_model(&self) -> Result<&str> {
        self.model
            .medium_model
            .as_deref()
            .or(self.model.completion_model.as_deref())
            .context(
                "No chat model configured. Set MEDIUM_DEPLOYMENT_MODEL_NAME or COMPLETION_DEPLOYMENT_NAME.",
            )
    }

    pub fn api_key(&self) -> Option<String> {
        if let Some(key) = &self.model.api_key {
            return Some(key.clone());
        }
        let env_var = self
            .model
            .api_key_env
            .as_deref()
            .or(self.provider().default_api_key_env())?;
        std::env::var(env_var).ok()
    }

    pub fn enabled_servers(&self) -> impl Iterator<Item = &McpServerConfig> {
        self.mcp_servers.iter().filter(|s| s.enabled)
    }
}
