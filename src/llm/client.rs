use anyhow::{Context, Result};
use std::sync::Arc;

use super::providers::{
    AzureOpenAIProvider, ChatOptions, ChatResponse, Message, OllamaProvider, OpenAIProvider,
    Provider, ToolDefinition,
};
use super::retry::{with_retry, RetryConfig};
use super::LlmError;
use crate::config::{ProviderKind, Settings};

#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn Provider>,
    model: String,
    options: ChatOptions,
    retry_config: RetryConfig,
}

impl LlmClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let model = settings.chat_model()?.to_string();
        let model_config = &settings.model;
        let api_key = settings.api_key();

        let provider: Arc<dyn Provider> = match settings.provider() {
            ProviderKind::OpenAI => {
                let key =
                    api_key.context("OpenAI API key not found. Set OPENAI_API_KEY env var.")?;
                Arc::new(OpenAIProvider::new(
                    key,
                    model.clone(),
                    model_config.base_url.clone(),
                ))
            }
            ProviderKind::Azure => {
                let key = api_key
                    .context("Azure OpenAI API key not found. Set AZURE_OPENAI_API_KEY env var.")?;
                let endpoint = model_config.base_url.clone().ok_or_else(|| {
                    LlmError::Config(
                        "Azure OpenAI endpoint not found. Set AZURE_OPENAI_ENDPOINT env var."
                            .to_string(),
                    )
                })?;
                Arc::new(AzureOpenAIProvider::new(
                    key,
                    endpoint,
                    model.clone(),
                    model_config.api_version.clone(),
                ))
            }
            ProviderKind::Ollama => {
                let base_url = model_config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434".to_string());
                Arc::new(OllamaProvider::new(base_url, model.clone()))
            }
        };

        tracing::debug!(provider = provider.name(), model = %model, "LLM client ready");

        Ok(Self {
            provider,
            model,
            options: ChatOptions {
                temperature: model_config.temperature,
                max_tokens: model_config.max_tokens,
            },
            retry_config: RetryConfig::default(),
        })
    }

    /// Wrap an already-built provider.
    pub fn from_provider(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            options: ChatOptions::default(),
            retry_config: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// One completion round. `messages` must already include the system prompt.
    pub async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ChatResponse> {
        let tools = if tools.is_empty() {
            None
        } else {
            Some(tools.to_vec())
        };

        let provider = self.provider.clone();
        let options = self.options;
        with_retry(&self.retry_config, || {
            let p = provider.clone();
            let m = messages.to_vec();
            let t = tools.clone();
            async move { p.chat(m, t, options).await }
        })
        .await
    }
}
