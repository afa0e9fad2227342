mod client;
mod error;
mod providers;
mod retry;

pub use client::LlmClient;
pub use error::LlmError;
pub use providers::{
    openai_messages, openai_request_body, parse_openai_response, AzureOpenAIProvider,
    ChatOptions, ChatResponse, Message, OllamaProvider, OpenAIProvider, Provider, Role,
    ToolCall, ToolDefinition,
};
pub use retry::{is_retryable_error, with_retry, RetryConfig, RetryDecision};
