use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Config(String),
}

impl LlmError {
    /// Rate limits and server-side failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Api { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            LlmError::MalformedResponse(_) | LlmError::Config(_) => false,
        }
    }
}
