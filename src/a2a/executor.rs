use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::types::{AgentCapabilities, AgentCard, AgentSkill, Message, A2A_PROTOCOL_VERSION};
use crate::core::{ChatAgent, Thread, SUPPORTED_CITIES};

/// What the executor gets for one `message/send`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub task_id: String,
    pub context_id: String,
    pub message: Message,
}

impl RequestContext {
    pub fn user_input(&self) -> String {
        self.message.text_content()
    }
}

#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Produce the agent's reply text for the request.
    async fn execute(&self, context: &RequestContext) -> Result<String>;

    async fn cancel(&self, task_id: &str) -> Result<()> {
        tracing::debug!(task_id, "Cancel requested");
        Ok(())
    }
}

/// Serves the time & weather agent. Each A2A context gets its own
/// conversation thread; turns within a context run one at a time.
pub struct WeatherAgentExecutor {
    agent: Arc<ChatAgent>,
    threads: Mutex<HashMap<String, Arc<Mutex<Thread>>>>,
}

impl WeatherAgentExecutor {
    pub fn new(agent: Arc<ChatAgent>) -> Self {
        Self {
            agent,
            threads: Mutex::new(HashMap::new()),
        }
    }

    async fn thread_for(&self, context_id: &str) -> Arc<Mutex<Thread>> {
        self.threads
            .lock()
            .await
            .entry(context_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(self.agent.get_new_thread())))
            .clone()
    }
}

#[async_trait]
impl AgentExecutor for WeatherAgentExecutor {
    async fn execute(&self, context: &RequestContext) -> Result<String> {
        let input = context.user_input();
        if input.trim().is_empty() {
            bail!("message contains no text");
        }

        let thread = self.thread_for(&context.context_id).await;
        let mut thread = thread.lock().await;

        tracing::info!(
            task_id = %context.task_id,
            context_id = %context.context_id,
            "Running weather agent"
        );
        let response = self.agent.run(&input, &mut thread).await?;
        Ok(response.text)
    }
}

pub fn weather_agent_card(url: impl Into<String>) -> AgentCard {
    let cities: Vec<&str> = SUPPORTED_CITIES.iter().map(|(city, _)| *city).collect();

    AgentCard {
        name: "Weather Agent".to_string(),
        description: format!(
            "Answers weather and local time questions for {}, remembering where the user \
             said they are.",
            cities.join(", ")
        ),
        url: url.into(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol_version: A2A_PROTOCOL_VERSION.to_string(),
        preferred_transport: "JSONRPC".to_string(),
        capabilities: AgentCapabilities::default(),
        default_input_modes: vec!["text".to_string()],
        default_output_modes: vec!["text".to_string()],
        skills: vec![
            AgentSkill {
                id: "weather".to_string(),
                name: "Weather lookup".to_string(),
                description: "Current weather for a supported city or the user's stated location"
                    .to_string(),
                tags: vec!["weather".to_string(), "forecast".to_string()],
                examples: vec![
                    "What is the weather in Berlin?".to_string(),
                    "I am in London, what is the weather here?".to_string(),
                ],
            },
            AgentSkill {
                id: "time".to_string(),
                name: "Local time".to_string(),
                description: "Current time in the user's timezone".to_string(),
                tags: vec!["time".to_string(), "timezone".to_string()],
                examples: vec!["What time is it for me right now?".to_string()],
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::types::Part;

    #[test]
    fn test_card_advertises_url_and_skills() {
        let card = weather_agent_card("http://localhost:8888/");
        assert_eq!(card.url, "http://localhost:8888/");
        assert!(!card.capabilities.streaming);

        let ids: Vec<&str> = card.skills.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["weather", "time"]);

        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["defaultInputModes"][0], "text");
        assert_eq!(json["protocolVersion"], A2A_PROTOCOL_VERSION);
    }

    #[test]
    fn test_card_names_every_supported_city() {
        let card = weather_agent_card("http://localhost:8888/");
        for (city, _) in SUPPORTED_CITIES {
            assert!(card.description.contains(city), "missing {}", city);
        }
    }

    #[test]
    fn test_user_input_joins_text_parts() {
        let mut message = Message::user_text("first");
        message.parts.push(Part::Text {
            text: "second".to_string(),
        });
        let context = RequestContext {
            task_id: "t".to_string(),
            context_id: "c".to_string(),
            message,
        };
        assert_eq!(context.user_input(), "first\nsecond");
    }
}
