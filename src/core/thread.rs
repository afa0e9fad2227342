use uuid::Uuid;

use crate::llm::{Message, Role};

/// Conversation history handed back into successive agent runs.
#[derive(Debug, Clone)]
pub struct Thread {
    id: String,
    messages: Vec<Message>,
}

impl Thread {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            messages: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && m.tool_calls.is_empty())
            .map(|m| m.content.as_str())
    }

    /// Append a completed turn.
    pub(crate) fn extend(&mut self, turn: impl IntoIterator<Item = Message>) {
        self.messages.extend(turn);
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}
