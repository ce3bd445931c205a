//! Message and Conversation domain types.
//!
//! A cycle's transcript is an ordered `Conversation`: the system persona,
//! the opening instruction, then alternating model decisions and tool
//! observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The agent's own runtime (instructions, observations)
    User,
    /// The model
    Assistant,
    /// Persona and rules
    System,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Attached images as `data:` URIs (sent as multi-part content)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            images: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Attach an image (a `data:` URI) to this message.
    pub fn with_image(mut self, data_uri: impl Into<String>) -> Self {
        self.images.push(data_uri.into());
        self
    }
}

/// An ordered transcript shared by every step of one cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    /// Ordered messages
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Start a conversation with a system persona.
    pub fn with_system(persona: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(persona)],
        }
    }

    /// Add a message to the conversation.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello, agent!");
        assert!(msg.images.is_empty());
    }

    #[test]
    fn conversation_keeps_order() {
        let mut conv = Conversation::with_system("persona");
        conv.push(Message::user("first"));
        conv.push(Message::assistant("second"));
        assert_eq!(conv.len(), 3);
        assert_eq!(conv.messages[0].role, Role::System);
        assert_eq!(conv.last().map(|m| m.content.as_str()), Some("second"));
    }

    #[test]
    fn images_are_omitted_when_empty() {
        let json = serde_json::to_string(&Message::user("plain")).unwrap();
        assert!(!json.contains("images"));

        let json = serde_json::to_string(&Message::user("pic").with_image("data:image/png;base64,AA")).unwrap();
        assert!(json.contains("data:image/png"));
    }
}
