//! Wire types for the wiki chat backend.
//!
//! Every body is camelCase JSON. Non-streaming endpoints wrap their payload
//! in [`ApiEnvelope`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::messages::{Role, Turn, TurnId};

/// Longest conversation title derived from a prompt, in characters.
pub const TITLE_MAX_CHARS: usize = 60;

/// Uniform response wrapper. `ok: false` is a normal value carrying a
/// message, not a transport error.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ApiEnvelope<T> {
    pub ok: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Splits the envelope into its payload or the backend's message.
    /// A successful envelope without data is reported as a message too.
    pub fn into_result(self) -> Result<T, String> {
        match (self.ok, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err("response carried no data".to_string()),
            (false, _) => Err(self
                .message
                .unwrap_or_else(|| "request rejected".to_string())),
        }
    }
}

/// Body of `POST /conversation/chat`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub prompt_text: String,
    pub model_name: String,
    pub model_provider: String,
    pub assistant_message_id: String,
    pub is_online: bool,
    pub is_deep_think: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FindConversationsRequest {
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub statuses: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub title: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub conversation_id: String,
    pub prompt_text: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FindMessagesRequest {
    pub conversation_id: String,
}

/// One row of the conversation list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Result of `create-message`: the id the streamed reply will carry.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedMessage {
    #[serde(alias = "id")]
    pub assistant_message_id: String,
}

/// A stored message as returned by `find-messages`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub thinking: String,
}

impl From<MessageRecord> for Turn {
    fn from(record: MessageRecord) -> Self {
        let id = TurnId::new(record.id);
        match record.role {
            Role::User => Turn::user(id, record.content),
            Role::Assistant => Turn::assistant(id, record.content, record.thinking),
        }
    }
}

/// Conversation title for a prompt: its first non-blank line, cut to
/// [`TITLE_MAX_CHARS`] characters.
pub fn derive_title(prompt: &str) -> String {
    let line = prompt
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    line.chars().take(TITLE_MAX_CHARS).collect()
}
