//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::api::client::{ChatBackend, ChatStream, ClientError};
use crate::api::types::{
    ApiEnvelope, ChatRequest, ConversationSummary, CreatedMessage, MessageRecord,
};
use crate::core::messages::{Turn, TurnId};
use crate::core::scroll::ScrollConfig;
use crate::core::state::{App, ChatSettings};

pub fn test_settings() -> ChatSettings {
    ChatSettings {
        model_name: "test-model".to_string(),
        model_provider: "test-provider".to_string(),
        online: false,
        deep_think: false,
    }
}

/// Creates a test App with default scroll tuning and a 3s progress auto-hide.
pub fn test_app() -> App {
    App::new(
        test_settings(),
        ScrollConfig {
            bottom_epsilon: 6,
            ..ScrollConfig::default()
        },
        Duration::from_millis(3000),
    )
}

pub fn user_turn(id: &str, text: &str) -> Turn {
    Turn::user(TurnId::new(id), text)
}

pub fn assistant_turn(id: &str, text: &str) -> Turn {
    Turn::assistant(TurnId::new(id), text, "")
}

fn ok<T>(data: T) -> ApiEnvelope<T> {
    ApiEnvelope {
        ok: true,
        data: Some(data),
        message: None,
    }
}

/// In-memory backend that replays a canned chat body.
pub struct FakeBackend {
    /// Chunks returned by `open_chat`. `None` simulates a body-less response.
    pub body: Option<Vec<Vec<u8>>>,
    /// Message for an `ok: false` reply to `create_message`.
    pub reject_message: Option<String>,
    /// Chat requests seen so far.
    pub chats: Mutex<Vec<ChatRequest>>,
    pub created_conversations: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn with_body(body: &str) -> Self {
        Self {
            body: Some(vec![body.as_bytes().to_vec()]),
            reject_message: None,
            chats: Mutex::new(Vec::new()),
            created_conversations: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn find_conversations(
        &self,
        _tenant_id: Option<&str>,
        _user_id: Option<&str>,
        _statuses: &[String],
    ) -> Result<ApiEnvelope<Vec<ConversationSummary>>, ClientError> {
        Ok(ok(Vec::new()))
    }

    async fn create_conversation(
        &self,
        _tenant_id: Option<&str>,
        _user_id: Option<&str>,
        title: &str,
    ) -> Result<ApiEnvelope<ConversationSummary>, ClientError> {
        let mut created = self.created_conversations.lock().unwrap();
        created.push(title.to_string());
        Ok(ok(ConversationSummary {
            id: format!("conv-{}", created.len()),
            title: title.to_string(),
            status: Some("active".to_string()),
            updated_at: None,
        }))
    }

    async fn create_message(
        &self,
        _conversation_id: &str,
        _prompt_text: &str,
    ) -> Result<ApiEnvelope<CreatedMessage>, ClientError> {
        if let Some(message) = &self.reject_message {
            return Ok(ApiEnvelope {
                ok: false,
                data: None,
                message: Some(message.clone()),
            });
        }
        Ok(ok(CreatedMessage {
            assistant_message_id: "server-reply-1".to_string(),
        }))
    }

    async fn find_messages(
        &self,
        _conversation_id: &str,
    ) -> Result<ApiEnvelope<Vec<MessageRecord>>, ClientError> {
        Ok(ok(Vec::new()))
    }

    async fn open_chat(&self, request: &ChatRequest) -> Result<ChatStream, ClientError> {
        self.chats.lock().unwrap().push(request.clone());
        match &self.body {
            Some(chunks) => Ok(futures::stream::iter(chunks.clone().into_iter().map(Ok)).boxed()),
            None => Err(ClientError::NoBody),
        }
    }
}
