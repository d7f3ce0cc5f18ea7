pub mod client;
pub mod types;

pub use client::{ChatBackend, ChatStream, ClientError, WikiClient};
pub use types::{ApiEnvelope, ChatRequest, ConversationSummary, CreatedMessage, MessageRecord};
