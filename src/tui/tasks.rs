//! Background work spawned for controller effects.
//!
//! Every task talks back to the event loop the same way: by sending
//! [`Action`]s over the loop's channel. A send error means the loop is gone,
//! which the chat task treats as a cancellation.

use std::future::Future;
use std::sync::{Arc, mpsc};

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::api::client::{ChatBackend, ClientError};
use crate::api::types::ChatRequest;
use crate::core::action::{Action, ChatJob};
use crate::core::config::ResolvedConfig;
use crate::core::messages::Turn;
use crate::stream::{StreamOutcome, pump};

/// Who is asking, sent with conversation-level requests.
#[derive(Debug, Clone, Default)]
pub struct BackendScope {
    pub tenant_id: Option<String>,
    pub user_id: Option<String>,
    pub statuses: Vec<String>,
}

impl BackendScope {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            tenant_id: config.tenant_id.clone(),
            user_id: config.user_id.clone(),
            statuses: config.conversation_statuses.clone(),
        }
    }
}

/// Resolves to `None` if `cancel` fires first.
async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}

/// Runs one send end to end: create the conversation if needed, register
/// the prompt, open the chat stream and pump it into the loop. Always
/// finishes with `StreamClosed` for the job's generation.
pub async fn run_chat_job(
    backend: &dyn ChatBackend,
    scope: &BackendScope,
    job: ChatJob,
    cancel: CancellationToken,
    tx: &mpsc::Sender<Action>,
) -> StreamOutcome {
    let generation = job.generation;
    info!("Chat {} starting", generation);

    let outcome = drive_chat(backend, scope, job, &cancel, tx)
        .await
        .unwrap_or_else(StreamOutcome::Failed);

    if outcome.is_error() {
        warn!("Chat {} closed: {}", generation, outcome);
    } else {
        info!("Chat {} closed: {}", generation, outcome);
    }
    if tx
        .send(Action::StreamClosed {
            generation,
            outcome: outcome.clone(),
        })
        .is_err()
    {
        debug!("Chat {} closed after the event loop went away", generation);
    }
    outcome
}

async fn drive_chat(
    backend: &dyn ChatBackend,
    scope: &BackendScope,
    job: ChatJob,
    cancel: &CancellationToken,
    tx: &mpsc::Sender<Action>,
) -> Result<StreamOutcome, String> {
    let generation = job.generation;

    let conversation_id = match job.conversation_id {
        Some(id) => id,
        None => {
            let created = until_cancelled(
                cancel,
                backend.create_conversation(
                    scope.tenant_id.as_deref(),
                    scope.user_id.as_deref(),
                    &job.title,
                ),
            )
            .await;
            let Some(created) = created else {
                return Ok(StreamOutcome::Cancelled);
            };
            let summary = created.map_err(|e| e.to_string())?.into_result()?;
            let id = summary.id.clone();
            info!("Created conversation {} for {}", id, generation);
            if tx
                .send(Action::ConversationCreated {
                    generation,
                    summary,
                })
                .is_err()
            {
                return Ok(StreamOutcome::Cancelled);
            }
            id
        }
    };

    let Some(message) =
        until_cancelled(cancel, backend.create_message(&conversation_id, &job.prompt)).await
    else {
        return Ok(StreamOutcome::Cancelled);
    };
    let message = message.map_err(|e| e.to_string())?.into_result()?;
    debug!(
        "Prompt registered in {}; reply id {}",
        conversation_id, message.assistant_message_id
    );

    let request = ChatRequest {
        prompt_text: job.prompt,
        model_name: job.settings.model_name,
        model_provider: job.settings.model_provider,
        assistant_message_id: message.assistant_message_id,
        is_online: job.settings.online,
        is_deep_think: job.settings.deep_think,
    };
    let body = match until_cancelled(cancel, backend.open_chat(&request)).await {
        None => return Ok(StreamOutcome::Cancelled),
        Some(Ok(body)) => body,
        Some(Err(ClientError::NoBody)) => return Ok(StreamOutcome::ReaderUnavailable),
        Some(Err(e)) => return Err(e.to_string()),
    };

    Ok(pump(body, cancel, |event| {
        tx.send(Action::Stream { generation, event }).is_ok()
    })
    .await)
}

pub fn spawn_chat(
    backend: Arc<dyn ChatBackend>,
    scope: BackendScope,
    job: ChatJob,
    cancel: CancellationToken,
    tx: mpsc::Sender<Action>,
) {
    tokio::spawn(async move {
        run_chat_job(backend.as_ref(), &scope, job, cancel, &tx).await;
    });
}

/// Fetches a conversation's turns.
pub async fn load_history(backend: &dyn ChatBackend, conversation_id: String) -> Action {
    let result = match backend.find_messages(&conversation_id).await {
        Ok(envelope) => envelope.into_result(),
        Err(e) => Err(e.to_string()),
    };
    match result {
        Ok(records) => {
            info!(
                "Loaded {} messages for conversation {}",
                records.len(),
                conversation_id
            );
            Action::HistoryLoaded {
                conversation_id,
                turns: records.into_iter().map(Turn::from).collect(),
            }
        }
        Err(message) => {
            warn!("History for {} failed: {}", conversation_id, message);
            Action::HistoryFailed {
                conversation_id,
                message,
            }
        }
    }
}

pub fn spawn_history(backend: Arc<dyn ChatBackend>, conversation_id: String, tx: mpsc::Sender<Action>) {
    tokio::spawn(async move {
        let action = load_history(backend.as_ref(), conversation_id).await;
        if tx.send(action).is_err() {
            warn!("Failed to deliver history: receiver dropped");
        }
    });
}

pub async fn load_conversations(backend: &dyn ChatBackend, scope: &BackendScope) -> Action {
    let result = backend
        .find_conversations(
            scope.tenant_id.as_deref(),
            scope.user_id.as_deref(),
            &scope.statuses,
        )
        .await;
    match result.map_err(|e| e.to_string()).and_then(|e| e.into_result()) {
        Ok(list) => Action::ConversationsLoaded(list),
        Err(message) => Action::ConversationsFailed(message),
    }
}

pub fn spawn_conversations(backend: Arc<dyn ChatBackend>, scope: BackendScope, tx: mpsc::Sender<Action>) {
    tokio::spawn(async move {
        let action = load_conversations(backend.as_ref(), &scope).await;
        if tx.send(action).is_err() {
            warn!("Failed to deliver conversation list: receiver dropped");
        }
    });
}
