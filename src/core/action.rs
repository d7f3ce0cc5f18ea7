//! # Actions
//!
//! Everything that can happen in wikichat becomes an `Action`.
//! User presses Enter? That's `Action::Submit(text)`.
//! A record arrives on the chat stream? That's `Action::Stream { .. }`.
//!
//! The `update()` function takes the current state, an action and a clock
//! reading, mutates the state, and returns an [`Effect`] describing the I/O
//! the adapter should start. No side effects here.
//!
//! ```text
//! State + Action + now  →  update()  →  New State + Effect
//! ```
//!
//! Taking `now` as a parameter keeps suppression windows and delayed tasks
//! testable without sleeping.

use std::time::Instant;

use log::{debug, info, warn};

use crate::api::types::{ConversationSummary, derive_title};
use crate::core::messages::{Field, Turn, TurnId};
use crate::core::progress::MISC_SECTION;
use crate::core::scroll::{FollowEvent, Viewport};
use crate::core::state::{App, ChatSettings, GenerationId};
use crate::core::timers::DelayedTask;
use crate::stream::{StreamEvent, StreamOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The conversation list arrived.
    ConversationsLoaded(Vec<ConversationSummary>),
    ConversationsFailed(String),
    /// Open an existing conversation.
    SelectConversation(String),
    HistoryLoaded {
        conversation_id: String,
        turns: Vec<Turn>,
    },
    HistoryFailed {
        conversation_id: String,
        message: String,
    },
    /// Start over with an empty, not yet created conversation.
    NewConversation,
    /// The backend created the conversation a send is going into.
    ConversationCreated {
        generation: GenerationId,
        summary: ConversationSummary,
    },
    Submit(String),
    /// Stop the reply being generated.
    Stop,
    Stream {
        generation: GenerationId,
        event: StreamEvent,
    },
    StreamClosed {
        generation: GenerationId,
        outcome: StreamOutcome,
    },
    /// The view re-measured the message list.
    ViewportMeasured(Viewport),
    /// Raw scroll input from the view (wheel, pointer, observed offset).
    Scroll(FollowEvent),
    JumpToLatest,
    PrevQuestion,
    NextQuestion,
    ToggleOnline,
    ToggleDeepThink,
    /// Clock tick from the event loop; fires due delayed tasks.
    Tick,
    Quit,
}

/// Everything a send needs once it leaves the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatJob {
    pub generation: GenerationId,
    /// `None` when the conversation must be created first.
    pub conversation_id: Option<String>,
    /// Title for a conversation created by this send.
    pub title: String,
    pub prompt: String,
    pub settings: ChatSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Quit,
    /// Cancel whatever stream is open and run this send.
    StartChat(ChatJob),
    /// Cancel the open stream.
    CancelStream,
    /// Cancel the open stream and fetch this conversation's history.
    LoadHistory(String),
    RefreshConversations,
}

pub fn update(app: &mut App, action: Action, now: Instant) -> Effect {
    match action {
        Action::ConversationsLoaded(list) => {
            info!("Loaded {} conversations", list.len());
            if let Some(id) = &app.conversation_id
                && let Some(summary) = list.iter().find(|c| &c.id == id)
                && !summary.title.is_empty()
            {
                app.conversation_title = Some(summary.title.clone());
            }
            app.conversations = list;
            Effect::None
        }
        Action::ConversationsFailed(message) => {
            warn!("Conversation list failed: {message}");
            app.status_message = format!("Could not list conversations: {message}");
            Effect::None
        }
        Action::SelectConversation(id) => {
            if app.conversation_id.as_deref() == Some(id.as_str()) && !app.store.is_empty() {
                return Effect::None;
            }
            info!("Switching to conversation {id}");
            abandon_generation(app);
            reset_conversation(app, now);
            app.conversation_title = app
                .conversations
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.title.clone())
                .filter(|t| !t.is_empty());
            app.conversation_id = Some(id.clone());
            app.loading_history = true;
            app.status_message = String::from("Loading conversation...");
            Effect::LoadHistory(id)
        }
        Action::HistoryLoaded {
            conversation_id,
            turns,
        } => {
            if app.conversation_id.as_deref() != Some(conversation_id.as_str()) {
                debug!("Dropping history for {conversation_id}: no longer selected");
                return Effect::None;
            }
            if !std::mem::take(&mut app.loading_history) {
                debug!("Dropping history for {conversation_id}: already loaded");
                return Effect::None;
            }
            let count = turns.len();
            // Turns present now were sent after the switch; they go after the history.
            let sent_meanwhile = app.store.len();
            let loaded = if sent_meanwhile > 0 {
                app.content_dirty = true;
                app.store.prepend_history(turns)
            } else {
                reset_conversation(app, now);
                app.store.replace_all(turns)
            };
            match loaded {
                Ok(()) => {
                    info!("Loaded {count} turns for {conversation_id} ({sent_meanwhile} sent meanwhile)");
                    if !app.is_generating {
                        app.status_message = format!("{count} messages");
                    }
                }
                Err(e) => {
                    warn!("History for {conversation_id} rejected: {e}");
                    app.status_message = format!("History rejected: {e}");
                }
            }
            app.sync_questions();
            Effect::None
        }
        Action::HistoryFailed {
            conversation_id,
            message,
        } => {
            if app.conversation_id.as_deref() == Some(conversation_id.as_str()) {
                app.loading_history = false;
                warn!("History load for {conversation_id} failed: {message}");
                app.status_message = format!("Could not load conversation: {message}");
            }
            Effect::None
        }
        Action::NewConversation => {
            let was_generating = abandon_generation(app);
            reset_conversation(app, now);
            app.conversation_id = None;
            app.conversation_title = None;
            app.loading_history = false;
            app.status_message = String::from("New conversation");
            if was_generating {
                Effect::CancelStream
            } else {
                Effect::None
            }
        }
        Action::ConversationCreated {
            generation,
            summary,
        } => {
            if !app.is_active(generation) || app.conversation_id.is_some() {
                debug!("Ignoring created conversation {} for {generation}", summary.id);
                return Effect::None;
            }
            info!("Conversation {} created", summary.id);
            app.conversation_id = Some(summary.id.clone());
            if !summary.title.is_empty() {
                app.conversation_title = Some(summary.title.clone());
            }
            Effect::RefreshConversations
        }
        Action::Submit(text) => submit(app, text, now),
        Action::Stop => {
            if !app.is_generating {
                return Effect::None;
            }
            info!("Generation stopped by user");
            if let Some(closed) = app.store.close_reply() {
                debug!("Reply {} kept {} bytes", closed.id, closed.text.len());
            }
            let generation = app.active_generation;
            app.end_generation();
            if app.progress.finish_running() > 0
                && let Some(generation) = generation
            {
                arm_progress_hide(app, generation, now);
            }
            app.status_message = String::from("Stopped");
            Effect::CancelStream
        }
        Action::Stream { generation, event } => {
            if !app.is_active(generation) {
                debug!("Dropping stale {:?} record from {generation}", event.kind());
                return Effect::None;
            }
            dispatch(app, generation, event, now);
            Effect::None
        }
        Action::StreamClosed {
            generation,
            outcome,
        } => {
            if !app.is_active(generation) {
                debug!("Stream for {generation} closed after it was superseded ({outcome})");
                return Effect::None;
            }
            close_stream(app, outcome, now);
            Effect::None
        }
        Action::ViewportMeasured(viewport) => {
            app.viewport = viewport;
            if std::mem::take(&mut app.content_dirty) {
                follow(app, FollowEvent::ContentChanged(viewport), now);
            }
            Effect::None
        }
        Action::Scroll(event) => {
            if let FollowEvent::Observed(viewport)
            | FollowEvent::PointerUp(viewport)
            | FollowEvent::Wheel { viewport, .. } = event
            {
                app.viewport = viewport;
            }
            follow(app, event, now);
            Effect::None
        }
        Action::JumpToLatest => {
            follow(app, FollowEvent::JumpToLatest, now);
            Effect::None
        }
        Action::PrevQuestion => {
            app.sync_questions();
            if let Some(position) = app.nav.prev() {
                follow(app, FollowEvent::NavigateTo(position), now);
            }
            Effect::None
        }
        Action::NextQuestion => {
            app.sync_questions();
            if let Some(position) = app.nav.next() {
                follow(app, FollowEvent::NavigateTo(position), now);
            }
            Effect::None
        }
        Action::ToggleOnline => {
            app.settings.online = !app.settings.online;
            app.status_message = format!("Online search {}", on_off(app.settings.online));
            Effect::None
        }
        Action::ToggleDeepThink => {
            app.settings.deep_think = !app.settings.deep_think;
            app.status_message = format!("Deep think {}", on_off(app.settings.deep_think));
            Effect::None
        }
        Action::Tick => {
            for task in app.timers.drain_due(now) {
                run_task(app, task, now);
            }
            Effect::None
        }
        Action::Quit => Effect::Quit,
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

fn submit(app: &mut App, text: String, now: Instant) -> Effect {
    let prompt = text.trim().to_string();
    if prompt.is_empty() {
        return Effect::None;
    }

    if app.awaiting_conversation() {
        info!("Holding send: the conversation is still being created");
        app.status_message = String::from("Still creating the conversation; send again in a moment");
        return Effect::None;
    }

    if app.is_generating {
        info!("New send while generating; closing the open reply");
        app.store.close_reply();
        app.end_generation();
    }

    let user_id = TurnId::optimistic("user");
    let reply_id = TurnId::optimistic("assistant");
    let batch = vec![
        Turn::user(user_id, prompt.clone()),
        Turn::pending_assistant(reply_id.clone()),
    ];
    if let Err(e) = app.store.append(batch) {
        warn!("Could not append turns: {e}");
        app.status_message = format!("Send failed: {e}");
        return Effect::None;
    }
    app.store.open(reply_id);
    app.sync_questions();

    app.progress.clear();
    follow(app, FollowEvent::MessageSent, now);

    let generation = app.begin_generation();
    app.status_message = String::from("Thinking...");
    info!("Submitting prompt ({} chars) as {generation}", prompt.len());

    Effect::StartChat(ChatJob {
        generation,
        conversation_id: app.conversation_id.clone(),
        title: derive_title(&prompt),
        prompt,
        settings: app.settings.clone(),
    })
}

/// Runs the handler for one record. Exactly one arm per record, in arrival
/// order.
fn dispatch(app: &mut App, generation: GenerationId, event: StreamEvent, now: Instant) {
    match event {
        StreamEvent::RetrieveStart { section, payload } => {
            app.progress.start(&section, payload);
        }
        StreamEvent::RetrieveEnd { section, payload } => {
            app.progress.finish(&section, payload);
            arm_progress_hide(app, generation, now);
        }
        StreamEvent::Thinking(delta) => {
            if app.store.append_to_open(Field::Thinking, &delta) {
                app.content_dirty = true;
            }
        }
        StreamEvent::Answer(delta) => {
            if app.store.append_to_open(Field::Answer, &delta) {
                app.content_dirty = true;
            }
        }
        StreamEvent::Done => finish_generation(app, now),
        StreamEvent::Unknown {
            kind,
            section,
            payload,
        } => {
            debug!("Unhandled record type {kind:?}");
            let section = section.unwrap_or_else(|| MISC_SECTION.to_string());
            let line = if payload.is_empty() {
                kind
            } else {
                format!("{kind}: {payload}")
            };
            app.progress.note(&section, line);
        }
    }
}

fn finish_generation(app: &mut App, now: Instant) {
    if let Some(closed) = app.store.close_reply() {
        info!("Reply {} finished ({} bytes)", closed.id, closed.text.len());
    }
    let generation = app.active_generation;
    app.end_generation();
    app.progress.finish_running();
    if let Some(generation) = generation {
        arm_progress_hide(app, generation, now);
    }
    follow(app, FollowEvent::GenerationDone, now);
    app.status_message = String::from("Ready");
}

fn close_stream(app: &mut App, outcome: StreamOutcome, now: Instant) {
    match outcome {
        StreamOutcome::Completed => {
            info!("Stream ended without a done record; finalizing");
            finish_generation(app, now);
        }
        StreamOutcome::Cancelled => {
            app.store.close_reply();
            app.end_generation();
            app.status_message = String::from("Stopped");
        }
        StreamOutcome::Failed(_) | StreamOutcome::ReaderUnavailable => {
            warn!("Reply failed: {outcome}");
            app.store.close_reply();
            app.end_generation();
            app.progress.fail_running(&outcome.to_string());
            app.status_message = format!("Reply failed: {outcome}");
        }
    }
}

/// Schedules the overlay auto-hide for `generation`, replacing any pending
/// hide. The delay counts from the latest section that finished.
fn arm_progress_hide(app: &mut App, generation: GenerationId, now: Instant) {
    app.timers
        .cancel_where(|task| matches!(task, DelayedTask::HideProgress { .. }));
    app.timers
        .schedule(now, app.progress_hide, DelayedTask::HideProgress { generation });
}

/// Drops the active generation without waiting for its stream. Returns
/// whether one was running.
fn abandon_generation(app: &mut App) -> bool {
    let was_generating = app.is_generating;
    app.store.close_reply();
    app.end_generation();
    was_generating
}

/// Clears everything tied to the current conversation and re-pins the view.
fn reset_conversation(app: &mut App, now: Instant) {
    app.timers.invalidate();
    app.store.clear();
    app.progress.clear();
    app.content_dirty = false;
    app.sync_questions();
    follow(app, FollowEvent::ConversationReset, now);
}

/// Feeds one event to the follow machine and applies its transition.
fn follow(app: &mut App, event: FollowEvent, now: Instant) {
    let transition = app.follow.apply(event, now, &app.scroll_config);
    app.follow = transition.state;
    if let Some(command) = transition.command {
        app.queue_scroll(command);
    }
    if transition.retry {
        for (attempt, delay) in app.scroll_config.force_retry_delays.iter().enumerate() {
            if !delay.is_zero() {
                app.timers
                    .schedule(now, *delay, DelayedTask::ForceScroll { attempt });
            }
        }
    }
}

fn run_task(app: &mut App, task: DelayedTask, now: Instant) {
    match task {
        DelayedTask::HideProgress { generation } => {
            if app.latest_generation() != Some(generation) {
                debug!("Dropping progress hide armed by {generation}: a newer turn started");
            } else if app.progress.any_running() {
                debug!("Keeping progress visible: a section is running");
            } else {
                app.progress.hide();
            }
        }
        DelayedTask::ForceScroll { attempt } => {
            debug!("Forced scroll attempt {attempt}");
            follow(app, FollowEvent::RetryForceScroll, now);
        }
    }
}
