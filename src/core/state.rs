//! # Application State
//!
//! Core conversation state for wikichat. This module contains domain logic
//! only, no TUI-specific types. Presentation state lives in the `tui` module.
//!
//! ```text
//! App
//! ├── store: MessageStore              // turns of the open conversation
//! ├── progress: ProgressBoard          // retrieval/stage overlay
//! ├── follow: FollowState              // scroll-follow machine
//! ├── nav: QuestionNav                 // prev/next question pointer
//! ├── timers: TimerQueue<DelayedTask>  // auto-hide + forced scroll retries
//! ├── viewport: Viewport               // last geometry reported by the view
//! ├── pending_scroll: Option<ScrollCommand>
//! ├── active_generation: Option<GenerationId>
//! ├── conversation_id / conversation_title
//! ├── conversations: Vec<ConversationSummary>
//! └── settings: ChatSettings           // model, provider, online, deep think
//! ```
//!
//! State changes only happen through `update(app, action, now)` in action.rs.

use std::fmt;
use std::time::Duration;

use crate::api::types::ConversationSummary;
use crate::core::config::ResolvedConfig;
use crate::core::messages::MessageStore;
use crate::core::navigation::QuestionNav;
use crate::core::progress::ProgressBoard;
use crate::core::scroll::{FollowState, ScrollCommand, ScrollConfig, Viewport};
use crate::core::timers::{DelayedTask, TimerQueue};

/// Identity of one send. Events tagged with anything but the active
/// generation are stale and get dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenerationId(u64);

impl GenerationId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Per-request chat options sent with every prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSettings {
    pub model_name: String,
    pub model_provider: String,
    pub online: bool,
    pub deep_think: bool,
}

pub struct App {
    pub store: MessageStore,
    pub progress: ProgressBoard,
    pub follow: FollowState,
    pub nav: QuestionNav,
    pub timers: TimerQueue<DelayedTask>,
    pub scroll_config: ScrollConfig,
    /// Delay before the progress overlay hides itself.
    pub progress_hide: Duration,
    pub viewport: Viewport,
    /// Streamed content arrived since the last viewport measurement.
    pub content_dirty: bool,
    pending_scroll: Option<ScrollCommand>,
    pub is_generating: bool,
    pub active_generation: Option<GenerationId>,
    next_generation: u64,
    pub conversation_id: Option<String>,
    /// A history fetch for `conversation_id` is outstanding.
    pub loading_history: bool,
    pub conversation_title: Option<String>,
    pub conversations: Vec<ConversationSummary>,
    pub status_message: String,
    pub settings: ChatSettings,
}

impl App {
    pub fn new(settings: ChatSettings, scroll_config: ScrollConfig, progress_hide: Duration) -> Self {
        Self {
            store: MessageStore::new(),
            progress: ProgressBoard::new(),
            follow: FollowState::default(),
            nav: QuestionNav::new(),
            timers: TimerQueue::new(),
            scroll_config,
            progress_hide,
            viewport: Viewport::default(),
            content_dirty: false,
            pending_scroll: None,
            is_generating: false,
            active_generation: None,
            next_generation: 0,
            conversation_id: None,
            loading_history: false,
            conversation_title: None,
            conversations: Vec::new(),
            status_message: String::from("Ask the wiki anything."),
            settings,
        }
    }

    pub fn from_config(config: &ResolvedConfig) -> Self {
        let settings = ChatSettings {
            model_name: config.model_name.clone(),
            model_provider: config.model_provider.clone(),
            online: config.online,
            deep_think: config.deep_think,
        };
        Self::new(settings, config.scroll.clone(), config.progress_hide)
    }

    /// Starts a new generation and makes it the only accepted one.
    pub fn begin_generation(&mut self) -> GenerationId {
        self.next_generation += 1;
        let id = GenerationId(self.next_generation);
        self.active_generation = Some(id);
        self.is_generating = true;
        id
    }

    /// Ends the active generation. Later events tagged with it are dropped.
    pub fn end_generation(&mut self) {
        self.active_generation = None;
        self.is_generating = false;
    }

    pub fn is_active(&self, generation: GenerationId) -> bool {
        self.active_generation == Some(generation)
    }

    /// The most recently started generation, whether or not it still runs.
    pub fn latest_generation(&self) -> Option<GenerationId> {
        (self.next_generation > 0).then_some(GenerationId(self.next_generation))
    }

    /// A send into a new conversation is running and the backend has not
    /// yet reported the conversation it created.
    pub fn awaiting_conversation(&self) -> bool {
        self.is_generating && self.conversation_id.is_none()
    }

    pub fn queue_scroll(&mut self, command: ScrollCommand) {
        self.pending_scroll = Some(command);
    }

    pub fn pending_scroll(&self) -> Option<ScrollCommand> {
        self.pending_scroll
    }

    /// Hands the queued scroll to the view. The view reports the resulting
    /// offset back as an observed scroll.
    pub fn take_scroll_command(&mut self) -> Option<ScrollCommand> {
        self.pending_scroll.take()
    }

    /// Recomputes the question positions after the turn list changed.
    pub fn sync_questions(&mut self) {
        self.nav.sync(self.store.turns());
    }

    pub fn title(&self) -> &str {
        self.conversation_title.as_deref().unwrap_or("New conversation")
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_app;

    #[test]
    fn test_app_new_defaults() {
        let app = test_app();
        assert_eq!(app.status_message, "Ask the wiki anything.");
        assert!(!app.is_generating);
        assert_eq!(app.settings.model_name, "test-model");
        assert_eq!(app.title(), "New conversation");
        assert!(app.follow.is_following());
    }

    #[test]
    fn test_generations_are_unique() {
        let mut app = test_app();
        let first = app.begin_generation();
        let second = app.begin_generation();
        assert_ne!(first, second);
        assert!(!app.is_active(first));
        assert!(app.is_active(second));

        app.end_generation();
        assert!(!app.is_active(second));
        assert!(!app.is_generating);
        assert_eq!(app.latest_generation(), Some(second));
    }

    #[test]
    fn test_awaiting_conversation_until_id_is_known() {
        let mut app = test_app();
        assert_eq!(app.latest_generation(), None);
        assert!(!app.awaiting_conversation());

        app.begin_generation();
        assert!(app.awaiting_conversation());
        app.conversation_id = Some("c1".to_string());
        assert!(!app.awaiting_conversation());
    }

    #[test]
    fn test_scroll_command_is_taken_once() {
        let mut app = test_app();
        app.queue_scroll(crate::core::scroll::ScrollCommand::ToBottom);
        assert!(app.take_scroll_command().is_some());
        assert!(app.take_scroll_command().is_none());
    }
}
