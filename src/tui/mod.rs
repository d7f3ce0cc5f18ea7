//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! translates keyboard and mouse events into `core::Action` values, and runs
//! the I/O each `Effect` asks for.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Redraw Strategy
//!
//! - **Animating** (a reply is streaming): draws every ~80ms for the spinner
//!   and the pulsing border.
//! - **Idle**: sleeps up to 500ms, or until the next delayed task is due, and
//!   only redraws on events.
//!
//! ## Scroll Handshake
//!
//! After each draw the message list reports its geometry
//! (`Action::ViewportMeasured`). If the controller answers with a scroll
//! command, the list executes it, reports the new offset as an observation,
//! and the frame is drawn again.
//!
//! A `SteadyBlock` cursor style is used instead of a blinking cursor because
//! ratatui's `set_cursor_position` resets the terminal's blink timer on every
//! `draw()` call.

mod component;
mod components;
mod event;
pub mod tasks;
mod ui;

use log::{debug, info};
use std::io::stdout;
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;

use crate::api::client::{ChatBackend, WikiClient};
use crate::core::action::{Action, Effect, update};
use crate::core::config::ResolvedConfig;
use crate::core::scroll::FollowEvent;
use crate::core::state::App;
use crate::stream::StreamSlot;
use crate::tui::component::EventHandler;
use crate::tui::components::{
    ConversationPickerState, InputBox, InputEvent, MessageListState, PickerEvent, PickerInput,
};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};
use crate::tui::tasks::BackendScope;

const ANIMATION_POLL: Duration = Duration::from_millis(80);
const IDLE_POLL: Duration = Duration::from_millis(500);

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub message_list: MessageListState,
    pub input_box: InputBox,
    /// Conversation picker overlay (None = hidden)
    pub picker: Option<ConversationPickerState>,
    pub pulse_value: f32,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            message_list: MessageListState::new(),
            input_box: InputBox::new(),
            picker: None,
            pulse_value: 0.0,
        }
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        // The Kitty keyboard protocol lets Shift+Enter through; terminals
        // without it ignore the request
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, keyboard enhancement)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste,
            Hide
        );
    }
}

/// Runs effects on behalf of the controller. Owns the only handle to the
/// open chat stream.
struct Runtime {
    backend: Arc<dyn ChatBackend>,
    scope: BackendScope,
    tx: mpsc::Sender<Action>,
    slot: StreamSlot,
}

impl Runtime {
    /// Returns true when the loop should exit.
    fn run_effect(&mut self, effect: Effect) -> bool {
        match effect {
            Effect::None => {}
            Effect::Quit => return true,
            Effect::StartChat(job) => {
                let cancel = self.slot.begin();
                tasks::spawn_chat(
                    self.backend.clone(),
                    self.scope.clone(),
                    job,
                    cancel,
                    self.tx.clone(),
                );
            }
            Effect::CancelStream => {
                if self.slot.cancel() {
                    info!("Cancelled the open chat stream");
                }
            }
            Effect::LoadHistory(conversation_id) => {
                self.slot.cancel();
                tasks::spawn_history(self.backend.clone(), conversation_id, self.tx.clone());
            }
            Effect::RefreshConversations => {
                tasks::spawn_conversations(self.backend.clone(), self.scope.clone(), self.tx.clone());
            }
        }
        false
    }

    fn dispatch(&mut self, app: &mut App, action: Action) -> bool {
        let effect = update(app, action, Instant::now());
        self.run_effect(effect)
    }
}

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let client = WikiClient::new(&config.base_url, config.api_token.clone())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    info!("Talking to {}", client.base_url());

    let mut app = App::from_config(&config);
    let mut tui = TuiState::new();

    // Channel for actions from background tasks
    let (tx, rx) = mpsc::channel();
    let mut runtime = Runtime {
        backend: Arc::new(client),
        scope: BackendScope::from_config(&config),
        tx,
        slot: StreamSlot::new(),
    };

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    let mut should_quit = runtime.run_effect(Effect::RefreshConversations);
    if let Some(id) = config.initial_conversation.clone() {
        should_quit |= runtime.dispatch(&mut app, Action::SelectConversation(id));
    }

    let start_time = Instant::now();
    let mut needs_redraw = true; // Force first frame

    while !should_quit {
        let animating = app.is_generating || app.progress.any_running();
        if animating {
            needs_redraw = true;
        }

        if needs_redraw {
            let elapsed = start_time.elapsed().as_secs_f32();
            tui.pulse_value = (elapsed * 5.0).sin() * 0.5 + 0.5;
            let spinner_frame = (elapsed * 12.0) as usize;
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui, spinner_frame))?;

            let measured = tui.message_list.viewport();
            should_quit |= runtime.dispatch(&mut app, Action::ViewportMeasured(measured));
            if let Some(command) = app.take_scroll_command() {
                let observed = tui.message_list.execute(command);
                should_quit |= runtime.dispatch(&mut app, Action::Scroll(FollowEvent::Observed(observed)));
                terminal.draw(|f| ui::draw_ui(f, &app, &mut tui, spinner_frame))?;
            }
            needs_redraw = false;
        }

        let mut timeout = if animating { ANIMATION_POLL } else { IDLE_POLL };
        if let Some(deadline) = app.timers.next_deadline() {
            timeout = timeout.min(deadline.saturating_duration_since(Instant::now()));
        }
        let first_event = poll_event_timeout(timeout);

        // Process first event + drain ALL pending events before next draw
        if first_event.is_some() {
            needs_redraw = true;
        }
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            if handle_event(event, &mut app, &mut tui, &mut runtime) {
                should_quit = true;
                break;
            }
        }

        if app
            .timers
            .next_deadline()
            .is_some_and(|deadline| deadline <= Instant::now())
        {
            needs_redraw = true;
            should_quit |= runtime.dispatch(&mut app, Action::Tick);
        }

        // Handle background task actions (stream records, history, lists)
        while let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {:?}", action);
            if runtime.dispatch(&mut app, action) {
                should_quit = true;
                break;
            }
        }
    }

    runtime.slot.cancel();
    ratatui::restore();
    Ok(())
}

/// Routes one terminal event. Returns true when the loop should exit.
fn handle_event(event: TuiEvent, app: &mut App, tui: &mut TuiState, runtime: &mut Runtime) -> bool {
    match event {
        // Resize just needs a redraw (already flagged)
        TuiEvent::Resize => return false,
        // ForceQuit (Ctrl+C) always quits, overlay or not
        TuiEvent::ForceQuit => return runtime.dispatch(app, Action::Quit),
        TuiEvent::OpenPicker => {
            tui.picker = Some(ConversationPickerState::new(
                &app.conversations,
                app.conversation_id.as_deref(),
            ));
            return runtime.run_effect(Effect::RefreshConversations);
        }
        _ => {}
    }

    // When the picker is open, route all events to it
    if let Some(picker) = tui.picker.as_mut() {
        let mut input = PickerInput {
            state: picker,
            conversations: &app.conversations,
        };
        return match input.handle_event(&event) {
            Some(PickerEvent::Open(id)) => {
                tui.picker = None;
                runtime.dispatch(app, Action::SelectConversation(id))
            }
            Some(PickerEvent::CreateNew) => {
                tui.picker = None;
                runtime.dispatch(app, Action::NewConversation)
            }
            Some(PickerEvent::Dismiss) => {
                tui.picker = None;
                false
            }
            None => false,
        };
    }

    match event {
        TuiEvent::Escape if app.is_generating => runtime.dispatch(app, Action::Stop),
        TuiEvent::Escape => false,
        TuiEvent::JumpToLatest => runtime.dispatch(app, Action::JumpToLatest),
        TuiEvent::PrevQuestion => runtime.dispatch(app, Action::PrevQuestion),
        TuiEvent::NextQuestion => runtime.dispatch(app, Action::NextQuestion),
        TuiEvent::ToggleOnline => runtime.dispatch(app, Action::ToggleOnline),
        TuiEvent::ToggleDeepThink => runtime.dispatch(app, Action::ToggleDeepThink),
        TuiEvent::MouseDown => runtime.dispatch(app, Action::Scroll(FollowEvent::PointerDown)),
        TuiEvent::MouseUp => {
            let viewport = tui.message_list.viewport();
            runtime.dispatch(app, Action::Scroll(FollowEvent::PointerUp(viewport)))
        }
        TuiEvent::ScrollUp
        | TuiEvent::ScrollDown
        | TuiEvent::ScrollPageUp
        | TuiEvent::ScrollPageDown
        | TuiEvent::Wheel(_) => {
            let Some(scroll) = tui.message_list.handle_event(&event) else {
                return false;
            };
            let wheel = FollowEvent::Wheel {
                delta: scroll.delta,
                viewport: scroll.before,
            };
            runtime.dispatch(app, Action::Scroll(wheel))
                | runtime.dispatch(app, Action::Scroll(FollowEvent::Observed(scroll.after)))
        }
        // Leave the prompt in the box; the controller only reports the hold.
        TuiEvent::Submit if app.awaiting_conversation() => {
            runtime.dispatch(app, Action::Submit(tui.input_box.buffer.clone()))
        }
        _ => match tui.input_box.handle_event(&event) {
            Some(InputEvent::Submit(text)) => runtime.dispatch(app, Action::Submit(text)),
            Some(InputEvent::ContentChanged) | None => false,
        },
    }
}
