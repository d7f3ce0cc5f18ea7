//! # Conversation Picker
//!
//! Overlay for switching between the server's conversations.
//! Opened with Ctrl+O, dismissed with Esc.
//!
//! Follows the persistent state + transient wrapper pattern:
//! - `ConversationPickerState` lives in `TuiState`
//! - `ConversationPicker` is created each frame with borrowed state

use chrono::{DateTime, Local, Utc};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph};

use crate::api::types::ConversationSummary;
use crate::tui::component::EventHandler;
use crate::tui::event::TuiEvent;

/// Events emitted by the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
    Open(String),
    CreateNew,
    Dismiss,
}

pub struct ConversationPickerState {
    pub selected: usize,
    pub list_state: ListState,
}

impl ConversationPickerState {
    /// Starts on the conversation at `current`, if it is listed.
    pub fn new(conversations: &[ConversationSummary], current: Option<&str>) -> Self {
        let selected = current
            .and_then(|id| conversations.iter().position(|c| c.id == id))
            .unwrap_or(0);
        let mut list_state = ListState::default();
        if !conversations.is_empty() {
            list_state.select(Some(selected));
        }
        Self {
            selected,
            list_state,
        }
    }

    fn select(&mut self, index: usize) {
        self.selected = index;
        self.list_state.select(Some(index));
    }
}

/// Binds the picker state to the list it navigates for one event.
pub struct PickerInput<'a> {
    pub state: &'a mut ConversationPickerState,
    pub conversations: &'a [ConversationSummary],
}

impl<'a> EventHandler for PickerInput<'a> {
    type Event = PickerEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        let count = self.conversations.len();
        match event {
            TuiEvent::Escape => Some(PickerEvent::Dismiss),
            TuiEvent::ScrollUp => {
                if count > 0 {
                    self.state.select(self.state.selected.saturating_sub(1));
                }
                None
            }
            TuiEvent::ScrollDown => {
                if count > 0 {
                    self.state.select((self.state.selected + 1).min(count - 1));
                }
                None
            }
            TuiEvent::Submit => self
                .conversations
                .get(self.state.selected)
                .map(|c| PickerEvent::Open(c.id.clone())),
            TuiEvent::InputChar('n') => Some(PickerEvent::CreateNew),
            _ => None,
        }
    }
}

/// Transient render wrapper for the picker overlay.
pub struct ConversationPicker<'a> {
    state: &'a mut ConversationPickerState,
    conversations: &'a [ConversationSummary],
    current: Option<&'a str>,
}

impl<'a> ConversationPicker<'a> {
    pub fn new(
        state: &'a mut ConversationPickerState,
        conversations: &'a [ConversationSummary],
        current: Option<&'a str>,
    ) -> Self {
        Self {
            state,
            conversations,
            current,
        }
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let overlay = centered_rect(80, 70, area);
        frame.render_widget(Clear, overlay);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Conversations ")
            .title_alignment(Alignment::Left)
            .title_bottom(Line::from(" n New  Enter Open  Esc Back ").centered())
            .padding(Padding::horizontal(1));

        if self.conversations.is_empty() {
            let empty = Paragraph::new("No conversations yet.")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(empty, overlay);
            return;
        }

        let inner_width = overlay.width.saturating_sub(4) as usize; // borders + padding
        let items: Vec<ListItem> = self
            .conversations
            .iter()
            .enumerate()
            .map(|(i, conversation)| {
                let date = conversation
                    .updated_at
                    .map(format_timestamp)
                    .unwrap_or_else(|| "      ".to_string());
                let marker = if self.current == Some(conversation.id.as_str()) {
                    "● "
                } else {
                    "  "
                };

                // Layout: "● Jan 15  <title>"
                let title_width = inner_width.saturating_sub(marker.chars().count() + date.len() + 2);
                let title = if conversation.title.trim().is_empty() {
                    "(untitled)"
                } else {
                    conversation.title.as_str()
                };

                let style = if i == self.state.selected {
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD | Modifier::REVERSED)
                } else {
                    Style::default().fg(Color::Gray)
                };

                ListItem::new(Line::from(vec![
                    Span::styled(marker, style),
                    Span::styled(date, style),
                    Span::styled("  ", style),
                    Span::styled(truncate_str(title, title_width), style),
                ]))
            })
            .collect();

        let list = List::new(items).block(block);
        frame.render_stateful_widget(list, overlay, &mut self.state.list_state);
    }
}

/// Format a timestamp as "Jan 15" style date in local time.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%b %d").to_string()
}

/// Truncate to `max_width` chars, adding "..." if needed.
fn truncate_str(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        ".".repeat(max_width)
    } else {
        let kept: String = s.chars().take(max_width - 3).collect();
        format!("{kept}...")
    }
}

/// Compute a centered rect using percentage of the outer rect.
fn centered_rect(percent_x: u16, percent_y: u16, outer: Rect) -> Rect {
    let [_, center_v, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(outer);
    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(center_v);
    center
}
