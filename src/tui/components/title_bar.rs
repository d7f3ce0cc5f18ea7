//! # TitleBar Component
//!
//! Top status line: conversation title, model, request flags, status, and the
//! "↓ latest" affordance shown when the transcript is not at the bottom.
//!
//! Purely presentational. All fields are props filled in by `draw_ui`.

use crate::tui::component::Component;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

const SPINNER: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

pub struct TitleBar {
    pub title: String,
    pub model_name: String,
    pub online: bool,
    pub deep_think: bool,
    pub status_message: String,
    pub is_generating: bool,
    pub spinner_frame: usize,
    /// Offer the jump-to-latest hint
    pub show_jump: bool,
}

impl TitleBar {
    fn flags(&self) -> String {
        let mut flags = Vec::new();
        if self.online {
            flags.push("online");
        }
        if self.deep_think {
            flags.push("deep think");
        }
        flags.join(", ")
    }

    pub fn text(&self) -> String {
        let mut text = format!("{} (model: {}", self.title, self.model_name);
        let flags = self.flags();
        if !flags.is_empty() {
            text.push_str(", ");
            text.push_str(&flags);
        }
        text.push(')');
        if !self.status_message.is_empty() {
            text.push_str(" | ");
            text.push_str(&self.status_message);
        }
        text
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        if self.is_generating {
            let glyph = SPINNER[self.spinner_frame % SPINNER.len()];
            spans.push(Span::styled(
                format!("{glyph} "),
                Style::default().fg(Color::Yellow),
            ));
        }
        spans.push(Span::raw(self.text()));
        if self.show_jump {
            spans.push(Span::styled(
                " | ↓ latest (End)",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        frame.render_widget(Line::from(spans), area);
    }
}
