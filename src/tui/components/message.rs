use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Widget, Wrap};

use crate::core::messages::{Body, Role, Turn};

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders (1 left + 1 right) and padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
const VERTICAL_OVERHEAD: u16 = 2;

/// Placeholder shown while a reply has produced nothing yet.
pub const PENDING_PLACEHOLDER: &str = "…";

/// Pulse intensity threshold above which the border transitions from normal to BOLD.
const PULSE_BOLD_THRESHOLD: f32 = 0.6;
/// Pulse intensity threshold above which the border transitions from DIM to normal.
const PULSE_NORMAL_THRESHOLD: f32 = 0.2;

/// Renders one conversation turn: a bordered block holding the reasoning
/// trace (if any) above the answer text.
///
/// Created fresh each frame by `MessageList`. Heights are predicted with
/// `textwrap` using the same options ratatui's `Paragraph` wraps with, so the
/// list can lay out the scroll canvas without rendering every turn.
#[derive(Clone, Copy)]
pub struct Message<'a> {
    pub turn: &'a Turn,
    /// The question the navigation pointer sits on
    pub is_current_question: bool,
    /// Current pulse intensity (0.0 to 1.0) for the reply being streamed
    pub pulse_intensity: f32,
}

impl<'a> Message<'a> {
    pub fn new(turn: &'a Turn, is_current_question: bool, pulse_intensity: f32) -> Self {
        Self {
            turn,
            is_current_question,
            pulse_intensity,
        }
    }

    /// Predicts the rendered height of `turn` at `width` columns.
    pub fn calculate_height(turn: &Turn, width: u16) -> u16 {
        let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if content_width == 0 {
            // Terminal too narrow for borders + padding
            return 1;
        }

        let thinking = turn.thinking.trim();
        let thinking_lines = if thinking.is_empty() {
            0
        } else {
            wrapped_lines(thinking, content_width)
        };
        let body_lines = wrapped_lines(body_text(turn), content_width).max(1);

        thinking_lines + body_lines + VERTICAL_OVERHEAD
    }
}

fn body_text(turn: &Turn) -> &str {
    match &turn.body {
        Body::Pending => PENDING_PLACEHOLDER,
        Body::Text(text) => text.trim(),
    }
}

fn wrapped_lines(text: &str, width: u16) -> u16 {
    if text.is_empty() {
        return 0;
    }
    let options = textwrap::Options::new(width as usize)
        .break_words(true)
        .word_separator(textwrap::WordSeparator::AsciiSpace);
    textwrap::wrap(text, options).len() as u16
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "wiki",
    }
}

fn role_style(role: Role) -> Style {
    match role {
        Role::User => Style::default().fg(Color::Green),
        Role::Assistant => Style::default().fg(Color::Blue),
    }
}

fn thinking_style() -> Style {
    Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::ITALIC)
}

impl<'a> Widget for Message<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = role_style(self.turn.role);

        let mut border_style = if self.is_current_question {
            Style::default().fg(Color::Cyan)
        } else {
            style.add_modifier(Modifier::DIM)
        };

        // Three-phase breathing: DIM → normal → BOLD
        if self.pulse_intensity > PULSE_BOLD_THRESHOLD {
            border_style = border_style
                .remove_modifier(Modifier::DIM)
                .add_modifier(Modifier::BOLD);
        } else if self.pulse_intensity > PULSE_NORMAL_THRESHOLD {
            border_style = border_style.remove_modifier(Modifier::DIM);
        }

        let block = Block::bordered()
            .title(role_label(self.turn.role))
            .border_type(BorderType::Rounded)
            .border_style(border_style)
            .title_style(border_style)
            .padding(Padding::horizontal(CONTENT_PAD_H));

        let inner = block.inner(area);
        block.render(area, buf);

        let mut body_area = inner;
        let thinking = self.turn.thinking.trim();
        if !thinking.is_empty() {
            let thinking_height = wrapped_lines(thinking, inner.width).min(inner.height);
            let thinking_area = Rect { height: thinking_height, ..inner };
            Paragraph::new(thinking)
                .style(thinking_style())
                .wrap(Wrap { trim: true })
                .render(thinking_area, buf);
            body_area.y += thinking_height;
            body_area.height = body_area.height.saturating_sub(thinking_height);
        }

        let body_style = if self.turn.body.is_pending() {
            thinking_style()
        } else {
            style
        };
        Paragraph::new(body_text(self.turn))
            .style(body_style)
            .wrap(Wrap { trim: true })
            .render(body_area, buf);
    }
}
