//! # InputBox Component
//!
//! Prompt editor. The buffer and cursor are internal state; the request
//! flags shown in the title are props from the application state.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, BorderType, Paragraph, Wrap};

use crate::tui::component::{Component, EventHandler};
use crate::tui::event::TuiEvent;

/// Border (2) + padding (2) consumed horizontally by the bordered block
const HORIZONTAL_OVERHEAD: u16 = 4;
/// Top + bottom borders consumed vertically
const VERTICAL_OVERHEAD: u16 = 2;
/// Maximum visible content lines
const MAX_VISIBLE_LINES: u16 = 5;

/// High-level events emitted by the InputBox
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// User submitted the text (Enter pressed)
    Submit(String),
    ContentChanged,
}

pub struct InputBox {
    pub buffer: String,
    /// Cursor position as byte offset in buffer (0..=buffer.len())
    cursor: usize,
    /// A reply is streaming; Enter still submits (superseding it)
    pub is_generating: bool,
}

impl Default for InputBox {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBox {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
            is_generating: false,
        }
    }

    /// Required height for the current buffer, clamped to the visible maximum.
    pub fn calculate_height(&self, content_width: u16) -> u16 {
        wrap_line_count(&self.buffer, content_width.saturating_sub(HORIZONTAL_OVERHEAD))
            .min(MAX_VISIBLE_LINES)
            + VERTICAL_OVERHEAD
    }

    fn title(&self) -> &'static str {
        if self.is_generating {
            "Ask (Esc stops the reply)"
        } else {
            "Ask"
        }
    }
}

fn wrap_options(width: u16) -> textwrap::Options<'static> {
    textwrap::Options::new(width as usize)
        .break_words(true)
        .word_separator(textwrap::WordSeparator::AsciiSpace)
}

/// Wrapped line count, counting a trailing newline as its own line.
fn wrap_line_count(text: &str, width: u16) -> u16 {
    if width == 0 || text.is_empty() {
        return 1;
    }
    let lines = textwrap::wrap(text, wrap_options(width));
    let mut count = (lines.len() as u16).max(1);
    if text.ends_with('\n') && !lines.last().is_some_and(|l| l.is_empty()) {
        count += 1;
    }
    count
}

fn prev_char_boundary(text: &str, pos: usize) -> usize {
    text[..pos]
        .char_indices()
        .next_back()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn next_char_boundary(text: &str, pos: usize) -> usize {
    text[pos..]
        .char_indices()
        .nth(1)
        .map(|(i, _)| pos + i)
        .unwrap_or(text.len())
}

impl Component for InputBox {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .title(self.title());
        let inner = block.inner(area);

        // Keep the cursor's line in view once the prompt outgrows the box
        let width = inner.width.saturating_sub(2);
        let before_cursor = &self.buffer[..self.cursor];
        let cursor_line = wrap_line_count(before_cursor, width).saturating_sub(1);
        let (cursor_col, scroll) = if width == 0 {
            (0, 0)
        } else {
            let last = textwrap::wrap(before_cursor, wrap_options(width))
                .last()
                .map(|line| unicode_width::UnicodeWidthStr::width(line.as_ref()))
                .unwrap_or(0);
            let col = if before_cursor.ends_with('\n') { 0 } else { last as u16 };
            (col, cursor_line.saturating_sub(inner.height.saturating_sub(1)))
        };

        let input = Paragraph::new(self.buffer.as_str())
            .block(block.padding(ratatui::widgets::Padding::horizontal(1)))
            .style(Style::default().fg(Color::Green))
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0));
        frame.render_widget(input, area);

        let x = inner.x + 1 + cursor_col.min(width);
        let y = inner.y + cursor_line.saturating_sub(scroll).min(inner.height.saturating_sub(1));
        frame.set_cursor_position((x, y));
    }
}

impl EventHandler for InputBox {
    type Event = InputEvent;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        match event {
            TuiEvent::InputChar(c) => {
                self.buffer.insert(self.cursor, *c);
                self.cursor += c.len_utf8();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Paste(text) => {
                self.buffer.insert_str(self.cursor, text);
                self.cursor += text.len();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Backspace => {
                if self.cursor == 0 {
                    return None;
                }
                let prev = prev_char_boundary(&self.buffer, self.cursor);
                self.buffer.drain(prev..self.cursor);
                self.cursor = prev;
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::CursorLeft => (self.cursor > 0).then(|| {
                self.cursor = prev_char_boundary(&self.buffer, self.cursor);
                InputEvent::ContentChanged
            }),
            TuiEvent::CursorRight => (self.cursor < self.buffer.len()).then(|| {
                self.cursor = next_char_boundary(&self.buffer, self.cursor);
                InputEvent::ContentChanged
            }),
            TuiEvent::Submit => {
                if self.buffer.trim().is_empty() {
                    return None;
                }
                let text = std::mem::take(&mut self.buffer);
                self.cursor = 0;
                Some(InputEvent::Submit(text))
            }
            _ => None,
        }
    }
}
