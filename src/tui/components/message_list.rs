//! # MessageList Component
//!
//! Scrollable transcript of the open conversation.
//!
//! The list never decides on its own to follow new content. Scrolling is
//! owned by the controller's follow machine: after each draw the list
//! reports its geometry, the controller may queue a `ScrollCommand`, and the
//! list executes it and reports the resulting offset back as an observation.
//!
//! Geometry crosses that boundary in virtual pixels (`PX_PER_ROW` per
//! terminal row) so the follow tolerances keep their sub-row meaning.

use ratatui::Frame;
use ratatui::layout::{Position, Rect, Size};
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::messages::{Turn, TurnId};
use crate::core::scroll::{ScrollCommand, Viewport};
use crate::tui::component::{Component, EventHandler};
use crate::tui::components::message::Message;
use crate::tui::event::TuiEvent;

/// Virtual pixels per terminal row.
pub const PX_PER_ROW: u32 = 16;
/// Rows moved per wheel notch.
const WHEEL_ROWS: i32 = 3;

/// A user-driven scroll of the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserScroll {
    /// Direction of travel, positive towards the bottom.
    pub delta: i32,
    /// Geometry before the scroll was applied.
    pub before: Viewport,
    /// Geometry after the scroll was applied.
    pub after: Viewport,
}

/// Persistent presentation state for the transcript, owned by `TuiState`.
#[derive(Default)]
pub struct MessageListState {
    pub scroll_state: ScrollViewState,
    pub layout: LayoutCache,
    pub viewport_height: u16,
}

impl MessageListState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset_rows(&self) -> u16 {
        self.scroll_state.offset().y
    }

    pub fn max_scroll(&self) -> u16 {
        self.layout.total_height().saturating_sub(self.viewport_height)
    }

    /// Current geometry in virtual pixels.
    pub fn viewport(&self) -> Viewport {
        Viewport::new(
            u32::from(self.offset_rows()) * PX_PER_ROW,
            u32::from(self.layout.total_height()) * PX_PER_ROW,
            u32::from(self.viewport_height) * PX_PER_ROW,
        )
    }

    fn set_offset_rows(&mut self, y: u16) {
        let y = y.min(self.max_scroll());
        self.scroll_state.set_offset(Position { x: 0, y });
    }

    /// Applies a controller scroll and returns the resulting geometry.
    pub fn execute(&mut self, command: ScrollCommand) -> Viewport {
        match command {
            ScrollCommand::ToBottom => self.set_offset_rows(self.max_scroll()),
            ScrollCommand::TurnToTop(position) => {
                let top = self.layout.top_of(position);
                self.set_offset_rows(top);
            }
        }
        self.viewport()
    }

    /// Scrolls by `rows` (negative is up) on behalf of the user.
    pub fn scroll_by(&mut self, rows: i32) -> UserScroll {
        let before = self.viewport();
        let target = (i32::from(self.offset_rows()) + rows).max(0);
        self.set_offset_rows(u16::try_from(target).unwrap_or(u16::MAX));
        UserScroll {
            delta: rows.signum(),
            before,
            after: self.viewport(),
        }
    }

    /// Keeps the offset inside the content after the content shrank.
    pub fn clamp_scroll(&mut self) {
        let max_scroll = self.max_scroll();
        if self.offset_rows() > max_scroll {
            self.set_offset_rows(max_scroll);
        }
    }
}

impl EventHandler for MessageListState {
    type Event = UserScroll;

    fn handle_event(&mut self, event: &TuiEvent) -> Option<Self::Event> {
        let page = i32::from(self.viewport_height.saturating_sub(1).max(1));
        let rows = match event {
            TuiEvent::ScrollUp => -1,
            TuiEvent::ScrollDown => 1,
            TuiEvent::ScrollPageUp => -page,
            TuiEvent::ScrollPageDown => page,
            TuiEvent::Wheel(notches) => notches * WHEEL_ROWS,
            _ => return None,
        };
        Some(self.scroll_by(rows))
    }
}

/// Transient render wrapper, created each frame with borrowed state.
pub struct MessageList<'a> {
    pub state: &'a mut MessageListState,
    pub turns: &'a [Turn],
    /// Reply currently being streamed, if any
    pub open_reply: Option<&'a TurnId>,
    /// Index of the question under the navigation pointer
    pub current_question: Option<usize>,
    pub pulse_value: f32,
}

impl<'a> MessageList<'a> {
    pub fn new(
        state: &'a mut MessageListState,
        turns: &'a [Turn],
        open_reply: Option<&'a TurnId>,
        current_question: Option<usize>,
        pulse_value: f32,
    ) -> Self {
        Self {
            state,
            turns,
            open_reply,
            current_question,
            pulse_value,
        }
    }
}

impl<'a> Component for MessageList<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let content_width = area.width.saturating_sub(1); // -1 for scrollbar safe area

        // 1. Update layout cache
        let layout = &mut self.state.layout;
        let reusable = layout.reusable_count(self.turns, content_width, self.open_reply);
        layout.heights.truncate(reusable);
        layout.ids.truncate(reusable);
        for turn in self.turns.iter().skip(reusable) {
            layout.heights.push(Message::calculate_height(turn, content_width));
            layout.ids.push(turn.id.clone());
        }
        layout.content_width = content_width;
        layout.rebuild_prefix_heights();

        // 2. Clamp against the new content height
        self.state.viewport_height = area.height;
        self.state.clamp_scroll();

        let scroll_offset = self.state.offset_rows();
        let visible_range = self.state.layout.visible_range(scroll_offset, area.height);
        let total_height = self.state.layout.total_height();

        // 3. Render visible turns into a ScrollView
        let mut scroll_view = ScrollView::new(Size::new(content_width, total_height))
            .vertical_scrollbar_visibility(ScrollbarVisibility::Always)
            .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

        let mut y_offset = self.state.layout.top_of(visible_range.start);
        for i in visible_range {
            let turn = &self.turns[i];
            let height = self.state.layout.heights[i];
            let pulse_intensity = if self.open_reply == Some(&turn.id) {
                self.pulse_value
            } else {
                0.0
            };
            let message = Message::new(turn, self.current_question == Some(i), pulse_intensity);
            scroll_view.render_widget(message, Rect::new(0, y_offset, content_width, height));
            y_offset = y_offset.saturating_add(height);
        }

        frame.render_stateful_widget(scroll_view, area, &mut self.state.scroll_state);
    }
}

/// Cached per-turn heights for the current width.
#[derive(Default)]
pub struct LayoutCache {
    pub heights: Vec<u16>,
    /// Running bottom edge of each turn (`prefix_heights[i]` = end of turn `i`)
    pub prefix_heights: Vec<u16>,
    ids: Vec<TurnId>,
    content_width: u16,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of leading cached heights still valid for `turns`.
    ///
    /// Heights are keyed by turn id. The reply being streamed and a trailing
    /// assistant turn (which may have settled between frames) are always
    /// re-measured.
    pub fn reusable_count(
        &self,
        turns: &[Turn],
        content_width: u16,
        open_reply: Option<&TurnId>,
    ) -> usize {
        if self.content_width != content_width || self.heights.is_empty() {
            return 0;
        }

        let mut reusable = self
            .ids
            .iter()
            .zip(turns)
            .take_while(|(cached, turn)| **cached == turn.id)
            .count()
            .min(self.heights.len());

        if let Some(open) = open_reply
            && let Some(position) = turns.iter().position(|turn| &turn.id == open)
        {
            reusable = reusable.min(position);
        }

        let last_is_volatile = turns
            .last()
            .is_some_and(|last| last.role == crate::core::messages::Role::Assistant);
        if last_is_volatile {
            reusable = reusable.min(turns.len() - 1);
        }

        reusable
    }

    pub fn rebuild_prefix_heights(&mut self) {
        self.prefix_heights = self
            .heights
            .iter()
            .scan(0u16, |acc, &h| {
                *acc = acc.saturating_add(h);
                Some(*acc)
            })
            .collect();
    }

    pub fn total_height(&self) -> u16 {
        self.prefix_heights.last().copied().unwrap_or(0)
    }

    /// Top edge of turn `index`. Past the end this is the total height.
    pub fn top_of(&self, index: usize) -> u16 {
        if index == 0 {
            return 0;
        }
        self.prefix_heights
            .get(index - 1)
            .copied()
            .unwrap_or_else(|| self.total_height())
    }

    /// Indices of turns intersecting the viewport, with half a viewport of
    /// buffer on either side.
    pub fn visible_range(&self, scroll_offset: u16, viewport_height: u16) -> std::ops::Range<usize> {
        let buffer = viewport_height / 2;
        let buffered_start = scroll_offset.saturating_sub(buffer);
        let buffered_end = scroll_offset
            .saturating_add(viewport_height)
            .saturating_add(buffer);

        let start = self
            .prefix_heights
            .partition_point(|&end| end <= buffered_start);
        let end = self
            .prefix_heights
            .partition_point(|&end| end < buffered_end)
            .saturating_add(1)
            .min(self.prefix_heights.len());

        start..end.max(start)
    }
}
