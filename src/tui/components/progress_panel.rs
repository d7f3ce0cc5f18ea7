//! # ProgressPanel Component
//!
//! Overlay above the input showing backend stages (retrieval and friends)
//! while a reply is generating. Stateless; it renders the controller's
//! `ProgressBoard` as given.

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Paragraph};

use crate::core::progress::{ProgressBoard, SectionIcon, SectionStatus};
use crate::tui::component::Component;

/// Rows the panel may take at most, borders included.
pub const MAX_PANEL_HEIGHT: u16 = 8;
const VERTICAL_OVERHEAD: u16 = 2;

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

pub struct ProgressPanel<'a> {
    pub board: &'a ProgressBoard,
    pub spinner_frame: usize,
}

impl<'a> ProgressPanel<'a> {
    pub fn new(board: &'a ProgressBoard, spinner_frame: usize) -> Self {
        Self {
            board,
            spinner_frame,
        }
    }

    /// Height the panel wants, or 0 when there is nothing to show.
    pub fn desired_height(board: &ProgressBoard) -> u16 {
        if !board.is_visible() || board.is_empty() {
            return 0;
        }
        let rows: usize = board.sections().map(|(_, section)| 1 + section.logs.len()).sum();
        (rows as u16)
            .saturating_add(VERTICAL_OVERHEAD)
            .min(MAX_PANEL_HEIGHT)
    }

    fn lines(&self) -> Vec<Line<'a>> {
        let mut lines = Vec::new();
        for (name, section) in self.board.sections() {
            let (marker, style) = match section.status {
                SectionStatus::Idle => ("○", Style::default().fg(Color::DarkGray)),
                SectionStatus::Running => (
                    SPINNER[self.spinner_frame % SPINNER.len()],
                    Style::default().fg(Color::Yellow),
                ),
                SectionStatus::Done => ("✓", Style::default().fg(Color::Green)),
                SectionStatus::Error => ("✗", Style::default().fg(Color::Red)),
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{marker} "), style),
                Span::styled(name, style.add_modifier(Modifier::BOLD)),
            ]));
            for (log, icon) in section.logs.iter().zip(&section.icons) {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {} ", icon_glyph(*icon)), style),
                    Span::styled(log.as_str(), Style::default().fg(Color::Gray)),
                ]));
            }
        }
        lines
    }
}

fn icon_glyph(icon: SectionIcon) -> &'static str {
    match icon {
        SectionIcon::Start => "▸",
        SectionIcon::Finish => "✓",
        SectionIcon::Note => "·",
        SectionIcon::Failure => "✗",
    }
}

impl<'a> Component for ProgressPanel<'a> {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        if area.height == 0 {
            return;
        }
        let lines = self.lines();
        // Keep the newest lines in view when the panel overflows
        let inner_rows = area.height.saturating_sub(VERTICAL_OVERHEAD) as usize;
        let skip = lines.len().saturating_sub(inner_rows) as u16;

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray))
            .title("progress");
        let paragraph = Paragraph::new(lines).block(block).scroll((skip, 0));
        frame.render_widget(paragraph, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn render_text(board: &ProgressBoard, width: u16, height: u16) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                ProgressPanel::new(board, 0).render(f, f.area());
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_hidden_board_takes_no_space() {
        let mut board = ProgressBoard::new();
        assert_eq!(ProgressPanel::desired_height(&board), 0);

        board.start("retrieve", "searching".to_string());
        board.hide();
        assert_eq!(ProgressPanel::desired_height(&board), 0);
    }

    #[test]
    fn test_height_counts_headers_and_logs() {
        let mut board = ProgressBoard::new();
        board.start("retrieve", "searching".to_string());
        board.finish("retrieve", "3 documents".to_string());
        // header + 2 logs + borders
        assert_eq!(ProgressPanel::desired_height(&board), 5);
    }

    #[test]
    fn test_height_is_capped() {
        let mut board = ProgressBoard::new();
        for i in 0..20 {
            board.note("misc", format!("line {i}"));
        }
        assert_eq!(ProgressPanel::desired_height(&board), MAX_PANEL_HEIGHT);
    }

    #[test]
    fn test_render_shows_sections_and_logs() {
        let mut board = ProgressBoard::new();
        board.start("retrieve", "searching the wiki".to_string());
        let height = ProgressPanel::desired_height(&board);
        let text = render_text(&board, 40, height);
        assert!(text.contains("retrieve"));
        assert!(text.contains("searching the wiki"));
        assert!(text.contains(SPINNER[0]));
    }

    #[test]
    fn test_render_overflow_keeps_newest() {
        let mut board = ProgressBoard::new();
        for i in 0..20 {
            board.note("misc", format!("line {i:02}"));
        }
        let text = render_text(&board, 40, MAX_PANEL_HEIGHT);
        assert!(text.contains("line 19"));
        assert!(!text.contains("line 00"));
    }
}
