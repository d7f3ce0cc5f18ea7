use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};

use crate::core::state::App;
use crate::tui::TuiState;
use crate::tui::component::Component;
use crate::tui::components::{ConversationPicker, MessageList, ProgressPanel, TitleBar};

/// Screen regions for one frame.
pub struct Areas {
    pub title: Rect,
    pub messages: Rect,
    pub progress: Rect,
    pub input: Rect,
}

pub fn layout(area: Rect, progress_height: u16, input_height: u16) -> Areas {
    use Constraint::{Length, Min};
    let [title, messages, progress, input] = Layout::vertical([
        Length(1),
        Min(0),
        Length(progress_height),
        Length(input_height),
    ])
    .areas(area);
    Areas {
        title,
        messages,
        progress,
        input,
    }
}

pub fn draw_ui(frame: &mut Frame, app: &App, tui: &mut TuiState, spinner_frame: usize) {
    let area = frame.area();
    let progress_height = ProgressPanel::desired_height(&app.progress);
    let input_height = tui.input_box.calculate_height(area.width);
    let areas = layout(area, progress_height, input_height);

    let mut title_bar = TitleBar {
        title: app.title().to_string(),
        model_name: app.settings.model_name.clone(),
        online: app.settings.online,
        deep_think: app.settings.deep_think,
        status_message: app.status_message.clone(),
        is_generating: app.is_generating,
        spinner_frame,
        show_jump: app.follow.shows_jump_affordance(),
    };
    title_bar.render(frame, areas.title);

    let mut message_list = MessageList::new(
        &mut tui.message_list,
        app.store.turns(),
        app.store.open_reply(),
        app.nav.current(),
        tui.pulse_value,
    );
    message_list.render(frame, areas.messages);

    if progress_height > 0 {
        ProgressPanel::new(&app.progress, spinner_frame).render(frame, areas.progress);
    }

    tui.input_box.is_generating = app.is_generating;
    tui.input_box.render(frame, areas.input);

    if let Some(picker) = tui.picker.as_mut() {
        ConversationPicker::new(picker, &app.conversations, app.conversation_id.as_deref())
            .render(frame, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::{Action, update};
    use crate::stream::StreamEvent;
    use crate::test_support::test_app;
    use crate::tui::components::ConversationPickerState;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::time::Instant;

    fn draw(app: &App, tui: &mut TuiState) -> String {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw_ui(f, app, tui, 0)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_layout_regions() {
        let areas = layout(Rect::new(0, 0, 80, 24), 4, 3);
        assert_eq!(areas.title.height, 1);
        assert_eq!(areas.progress.height, 4);
        assert_eq!(areas.input.height, 3);
        assert_eq!(areas.messages.height, 16);
        assert_eq!(areas.input.y, 21);
    }

    #[test]
    fn test_draw_empty_conversation() {
        let app = test_app();
        let mut tui = TuiState::new();
        let text = draw(&app, &mut tui);
        assert!(text.contains("New conversation"));
        assert!(text.contains("test-model"));
        assert!(text.contains("Ask"));
    }

    #[test]
    fn test_draw_streaming_reply_with_progress() {
        let mut app = test_app();
        let now = Instant::now();
        update(&mut app, Action::Submit("Capital of France?".to_string()), now);
        let generation = app.active_generation.unwrap();
        update(
            &mut app,
            Action::Stream {
                generation,
                event: StreamEvent::RetrieveStart {
                    section: "retrieve".to_string(),
                    payload: "searching".to_string(),
                },
            },
            now,
        );
        update(
            &mut app,
            Action::Stream {
                generation,
                event: StreamEvent::Answer("Paris".to_string()),
            },
            now,
        );

        let mut tui = TuiState::new();
        let text = draw(&app, &mut tui);
        assert!(text.contains("Capital of France?"));
        assert!(text.contains("Paris"));
        assert!(text.contains("progress"));
        assert!(text.contains("searching"));
        assert!(text.contains("Esc stops the reply"));
    }

    #[test]
    fn test_draw_picker_overlay() {
        let app = test_app();
        let mut tui = TuiState::new();
        tui.picker = Some(ConversationPickerState::new(&app.conversations, None));
        let text = draw(&app, &mut tui);
        assert!(text.contains("No conversations yet."));
    }
}
