//! Previous/next question navigation over the user turns of a conversation.

use crate::core::messages::Turn;
use crate::core::messages::Role;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct QuestionNav {
    /// List positions of user turns.
    positions: Vec<usize>,
    /// Index into `positions`. `None` only while there are no questions.
    pointer: Option<usize>,
}

impl QuestionNav {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the question positions. The pointer resets to the last
    /// question whenever the number of questions changes.
    pub fn sync(&mut self, turns: &[Turn]) {
        let positions: Vec<usize> = turns
            .iter()
            .enumerate()
            .filter(|(_, t)| t.role == Role::User)
            .map(|(i, _)| i)
            .collect();

        if positions.len() != self.positions.len() {
            self.pointer = positions.len().checked_sub(1);
        }
        self.positions = positions;
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn pointer(&self) -> Option<usize> {
        self.pointer
    }

    /// List position of the question under the pointer.
    pub fn current(&self) -> Option<usize> {
        self.pointer.map(|p| self.positions[p])
    }

    /// Moves to the previous question, saturating at the first. Returns the
    /// list position to show.
    pub fn prev(&mut self) -> Option<usize> {
        let p = self.pointer?;
        self.pointer = Some(p.saturating_sub(1));
        self.current()
    }

    /// Moves to the next question, saturating at the last.
    pub fn next(&mut self) -> Option<usize> {
        let p = self.pointer?;
        self.pointer = Some((p + 1).min(self.positions.len() - 1));
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{assistant_turn, user_turn};

    fn three_questions() -> Vec<Turn> {
        vec![
            user_turn("u1", "q1"),
            assistant_turn("a1", "r1"),
            user_turn("u2", "q2"),
            assistant_turn("a2", "r2"),
            user_turn("u3", "q3"),
        ]
    }

    #[test]
    fn test_sync_points_at_last_question() {
        let mut nav = QuestionNav::new();
        nav.sync(&three_questions());
        assert_eq!(nav.positions(), &[0, 2, 4]);
        assert_eq!(nav.pointer(), Some(2));
        assert_eq!(nav.current(), Some(4));
    }

    #[test]
    fn test_next_saturates_at_last() {
        let mut nav = QuestionNav::new();
        nav.sync(&three_questions());
        for _ in 0..5 {
            nav.next();
        }
        assert_eq!(nav.pointer(), Some(2));
        assert_eq!(nav.current(), Some(4));
    }

    #[test]
    fn test_prev_saturates_at_first() {
        let mut nav = QuestionNav::new();
        nav.sync(&three_questions());
        assert_eq!(nav.prev(), Some(2));
        assert_eq!(nav.prev(), Some(0));
        assert_eq!(nav.prev(), Some(0));
        assert_eq!(nav.pointer(), Some(0));
    }

    #[test]
    fn test_empty_conversation_has_no_pointer() {
        let mut nav = QuestionNav::new();
        nav.sync(&[]);
        assert_eq!(nav.next(), None);
        assert_eq!(nav.prev(), None);
    }

    #[test]
    fn test_pointer_resets_only_when_count_changes() {
        let mut nav = QuestionNav::new();
        let mut turns = three_questions();
        nav.sync(&turns);
        nav.prev();
        assert_eq!(nav.pointer(), Some(1));

        // Assistant turn appended: same questions, pointer kept.
        turns.push(assistant_turn("a3", "r3"));
        nav.sync(&turns);
        assert_eq!(nav.pointer(), Some(1));

        turns.push(user_turn("u4", "q4"));
        nav.sync(&turns);
        assert_eq!(nav.pointer(), Some(3));
    }
}
