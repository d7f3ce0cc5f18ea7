//! # Progress Sections
//!
//! Transient status blocks for backend-side stages (retrieval and friends)
//! surfaced while a reply is generating. Sections are keyed by name and kept
//! in first-seen order for display.

/// Section bucket for records that name no section.
pub const MISC_SECTION: &str = "misc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectionStatus {
    #[default]
    Idle,
    Running,
    Done,
    Error,
}

/// Glyph kind attached to each log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionIcon {
    Start,
    Finish,
    Note,
    Failure,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSection {
    pub status: SectionStatus,
    pub logs: Vec<String>,
    pub icons: Vec<SectionIcon>,
}

impl ProgressSection {
    fn push(&mut self, icon: SectionIcon, line: String) {
        if line.is_empty() {
            return;
        }
        self.logs.push(line);
        self.icons.push(icon);
    }
}

#[derive(Debug, Default)]
pub struct ProgressBoard {
    sections: Vec<(String, ProgressSection)>,
    visible: bool,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &ProgressSection)> {
        self.sections.iter().map(|(name, s)| (name.as_str(), s))
    }

    pub fn get(&self, name: &str) -> Option<&ProgressSection> {
        self.sections
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    pub fn any_running(&self) -> bool {
        self.sections
            .iter()
            .any(|(_, s)| s.status == SectionStatus::Running)
    }

    fn entry(&mut self, name: &str) -> &mut ProgressSection {
        let pos = match self.sections.iter().position(|(n, _)| n == name) {
            Some(pos) => pos,
            None => {
                self.sections
                    .push((name.to_string(), ProgressSection::default()));
                self.sections.len() - 1
            }
        };
        &mut self.sections[pos].1
    }

    /// Marks a section running, shows the overlay, and seeds the log.
    pub fn start(&mut self, name: &str, payload: String) {
        let section = self.entry(name);
        section.status = SectionStatus::Running;
        section.push(SectionIcon::Start, payload);
        self.visible = true;
    }

    pub fn finish(&mut self, name: &str, payload: String) {
        let section = self.entry(name);
        section.status = SectionStatus::Done;
        section.push(SectionIcon::Finish, payload);
    }

    /// Appends a diagnostic line without changing the section's status.
    pub fn note(&mut self, name: &str, line: String) {
        self.entry(name).push(SectionIcon::Note, line);
        self.visible = true;
    }

    /// Flips every running section to `Done`. Returns how many changed.
    pub fn finish_running(&mut self) -> usize {
        self.flip_running(SectionStatus::Done, None)
    }

    /// Flips every running section to `Error`, logging `reason` on each.
    pub fn fail_running(&mut self, reason: &str) -> usize {
        self.flip_running(SectionStatus::Error, Some(reason))
    }

    fn flip_running(&mut self, to: SectionStatus, reason: Option<&str>) -> usize {
        let mut flipped = 0;
        for (_, section) in self.sections.iter_mut() {
            if section.status == SectionStatus::Running {
                section.status = to;
                if let Some(reason) = reason {
                    section.push(SectionIcon::Failure, reason.to_string());
                }
                flipped += 1;
            }
        }
        flipped
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn clear(&mut self) {
        self.sections.clear();
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_creates_section_and_shows_overlay() {
        let mut board = ProgressBoard::new();
        board.start("retrieve", "searching 3 wikis".into());

        assert!(board.is_visible());
        let section = board.get("retrieve").unwrap();
        assert_eq!(section.status, SectionStatus::Running);
        assert_eq!(section.logs, vec!["searching 3 wikis"]);
        assert_eq!(section.icons, vec![SectionIcon::Start]);
    }

    #[test]
    fn test_finish_appends_and_marks_done() {
        let mut board = ProgressBoard::new();
        board.start("retrieve", "searching".into());
        board.finish("retrieve", "found 4 chunks".into());

        let section = board.get("retrieve").unwrap();
        assert_eq!(section.status, SectionStatus::Done);
        assert_eq!(section.logs.len(), 2);
        assert!(!board.any_running());
    }

    #[test]
    fn test_empty_payload_is_not_logged() {
        let mut board = ProgressBoard::new();
        board.start("retrieve", String::new());
        assert!(board.get("retrieve").unwrap().logs.is_empty());
    }

    #[test]
    fn test_sections_keep_first_seen_order() {
        let mut board = ProgressBoard::new();
        board.start("b", "1".into());
        board.start("a", "2".into());
        board.note("b", "3".into());
        let names: Vec<&str> = board.sections().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_finish_and_fail_running() {
        let mut board = ProgressBoard::new();
        board.start("a", "x".into());
        board.start("b", "y".into());
        board.finish("b", String::new());

        assert_eq!(board.finish_running(), 1);
        assert_eq!(board.get("a").unwrap().status, SectionStatus::Done);

        board.start("c", "z".into());
        assert_eq!(board.fail_running("network error"), 1);
        let c = board.get("c").unwrap();
        assert_eq!(c.status, SectionStatus::Error);
        assert_eq!(c.icons.last(), Some(&SectionIcon::Failure));
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut board = ProgressBoard::new();
        board.start("a", "x".into());
        board.clear();
        assert!(board.is_empty());
        assert!(!board.is_visible());
    }
}
