use ratatui::{Frame, layout::Rect};

use super::render_list_popup;

pub struct NotesWindow;

impl NotesWindow {
    pub fn render(frame: &mut Frame, area: Rect, entries: &[String], selected_index: usize) {
        let popup_area = Rect::new(
            area.x + area.width / 8,
            area.y + area.height / 6,
            area.width * 3 / 4,
            area.height * 2 / 3,
        );
        render_list_popup(
            frame,
            popup_area,
            "Notes",
            entries,
            selected_index,
            "No notes yet. Press n while reading to write one.",
            "Enter open chapter | q close",
        );
    }
}
