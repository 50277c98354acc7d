use ratatui::{Frame, layout::Rect};

use super::{centered_popup_area, render_list_popup};

pub struct PickerWindow;

impl PickerWindow {
    pub fn render(frame: &mut Frame, area: Rect, title: &str, entries: &[String], selected_index: usize) {
        let popup_area = centered_popup_area(area, 50, 80);
        render_list_popup(
            frame,
            popup_area,
            title,
            entries,
            selected_index,
            "Nothing to choose",
            "Enter select | h back | q close",
        );
    }
}
