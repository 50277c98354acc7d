use ratatui::{Frame, layout::Rect};

use super::render_list_popup;

pub struct FavoritesWindow;

impl FavoritesWindow {
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
            "Favorites",
            entries,
            selected_index,
            "No favorites yet. Press f on a chapter to add it.",
            "Enter open chapter | q close",
        );
    }
}
