use ratatui::{
    Frame,
    layout::Rect,
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};

pub struct HelpWindow;

const HELP_TEXT: &[&str] = &[
    " Reading:",
    "   k / Up            Line Up",
    "   j / Down          Line Down",
    "   PgUp              Page Up",
    "   PgDn / Space      Page Down",
    "   Ctrl+u / Ctrl+d   Half Page Up/Down",
    "   [count]j          Repeat (e.g. 5j)",
    "",
    " Navigation:",
    "   g                 Go To Book/Chapter/Verse",
    "   Enter / l         Select (picker)",
    "   h / Backspace     Back (picker)",
    "",
    " Study:",
    "   f                 Toggle Favorite Chapter",
    "   n                 Edit Chapter Note",
    "   N                 Notes",
    "   F                 Favorites",
    "   y                 Copy Verse To Clipboard",
    "   p                 Profile & Streak",
    "",
    " Note Editor:",
    "   Ctrl+s            Save",
    "   Esc               Discard",
    "",
    "   q                 Quit / Close Window",
    "   ?                 Help",
];

impl HelpWindow {
    pub fn get_total_lines() -> usize {
        HELP_TEXT.len()
    }

    /// Largest useful scroll offset for a help popup inside `area`.
    pub fn max_scroll_offset(area: Rect) -> u16 {
        let visible = area.height.saturating_sub(2) as usize;
        Self::get_total_lines().saturating_sub(visible) as u16
    }

    pub fn render(frame: &mut Frame, area: Rect, scroll_offset: u16) {
        let help_content: Vec<Line> = HELP_TEXT.iter().map(|&s| Line::from(s)).collect();

        let max_width = help_content.iter().map(|l| l.width()).max().unwrap_or(0) as u16;
        let width = (max_width + 4).min(area.width);
        let height = (help_content.len() as u16 + 2).min(area.height);

        let x = area.x + (area.width - width) / 2;
        let y = area.y + (area.height - height) / 2;
        let popup_area = Rect::new(x, y, width, height);

        frame.render_widget(Clear, popup_area);

        let help_paragraph = Paragraph::new(help_content)
            .block(Block::default().title("Help").borders(Borders::ALL))
            .scroll((scroll_offset, 0));

        frame.render_widget(help_paragraph, popup_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_scroll_offset() {
        let tall = Rect::new(0, 0, 80, 100);
        assert_eq!(HelpWindow::max_scroll_offset(tall), 0);

        let short = Rect::new(0, 0, 80, 12);
        assert_eq!(
            HelpWindow::max_scroll_offset(short) as usize,
            HelpWindow::get_total_lines() - 10
        );
    }
}
