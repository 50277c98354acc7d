use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::centered_popup_area;

pub struct NoteEditorWindow;

impl NoteEditorWindow {
    pub fn render(frame: &mut Frame, area: Rect, title: &str, text: &str) {
        let popup_area = centered_popup_area(area, 70, 60);

        frame.render_widget(Clear, popup_area);
        let block = Block::default()
            .title(format!("Note: {}", title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);

        let lines: Vec<Line> = text.split('\n').map(|l| Line::from(l.to_string())).collect();
        let line_count = lines.len() as u16;
        let scroll = line_count.saturating_sub(rows[0].height);
        let body = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0));
        frame.render_widget(body, rows[0]);

        let footer = Paragraph::new("Ctrl+s save | Esc discard | empty note deletes it")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(footer, rows[1]);

        let last_line = text.rsplit('\n').next().unwrap_or("");
        let cursor_x = rows[0].x + (last_line.chars().count() as u16).min(rows[0].width.saturating_sub(1));
        let cursor_y = rows[0].y + line_count.saturating_sub(1).min(rows[0].height.saturating_sub(1));
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}
