pub mod favorites;
pub mod help;
pub mod note_editor;
pub mod notes;
pub mod picker;
pub mod profile;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

/// Compute a centered popup area within the given area.
pub fn centered_popup_area(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let width = (area.width * width_percent) / 100;
    let height = (area.height * height_percent) / 100;
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;

    Rect::new(x, y, width, height)
}

/// Bordered list with a one-line footer; keeps the selection in view.
pub(crate) fn render_list_popup(
    frame: &mut Frame,
    popup_area: Rect,
    title: &str,
    entries: &[String],
    selected_index: usize,
    empty_text: &str,
    footer: &str,
) {
    frame.render_widget(Clear, popup_area);
    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);
    let footer = Paragraph::new(footer.to_string()).style(Style::default().fg(Color::DarkGray));

    if entries.is_empty() {
        let paragraph =
            Paragraph::new(empty_text.to_string()).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, rows[0]);
        frame.render_widget(footer, rows[1]);
        return;
    }

    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| ListItem::new(Line::from(entry.clone())))
        .collect();
    let list = List::new(items).highlight_style(Style::default().bg(Color::Blue).fg(Color::White));
    let mut list_state = ListState::default();
    list_state.select(Some(selected_index.min(entries.len() - 1)));

    frame.render_stateful_widget(list, rows[0], &mut list_state);
    frame.render_widget(footer, rows[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_popup_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_popup_area(area, 50, 50);
        assert_eq!(popup, Rect::new(25, 10, 50, 20));
    }
}
