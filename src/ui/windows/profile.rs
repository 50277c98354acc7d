use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::centered_popup_area;

pub struct ProfileWindow;

impl ProfileWindow {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        user_id: Option<&str>,
        streak: u32,
        favorites_count: usize,
    ) {
        let popup_area = centered_popup_area(area, 50, 40);

        frame.render_widget(Clear, popup_area);

        let content = match user_id {
            Some(user_id) => vec![
                Line::from(Span::styled(
                    user_id.to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(format!("Streak: {} {}", streak, if streak == 1 { "day" } else { "days" })),
                Line::from(format!("Favorites: {}", favorites_count)),
                Line::from(""),
                Line::from(Span::styled(
                    "L log out | q close",
                    Style::default().add_modifier(Modifier::ITALIC),
                )),
            ],
            None => vec![
                Line::from("Not signed in"),
                Line::from(""),
                Line::from("Start with `luz --user NAME` to keep favorites, notes and a streak."),
                Line::from(""),
                Line::from(Span::styled(
                    "Press any key to close",
                    Style::default().add_modifier(Modifier::ITALIC),
                )),
            ],
        };

        let style = if user_id.is_some() {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let paragraph = Paragraph::new(content)
            .style(style)
            .block(Block::default().title("Profile").borders(Borders::ALL));

        frame.render_widget(paragraph, popup_area);
    }
}
