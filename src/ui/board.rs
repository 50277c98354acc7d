use std::collections::HashSet;

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use textwrap::{Options, WordSplitter};

use crate::engine::LayoutProvider;
use crate::scroll::{ChapterSpan, ScrollCoordinator, VerseSpan, WindowLayout};
use crate::window::ChapterWindow;

const FAVORITE_MARK: &str = " ★";

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    Title { reference: String },
    Verse { key: String, verse: usize, number_len: usize },
    Blank,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardLine {
    pub text: String,
    pub kind: LineKind,
}

impl BoardLine {
    fn blank() -> Self {
        Self {
            text: String::new(),
            kind: LineKind::Blank,
        }
    }
}

/// Board widget: lays out the chapter window as wrapped rows and draws the
/// slice under the viewport.
pub struct Board {
    lines: Vec<BoardLine>,
    text_width: usize,
    show_verse_numbers: bool,
}

impl Board {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            text_width: 72,
            show_verse_numbers: true,
        }
    }

    pub fn with_text_width(mut self, text_width: usize) -> Self {
        self.text_width = text_width.max(1);
        self
    }

    pub fn with_verse_numbers(mut self, show: bool) -> Self {
        self.show_verse_numbers = show;
        self
    }

    pub fn text_width(&self) -> usize {
        self.text_width
    }

    /// Returns true when the width changed and the window needs a new layout.
    pub fn set_text_width(&mut self, text_width: usize) -> bool {
        let text_width = text_width.max(1);
        if self.text_width == text_width {
            return false;
        }
        self.text_width = text_width;
        true
    }

    pub fn total_lines(&self) -> usize {
        self.lines.len()
    }

    pub fn get_line(&self, line: usize) -> Option<&str> {
        self.lines.get(line).map(|l| l.text.as_str())
    }

    fn wrap_verse(&self, number: usize, text: &str) -> (Vec<String>, usize) {
        let prefix = if self.show_verse_numbers {
            format!("{} ", number)
        } else {
            String::new()
        };
        let indent = " ".repeat(prefix.chars().count());
        let options = Options::new(self.text_width)
            .initial_indent(&prefix)
            .subsequent_indent(&indent)
            .word_splitter(WordSplitter::NoHyphenation);
        let wrapped: Vec<String> = textwrap::wrap(text.trim(), &options)
            .into_iter()
            .map(|line| line.trim_end().to_string())
            .collect();
        (wrapped, prefix.len())
    }

    pub fn render(
        &self,
        frame: &mut Frame,
        area: Rect,
        coordinator: &ScrollCoordinator,
        favorites: &HashSet<String>,
    ) {
        let start = coordinator.offset();
        let end = (start + area.height as usize).min(self.lines.len());
        let active = coordinator.active();

        let visible_lines: Vec<Line> = self
            .lines
            .get(start..end)
            .unwrap_or(&[])
            .iter()
            .map(|line| match &line.kind {
                LineKind::Title { reference } => {
                    let mut spans = vec![Span::styled(
                        line.text.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )];
                    if favorites.contains(reference) {
                        spans.push(Span::styled(FAVORITE_MARK, Style::default().fg(Color::Yellow)));
                    }
                    Line::from(spans)
                }
                LineKind::Verse { key, verse, number_len } => {
                    let mut text_style = Style::default();
                    if coordinator.is_highlighted(key, *verse) {
                        text_style = text_style.bg(Color::Yellow).fg(Color::Black);
                    } else if active.is_some_and(|a| a.chapter_key == *key && a.verse == *verse) {
                        text_style = text_style.add_modifier(Modifier::BOLD);
                    }
                    let split = (*number_len).min(line.text.len());
                    let (number, text) = line.text.split_at(split);
                    Line::from(vec![
                        Span::styled(number.to_string(), Style::default().fg(Color::DarkGray)),
                        Span::styled(text.to_string(), text_style),
                    ])
                }
                LineKind::Blank => Line::from(""),
            })
            .collect();

        let paragraph = Paragraph::new(visible_lines).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    pub fn render_status(frame: &mut Frame, area: Rect, text: &str, color: Color) {
        let paragraph = Paragraph::new(vec![Line::from(""), Line::from(text.to_string())])
            .style(Style::default().fg(color).add_modifier(Modifier::ITALIC))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

impl LayoutProvider for Board {
    fn layout(&mut self, window: &ChapterWindow) -> WindowLayout {
        let mut lines = Vec::new();
        let mut chapters = Vec::with_capacity(window.len());

        for chapter in window.chapters() {
            let start = lines.len();
            lines.push(BoardLine {
                text: chapter.reference(),
                kind: LineKind::Title {
                    reference: chapter.reference(),
                },
            });
            lines.push(BoardLine::blank());

            let mut verses = Vec::with_capacity(chapter.verses.len());
            for (index, text) in chapter.verses.iter().enumerate() {
                let (wrapped, number_len) = self.wrap_verse(index + 1, text);
                let verse_start = lines.len();
                for (i, row) in wrapped.into_iter().enumerate() {
                    lines.push(BoardLine {
                        text: row,
                        kind: LineKind::Verse {
                            key: chapter.key.clone(),
                            verse: index,
                            number_len: if i == 0 { number_len } else { 0 },
                        },
                    });
                }
                if lines.len() == verse_start {
                    lines.push(BoardLine {
                        text: String::new(),
                        kind: LineKind::Verse {
                            key: chapter.key.clone(),
                            verse: index,
                            number_len: 0,
                        },
                    });
                }
                verses.push(VerseSpan {
                    verse: index,
                    start: verse_start,
                    height: lines.len() - verse_start,
                });
            }
            lines.push(BoardLine::blank());

            chapters.push(ChapterSpan {
                key: chapter.key.clone(),
                start,
                height: lines.len() - start,
                verses,
            });
        }

        let total_height = lines.len();
        self.lines = lines;
        WindowLayout {
            chapters,
            total_height,
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bible, Book, ChapterPosition};
    use crate::window::WindowOptions;
    use std::sync::Arc;

    fn window() -> ChapterWindow {
        let bible = Bible::new(vec![Book {
            abbrev: "gn".to_string(),
            name: "Gênesis".to_string(),
            chapters: vec![
                vec![
                    "No princípio criou Deus os céus e a terra.".to_string(),
                    "E a terra era sem forma e vazia.".to_string(),
                ],
                vec!["Disse Deus.".to_string()],
            ],
        }]);
        let mut window = ChapterWindow::new(Arc::new(bible), WindowOptions::default()).unwrap();
        window.initialize(ChapterPosition::new(0, 0)).unwrap();
        window
    }

    #[test]
    fn test_board_default() {
        let board = Board::default();
        assert_eq!(board.text_width(), 72);
        assert!(board.show_verse_numbers);
        assert_eq!(board.total_lines(), 0);
    }

    #[test]
    fn test_board_builder() {
        let board = Board::new().with_text_width(30).with_verse_numbers(false);
        assert_eq!(board.text_width(), 30);
        assert!(!board.show_verse_numbers);
    }

    #[test]
    fn test_layout_spans_cover_every_row() {
        let mut board = Board::new().with_text_width(20);
        let mut window = window();
        window.append_next();
        let layout = board.layout(&window);

        assert_eq!(layout.chapters.len(), 2);
        assert_eq!(layout.total_height, board.total_lines());
        let first = &layout.chapters[0];
        let second = &layout.chapters[1];
        assert_eq!(first.start, 0);
        assert_eq!(second.start, first.end());
        assert_eq!(second.end(), layout.total_height);

        // title + blank, then the first verse starts
        assert_eq!(first.verses[0].start, 2);
        assert!(first.verses[0].height > 1, "long verse should wrap at width 20");
        assert_eq!(
            first.verses[1].start,
            first.verses[0].start + first.verses[0].height
        );
        assert_eq!(board.get_line(0), Some("Gênesis 1"));
        assert!(board.get_line(2).unwrap().starts_with("1 No"));
        assert!(board.get_line(3).unwrap().starts_with("  "));
    }

    #[test]
    fn test_width_change_requests_relayout() {
        let mut board = Board::new();
        assert!(!board.set_text_width(72));
        assert!(board.set_text_width(40));

        let window = window();
        let wide = Board::new().with_text_width(200).layout(&window).total_height;
        let narrow = Board::new().with_text_width(12).layout(&window).total_height;
        assert!(narrow > wide);
    }

    #[test]
    fn test_verse_numbers_can_be_hidden() {
        let mut board = Board::new().with_verse_numbers(false);
        board.layout(&window());
        assert_eq!(board.get_line(2), Some("No princípio criou Deus os céus e a terra."));
    }
}
