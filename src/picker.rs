//! Book → chapter → verse drill-down used by the `g` popup.

use crate::models::{Bible, ChapterPosition, JumpTarget};
use crate::scripture::format_abbreviation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickerStep {
    #[default]
    Books,
    Chapters {
        book: usize,
    },
    Verses {
        book: usize,
        chapter: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerOutcome {
    /// Still browsing.
    Moved,
    /// A verse was chosen; the picker is closed.
    Jump(JumpTarget),
    Closed,
}

#[derive(Debug, Default)]
pub struct NavigationPicker {
    open: bool,
    step: PickerStep,
    selected: usize,
}

impl NavigationPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn step(&self) -> PickerStep {
        self.step
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Always starts over at the book list.
    pub fn open(&mut self) {
        self.open = true;
        self.step = PickerStep::Books;
        self.selected = 0;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.step = PickerStep::Books;
        self.selected = 0;
    }

    pub fn len(&self, bible: &Bible) -> usize {
        match self.step {
            PickerStep::Books => bible.books().len(),
            PickerStep::Chapters { book } => bible.book(book).map_or(0, |b| b.chapter_count()),
            PickerStep::Verses { book, chapter } => bible
                .book(book)
                .and_then(|b| b.chapter(chapter))
                .map_or(0, |verses| verses.len()),
        }
    }

    pub fn is_empty(&self, bible: &Bible) -> bool {
        self.len(bible) == 0
    }

    pub fn title(&self, bible: &Bible) -> String {
        match self.step {
            PickerStep::Books => "Books".to_string(),
            PickerStep::Chapters { book } => bible
                .book(book)
                .map(|b| b.name.clone())
                .unwrap_or_default(),
            PickerStep::Verses { book, chapter } => bible
                .book(book)
                .map(|b| format!("{} {}", b.name, chapter + 1))
                .unwrap_or_default(),
        }
    }

    /// Labels for the entries of the current step.
    pub fn entries(&self, bible: &Bible) -> Vec<String> {
        match self.step {
            PickerStep::Books => bible
                .books()
                .iter()
                .map(|book| format!("{:<4} {}", format_abbreviation(&book.abbrev), book.name))
                .collect(),
            _ => (1..=self.len(bible)).map(|n| n.to_string()).collect(),
        }
    }

    pub fn move_selection(&mut self, delta: isize, bible: &Bible) {
        let len = self.len(bible);
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = self.selected.saturating_add_signed(delta).min(len - 1);
    }

    pub fn select_index(&mut self, index: usize, bible: &Bible) -> PickerOutcome {
        if index >= self.len(bible) {
            return PickerOutcome::Moved;
        }
        self.selected = index;
        self.select(bible)
    }

    /// Descend one step, or commit the jump from the verse list.
    pub fn select(&mut self, bible: &Bible) -> PickerOutcome {
        if !self.open || self.is_empty(bible) {
            return PickerOutcome::Moved;
        }
        match self.step {
            PickerStep::Books => {
                self.step = PickerStep::Chapters {
                    book: self.selected,
                };
                self.selected = 0;
                PickerOutcome::Moved
            }
            PickerStep::Chapters { book } => {
                self.step = PickerStep::Verses {
                    book,
                    chapter: self.selected,
                };
                self.selected = 0;
                PickerOutcome::Moved
            }
            PickerStep::Verses { book, chapter } => {
                let target = JumpTarget {
                    position: ChapterPosition::new(book, chapter),
                    verse: Some(self.selected),
                };
                self.close();
                PickerOutcome::Jump(target)
            }
        }
    }

    /// Go up one step, keeping the parent selection. Closes from the book list.
    pub fn back(&mut self) -> PickerOutcome {
        match self.step {
            PickerStep::Books => {
                self.close();
                PickerOutcome::Closed
            }
            PickerStep::Chapters { book } => {
                self.step = PickerStep::Books;
                self.selected = book;
                PickerOutcome::Moved
            }
            PickerStep::Verses { book, chapter } => {
                self.step = PickerStep::Chapters { book };
                self.selected = chapter;
                PickerOutcome::Moved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Book;

    fn bible() -> Bible {
        let book = |abbrev: &str, name: &str, chapters: &[usize]| Book {
            abbrev: abbrev.to_string(),
            name: name.to_string(),
            chapters: chapters
                .iter()
                .map(|&verses| (0..verses).map(|v| format!("verse {}", v + 1)).collect())
                .collect(),
        };
        Bible::new(vec![
            book("gn", "Gênesis", &[3, 2]),
            book("1sm", "1º Samuel", &[4, 5, 6]),
        ])
    }

    #[test]
    fn test_full_path_produces_one_jump_and_closes() {
        let bible = bible();
        let mut picker = NavigationPicker::new();
        picker.open();

        assert_eq!(picker.select_index(1, &bible), PickerOutcome::Moved);
        assert_eq!(picker.step(), PickerStep::Chapters { book: 1 });
        assert_eq!(picker.select_index(2, &bible), PickerOutcome::Moved);
        assert_eq!(picker.step(), PickerStep::Verses { book: 1, chapter: 2 });
        assert_eq!(picker.entries(&bible).len(), 6);

        let outcome = picker.select_index(4, &bible);
        assert_eq!(
            outcome,
            PickerOutcome::Jump(JumpTarget {
                position: ChapterPosition::new(1, 2),
                verse: Some(4),
            })
        );
        assert!(!picker.is_open());
        assert_eq!(picker.step(), PickerStep::Books);
    }

    #[test]
    fn test_back_keeps_selected_book() {
        let bible = bible();
        let mut picker = NavigationPicker::new();
        picker.open();
        picker.select_index(1, &bible);
        picker.select_index(0, &bible);

        assert_eq!(picker.back(), PickerOutcome::Moved);
        assert_eq!(picker.step(), PickerStep::Chapters { book: 1 });
        assert_eq!(picker.selected(), 0);

        assert_eq!(picker.back(), PickerOutcome::Moved);
        assert_eq!(picker.step(), PickerStep::Books);
        assert_eq!(picker.selected(), 1);

        assert_eq!(picker.back(), PickerOutcome::Closed);
        assert!(!picker.is_open());
    }

    #[test]
    fn test_open_resets_previous_browsing() {
        let bible = bible();
        let mut picker = NavigationPicker::new();
        picker.open();
        picker.select_index(1, &bible);
        picker.move_selection(2, &bible);
        picker.close();

        picker.open();
        assert_eq!(picker.step(), PickerStep::Books);
        assert_eq!(picker.selected(), 0);
    }

    #[test]
    fn test_selection_is_clamped() {
        let bible = bible();
        let mut picker = NavigationPicker::new();
        picker.open();
        picker.move_selection(10, &bible);
        assert_eq!(picker.selected(), 1);
        picker.move_selection(-10, &bible);
        assert_eq!(picker.selected(), 0);
        assert_eq!(picker.select_index(7, &bible), PickerOutcome::Moved);
        assert_eq!(picker.step(), PickerStep::Books);
    }

    #[test]
    fn test_book_entries_use_formatted_abbreviations() {
        let bible = bible();
        let mut picker = NavigationPicker::new();
        picker.open();
        let entries = picker.entries(&bible);
        assert!(entries[0].starts_with("Gn "));
        assert!(entries[1].starts_with("1Sm "));
        assert!(entries[1].ends_with("1º Samuel"));
    }
}
