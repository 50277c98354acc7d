use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum Direction {
    Up,
    Down,
    PageUp,
    PageDown,
    HalfPageUp,
    HalfPageDown,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum WindowType {
    #[default]
    Reader,
    Help,
    Picker,
    NoteEditor,
    Notes,
    Favorites,
    Profile,
}

/// A canonical book: immutable once the dataset is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub abbrev: String,
    pub name: String,
    pub chapters: Vec<Vec<String>>,
}

impl Book {
    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    pub fn chapter(&self, index: usize) -> Option<&[String]> {
        self.chapters.get(index).map(|verses| verses.as_slice())
    }
}

/// Address of a chapter inside the canonical ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChapterPosition {
    pub book: usize,
    pub chapter: usize,
}

impl ChapterPosition {
    pub const fn new(book: usize, chapter: usize) -> Self {
        Self { book, chapter }
    }
}

/// The whole canon, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Bible {
    books: Vec<Book>,
}

impl Bible {
    pub fn new(books: Vec<Book>) -> Self {
        Self { books }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn book(&self, index: usize) -> Option<&Book> {
        self.books.get(index)
    }

    pub fn book_index(&self, abbrev: &str) -> Option<usize> {
        self.books.iter().position(|book| book.abbrev == abbrev)
    }

    pub fn total_chapters(&self) -> usize {
        self.books.iter().map(Book::chapter_count).sum()
    }

    pub fn first_position(&self) -> Option<ChapterPosition> {
        self.books
            .first()
            .filter(|book| book.chapter_count() > 0)
            .map(|_| ChapterPosition::new(0, 0))
    }

    pub fn last_position(&self) -> Option<ChapterPosition> {
        let book = self.books.len().checked_sub(1)?;
        let chapter = self.books[book].chapter_count().checked_sub(1)?;
        Some(ChapterPosition::new(book, chapter))
    }

    pub fn contains(&self, position: ChapterPosition) -> bool {
        self.book(position.book)
            .is_some_and(|book| position.chapter < book.chapter_count())
    }

    /// Resolve an abbreviation and zero-based chapter index.
    pub fn resolve(&self, abbrev: &str, chapter: usize) -> Option<ChapterPosition> {
        let book = self.book_index(abbrev)?;
        let position = ChapterPosition::new(book, chapter);
        self.contains(position).then_some(position)
    }

    /// The chapter right after `position`, crossing into the next book.
    /// `None` at the end of the canon.
    pub fn next_position(&self, position: ChapterPosition) -> Option<ChapterPosition> {
        let book = self.book(position.book)?;
        if position.chapter + 1 < book.chapter_count() {
            return Some(ChapterPosition::new(position.book, position.chapter + 1));
        }
        let next_book = position.book + 1;
        self.book(next_book)
            .filter(|book| book.chapter_count() > 0)
            .map(|_| ChapterPosition::new(next_book, 0))
    }

    /// The chapter right before `position`, crossing into the last chapter
    /// of the previous book. `None` at the start of the canon.
    pub fn previous_position(&self, position: ChapterPosition) -> Option<ChapterPosition> {
        if position.chapter > 0 {
            return Some(ChapterPosition::new(position.book, position.chapter - 1));
        }
        let previous_book = position.book.checked_sub(1)?;
        let last = self.book(previous_book)?.chapter_count().checked_sub(1)?;
        Some(ChapterPosition::new(previous_book, last))
    }

    pub fn render(&self, position: ChapterPosition) -> Option<RenderedChapter> {
        let book = self.book(position.book)?;
        let verses = book.chapter(position.chapter)?;
        Some(RenderedChapter {
            key: chapter_key(&book.abbrev, position.chapter),
            abbrev: book.abbrev.clone(),
            name: book.name.clone(),
            position,
            verses: verses.to_vec(),
        })
    }
}

/// Composite identity of a chapter in the rendered window.
pub fn chapter_key(abbrev: &str, chapter_index: usize) -> String {
    format!("{}-{}", abbrev, chapter_index)
}

/// View model of a chapter that is part of the rendered window.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChapter {
    pub key: String,
    pub abbrev: String,
    pub name: String,
    pub position: ChapterPosition,
    pub verses: Vec<String>,
}

impl RenderedChapter {
    pub fn chapter_index(&self) -> usize {
        self.position.chapter
    }

    /// Human reference used for titles and favorites, e.g. "Gênesis 1".
    pub fn reference(&self) -> String {
        format!("{} {}", self.name, self.position.chapter + 1)
    }

    pub fn verse_reference(&self, verse_index: usize) -> String {
        format!("{}:{}", self.reference(), verse_index + 1)
    }

    /// Opening text stored alongside a favorite.
    pub fn preview(&self) -> String {
        let first = self.verses.first().map(String::as_str).unwrap_or("");
        let mut preview: String = first.chars().take(PREVIEW_CHARS).collect();
        if first.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        preview
    }
}

const PREVIEW_CHARS: usize = 100;

/// A resolved jump destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTarget {
    pub position: ChapterPosition,
    pub verse: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteEntry {
    pub reference: String,
    pub preview: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteEntry {
    pub abbrev: String,
    pub chapter_index: usize,
    pub text: String,
    pub updated_at: DateTime<Utc>,
}
