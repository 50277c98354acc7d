//! The contiguous run of chapters currently materialized for display.
//!
//! The window always holds at least one chapter and its chapters follow
//! canonical order with no gaps. It grows one chapter at a time at either
//! edge, or is replaced wholesale by a jump.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::ReaderError;
use crate::models::{Bible, ChapterPosition, JumpTarget, RenderedChapter};

/// Smallest cap that still leaves room for the chapter being read and one
/// neighbour on each side.
pub const MIN_WINDOW_CHAPTERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Top,
    Bottom,
}

/// How the in-flight guard is scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardPolicy {
    /// One flag for both edges: a pending prepend also holds back appends.
    #[default]
    Shared,
    /// Each edge has its own flag.
    PerEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowOptions {
    pub guard: GuardPolicy,
    pub max_chapters: Option<usize>,
}

/// Proof that a pagination started; hand it back through
/// [`ChapterWindow::settle`] once the new layout has been committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationTicket {
    pub edge: Edge,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pagination {
    Started {
        ticket: PaginationTicket,
        inserted: String,
    },
    /// Start or end of the canon; nothing to add.
    Boundary,
    /// Another pagination is still in flight.
    Suppressed,
}

pub struct ChapterWindow {
    bible: Arc<Bible>,
    chapters: VecDeque<RenderedChapter>,
    options: WindowOptions,
    generation: u64,
    in_flight: Vec<PaginationTicket>,
}

impl ChapterWindow {
    /// Open the window on the first chapter of the canon.
    pub fn new(bible: Arc<Bible>, options: WindowOptions) -> Result<Self, ReaderError> {
        let start = bible
            .first_position()
            .ok_or_else(|| ReaderError::DataUnavailable("dataset has no chapters".to_string()))?;
        let mut window = Self {
            bible,
            chapters: VecDeque::new(),
            options: WindowOptions {
                guard: options.guard,
                max_chapters: options.max_chapters.map(|max| max.max(MIN_WINDOW_CHAPTERS)),
            },
            generation: 0,
            in_flight: Vec::new(),
        };
        window.initialize(start)?;
        Ok(window)
    }

    pub fn bible(&self) -> &Arc<Bible> {
        &self.bible
    }

    /// Replace the window with the single chapter at `position`.
    pub fn initialize(&mut self, position: ChapterPosition) -> Result<(), ReaderError> {
        let chapter = self.bible.render(position).ok_or_else(|| {
            ReaderError::InvalidReference(format!("{}-{}", position.book, position.chapter))
        })?;
        self.generation += 1;
        self.in_flight.clear();
        self.chapters.clear();
        self.chapters.push_back(chapter);
        Ok(())
    }

    /// Replace the window with the jump target. A verse outside the chapter
    /// is dropped rather than rejected.
    pub fn jump_to(&mut self, target: JumpTarget) -> Result<JumpTarget, ReaderError> {
        self.initialize(target.position)?;
        let verse_count = self.chapters.front().map_or(0, |c| c.verses.len());
        let verse = target.verse.filter(|verse| *verse < verse_count);
        log::debug!(
            "jump to {}-{} verse {:?}",
            target.position.book,
            target.position.chapter,
            verse
        );
        Ok(JumpTarget {
            position: target.position,
            verse,
        })
    }

    pub fn jump_to_reference(
        &mut self,
        abbrev: &str,
        chapter: usize,
        verse: Option<usize>,
    ) -> Result<JumpTarget, ReaderError> {
        let position = self
            .bible
            .resolve(abbrev, chapter)
            .ok_or_else(|| ReaderError::InvalidReference(format!("{}-{}", abbrev, chapter)))?;
        self.jump_to(JumpTarget { position, verse })
    }

    pub fn prepend_previous(&mut self) -> Pagination {
        self.paginate(Edge::Top)
    }

    pub fn append_next(&mut self) -> Pagination {
        self.paginate(Edge::Bottom)
    }

    fn paginate(&mut self, edge: Edge) -> Pagination {
        if self.is_busy(edge) {
            return Pagination::Suppressed;
        }

        let anchor = match edge {
            Edge::Top => self.first().position,
            Edge::Bottom => self.last().position,
        };
        let neighbour = match edge {
            Edge::Top => self.bible.previous_position(anchor),
            Edge::Bottom => self.bible.next_position(anchor),
        };
        let Some(chapter) = neighbour.and_then(|position| self.bible.render(position)) else {
            return Pagination::Boundary;
        };

        let ticket = PaginationTicket {
            edge,
            generation: self.generation,
        };
        self.in_flight.push(ticket);

        let inserted = chapter.key.clone();
        match edge {
            Edge::Top => self.chapters.push_front(chapter),
            Edge::Bottom => self.chapters.push_back(chapter),
        }

        Pagination::Started { ticket, inserted }
    }

    /// True when a cap is configured and the window holds more chapters.
    pub fn over_capacity(&self) -> bool {
        self.options
            .max_chapters
            .is_some_and(|max| self.chapters.len() > max)
    }

    /// Drop the chapter at `edge`. The last remaining chapter is never
    /// removed, and nothing is removed while a pagination is in flight.
    pub fn evict(&mut self, edge: Edge) -> Option<String> {
        if self.chapters.len() <= 1 || !self.in_flight.is_empty() {
            return None;
        }
        let removed = match edge {
            Edge::Top => self.chapters.pop_front(),
            Edge::Bottom => self.chapters.pop_back(),
        };
        removed.map(|chapter| chapter.key)
    }

    /// Release the guard held by `ticket`. Returns false when the ticket
    /// belongs to a window that has since been replaced.
    pub fn settle(&mut self, ticket: PaginationTicket) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        let before = self.in_flight.len();
        self.in_flight.retain(|held| *held != ticket);
        self.in_flight.len() != before
    }

    /// Drop all pending work; outstanding tickets become stale.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.in_flight.clear();
    }

    pub fn is_busy(&self, edge: Edge) -> bool {
        match self.options.guard {
            GuardPolicy::Shared => !self.in_flight.is_empty(),
            GuardPolicy::PerEdge => self.in_flight.iter().any(|ticket| ticket.edge == edge),
        }
    }

    pub fn chapters(&self) -> impl Iterator<Item = &RenderedChapter> {
        self.chapters.iter()
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn first(&self) -> &RenderedChapter {
        &self.chapters[0]
    }

    pub fn last(&self) -> &RenderedChapter {
        &self.chapters[self.chapters.len() - 1]
    }

    pub fn get(&self, key: &str) -> Option<&RenderedChapter> {
        self.chapters.iter().find(|chapter| chapter.key == key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.chapters.iter().map(|chapter| chapter.key.clone()).collect()
    }
}
