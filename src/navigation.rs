use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};

use regex::Regex;

use crate::error::ReaderError;
use crate::models::{Bible, JumpTarget};

/// Request to open the reader somewhere other than the default start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationIntent {
    pub abbrev: String,
    pub chapter_index: usize,
    pub verse_index: Option<usize>,
}

impl NavigationIntent {
    pub fn new(abbrev: impl Into<String>, chapter_index: usize) -> Self {
        Self {
            abbrev: abbrev.into(),
            chapter_index,
            verse_index: None,
        }
    }

    pub fn with_verse(mut self, verse_index: usize) -> Self {
        self.verse_index = Some(verse_index);
        self
    }

    /// Persisted form, `<abbrev>-<chapterIndex>`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.abbrev, self.chapter_index)
    }

    pub fn resolve(&self, bible: &Bible) -> Result<JumpTarget, ReaderError> {
        let position = bible
            .resolve(&self.abbrev, self.chapter_index)
            .ok_or_else(|| ReaderError::InvalidReference(self.key()))?;
        Ok(JumpTarget {
            position,
            verse: self.verse_index,
        })
    }
}

impl fmt::Display for NavigationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for NavigationIntent {
    type Err = ReaderError;

    /// Splits on the last `-` so abbreviations may contain dashes.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let invalid = || ReaderError::InvalidReference(value.to_string());
        let (abbrev, chapter) = value.rsplit_once('-').ok_or_else(invalid)?;
        if abbrev.is_empty() {
            return Err(invalid());
        }
        let chapter_index = chapter.parse::<usize>().map_err(|_| invalid())?;
        Ok(Self::new(abbrev, chapter_index))
    }
}

/// Holds at most one pending intent between views.
#[derive(Debug, Default)]
pub struct IntentRouter {
    pending: Mutex<Option<NavigationIntent>>,
}

impl IntentRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces whatever was pending.
    pub fn submit(&self, intent: NavigationIntent) {
        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(intent);
        }
    }

    /// Read and clear in one step.
    pub fn take(&self) -> Option<NavigationIntent> {
        self.pending.lock().ok().and_then(|mut pending| pending.take())
    }

    pub fn has_pending(&self) -> bool {
        self.pending.lock().map(|pending| pending.is_some()).unwrap_or(false)
    }
}

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(.+?)\s+(\d+)(?::(\d+))?\s*$").expect("valid reference regex"))
}

/// Intent for a human reference such as "Gênesis 1" or "Salmos 23:4",
/// matched against book names or abbreviations.
pub fn parse_reference(reference: &str, bible: &Bible) -> Option<NavigationIntent> {
    let captures = reference_regex().captures(reference)?;
    let book_text = captures.get(1)?.as_str();
    let book = bible.books().iter().find(|book| {
        book.name.eq_ignore_ascii_case(book_text)
            || book.name == book_text
            || book.abbrev.eq_ignore_ascii_case(book_text)
    })?;
    let chapter: usize = captures.get(2)?.as_str().parse().ok()?;
    let mut intent = NavigationIntent::new(book.abbrev.clone(), chapter.checked_sub(1)?);
    if let Some(verse) = captures.get(3).and_then(|v| v.as_str().parse::<usize>().ok()) {
        intent = intent.with_verse(verse.checked_sub(1)?);
    }
    Some(intent)
}

/// Where the reader should start: the intent if it resolves, else the
/// first chapter of the canon.
pub fn start_target(intent: Option<&NavigationIntent>, bible: &Bible) -> Option<JumpTarget> {
    if let Some(intent) = intent {
        match intent.resolve(bible) {
            Ok(target) => return Some(target),
            Err(err) => log::warn!("ignoring navigation intent: {}", err),
        }
    }
    bible.first_position().map(|position| JumpTarget {
        position,
        verse: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, ChapterPosition};

    fn bible() -> Bible {
        let book = |abbrev: &str, chapters: usize| Book {
            abbrev: abbrev.to_string(),
            name: abbrev.to_string(),
            chapters: vec![vec!["v".to_string()]; chapters],
        };
        Bible::new(vec![book("gn", 2), book("1sm", 3)])
    }

    #[test]
    fn test_key_parse_and_format() {
        let intent: NavigationIntent = "1sm-2".parse().unwrap();
        assert_eq!(intent, NavigationIntent::new("1sm", 2));
        assert_eq!(intent.to_string(), "1sm-2");

        let dashed: NavigationIntent = "x-y-4".parse().unwrap();
        assert_eq!(dashed.abbrev, "x-y");
        assert_eq!(dashed.chapter_index, 4);

        assert!("gn".parse::<NavigationIntent>().is_err());
        assert!("-3".parse::<NavigationIntent>().is_err());
        assert!("gn-x".parse::<NavigationIntent>().is_err());
    }

    #[test]
    fn test_parse_human_reference() {
        let bible = bible();
        assert_eq!(parse_reference("gn 2", &bible), Some(NavigationIntent::new("gn", 1)));
        assert_eq!(
            parse_reference("1SM 3:4", &bible),
            Some(NavigationIntent::new("1sm", 2).with_verse(3))
        );
        assert_eq!(parse_reference("gn 0", &bible), None);
        assert_eq!(parse_reference("Apocalipse 1", &bible), None);
        assert_eq!(parse_reference("gn", &bible), None);
    }

    #[test]
    fn test_take_clears_pending_intent() {
        let router = IntentRouter::new();
        assert!(router.take().is_none());

        router.submit(NavigationIntent::new("gn", 0));
        router.submit(NavigationIntent::new("gn", 1));
        assert!(router.has_pending());
        assert_eq!(router.take(), Some(NavigationIntent::new("gn", 1)));
        assert!(router.take().is_none());
        assert!(!router.has_pending());
    }

    #[test]
    fn test_start_target_falls_back_on_unknown_reference() {
        let bible = bible();
        let good = NavigationIntent::new("1sm", 2).with_verse(0);
        assert_eq!(
            start_target(Some(&good), &bible),
            Some(JumpTarget {
                position: ChapterPosition::new(1, 2),
                verse: Some(0),
            })
        );

        let bad = NavigationIntent::new("1sm", 9);
        assert_eq!(
            start_target(Some(&bad), &bible),
            Some(JumpTarget {
                position: ChapterPosition::new(0, 0),
                verse: None,
            })
        );
        assert_eq!(start_target(None, &bible).unwrap().position, ChapterPosition::new(0, 0));
    }
}
