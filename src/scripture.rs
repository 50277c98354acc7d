//! Scripture dataset loading.
//!
//! The dataset is a JSON array of `{"abbrev": "gn", "chapters": [["v1", ...], ...]}`
//! objects in canonical order. It is fetched once per [`ScriptureService`] and
//! shared read-only afterwards.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;
use serde::Deserialize;

use crate::error::ReaderError;
use crate::models::{Bible, Book};

pub const BOOK_NAMES: &[(&str, &str)] = &[
    ("gn", "Gênesis"),
    ("ex", "Êxodo"),
    ("lv", "Levítico"),
    ("nm", "Números"),
    ("dt", "Deuteronômio"),
    ("js", "Josué"),
    ("jz", "Juízes"),
    ("rt", "Rute"),
    ("1sm", "1 Samuel"),
    ("2sm", "2 Samuel"),
    ("1rs", "1 Reis"),
    ("2rs", "2 Reis"),
    ("1cr", "1 Crônicas"),
    ("2cr", "2 Crônicas"),
    ("ed", "Esdras"),
    ("ne", "Neemias"),
    ("et", "Ester"),
    ("job", "Jó"),
    ("sl", "Salmos"),
    ("pv", "Provérbios"),
    ("ec", "Eclesiastes"),
    ("ct", "Cânticos"),
    ("is", "Isaías"),
    ("jr", "Jeremias"),
    ("lm", "Lamentações"),
    ("ez", "Ezequiel"),
    ("dn", "Daniel"),
    ("os", "Oséias"),
    ("jl", "Joel"),
    ("am", "Amós"),
    ("ob", "Obadias"),
    ("jn", "Jonas"),
    ("mq", "Miquéias"),
    ("na", "Naum"),
    ("hc", "Habacuque"),
    ("sf", "Sofonias"),
    ("ag", "Ageu"),
    ("zc", "Zacarias"),
    ("ml", "Malaquias"),
    ("mt", "Mateus"),
    ("mc", "Marcos"),
    ("lc", "Lucas"),
    ("jo", "João"),
    ("at", "Atos"),
    ("rm", "Romanos"),
    ("1co", "1 Coríntios"),
    ("2co", "2 Coríntios"),
    ("gl", "Gálatas"),
    ("ef", "Efésios"),
    ("fp", "Filipenses"),
    ("cl", "Colossenses"),
    ("1ts", "1 Tessalonicenses"),
    ("2ts", "2 Tessalonicenses"),
    ("1tm", "1 Timóteo"),
    ("2tm", "2 Timóteo"),
    ("tt", "Tito"),
    ("fm", "Filemom"),
    ("hb", "Hebreus"),
    ("tg", "Tiago"),
    ("1pe", "1 Pedro"),
    ("2pe", "2 Pedro"),
    ("1jo", "1 João"),
    ("2jo", "2 João"),
    ("3jo", "3 João"),
    ("jd", "Judas"),
    ("ap", "Apocalipse"),
];

/// Display name for an abbreviation; unknown abbreviations display as-is.
pub fn display_name(abbrev: &str) -> String {
    BOOK_NAMES
        .iter()
        .find(|(key, _)| *key == abbrev)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| abbrev.to_string())
}

/// Compact label for an abbreviation: `"1sm"` -> `"1Sm"`, `"gn"` -> `"Gn"`.
pub fn format_abbreviation(abbrev: &str) -> String {
    static NUMBERED: OnceLock<Regex> = OnceLock::new();
    let numbered = NUMBERED.get_or_init(|| Regex::new(r"^(\d)(\p{L}+)$").expect("valid regex"));

    if let Some(caps) = numbered.captures(abbrev) {
        return format!("{}{}", &caps[1], title_case(&caps[2]));
    }

    let mut chars = abbrev.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// One book as it appears in the dataset file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBook {
    pub abbrev: String,
    pub chapters: Vec<Vec<String>>,
}

/// Where the canonical text comes from.
pub trait DatasetSource: Send + Sync {
    fn fetch_scripture_dataset(&self) -> Result<Vec<RawBook>, ReaderError>;

    fn describe(&self) -> String;
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetSource for FileSource {
    fn fetch_scripture_dataset(&self) -> Result<Vec<RawBook>, ReaderError> {
        let text = fs::read_to_string(&self.path).map_err(|err| {
            ReaderError::DataUnavailable(format!("{}: {}", self.path.display(), err))
        })?;
        parse_dataset(&text)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

pub struct HttpSource {
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl DatasetSource for HttpSource {
    fn fetch_scripture_dataset(&self) -> Result<Vec<RawBook>, ReaderError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("luz/0.1")
            .build()?;
        let text = client.get(&self.url).send()?.error_for_status()?.text()?;
        parse_dataset(&text)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Pick a source from a path or an http(s) URL.
pub fn source_for(location: &str) -> Box<dyn DatasetSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpSource::new(location))
    } else {
        Box::new(FileSource::new(location))
    }
}

pub fn parse_dataset(text: &str) -> Result<Vec<RawBook>, ReaderError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    Ok(serde_json::from_str(text)?)
}

/// Validate the raw dataset and inject display names.
pub fn build_bible(raw: Vec<RawBook>) -> Result<Bible, ReaderError> {
    if raw.is_empty() {
        return Err(ReaderError::DataUnavailable("dataset has no books".to_string()));
    }

    let mut seen = HashSet::new();
    let mut books = Vec::with_capacity(raw.len());
    for book in raw {
        if book.abbrev.is_empty() {
            return Err(ReaderError::DataUnavailable("book without abbreviation".to_string()));
        }
        if book.chapters.is_empty() {
            return Err(ReaderError::DataUnavailable(format!("book '{}' has no chapters", book.abbrev)));
        }
        if !seen.insert(book.abbrev.clone()) {
            return Err(ReaderError::DataUnavailable(format!("duplicate book '{}'", book.abbrev)));
        }
        books.push(Book {
            name: display_name(&book.abbrev),
            abbrev: book.abbrev,
            chapters: book.chapters,
        });
    }

    Ok(Bible::new(books))
}

/// Application-wide access to the canon. Construct once at start-up and
/// share; [`ScriptureService::load`] fetches on the first successful call only.
pub struct ScriptureService {
    source: Box<dyn DatasetSource>,
    cache: OnceLock<Arc<Bible>>,
    loading: Mutex<()>,
}

impl ScriptureService {
    pub fn new(source: Box<dyn DatasetSource>) -> Self {
        Self {
            source,
            cache: OnceLock::new(),
            loading: Mutex::new(()),
        }
    }

    pub fn load(&self) -> Result<Arc<Bible>, ReaderError> {
        if let Some(bible) = self.cache.get() {
            return Ok(Arc::clone(bible));
        }

        let _guard = self
            .loading
            .lock()
            .map_err(|_| ReaderError::DataUnavailable("dataset loader poisoned".to_string()))?;
        if let Some(bible) = self.cache.get() {
            return Ok(Arc::clone(bible));
        }

        log::info!("loading scripture dataset from {}", self.source.describe());
        let raw = self.source.fetch_scripture_dataset().inspect_err(|err| {
            log::error!("error loading scripture dataset: {}", err);
        })?;
        let bible = Arc::new(build_bible(raw)?);
        log::debug!(
            "loaded {} books, {} chapters",
            bible.books().len(),
            bible.total_chapters()
        );
        let _ = self.cache.set(Arc::clone(&bible));
        Ok(bible)
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.get().is_some()
    }
}
