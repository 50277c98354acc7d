use std::path::Path;

use chrono::{Local, NaiveDate, Utc};
use eyre::Result;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::ReaderError;
use crate::models::{FavoriteEntry, NoteEntry};
use crate::navigation::NavigationIntent;
use crate::streak::format_day;

pub trait FavoritesStore {
    fn is_favorite(&self, user: &str, reference: &str) -> Result<bool, ReaderError>;
    /// Flip the favorite and return the new state.
    fn toggle_favorite(&self, user: &str, reference: &str, preview: &str) -> Result<bool, ReaderError>;
}

pub trait NotesStore {
    /// Empty when the chapter has no note.
    fn get_note(&self, user: &str, abbrev: &str, chapter_index: usize) -> Result<String, ReaderError>;
    fn save_note(&self, user: &str, abbrev: &str, chapter_index: usize, text: &str) -> Result<(), ReaderError>;
}

pub trait ActivityStore {
    /// Idempotent per calendar day.
    fn record_activity_on(&self, user: &str, day: NaiveDate) -> Result<(), ReaderError>;
    /// Most recent first.
    fn fetch_recent_activity_days(&self, user: &str, limit: usize) -> Result<Vec<String>, ReaderError>;

    fn record_reading_activity(&self, user: &str) -> Result<(), ReaderError> {
        self.record_activity_on(user, Local::now().date_naive())
    }
}

pub struct State {
    conn: Connection,
}

impl State {
    /// Open (or create) `states.db` inside `data_dir`.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let filepath = data_dir.join("states.db");

        if let Some(parent) = filepath.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self::open(&filepath)?)
    }

    pub fn open(path: &Path) -> Result<Self, ReaderError> {
        let conn = Connection::open(path)?;
        Self::init_db(&conn)?;
        Ok(Self { conn })
    }

    fn init_db(conn: &Connection) -> Result<(), ReaderError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS favorites (
                user_id TEXT NOT NULL,
                id TEXT NOT NULL,
                reference TEXT NOT NULL,
                preview TEXT,
                created_at DATETIME NOT NULL,
                PRIMARY KEY (user_id, id)
            );

            CREATE TABLE IF NOT EXISTS notes (
                user_id TEXT NOT NULL,
                abbrev TEXT NOT NULL,
                chapter_index INTEGER NOT NULL,
                text TEXT NOT NULL,
                updated_at DATETIME NOT NULL,
                PRIMARY KEY (user_id, abbrev, chapter_index)
            );

            CREATE TABLE IF NOT EXISTS activity_log (
                user_id TEXT NOT NULL,
                day TEXT NOT NULL,
                PRIMARY KEY (user_id, day)
            );

            CREATE TABLE IF NOT EXISTS pending_navigation (
                slot INTEGER PRIMARY KEY CHECK (slot = 0),
                abbrev TEXT NOT NULL,
                chapter_index INTEGER NOT NULL,
                verse_index INTEGER
            );
            ",
        )?;
        Ok(())
    }

    pub fn list_favorites(&self, user: &str) -> Result<Vec<FavoriteEntry>, ReaderError> {
        let mut stmt = self.conn.prepare(
            "SELECT reference, preview, created_at FROM favorites WHERE user_id=? ORDER BY created_at DESC",
        )?;
        let favorites_iter = stmt.query_map(params![user], |row| {
            Ok(FavoriteEntry {
                reference: row.get(0)?,
                preview: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                created_at: row.get(2)?,
            })
        })?;

        let mut favorites = Vec::new();
        for favorite in favorites_iter {
            favorites.push(favorite?);
        }
        Ok(favorites)
    }

    pub fn count_favorites(&self, user: &str) -> Result<usize, ReaderError> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM favorites WHERE user_id=?",
            params![user],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn list_notes(&self, user: &str) -> Result<Vec<NoteEntry>, ReaderError> {
        let mut stmt = self.conn.prepare(
            "SELECT abbrev, chapter_index, text, updated_at FROM notes WHERE user_id=? ORDER BY updated_at DESC",
        )?;
        let notes_iter = stmt.query_map(params![user], |row| {
            Ok(NoteEntry {
                abbrev: row.get(0)?,
                chapter_index: row.get(1)?,
                text: row.get(2)?,
                updated_at: row.get(3)?,
            })
        })?;

        let mut notes = Vec::new();
        for note in notes_iter {
            notes.push(note?);
        }
        Ok(notes)
    }

    /// Replace the persisted deep link.
    pub fn set_pending_navigation(&self, intent: &NavigationIntent) -> Result<(), ReaderError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO pending_navigation (slot, abbrev, chapter_index, verse_index) VALUES (0, ?, ?, ?)",
            params![intent.abbrev, intent.chapter_index, intent.verse_index],
        )?;
        Ok(())
    }

    /// Read and clear the persisted deep link in one transaction.
    pub fn take_pending_navigation(&self) -> Result<Option<NavigationIntent>, ReaderError> {
        let tx = self.conn.unchecked_transaction()?;
        let intent = tx
            .query_row(
                "SELECT abbrev, chapter_index, verse_index FROM pending_navigation WHERE slot=0",
                [],
                |row| {
                    Ok(NavigationIntent {
                        abbrev: row.get(0)?,
                        chapter_index: row.get(1)?,
                        verse_index: row.get(2)?,
                    })
                },
            )
            .optional()?;
        tx.execute("DELETE FROM pending_navigation", [])?;
        tx.commit()?;
        Ok(intent)
    }
}

/// Stable short id for a favorite reference.
pub fn favorite_id(reference: &str) -> String {
    use sha1::{Digest, Sha1};
    let mut hasher = Sha1::new();
    hasher.update(reference.trim().as_bytes());
    let hash = hasher.finalize();
    hex::encode(hash)[..10].to_string()
}

impl FavoritesStore for State {
    fn is_favorite(&self, user: &str, reference: &str) -> Result<bool, ReaderError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM favorites WHERE user_id=? AND id=?",
                params![user, favorite_id(reference)],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn toggle_favorite(&self, user: &str, reference: &str, preview: &str) -> Result<bool, ReaderError> {
        let id = favorite_id(reference);
        let removed = self.conn.execute(
            "DELETE FROM favorites WHERE user_id=? AND id=?",
            params![user, id],
        )?;
        if removed > 0 {
            return Ok(false);
        }
        self.conn.execute(
            "INSERT INTO favorites (user_id, id, reference, preview, created_at) VALUES (?, ?, ?, ?, ?)",
            params![user, id, reference, preview, Utc::now()],
        )?;
        Ok(true)
    }
}

impl NotesStore for State {
    fn get_note(&self, user: &str, abbrev: &str, chapter_index: usize) -> Result<String, ReaderError> {
        let text = self
            .conn
            .query_row(
                "SELECT text FROM notes WHERE user_id=? AND abbrev=? AND chapter_index=?",
                params![user, abbrev, chapter_index],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(text.unwrap_or_default())
    }

    fn save_note(&self, user: &str, abbrev: &str, chapter_index: usize, text: &str) -> Result<(), ReaderError> {
        if text.trim().is_empty() {
            self.conn.execute(
                "DELETE FROM notes WHERE user_id=? AND abbrev=? AND chapter_index=?",
                params![user, abbrev, chapter_index],
            )?;
            return Ok(());
        }
        self.conn.execute(
            "INSERT OR REPLACE INTO notes (user_id, abbrev, chapter_index, text, updated_at) VALUES (?, ?, ?, ?, ?)",
            params![user, abbrev, chapter_index, text, Utc::now()],
        )?;
        Ok(())
    }
}

impl ActivityStore for State {
    fn record_activity_on(&self, user: &str, day: NaiveDate) -> Result<(), ReaderError> {
        self.conn.execute(
            "INSERT OR IGNORE INTO activity_log (user_id, day) VALUES (?, ?)",
            params![user, format_day(day)],
        )?;
        Ok(())
    }

    fn fetch_recent_activity_days(&self, user: &str, limit: usize) -> Result<Vec<String>, ReaderError> {
        let mut stmt = self
            .conn
            .prepare("SELECT day FROM activity_log WHERE user_id=? ORDER BY day DESC LIMIT ?")?;
        let days_iter = stmt.query_map(params![user, limit], |row| row.get::<_, String>(0))?;

        let mut days = Vec::new();
        for day in days_iter {
            days.push(day?);
        }
        Ok(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streak::compute_streak;
    use chrono::Days;
    use tempfile::TempDir;

    fn setup_test_state() -> (State, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_states.db");
        let state = State::open(&db_path).unwrap();
        (state, temp_dir)
    }

    #[test]
    fn test_state_database_initialization() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_init.db");
        assert!(!db_path.exists());
        let conn = Connection::open(&db_path).unwrap();
        State::init_db(&conn).unwrap();
        // running it twice must be harmless
        State::init_db(&conn).unwrap();
        assert!(db_path.exists());

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        for table in ["activity_log", "favorites", "notes", "pending_navigation"] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }
    }

    #[test]
    fn test_toggle_favorite() {
        let (state, _temp_dir) = setup_test_state();

        assert!(!state.is_favorite("ana", "Gênesis 1").unwrap());
        assert!(state.toggle_favorite("ana", "Gênesis 1", "No princípio...").unwrap());
        assert!(state.is_favorite("ana", "Gênesis 1").unwrap());
        // favorites are per user
        assert!(!state.is_favorite("bia", "Gênesis 1").unwrap());

        let favorites = state.list_favorites("ana").unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].reference, "Gênesis 1");
        assert_eq!(favorites[0].preview, "No princípio...");
        assert_eq!(state.count_favorites("ana").unwrap(), 1);

        assert!(!state.toggle_favorite("ana", "Gênesis 1", "").unwrap());
        assert!(!state.is_favorite("ana", "Gênesis 1").unwrap());
        assert!(state.list_favorites("ana").unwrap().is_empty());
    }

    #[test]
    fn test_favorite_id_is_stable() {
        assert_eq!(favorite_id("Salmos 23"), favorite_id(" Salmos 23 "));
        assert_ne!(favorite_id("Salmos 23"), favorite_id("Salmos 24"));
        assert_eq!(favorite_id("Salmos 23").len(), 10);
    }

    #[test]
    fn test_notes_round_trip() {
        let (state, _temp_dir) = setup_test_state();

        assert_eq!(state.get_note("ana", "gn", 0).unwrap(), "");
        state.save_note("ana", "gn", 0, "Luz no primeiro dia").unwrap();
        state.save_note("ana", "gn", 0, "Luz e trevas").unwrap();
        state.save_note("ana", "ex", 2, "Sarça").unwrap();
        assert_eq!(state.get_note("ana", "gn", 0).unwrap(), "Luz e trevas");
        assert_eq!(state.get_note("bia", "gn", 0).unwrap(), "");

        let notes = state.list_notes("ana").unwrap();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().any(|n| n.abbrev == "ex" && n.chapter_index == 2));
    }

    #[test]
    fn test_saving_empty_note_deletes_it() {
        let (state, _temp_dir) = setup_test_state();
        state.save_note("ana", "gn", 3, "texto").unwrap();
        state.save_note("ana", "gn", 3, "   ").unwrap();
        assert_eq!(state.get_note("ana", "gn", 3).unwrap(), "");
        assert!(state.list_notes("ana").unwrap().is_empty());
    }

    #[test]
    fn test_activity_is_idempotent_per_day() {
        let (state, _temp_dir) = setup_test_state();
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let yesterday = today.checked_sub_days(Days::new(1)).unwrap();

        state.record_activity_on("ana", today).unwrap();
        state.record_activity_on("ana", today).unwrap();
        state.record_activity_on("ana", yesterday).unwrap();
        state.record_activity_on("bia", today).unwrap();

        let days = state.fetch_recent_activity_days("ana", 30).unwrap();
        assert_eq!(days, vec!["2024-05-10", "2024-05-09"]);
        assert_eq!(compute_streak(&days, today), 2);
        assert_eq!(state.fetch_recent_activity_days("ana", 1).unwrap().len(), 1);
    }

    #[test]
    fn test_pending_navigation_is_consumed_once() {
        let (state, _temp_dir) = setup_test_state();
        assert!(state.take_pending_navigation().unwrap().is_none());

        state
            .set_pending_navigation(&NavigationIntent::new("sl", 22).with_verse(3))
            .unwrap();
        state.set_pending_navigation(&NavigationIntent::new("jo", 2)).unwrap();

        let intent = state.take_pending_navigation().unwrap().unwrap();
        assert_eq!(intent, NavigationIntent::new("jo", 2));
        assert!(state.take_pending_navigation().unwrap().is_none());
    }
}
