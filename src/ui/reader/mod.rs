use arboard::Clipboard;
use std::cell::RefCell;
use std::collections::HashSet;
use std::io;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::config::Config;
use crate::engine::ReadingEngine;
use crate::error::ReaderError;
use crate::events::{self, FavoriteBus, FavoriteUpdated};
use crate::logging;
use crate::models::{Bible, Direction as AppDirection, FavoriteEntry, NoteEntry, WindowType};
use crate::navigation::{IntentRouter, NavigationIntent, parse_reference, start_target};
use crate::picker::{NavigationPicker, PickerOutcome};
use crate::scripture::{ScriptureService, display_name};
use crate::session::Session;
use crate::state::{ActivityStore, FavoritesStore, NotesStore, State};
use crate::streak::{RECENT_ACTIVITY_LIMIT, compute_streak};
use crate::ui::board::Board;
use crate::ui::windows::{
    favorites::FavoritesWindow, help::HelpWindow, note_editor::NoteEditorWindow,
    notes::NotesWindow, picker::PickerWindow, profile::ProfileWindow,
};

/// Upper bound on engine ticks per frame; pagination resumes next frame.
const MAX_TICKS_PER_FRAME: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

/// Application state that encompasses all UI and reading state
#[derive(Debug, Clone)]
pub struct ApplicationState {
    pub config: Config,
    pub session: Session,
    pub ui_state: UiState,
    pub load_state: LoadState,
    pub should_quit: bool,
    pub count_prefix: String, // For command repetition (e.g., "5j")
    pub streak: u32,
    /// References of favorited chapters, fed by the favorite bus.
    pub favorites: HashSet<String>,
}

impl ApplicationState {
    pub fn new(config: Config, session: Session) -> Self {
        Self {
            config,
            session,
            ui_state: UiState::new(),
            load_state: LoadState::Loading,
            should_quit: false,
            count_prefix: String::new(),
            streak: 0,
            favorites: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub active_window: WindowType,
    pub show_help: bool,
    pub show_picker: bool,
    pub show_note_editor: bool,
    pub show_notes: bool,
    pub show_favorites: bool,
    pub show_profile: bool,
    pub help_scroll_offset: u16,
    pub note_target: Option<(String, usize)>,
    pub note_title: String,
    pub note_text: String,
    pub notes: Vec<NoteEntry>,
    pub notes_selected_index: usize,
    pub favorite_entries: Vec<FavoriteEntry>,
    pub favorites_selected_index: usize,
    pub favorites_count: usize,
    pub message: Option<String>,
    pub message_type: MessageType,
    pub message_time: Option<Instant>,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    pub fn new() -> Self {
        Self {
            active_window: WindowType::Reader,
            show_help: false,
            show_picker: false,
            show_note_editor: false,
            show_notes: false,
            show_favorites: false,
            show_profile: false,
            help_scroll_offset: 0,
            note_target: None,
            note_title: String::new(),
            note_text: String::new(),
            notes: Vec::new(),
            notes_selected_index: 0,
            favorite_entries: Vec::new(),
            favorites_selected_index: 0,
            favorites_count: 0,
            message: None,
            message_type: MessageType::Info,
            message_time: None,
        }
    }

    pub fn set_message(&mut self, message: String, message_type: MessageType) {
        self.message = Some(message);
        self.message_type = message_type;
        self.message_time = Some(Instant::now());
    }

    pub fn clear_message(&mut self) {
        self.message = None;
        self.message_time = None;
    }

    /// Returns true if the current message has expired (older than 3 seconds).
    pub fn message_expired(&self) -> bool {
        self.message_time
            .is_some_and(|t| t.elapsed() >= Duration::from_secs(3))
    }

    /// Persist the note being edited. Success closes the editor; a failure
    /// keeps it open with the text intact and an error on the status line.
    pub fn save_note(&mut self, store: &dyn NotesStore, user: &str) -> Result<(), ReaderError> {
        let Some((abbrev, chapter_index)) = self.note_target.clone() else {
            self.open_window(WindowType::Reader);
            return Ok(());
        };
        match store.save_note(user, &abbrev, chapter_index, &self.note_text) {
            Ok(()) => {
                let message = if self.note_text.trim().is_empty() {
                    "Note deleted"
                } else {
                    "Note saved"
                };
                self.note_target = None;
                self.open_window(WindowType::Reader);
                self.set_message(message.to_string(), MessageType::Info);
                Ok(())
            }
            Err(err) => {
                log::error!("saving note for {}-{} failed: {}", abbrev, chapter_index, err);
                self.set_message(err.user_message(), MessageType::Error);
                Err(err)
            }
        }
    }

    pub fn open_window(&mut self, window_type: WindowType) {
        self.active_window = window_type.clone();
        match window_type {
            WindowType::Reader => {
                self.show_help = false;
                self.show_picker = false;
                self.show_note_editor = false;
                self.show_notes = false;
                self.show_favorites = false;
                self.show_profile = false;
            }
            WindowType::Help => {
                self.show_help = true;
                self.help_scroll_offset = 0;
            }
            WindowType::Picker => self.show_picker = true,
            WindowType::NoteEditor => self.show_note_editor = true,
            WindowType::Notes => {
                self.show_notes = true;
                self.notes_selected_index = 0;
            }
            WindowType::Favorites => {
                self.show_favorites = true;
                self.favorites_selected_index = 0;
            }
            WindowType::Profile => self.show_profile = true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum MessageType {
    Info,
    Warning,
    Error,
}

/// Main reader application struct
pub struct Reader {
    state: Rc<RefCell<ApplicationState>>,
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    db_state: State,
    board: Board,
    clipboard: Option<Clipboard>,
    service: Arc<ScriptureService>,
    engine: Option<ReadingEngine>,
    picker: NavigationPicker,
    router: IntentRouter,
    favorite_bus: FavoriteBus,
    favorite_rx: Receiver<FavoriteUpdated>,
    /// Chapter references already looked up in the favorites store.
    checked_favorites: HashSet<String>,
    dataset_rx: Option<Receiver<Result<Arc<Bible>, ReaderError>>>,
}

impl Reader {
    pub fn new(config: Config, session: Session, service: Arc<ScriptureService>) -> eyre::Result<Self> {
        let backend = CrosstermBackend::new(io::stdout());
        let terminal = Terminal::new(backend)?;

        let db_state = State::new(&config.data_dir())?;
        let board = Board::new()
            .with_text_width(config.settings.text_width())
            .with_verse_numbers(config.settings.show_verse_numbers);
        let favorite_bus = FavoriteBus::new();
        let favorite_rx = favorite_bus.subscribe();

        let app_state = ApplicationState::new(config, session);

        Ok(Self {
            state: Rc::new(RefCell::new(app_state)),
            terminal,
            db_state,
            board,
            clipboard: None,
            service,
            engine: None,
            picker: NavigationPicker::new(),
            router: IntentRouter::new(),
            favorite_bus,
            favorite_rx,
            checked_favorites: HashSet::new(),
            dataset_rx: None,
        })
    }

    /// Fetch the dataset off the UI thread.
    fn start_loading(&mut self) {
        let (tx, rx) = mpsc::channel();
        let service = Arc::clone(&self.service);
        std::thread::spawn(move || {
            let _ = tx.send(service.load());
        });
        self.dataset_rx = Some(rx);
        self.state.borrow_mut().load_state = LoadState::Loading;
    }

    fn poll_dataset(&mut self) {
        let received = match &self.dataset_rx {
            Some(rx) => rx.try_recv(),
            None => return,
        };
        match received {
            Ok(Ok(bible)) => {
                self.dataset_rx = None;
                self.on_dataset_ready(bible);
            }
            Ok(Err(err)) => {
                self.dataset_rx = None;
                log::error!("scripture dataset failed to load: {}", err);
                self.state.borrow_mut().load_state = LoadState::Failed(err.to_string());
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.dataset_rx = None;
                self.state.borrow_mut().load_state =
                    LoadState::Failed("dataset loader stopped unexpectedly".to_string());
            }
        }
    }

    fn on_dataset_ready(&mut self, bible: Arc<Bible>) {
        let settings = self.state.borrow().config.settings.clone();
        match ReadingEngine::new(bible, settings.window_options(), settings.coordinator_options()) {
            Ok(engine) => self.engine = Some(engine),
            Err(err) => {
                log::error!("cannot open the reading window: {}", err);
                self.state.borrow_mut().load_state = LoadState::Failed(err.to_string());
                return;
            }
        }
        self.state.borrow_mut().load_state = LoadState::Ready;

        match self.db_state.take_pending_navigation() {
            Ok(Some(intent)) => self.router.submit(intent),
            Ok(None) => {}
            Err(err) => log::warn!("could not read pending navigation: {}", err),
        }

        self.record_activity();
    }

    fn record_activity(&mut self) {
        let Some(user) = self.state.borrow().session.user_id().map(str::to_string) else {
            return;
        };
        if let Err(err) = self.db_state.record_reading_activity(&user) {
            log::warn!("could not record reading activity: {}", err);
        }
        self.refresh_streak(&user);
    }

    fn refresh_streak(&mut self, user: &str) {
        match self
            .db_state
            .fetch_recent_activity_days(user, RECENT_ACTIVITY_LIMIT)
        {
            Ok(days) => {
                self.state.borrow_mut().streak = compute_streak(&days, Local::now().date_naive());
            }
            Err(err) => log::warn!("could not load reading activity: {}", err),
        }
    }

    fn apply_pending_intent(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let Some(intent) = self.router.take() else {
            return;
        };
        let Some(target) = start_target(Some(&intent), engine.bible()) else {
            return;
        };
        if let Err(err) = engine.jump(target) {
            self.state
                .borrow_mut()
                .ui_state
                .set_message(err.user_message(), MessageType::Error);
        }
    }

    fn drain_favorite_events(&mut self) {
        let mut state = self.state.borrow_mut();
        while let Ok(event) = self.favorite_rx.try_recv() {
            if event.is_favorite {
                state.favorites.insert(event.reference);
            } else {
                state.favorites.remove(&event.reference);
            }
        }
    }

    /// Lay out and paginate until the window covers the viewport.
    fn settle_engine(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let (term_width, term_height) = crossterm::terminal::size().unwrap_or((80, 24));
        let text_width = self.state.borrow().config.settings.text_width();
        let (_, content_area) = Self::reader_areas(Rect::new(0, 0, term_width, term_height), text_width);

        engine.set_viewport_height(content_area.height as usize);
        if self.board.set_text_width(content_area.width.max(1) as usize) {
            engine.relayout();
        }
        let mut rounds = 0;
        while engine.tick(&mut self.board) {
            rounds += 1;
            if rounds >= MAX_TICKS_PER_FRAME {
                log::debug!("window still settling after {} ticks", rounds);
                break;
            }
        }
        self.refresh_chapter_favorites();
    }

    /// Look up the favorite flag of chapters that just entered the window.
    fn refresh_chapter_favorites(&mut self) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let Some(user) = self.state.borrow().session.user_id().map(str::to_string) else {
            return;
        };
        for chapter in engine.window().chapters() {
            let reference = chapter.reference();
            if !self.checked_favorites.insert(reference.clone()) {
                continue;
            }
            match self.db_state.is_favorite(&user, &reference) {
                Ok(true) => {
                    self.state.borrow_mut().favorites.insert(reference);
                }
                Ok(false) => {}
                Err(err) => log::warn!("could not read favorite {}: {}", reference, err),
            }
        }
    }

    /// Run the main application loop
    pub fn run(&mut self) -> eyre::Result<()> {
        let log_path = self.state.borrow().config.data_dir().join("luz.log");
        if let Err(err) = logging::redirect_to_file(&log_path) {
            log::warn!("cannot write log file {}: {}", log_path.display(), err);
        }

        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen)?;

        self.terminal.clear()?;
        self.terminal.hide_cursor()?;

        self.start_loading();
        let result = self.event_loop();

        if let Some(engine) = self.engine.as_mut() {
            engine.teardown();
        }

        self.terminal.clear()?;
        self.terminal.show_cursor()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
        crossterm::terminal::disable_raw_mode()?;
        logging::redirect_to_stderr();

        result
    }

    fn event_loop(&mut self) -> eyre::Result<()> {
        loop {
            if self.state.borrow().should_quit {
                break;
            }

            // Auto-clear expired messages before rendering
            {
                let mut state = self.state.borrow_mut();
                if state.ui_state.message_expired() {
                    state.ui_state.clear_message();
                }
            }

            self.poll_dataset();
            self.drain_favorite_events();
            self.apply_pending_intent();
            self.settle_engine();

            // Render UI
            {
                let state = self.state.clone();
                self.terminal.draw(|f| {
                    let state_ref = state.borrow();
                    Self::render_static(f, &state_ref, &self.board, self.engine.as_ref(), &self.picker);
                })?;
            }

            // Poll with timeout so we can re-render when messages expire or the
            // jump highlight fades
            let poll_timeout = {
                let state = self.state.borrow();
                let highlighting = self
                    .engine
                    .as_ref()
                    .is_some_and(|engine| engine.coordinator().highlight_pending());
                if self.dataset_rx.is_some() {
                    Duration::from_millis(100)
                } else if highlighting {
                    Duration::from_millis(250)
                } else {
                    match state.ui_state.message_time {
                        Some(t) => {
                            let elapsed = t.elapsed();
                            let expiry = Duration::from_secs(3);
                            if elapsed < expiry {
                                expiry - elapsed
                            } else {
                                Duration::from_millis(100)
                            }
                        }
                        None => Duration::from_secs(60),
                    }
                }
            };

            if !crossterm::event::poll(poll_timeout)? {
                continue;
            }

            if let Ok(event) = crossterm::event::read() {
                match event {
                    Event::Key(key) => {
                        if key.kind == KeyEventKind::Press {
                            self.handle_key_event(key)?;
                        }
                    }
                    Event::Resize(_, _) => {
                        // the next settle pass picks up the new geometry
                        if let Some(engine) = self.engine.as_mut() {
                            engine.relayout();
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Handle keyboard input events
    fn handle_key_event(&mut self, key: KeyEvent) -> eyre::Result<()> {
        {
            let mut state = self.state.borrow_mut();
            if state.ui_state.message.is_some()
                && state.ui_state.active_window == WindowType::Reader
            {
                state.ui_state.clear_message();
            }
        }

        let active_window = self.state.borrow().ui_state.active_window.clone();
        if active_window == WindowType::Reader
            && let KeyCode::Char(c) = key.code
            && c.is_ascii_digit()
        {
            let mut state = self.state.borrow_mut();
            if state.count_prefix.len() < 6 {
                state.count_prefix.push(c);
            }
            return Ok(());
        }

        let repeat_count = {
            let state = self.state.borrow();
            if state.count_prefix.is_empty() {
                1
            } else {
                state.count_prefix.parse().unwrap_or(1)
            }
        };

        match active_window {
            WindowType::Help => self.handle_help_mode_keys(key, repeat_count)?,
            WindowType::Picker => self.handle_picker_mode_keys(key, repeat_count)?,
            WindowType::NoteEditor => self.handle_note_editor_keys(key)?,
            WindowType::Notes => self.handle_notes_mode_keys(key, repeat_count)?,
            WindowType::Favorites => self.handle_favorites_mode_keys(key, repeat_count)?,
            WindowType::Profile => self.handle_profile_mode_keys(key)?,
            WindowType::Reader => self.handle_normal_mode_keys(key, repeat_count)?,
        }

        self.state.borrow_mut().count_prefix.clear();
        Ok(())
    }

    /// Handle keys in normal reading mode
    fn handle_normal_mode_keys(&mut self, key: KeyEvent, repeat_count: u32) -> eyre::Result<()> {
        match key.code {
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.move_cursor(AppDirection::HalfPageDown, repeat_count);
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.move_cursor(AppDirection::HalfPageUp, repeat_count);
            }
            KeyCode::Char('q') => {
                self.state.borrow_mut().should_quit = true;
            }
            KeyCode::Char('?') => {
                self.state.borrow_mut().ui_state.open_window(WindowType::Help);
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.move_cursor(AppDirection::Down, repeat_count);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.move_cursor(AppDirection::Up, repeat_count);
            }
            KeyCode::PageDown | KeyCode::Char(' ') => {
                self.move_cursor(AppDirection::PageDown, repeat_count);
            }
            KeyCode::PageUp => {
                self.move_cursor(AppDirection::PageUp, repeat_count);
            }
            KeyCode::Char('g') => self.open_picker(),
            KeyCode::Char('f') => self.toggle_favorite(),
            KeyCode::Char('n') => self.open_note_editor(),
            KeyCode::Char('N') => self.open_notes_window(),
            KeyCode::Char('F') => self.open_favorites_window(),
            KeyCode::Char('p') => self.open_profile_window(),
            KeyCode::Char('y') => self.share_active_verse(),
            _ => {}
        }
        Ok(())
    }

    fn move_cursor(&mut self, direction: AppDirection, repeat_count: u32) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let count = repeat_count.max(1) as isize;
        let page = engine.page_size() as isize;
        let half = (page / 2).max(1);
        let delta = match direction {
            AppDirection::Up => -count,
            AppDirection::Down => count,
            AppDirection::PageUp => -page * count,
            AppDirection::PageDown => page * count,
            AppDirection::HalfPageUp => -half * count,
            AppDirection::HalfPageDown => half * count,
        };
        engine.scroll_by(delta);
    }

    /// Handle common list navigation keys (Esc/q to close, j/k to move selection).
    /// Returns `true` if the key was consumed, `false` if it should be handled by the caller.
    fn handle_list_nav(
        &self,
        key: &KeyEvent,
        repeat_count: u32,
        list_len: usize,
        index: &mut usize,
    ) -> bool {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.state.borrow_mut().ui_state.open_window(WindowType::Reader);
                true
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if list_len > 0 {
                    *index = index.saturating_add(repeat_count as usize).min(list_len - 1);
                }
                true
            }
            KeyCode::Char('k') | KeyCode::Up => {
                *index = index.saturating_sub(repeat_count as usize);
                true
            }
            _ => false,
        }
    }

    fn handle_picker_mode_keys(&mut self, key: KeyEvent, repeat_count: u32) -> eyre::Result<()> {
        let Some(bible) = self.engine.as_ref().map(|engine| Arc::clone(engine.bible())) else {
            self.close_picker();
            return Ok(());
        };
        let count = repeat_count.max(1) as isize;
        match key.code {
            KeyCode::Char('q') => self.close_picker(),
            KeyCode::Char('j') | KeyCode::Down => self.picker.move_selection(count, &bible),
            KeyCode::Char('k') | KeyCode::Up => self.picker.move_selection(-count, &bible),
            KeyCode::PageDown => self.picker.move_selection(10 * count, &bible),
            KeyCode::PageUp => self.picker.move_selection(-10 * count, &bible),
            KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
                if let PickerOutcome::Jump(target) = self.picker.select(&bible) {
                    self.close_picker();
                    if let Some(engine) = self.engine.as_mut()
                        && let Err(err) = engine.jump(target)
                    {
                        self.state
                            .borrow_mut()
                            .ui_state
                            .set_message(err.user_message(), MessageType::Error);
                    }
                }
            }
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('h') | KeyCode::Left => {
                if self.picker.back() == PickerOutcome::Closed {
                    self.close_picker();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn open_picker(&mut self) {
        if self.engine.is_none() {
            return;
        }
        self.picker.open();
        self.state.borrow_mut().ui_state.open_window(WindowType::Picker);
    }

    fn close_picker(&mut self) {
        self.picker.close();
        self.state.borrow_mut().ui_state.open_window(WindowType::Reader);
    }

    fn handle_note_editor_keys(&mut self, key: KeyEvent) -> eyre::Result<()> {
        match key.code {
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => self.save_note(),
            KeyCode::Esc => {
                let mut state = self.state.borrow_mut();
                state.ui_state.note_target = None;
                state.ui_state.open_window(WindowType::Reader);
            }
            KeyCode::Enter => self.state.borrow_mut().ui_state.note_text.push('\n'),
            KeyCode::Backspace => {
                self.state.borrow_mut().ui_state.note_text.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.borrow_mut().ui_state.note_text.push(c);
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_notes_mode_keys(&mut self, key: KeyEvent, repeat_count: u32) -> eyre::Result<()> {
        let (list_len, mut index) = {
            let s = self.state.borrow();
            (s.ui_state.notes.len(), s.ui_state.notes_selected_index)
        };
        if self.handle_list_nav(&key, repeat_count, list_len, &mut index) {
            self.state.borrow_mut().ui_state.notes_selected_index = index;
        } else if key.code == KeyCode::Enter {
            let note = self.state.borrow().ui_state.notes.get(index).cloned();
            if let Some(note) = note {
                self.router
                    .submit(NavigationIntent::new(note.abbrev, note.chapter_index));
                self.state.borrow_mut().ui_state.open_window(WindowType::Reader);
            }
        }
        Ok(())
    }

    fn handle_favorites_mode_keys(&mut self, key: KeyEvent, repeat_count: u32) -> eyre::Result<()> {
        let (list_len, mut index) = {
            let s = self.state.borrow();
            (s.ui_state.favorite_entries.len(), s.ui_state.favorites_selected_index)
        };
        if self.handle_list_nav(&key, repeat_count, list_len, &mut index) {
            self.state.borrow_mut().ui_state.favorites_selected_index = index;
        } else if key.code == KeyCode::Enter {
            let reference = self
                .state
                .borrow()
                .ui_state
                .favorite_entries
                .get(index)
                .map(|entry| entry.reference.clone());
            let Some(reference) = reference else {
                return Ok(());
            };
            let intent = self
                .engine
                .as_ref()
                .and_then(|engine| parse_reference(&reference, engine.bible()));
            let mut state = self.state.borrow_mut();
            match intent {
                Some(intent) => {
                    self.router.submit(intent);
                    state.ui_state.open_window(WindowType::Reader);
                }
                None => state.ui_state.set_message(
                    ReaderError::InvalidReference(reference).user_message(),
                    MessageType::Warning,
                ),
            }
        }
        Ok(())
    }

    fn handle_profile_mode_keys(&mut self, key: KeyEvent) -> eyre::Result<()> {
        let signed_in = self.state.borrow().session.is_signed_in();
        match key.code {
            KeyCode::Char('L') if signed_in => self.logout()?,
            _ => self.state.borrow_mut().ui_state.open_window(WindowType::Reader),
        }
        Ok(())
    }

    fn handle_help_mode_keys(&mut self, key: KeyEvent, repeat_count: u32) -> eyre::Result<()> {
        let (term_width, term_height) = crossterm::terminal::size().unwrap_or((80, 24));
        let max_offset = HelpWindow::max_scroll_offset(Rect::new(0, 0, term_width, term_height));

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') | KeyCode::Enter => {
                let mut state = self.state.borrow_mut();
                state.ui_state.open_window(WindowType::Reader);
            }
            KeyCode::Char('j') | KeyCode::Down => {
                let mut state = self.state.borrow_mut();
                state.ui_state.help_scroll_offset = state
                    .ui_state
                    .help_scroll_offset
                    .saturating_add(repeat_count as u16)
                    .min(max_offset);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                let mut state = self.state.borrow_mut();
                state.ui_state.help_scroll_offset = state
                    .ui_state
                    .help_scroll_offset
                    .saturating_sub(repeat_count as u16);
            }
            _ => {}
        }
        Ok(())
    }

    /// Signed-in user, or a prompt on the status line.
    fn require_user(&self) -> Option<String> {
        let mut state = self.state.borrow_mut();
        match state.session.require_user() {
            Ok(user) => Some(user.to_string()),
            Err(err) => {
                state
                    .ui_state
                    .set_message(err.user_message(), MessageType::Warning);
                None
            }
        }
    }

    /// Flip the favorite of the focused chapter. The star changes before the
    /// store answers and is put back if the store fails.
    fn toggle_favorite(&mut self) {
        let Some(user) = self.require_user() else {
            return;
        };
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let chapter = engine.focused_chapter();
        let reference = chapter.reference();
        let preview = chapter.preview();
        let was_favorite = self.state.borrow().favorites.contains(&reference);

        let result = events::toggle_favorite(
            &self.db_state,
            &self.favorite_bus,
            &user,
            &reference,
            &preview,
            was_favorite,
        );
        let (text, message_type) = match result {
            Ok(true) => (format!("{} added to favorites", reference), MessageType::Info),
            Ok(false) => (format!("{} removed from favorites", reference), MessageType::Info),
            Err(err) => (err.user_message(), MessageType::Error),
        };
        self.state.borrow_mut().ui_state.set_message(text, message_type);
    }

    fn open_note_editor(&mut self) {
        let Some(user) = self.require_user() else {
            return;
        };
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let chapter = engine.focused_chapter();
        let (abbrev, chapter_index, title) = (
            chapter.abbrev.clone(),
            chapter.chapter_index(),
            chapter.reference(),
        );

        let mut state = self.state.borrow_mut();
        match self.db_state.get_note(&user, &abbrev, chapter_index) {
            Ok(text) => {
                state.ui_state.note_target = Some((abbrev, chapter_index));
                state.ui_state.note_title = title;
                state.ui_state.note_text = text;
                state.ui_state.open_window(WindowType::NoteEditor);
            }
            Err(err) => {
                log::error!("loading note for {} failed: {}", title, err);
                state
                    .ui_state
                    .set_message(err.user_message(), MessageType::Error);
            }
        }
    }

    /// Failures keep the editor open so the text is not lost.
    fn save_note(&mut self) {
        let Some(user) = self.require_user() else {
            return;
        };
        // a failed save leaves the editor open with the text intact
        let _ = self
            .state
            .borrow_mut()
            .ui_state
            .save_note(&self.db_state, &user);
    }

    fn open_notes_window(&mut self) {
        let Some(user) = self.require_user() else {
            return;
        };
        let mut state = self.state.borrow_mut();
        match self.db_state.list_notes(&user) {
            Ok(notes) => {
                state.ui_state.notes = notes;
                state.ui_state.open_window(WindowType::Notes);
            }
            Err(err) => {
                log::error!("listing notes failed: {}", err);
                state
                    .ui_state
                    .set_message(err.user_message(), MessageType::Error);
            }
        }
    }

    fn open_favorites_window(&mut self) {
        let Some(user) = self.require_user() else {
            return;
        };
        let mut state = self.state.borrow_mut();
        match self.db_state.list_favorites(&user) {
            Ok(favorites) => {
                state.ui_state.favorite_entries = favorites;
                state.ui_state.open_window(WindowType::Favorites);
            }
            Err(err) => {
                log::error!("listing favorites failed: {}", err);
                state
                    .ui_state
                    .set_message(err.user_message(), MessageType::Error);
            }
        }
    }

    fn open_profile_window(&mut self) {
        let user = self.state.borrow().session.user_id().map(str::to_string);
        if let Some(user) = user {
            self.refresh_streak(&user);
            match self.db_state.count_favorites(&user) {
                Ok(count) => self.state.borrow_mut().ui_state.favorites_count = count,
                Err(err) => log::warn!("counting favorites failed: {}", err),
            }
        }
        self.state.borrow_mut().ui_state.open_window(WindowType::Profile);
    }

    fn logout(&mut self) -> eyre::Result<()> {
        self.checked_favorites.clear();
        let mut state = self.state.borrow_mut();
        let user = state.session.logout();
        state.config.settings.user_id = None;
        state.favorites.clear();
        state.streak = 0;
        state.ui_state.favorites_count = 0;
        state.ui_state.open_window(WindowType::Reader);
        if let Err(err) = state.config.save() {
            log::warn!("could not persist logout: {}", err);
        }
        log::info!("signed out {}", user.unwrap_or_default());
        state
            .ui_state
            .set_message("Signed out".to_string(), MessageType::Info);
        Ok(())
    }

    /// Copy the active verse (or the first verse of the focused chapter).
    fn share_active_verse(&mut self) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let (chapter, verse) = engine
            .active_verse()
            .unwrap_or_else(|| (engine.focused_chapter(), 0));
        let Some(text) = chapter.verses.get(verse) else {
            return;
        };
        let share_text = Self::format_share_text(&chapter.verse_reference(verse), text);
        let reference = chapter.verse_reference(verse);

        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(err) => {
                    log::warn!("clipboard unavailable: {}", err);
                    self.state.borrow_mut().ui_state.set_message(
                        "Clipboard is not available".to_string(),
                        MessageType::Error,
                    );
                    return;
                }
            }
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            return;
        };
        let (message, message_type) = match clipboard.set_text(share_text) {
            Ok(()) => (format!("Copied {}", reference), MessageType::Info),
            Err(err) => {
                log::warn!("clipboard write failed: {}", err);
                ("Could not copy to clipboard".to_string(), MessageType::Error)
            }
        };
        self.state
            .borrow_mut()
            .ui_state
            .set_message(message, message_type);
    }

    fn format_share_text(reference: &str, verse_text: &str) -> String {
        format!("\"{}\" ({})", verse_text.trim(), reference)
    }

    fn format_note_entry(note: &NoteEntry, bible: Option<&Bible>) -> String {
        let name = bible
            .and_then(|bible| bible.book_index(&note.abbrev).and_then(|i| bible.book(i)))
            .map(|book| book.name.clone())
            .unwrap_or_else(|| display_name(&note.abbrev));
        let first_line = note.text.lines().next().unwrap_or("");
        let mut preview: String = first_line.chars().take(60).collect();
        if first_line.chars().count() > 60 || note.text.lines().count() > 1 {
            preview.push_str("...");
        }
        format!(
            "{} {}  {}  ({})",
            name,
            note.chapter_index + 1,
            preview,
            note.updated_at.with_timezone(&Local).format("%Y-%m-%d")
        )
    }

    fn format_favorite_entry(entry: &FavoriteEntry) -> String {
        if entry.preview.is_empty() {
            entry.reference.clone()
        } else {
            format!("{}  {}", entry.reference, entry.preview)
        }
    }

    /// Header row and the centered reading column.
    fn reader_areas(frame_area: Rect, text_width: usize) -> (Rect, Rect) {
        let chunks = Layout::default()
            .direction(ratatui::layout::Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(frame_area);

        let available_width = chunks[2].width as usize;
        let padding = if available_width <= 20 {
            0
        } else {
            (available_width.saturating_sub(text_width) / 2).max(2)
        };
        let content_width = (available_width.saturating_sub(padding * 2).max(20) as u16).min(chunks[2].width);
        let left_pad = (chunks[2].width.saturating_sub(content_width)) / 2;
        let content_area = Rect {
            x: chunks[2].x + left_pad,
            y: chunks[2].y,
            width: content_width,
            height: chunks[2].height,
        };
        (chunks[0], content_area)
    }

    fn render_static(
        frame: &mut Frame,
        state: &ApplicationState,
        board: &Board,
        engine: Option<&ReadingEngine>,
        picker: &NavigationPicker,
    ) {
        Self::render_reader_static(frame, state, board, engine);

        if state.ui_state.show_help {
            HelpWindow::render(frame, frame.area(), state.ui_state.help_scroll_offset);
        } else if state.ui_state.show_picker && picker.is_open() {
            if let Some(engine) = engine {
                let bible = engine.bible();
                PickerWindow::render(
                    frame,
                    frame.area(),
                    &picker.title(bible),
                    &picker.entries(bible),
                    picker.selected(),
                );
            }
        } else if state.ui_state.show_note_editor {
            NoteEditorWindow::render(
                frame,
                frame.area(),
                &state.ui_state.note_title,
                &state.ui_state.note_text,
            );
        } else if state.ui_state.show_notes {
            let bible = engine.map(|engine| engine.bible().as_ref());
            let entries: Vec<String> = state
                .ui_state
                .notes
                .iter()
                .map(|note| Self::format_note_entry(note, bible))
                .collect();
            NotesWindow::render(frame, frame.area(), &entries, state.ui_state.notes_selected_index);
        } else if state.ui_state.show_favorites {
            let entries: Vec<String> = state
                .ui_state
                .favorite_entries
                .iter()
                .map(Self::format_favorite_entry)
                .collect();
            FavoritesWindow::render(
                frame,
                frame.area(),
                &entries,
                state.ui_state.favorites_selected_index,
            );
        } else if state.ui_state.show_profile {
            ProfileWindow::render(
                frame,
                frame.area(),
                state.session.user_id(),
                state.streak,
                state.ui_state.favorites_count,
            );
        }

        if let Some(ref message) = state.ui_state.message {
            Self::render_message_static(frame, message, &state.ui_state.message_type);
        }
    }

    fn render_reader_static(
        frame: &mut Frame,
        state: &ApplicationState,
        board: &Board,
        engine: Option<&ReadingEngine>,
    ) {
        let text_width = state.config.settings.text_width();
        let (header_area, content_area) = Self::reader_areas(frame.area(), text_width);

        let title = engine
            .map(|engine| engine.focused_chapter().reference())
            .unwrap_or_else(|| "luz".to_string());
        let is_favorite = state.favorites.contains(&title);
        let right_text = state
            .session
            .user_id()
            .map(|_| format!("streak {}d", state.streak));
        let header_line = Self::build_header_line(&title, right_text.as_deref(), header_area.width);
        let mut spans = vec![Span::styled(
            header_line,
            Style::default().add_modifier(Modifier::BOLD),
        )];
        if is_favorite {
            // the star sits in the gap left of the right-hand text
            spans = Self::mark_header_favorite(spans, &title);
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), header_area);

        match &state.load_state {
            LoadState::Loading => {
                Board::render_status(frame, content_area, "Loading scripture...", Color::DarkGray);
            }
            LoadState::Failed(reason) => {
                let text = format!("Scripture unavailable: {}", reason);
                Board::render_status(frame, content_area, &text, Color::Red);
            }
            LoadState::Ready => {
                if let Some(engine) = engine {
                    board.render(frame, content_area, engine.coordinator(), &state.favorites);
                }
            }
        }
    }

    fn mark_header_favorite(spans: Vec<Span<'static>>, title: &str) -> Vec<Span<'static>> {
        let Some(line) = spans.first().map(|span| span.content.to_string()) else {
            return spans;
        };
        let Some(start) = line.find(title) else {
            return spans;
        };
        let end = start + title.len();
        let (head, tail) = line.split_at(end);
        let tail = tail.strip_prefix("  ").unwrap_or(tail);
        vec![
            Span::styled(head.to_string(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(" ★", Style::default().fg(Color::Yellow)),
            Span::raw(tail.to_string()),
        ]
    }

    fn build_header_line(title: &str, right_text: Option<&str>, width: u16) -> String {
        let width = width as usize;
        if width == 0 {
            return String::new();
        }

        let mut buffer = vec![' '; width];
        let right_len = right_text.map(|text| text.chars().count()).unwrap_or(0);
        let content_width = if right_len > 0 {
            width.saturating_sub(right_len + 1)
        } else {
            width
        };

        let title_chars: Vec<char> = title.chars().take(content_width).collect();
        let title_start = (content_width.saturating_sub(title_chars.len())) / 2;
        for (i, ch) in title_chars.into_iter().enumerate() {
            if title_start + i < buffer.len() {
                buffer[title_start + i] = ch;
            }
        }

        if let Some(right_text) = right_text {
            let start = width.saturating_sub(right_len);
            for (i, ch) in right_text.chars().enumerate() {
                if start + i < buffer.len() {
                    buffer[start + i] = ch;
                }
            }
        }

        buffer.into_iter().collect()
    }

    fn render_message_static(frame: &mut Frame, message: &str, message_type: &MessageType) {
        let color = match message_type {
            MessageType::Info => Color::Blue,
            MessageType::Warning => Color::Yellow,
            MessageType::Error => Color::Red,
        };

        let message_paragraph = Paragraph::new(message)
            .style(Style::default().fg(color))
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: true });

        let frame_area = frame.area();
        let area = Rect {
            x: frame_area.x + 2,
            y: frame_area.y + 2,
            width: frame_area.width.saturating_sub(4),
            height: 3.min(frame_area.height.saturating_sub(2)),
        };

        frame.render_widget(Clear, area);
        frame.render_widget(message_paragraph, area);
    }
}
