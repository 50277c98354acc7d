//! Drives the chapter window from viewport observations.
//!
//! Every mutation of the window marks the layout dirty. Offset correction,
//! settling of in-flight paginations and the next round of sentinel checks
//! only happen in [`ReadingEngine::tick`], after the layout provider has
//! laid out the new window.

use std::sync::Arc;

use crate::error::ReaderError;
use crate::models::{Bible, JumpTarget, RenderedChapter};
use crate::scroll::{CoordinatorOptions, ScrollCoordinator, Trigger, WindowLayout};
use crate::window::{ChapterWindow, Edge, Pagination, PaginationTicket, WindowOptions};

/// Turns the window into row geometry (and whatever the renderer needs).
pub trait LayoutProvider {
    fn layout(&mut self, window: &ChapterWindow) -> WindowLayout;
}

pub struct ReadingEngine {
    window: ChapterWindow,
    coordinator: ScrollCoordinator,
    pending: Vec<PaginationTicket>,
    dirty: bool,
    alive: bool,
}

impl ReadingEngine {
    pub fn new(
        bible: Arc<Bible>,
        window_options: WindowOptions,
        coordinator_options: CoordinatorOptions,
    ) -> Result<Self, ReaderError> {
        Ok(Self {
            window: ChapterWindow::new(bible, window_options)?,
            coordinator: ScrollCoordinator::new(coordinator_options),
            pending: Vec::new(),
            dirty: true,
            alive: true,
        })
    }

    pub fn window(&self) -> &ChapterWindow {
        &self.window
    }

    pub fn coordinator(&self) -> &ScrollCoordinator {
        &self.coordinator
    }

    pub fn bible(&self) -> &Arc<Bible> {
        self.window.bible()
    }

    /// Replace the window with `target` and scroll to it after layout.
    pub fn jump(&mut self, target: JumpTarget) -> Result<JumpTarget, ReaderError> {
        let target = self.window.jump_to(target)?;
        self.pending.clear();
        self.coordinator
            .expect_jump(&self.window.first().key, target.verse);
        self.dirty = true;
        Ok(target)
    }

    pub fn jump_to_reference(
        &mut self,
        abbrev: &str,
        chapter: usize,
        verse: Option<usize>,
    ) -> Result<JumpTarget, ReaderError> {
        let position = self
            .bible()
            .resolve(abbrev, chapter)
            .ok_or_else(|| ReaderError::InvalidReference(format!("{}-{}", abbrev, chapter)))?;
        self.jump(JumpTarget { position, verse })
    }

    pub fn scroll_by(&mut self, delta: isize) {
        self.coordinator.scroll_by(delta);
        self.coordinator.update_active();
    }

    pub fn page_size(&self) -> usize {
        self.coordinator.viewport_height().saturating_sub(2).max(1)
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.coordinator.set_viewport_height(height);
    }

    /// Force a fresh layout (text width changed, terminal resized).
    pub fn relayout(&mut self) {
        self.coordinator.capture_anchor();
        self.dirty = true;
    }

    /// True while a layout or an in-flight pagination is outstanding.
    pub fn is_settling(&self) -> bool {
        self.dirty || !self.pending.is_empty()
    }

    /// Commit a pending layout, then react to the sentinels. Returns true
    /// when the window changed and another tick is needed.
    pub fn tick(&mut self, layouter: &mut dyn LayoutProvider) -> bool {
        if !self.alive {
            return false;
        }

        if self.dirty {
            let layout = layouter.layout(&self.window);
            self.coordinator.commit_layout(layout);
            for ticket in self.pending.drain(..) {
                self.window.settle(ticket);
            }
            self.dirty = false;
            if self.evict_out_of_reach() {
                return true;
            }
        }

        for trigger in self.coordinator.observe() {
            let edge = match trigger {
                Trigger::Prepend => Edge::Top,
                Trigger::Append => Edge::Bottom,
            };
            self.coordinator.capture_anchor();
            let outcome = match edge {
                Edge::Top => self.window.prepend_previous(),
                Edge::Bottom => self.window.append_next(),
            };
            match outcome {
                Pagination::Started { ticket, inserted } => {
                    log::debug!("window {:?}: added {}", edge, inserted);
                    self.pending.push(ticket);
                    self.dirty = true;
                }
                Pagination::Boundary => log::debug!("window {:?}: end of canon", edge),
                Pagination::Suppressed => log::debug!("window {:?}: pagination in flight", edge),
            }
        }

        if !self.dirty {
            self.coordinator.discard_anchor();
        }
        self.coordinator.update_active();
        self.dirty
    }

    fn evict_out_of_reach(&mut self) -> bool {
        if !self.window.over_capacity() {
            return false;
        }
        let edge = if self.coordinator.top_chapter_out_of_reach() {
            Edge::Top
        } else if self.coordinator.bottom_chapter_out_of_reach() {
            Edge::Bottom
        } else {
            return false;
        };
        self.coordinator.capture_anchor();
        match self.window.evict(edge) {
            Some(key) => {
                log::debug!("window {:?}: evicted {}", edge, key);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Stop reacting to anything still queued; later ticks are no-ops.
    pub fn teardown(&mut self) {
        self.alive = false;
        self.window.invalidate();
        self.pending.clear();
    }

    pub fn active_chapter(&self) -> Option<&RenderedChapter> {
        let key = self.coordinator.active_chapter_key()?;
        self.window.get(key)
    }

    /// Active chapter, falling back to the first chapter of the window.
    pub fn focused_chapter(&self) -> &RenderedChapter {
        self.active_chapter().unwrap_or_else(|| self.window.first())
    }

    pub fn active_verse(&self) -> Option<(&RenderedChapter, usize)> {
        let active = self.coordinator.active()?;
        let chapter = self.window.get(&active.chapter_key)?;
        Some((chapter, active.verse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, ChapterPosition};
    use crate::scroll::{ChapterSpan, VerseSpan};
    use crate::window::GuardPolicy;
    use std::time::Duration;

    /// One header row plus one row per verse, chapters back to back.
    struct RowPerVerse {
        calls: usize,
    }

    impl LayoutProvider for RowPerVerse {
        fn layout(&mut self, window: &ChapterWindow) -> WindowLayout {
            self.calls += 1;
            let mut row = 0;
            let chapters = window
                .chapters()
                .map(|chapter| {
                    let start = row;
                    row += 1;
                    let verses = (0..chapter.verses.len())
                        .map(|verse| {
                            let span = VerseSpan { verse, start: row, height: 1 };
                            row += 1;
                            span
                        })
                        .collect();
                    ChapterSpan {
                        key: chapter.key.clone(),
                        start,
                        height: row - start,
                        verses,
                    }
                })
                .collect();
            WindowLayout { chapters, total_height: row }
        }
    }

    fn bible(verses_per_chapter: usize) -> Arc<Bible> {
        let book = |abbrev: &str, chapters: usize| Book {
            abbrev: abbrev.to_string(),
            name: abbrev.to_string(),
            chapters: (0..chapters)
                .map(|c| (0..verses_per_chapter).map(|v| format!("{} {}:{}", abbrev, c + 1, v + 1)).collect())
                .collect(),
        };
        Arc::new(Bible::new(vec![book("gn", 3), book("ex", 3)]))
    }

    fn options() -> CoordinatorOptions {
        CoordinatorOptions {
            lookahead_rows: 2,
            focus_top_percent: 0,
            focus_bottom_percent: 50,
            highlight: Duration::from_secs(60),
        }
    }

    fn run_until_idle(engine: &mut ReadingEngine, layouter: &mut RowPerVerse) {
        for _ in 0..50 {
            if !engine.tick(layouter) {
                return;
            }
        }
        panic!("engine did not settle");
    }

    #[test]
    fn test_fills_viewport_then_stops() {
        let mut engine = ReadingEngine::new(bible(10), WindowOptions::default(), options()).unwrap();
        let mut layouter = RowPerVerse { calls: 0 };
        engine.set_viewport_height(15);
        run_until_idle(&mut engine, &mut layouter);

        // gn-0 is 11 rows; one more chapter covers viewport + lookahead.
        assert_eq!(engine.window().keys(), vec!["gn-0", "gn-1"]);
        assert!(!engine.is_settling());
        assert_eq!(engine.focused_chapter().key, "gn-0");
    }

    #[test]
    fn test_prepend_after_jump_preserves_position() {
        let mut engine = ReadingEngine::new(bible(30), WindowOptions::default(), options()).unwrap();
        let mut layouter = RowPerVerse { calls: 0 };
        engine.set_viewport_height(10);
        engine.jump_to_reference("ex", 0, Some(1)).unwrap();
        run_until_idle(&mut engine, &mut layouter);

        // verse 2 sits at row 2, inside the lookahead of the top sentinel, so
        // gn-2 was prepended and the offset moved down by its 31 rows.
        assert_eq!(engine.window().keys(), vec!["gn-2", "ex-0"]);
        assert_eq!(engine.coordinator().offset(), 33);
        let (chapter, verse) = engine.active_verse().unwrap();
        assert_eq!(chapter.key, "ex-0");
        assert_eq!(verse, 1);
        assert!(engine.coordinator().is_highlighted("ex-0", 1));
    }

    #[test]
    fn test_scrolling_down_appends() {
        let mut engine = ReadingEngine::new(bible(30), WindowOptions::default(), options()).unwrap();
        let mut layouter = RowPerVerse { calls: 0 };
        engine.set_viewport_height(10);
        run_until_idle(&mut engine, &mut layouter);
        assert_eq!(engine.window().keys(), vec!["gn-0"]);

        engine.scroll_by(20);
        run_until_idle(&mut engine, &mut layouter);
        assert_eq!(engine.window().keys(), vec!["gn-0", "gn-1"]);
        assert_eq!(engine.coordinator().offset(), 20);
    }

    #[test]
    fn test_layout_happens_before_settle() {
        let mut engine = ReadingEngine::new(bible(3), WindowOptions::default(), options()).unwrap();
        let mut layouter = RowPerVerse { calls: 0 };
        engine.set_viewport_height(40);

        assert!(engine.tick(&mut layouter));
        assert_eq!(layouter.calls, 1);
        // the append started in this tick is still in flight
        assert!(engine.window().is_busy(Edge::Bottom));
        assert!(engine.is_settling());

        engine.tick(&mut layouter);
        assert_eq!(layouter.calls, 2);
        assert_eq!(engine.window().len(), 3);
    }

    #[test]
    fn test_cap_evicts_chapters_out_of_reach() {
        let window_options = WindowOptions {
            guard: GuardPolicy::Shared,
            max_chapters: Some(3),
        };
        let mut engine = ReadingEngine::new(bible(30), window_options, options()).unwrap();
        let mut layouter = RowPerVerse { calls: 0 };
        engine.set_viewport_height(10);
        run_until_idle(&mut engine, &mut layouter);

        for _ in 0..12 {
            engine.scroll_by(10);
            run_until_idle(&mut engine, &mut layouter);
        }
        assert!(engine.window().len() <= 3);
        let (chapter, _) = engine.active_verse().unwrap();
        assert!(engine.window().get(&chapter.key).is_some());
        let positions: Vec<ChapterPosition> = engine.window().chapters().map(|c| c.position).collect();
        for pair in positions.windows(2) {
            assert_eq!(engine.bible().next_position(pair[0]), Some(pair[1]));
        }
    }

    #[test]
    fn test_teardown_makes_ticks_noops() {
        let mut engine = ReadingEngine::new(bible(3), WindowOptions::default(), options()).unwrap();
        let mut layouter = RowPerVerse { calls: 0 };
        engine.set_viewport_height(40);
        engine.tick(&mut layouter);
        engine.teardown();
        assert!(!engine.tick(&mut layouter));
        assert_eq!(layouter.calls, 1);
        assert_eq!(engine.window().len(), 2);
    }
}
