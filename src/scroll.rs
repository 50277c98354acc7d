//! Viewport bookkeeping for the rendered window.
//!
//! Rows are terminal rows. The coordinator never mutates the window itself:
//! it reports pagination triggers from the two sentinels, keeps the reading
//! position stable across insertions above the viewport, and tracks which
//! verse is in focus.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseSpan {
    pub verse: usize,
    pub start: usize,
    pub height: usize,
}

impl VerseSpan {
    fn end(&self) -> usize {
        self.start + self.height
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSpan {
    pub key: String,
    pub start: usize,
    pub height: usize,
    pub verses: Vec<VerseSpan>,
}

impl ChapterSpan {
    pub fn end(&self) -> usize {
        self.start + self.height
    }
}

/// Row geometry of the whole window, produced by the board after laying
/// out the chapters at the current text width.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowLayout {
    pub chapters: Vec<ChapterSpan>,
    pub total_height: usize,
}

impl WindowLayout {
    pub fn chapter(&self, key: &str) -> Option<&ChapterSpan> {
        self.chapters.iter().find(|chapter| chapter.key == key)
    }

    /// Chapter covering `row`; rows past the end belong to the last chapter.
    pub fn chapter_at(&self, row: usize) -> Option<&ChapterSpan> {
        self.chapters
            .iter()
            .find(|chapter| row < chapter.end())
            .or_else(|| self.chapters.last())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Prepend,
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVerse {
    pub chapter_key: String,
    pub verse: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// Extra rows around the viewport in which a sentinel counts as visible.
    pub lookahead_rows: usize,
    /// Share of the viewport height cut from the top of the focus region.
    pub focus_top_percent: u16,
    /// Share of the viewport height cut from the bottom of the focus region.
    pub focus_bottom_percent: u16,
    pub highlight: Duration,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            lookahead_rows: 8,
            focus_top_percent: 10,
            focus_bottom_percent: 55,
            highlight: Duration::from_millis(2000),
        }
    }
}

/// Reading position captured before the window changes: the verse under
/// the top of the viewport and how many of its rows are scrolled past.
/// Rows outside any verse (title, gaps) anchor to the chapter start.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScrollAnchor {
    key: String,
    verse: Option<usize>,
    within: usize,
    height_before: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingJump {
    key: String,
    verse: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Highlight {
    key: String,
    verse: usize,
    until: Instant,
}

#[derive(Debug)]
pub struct ScrollCoordinator {
    options: CoordinatorOptions,
    offset: usize,
    viewport_height: usize,
    layout: WindowLayout,
    top_visible: bool,
    bottom_visible: bool,
    reobserve: bool,
    anchor: Option<ScrollAnchor>,
    pending_jump: Option<PendingJump>,
    active: Option<ActiveVerse>,
    highlight: Option<Highlight>,
}

impl ScrollCoordinator {
    pub fn new(options: CoordinatorOptions) -> Self {
        Self {
            options,
            offset: 0,
            viewport_height: 0,
            layout: WindowLayout::default(),
            top_visible: false,
            bottom_visible: false,
            reobserve: true,
            anchor: None,
            pending_jump: None,
            active: None,
            highlight: None,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    pub fn layout(&self) -> &WindowLayout {
        &self.layout
    }

    pub fn max_offset(&self) -> usize {
        self.layout.total_height.saturating_sub(self.viewport_height)
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        if self.viewport_height != height {
            self.viewport_height = height;
            self.clamp_offset();
            self.reobserve = true;
        }
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let target = self.offset.saturating_add_signed(delta);
        self.scroll_to(target);
    }

    pub fn scroll_to(&mut self, offset: usize) {
        self.offset = offset;
        self.clamp_offset();
    }

    fn clamp_offset(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }

    /// Remember what is under the viewport before the window is mutated.
    /// Applied on the next [`ScrollCoordinator::commit_layout`].
    pub fn capture_anchor(&mut self) {
        let Some(chapter) = self.layout.chapter_at(self.offset) else {
            return;
        };
        let verse = chapter
            .verses
            .iter()
            .find(|span| span.start <= self.offset && self.offset < span.end());
        self.anchor = Some(ScrollAnchor {
            key: chapter.key.clone(),
            verse: verse.map(|span| span.verse),
            within: self
                .offset
                .saturating_sub(verse.map_or(chapter.start, |span| span.start)),
            height_before: self.layout.total_height,
        });
    }

    pub fn discard_anchor(&mut self) {
        self.anchor = None;
    }

    /// The window was replaced by a jump: scroll to `verse` of the chapter
    /// (or its start) once laid out.
    pub fn expect_jump(&mut self, key: &str, verse: Option<usize>) {
        self.anchor = None;
        self.active = None;
        self.highlight = None;
        self.pending_jump = Some(PendingJump {
            key: key.to_string(),
            verse,
        });
    }

    /// Adopt a freshly committed layout and apply any pending correction.
    pub fn commit_layout(&mut self, layout: WindowLayout) {
        self.layout = layout;

        if let Some(jump) = self.pending_jump.take() {
            if let Some(chapter) = self.layout.chapter(&jump.key) {
                let row = jump
                    .verse
                    .and_then(|verse| chapter.verses.iter().find(|span| span.verse == verse))
                    .map_or(chapter.start, |span| span.start);
                self.offset = row;
                if let Some(verse) = jump.verse {
                    self.highlight = Some(Highlight {
                        key: jump.key.clone(),
                        verse,
                        until: Instant::now() + self.options.highlight,
                    });
                }
            }
            self.anchor = None;
        } else if let Some(anchor) = self.anchor.take() {
            if let Some(chapter) = self.layout.chapter(&anchor.key) {
                let span = anchor
                    .verse
                    .and_then(|verse| chapter.verses.iter().find(|span| span.verse == verse));
                // rewrapping may shrink the verse
                let corrected = match span {
                    Some(span) => span.start + anchor.within.min(span.height.saturating_sub(1)),
                    None if anchor.verse.is_some() => chapter.start,
                    None => chapter.start + anchor.within.min(chapter.height.saturating_sub(1)),
                };
                log::debug!(
                    "scroll anchor {}: height {} -> {}, offset {} -> {}",
                    anchor.key,
                    anchor.height_before,
                    self.layout.total_height,
                    self.offset,
                    corrected
                );
                self.offset = corrected;
            }
        }

        self.clamp_offset();
        self.reobserve = true;
        self.update_active();
    }

    fn sentinels(&self) -> (bool, bool) {
        let lookahead = self.options.lookahead_rows;
        let top = self.offset <= lookahead;
        let bottom = self.layout.total_height <= self.offset + self.viewport_height + lookahead;
        (top, bottom)
    }

    /// Report sentinels that entered the viewport since the last call, or
    /// that are visible right after the window changed.
    pub fn observe(&mut self) -> Vec<Trigger> {
        if self.layout.chapters.is_empty() || self.viewport_height == 0 {
            return Vec::new();
        }
        let (top, bottom) = self.sentinels();
        let mut triggers = Vec::new();
        if top && (self.reobserve || !self.top_visible) {
            triggers.push(Trigger::Prepend);
        }
        if bottom && (self.reobserve || !self.bottom_visible) {
            triggers.push(Trigger::Append);
        }
        self.top_visible = top;
        self.bottom_visible = bottom;
        self.reobserve = false;
        triggers
    }

    fn focus_region(&self) -> (usize, usize) {
        let height = self.viewport_height;
        let top_inset = height * usize::from(self.options.focus_top_percent) / 100;
        let bottom_inset = height * usize::from(self.options.focus_bottom_percent) / 100;
        let start = self.offset + top_inset;
        let end = (self.offset + height.saturating_sub(bottom_inset)).max(start + 1);
        (start, end)
    }

    /// Pick the verse with the highest share of its rows inside the focus
    /// region. Keeps the previous choice when nothing intersects.
    pub fn update_active(&mut self) -> Option<&ActiveVerse> {
        let (region_start, region_end) = self.focus_region();
        let mut best: Option<(f64, &str, usize)> = None;

        for chapter in &self.layout.chapters {
            if chapter.end() <= region_start || chapter.start >= region_end {
                continue;
            }
            for span in &chapter.verses {
                if span.height == 0 {
                    continue;
                }
                let overlap_start = span.start.max(region_start);
                let overlap_end = span.end().min(region_end);
                if overlap_end <= overlap_start {
                    continue;
                }
                let ratio = (overlap_end - overlap_start) as f64 / span.height as f64;
                if best.is_none_or(|(current, _, _)| ratio > current) {
                    best = Some((ratio, chapter.key.as_str(), span.verse));
                }
            }
        }

        if let Some((_, key, verse)) = best {
            self.active = Some(ActiveVerse {
                chapter_key: key.to_string(),
                verse,
            });
        } else if let Some(active) = &self.active
            && self.layout.chapter(&active.chapter_key).is_none()
        {
            self.active = self.layout.chapters.first().map(|chapter| ActiveVerse {
                chapter_key: chapter.key.clone(),
                verse: 0,
            });
        }
        self.active.as_ref()
    }

    pub fn active(&self) -> Option<&ActiveVerse> {
        self.active.as_ref()
    }

    pub fn active_chapter_key(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.chapter_key.as_str())
    }

    pub fn is_highlighted(&self, key: &str, verse: usize) -> bool {
        self.highlight.as_ref().is_some_and(|highlight| {
            highlight.key == key && highlight.verse == verse && Instant::now() < highlight.until
        })
    }

    pub fn highlight_pending(&self) -> bool {
        self.highlight
            .as_ref()
            .is_some_and(|highlight| Instant::now() < highlight.until)
    }

    /// Whether the chapter at the top edge lies entirely above the viewport
    /// and its lookahead margin.
    pub fn top_chapter_out_of_reach(&self) -> bool {
        self.layout.chapters.len() > 1
            && self
                .layout
                .chapters
                .first()
                .is_some_and(|chapter| chapter.end() + self.options.lookahead_rows < self.offset)
    }

    /// Whether the chapter at the bottom edge lies entirely below the
    /// viewport and its lookahead margin.
    pub fn bottom_chapter_out_of_reach(&self) -> bool {
        let limit = self.offset + self.viewport_height + self.options.lookahead_rows;
        self.layout.chapters.len() > 1
            && self
                .layout
                .chapters
                .last()
                .is_some_and(|chapter| chapter.start > limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One header row, then one row per verse line count in `verses`.
    fn chapter(key: &str, start: usize, verses: &[usize]) -> ChapterSpan {
        let mut row = start + 1;
        let spans = verses
            .iter()
            .enumerate()
            .map(|(verse, height)| {
                let span = VerseSpan { verse, start: row, height: *height };
                row += height;
                span
            })
            .collect();
        ChapterSpan {
            key: key.to_string(),
            start,
            height: row - start,
            verses: spans,
        }
    }

    fn layout(chapters: Vec<ChapterSpan>) -> WindowLayout {
        let total_height = chapters.last().map_or(0, ChapterSpan::end);
        WindowLayout { chapters, total_height }
    }

    fn options() -> CoordinatorOptions {
        CoordinatorOptions {
            lookahead_rows: 2,
            focus_top_percent: 0,
            focus_bottom_percent: 50,
            highlight: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_initial_observe_fires_visible_sentinels() {
        let mut coordinator = ScrollCoordinator::new(options());
        coordinator.set_viewport_height(10);
        coordinator.commit_layout(layout(vec![chapter("gn-0", 0, &[1; 30])]));

        assert_eq!(coordinator.observe(), vec![Trigger::Prepend]);
        assert!(coordinator.observe().is_empty());
    }

    #[test]
    fn test_bottom_sentinel_fires_on_entering_lookahead() {
        let mut coordinator = ScrollCoordinator::new(options());
        coordinator.set_viewport_height(10);
        coordinator.commit_layout(layout(vec![chapter("gn-0", 0, &[1; 30])]));
        coordinator.observe();

        coordinator.scroll_to(15);
        assert!(coordinator.observe().is_empty());

        // total 31, viewport ends at 29, lookahead 2 reaches the end
        coordinator.scroll_to(19);
        assert_eq!(coordinator.observe(), vec![Trigger::Append]);
        coordinator.scroll_to(20);
        assert!(coordinator.observe().is_empty());
    }

    #[test]
    fn test_reobserve_after_commit_fires_again() {
        let mut coordinator = ScrollCoordinator::new(options());
        coordinator.set_viewport_height(10);
        coordinator.commit_layout(layout(vec![chapter("ob-0", 0, &[1; 3])]));
        assert_eq!(coordinator.observe(), vec![Trigger::Prepend, Trigger::Append]);

        coordinator.commit_layout(layout(vec![chapter("ob-0", 0, &[1; 3]), chapter("jn-0", 4, &[1; 3])]));
        assert_eq!(coordinator.observe(), vec![Trigger::Prepend, Trigger::Append]);
    }

    #[test]
    fn test_prepend_keeps_content_under_viewport() {
        let mut coordinator = ScrollCoordinator::new(options());
        coordinator.set_viewport_height(10);
        coordinator.commit_layout(layout(vec![chapter("gn-1", 0, &[1; 30])]));
        coordinator.scroll_to(1);
        coordinator.capture_anchor();

        // 21 rows inserted above.
        coordinator.commit_layout(layout(vec![chapter("gn-0", 0, &[1; 20]), chapter("gn-1", 21, &[1; 30])]));
        assert_eq!(coordinator.offset(), 22);
    }

    #[test]
    fn test_append_needs_no_correction() {
        let mut coordinator = ScrollCoordinator::new(options());
        coordinator.set_viewport_height(10);
        coordinator.commit_layout(layout(vec![chapter("gn-0", 0, &[1; 30])]));
        coordinator.scroll_to(19);
        coordinator.capture_anchor();
        coordinator.commit_layout(layout(vec![chapter("gn-0", 0, &[1; 30]), chapter("gn-1", 31, &[1; 5])]));
        assert_eq!(coordinator.offset(), 19);
    }

    #[test]
    fn test_rewrap_keeps_verse_under_viewport() {
        let mut coordinator = ScrollCoordinator::new(options());
        coordinator.set_viewport_height(10);
        coordinator.commit_layout(layout(vec![chapter("gn-1", 0, &[2; 30])]));
        // second row of verse 15
        coordinator.scroll_to(32);
        coordinator.capture_anchor();

        // narrower text: every verse now takes four rows
        coordinator.commit_layout(layout(vec![chapter("gn-1", 0, &[4; 30])]));
        assert_eq!(coordinator.offset(), 62);

        coordinator.capture_anchor();
        // wider again: one row each, the row inside the verse is clamped
        coordinator.commit_layout(layout(vec![chapter("gn-1", 0, &[1; 30])]));
        assert_eq!(coordinator.offset(), 16);
    }

    #[test]
    fn test_top_eviction_is_compensated() {
        let mut coordinator = ScrollCoordinator::new(options());
        coordinator.set_viewport_height(5);
        coordinator.commit_layout(layout(vec![chapter("gn-0", 0, &[1; 9]), chapter("gn-1", 10, &[1; 20])]));
        coordinator.scroll_to(25);
        assert!(coordinator.top_chapter_out_of_reach());
        assert!(!coordinator.bottom_chapter_out_of_reach());
        coordinator.capture_anchor();

        coordinator.commit_layout(layout(vec![chapter("gn-1", 0, &[1; 20])]));
        assert_eq!(coordinator.offset(), 15);
    }

    #[test]
    fn test_jump_scrolls_to_verse_and_highlights() {
        let mut coordinator = ScrollCoordinator::new(options());
        coordinator.set_viewport_height(5);
        coordinator.expect_jump("sl-22", Some(3));
        coordinator.commit_layout(layout(vec![chapter("sl-22", 0, &[2, 2, 2, 2, 2, 2, 2, 2])]));

        assert_eq!(coordinator.offset(), 7);
        assert!(coordinator.is_highlighted("sl-22", 3));
        assert!(!coordinator.is_highlighted("sl-22", 2));
        assert!(coordinator.highlight_pending());
        assert_eq!(coordinator.active().unwrap().verse, 3);
    }

    #[test]
    fn test_active_verse_prefers_highest_ratio() {
        let mut coordinator = ScrollCoordinator::new(options());
        coordinator.set_viewport_height(8);
        // focus region = rows [offset, offset + 4)
        coordinator.commit_layout(layout(vec![chapter("gn-0", 0, &[4, 1, 1, 6])]));

        coordinator.scroll_to(3);
        // verse 0 rows 1..5 -> 2/4, verse 1 row 5 -> 1/1, verse 2 row 6 -> 1/1
        let active = coordinator.update_active().unwrap().clone();
        assert_eq!(active, ActiveVerse { chapter_key: "gn-0".to_string(), verse: 1 });
    }

    #[test]
    fn test_active_chapter_follows_scroll() {
        let mut coordinator = ScrollCoordinator::new(options());
        coordinator.set_viewport_height(6);
        coordinator.commit_layout(layout(vec![chapter("gn-0", 0, &[1; 5]), chapter("gn-1", 6, &[1; 10])]));
        assert_eq!(coordinator.active_chapter_key(), Some("gn-0"));

        coordinator.scroll_to(7);
        coordinator.update_active();
        assert_eq!(coordinator.active_chapter_key(), Some("gn-1"));
    }

    #[test]
    fn test_active_kept_when_region_shows_only_headers() {
        let mut coordinator = ScrollCoordinator::new(CoordinatorOptions {
            focus_bottom_percent: 90,
            ..options()
        });
        coordinator.set_viewport_height(10);
        coordinator.commit_layout(layout(vec![chapter("gn-0", 0, &[1; 15]), chapter("gn-1", 16, &[1; 15])]));
        coordinator.scroll_to(14);
        coordinator.update_active();
        assert_eq!(coordinator.active().unwrap().verse, 13);

        coordinator.scroll_to(16);
        coordinator.update_active();
        assert_eq!(coordinator.active_chapter_key(), Some("gn-0"));
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut coordinator = ScrollCoordinator::new(options());
        coordinator.set_viewport_height(10);
        coordinator.commit_layout(layout(vec![chapter("gn-0", 0, &[1; 14])]));
        coordinator.scroll_by(100);
        assert_eq!(coordinator.offset(), 5);
        coordinator.scroll_by(-100);
        assert_eq!(coordinator.offset(), 0);
    }
}
