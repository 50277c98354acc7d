use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scroll::CoordinatorOptions;
use crate::window::{GuardPolicy, WindowOptions};

pub const DEFAULT_DATASET_FILE: &str = "bible.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Local path or http(s) URL of the dataset. `None` means
    /// `bible.json` inside the data directory.
    pub dataset_source: Option<String>,
    pub user_id: Option<String>,
    pub text_width: usize,
    pub lookahead_rows: usize,
    pub focus_top_percent: u16,
    pub focus_bottom_percent: u16,
    /// 0 keeps every loaded chapter.
    pub max_window_chapters: usize,
    pub independent_edge_guards: bool,
    pub highlight_millis: u64,
    pub show_verse_numbers: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dataset_source: None,
            user_id: None,
            text_width: 72,
            lookahead_rows: 8,
            focus_top_percent: 10,
            focus_bottom_percent: 55,
            max_window_chapters: 9,
            independent_edge_guards: false,
            highlight_millis: 2000,
            show_verse_numbers: true,
        }
    }
}

impl Settings {
    pub fn merge(&mut self, other: Self) {
        if other.dataset_source.is_some() {
            self.dataset_source = other.dataset_source;
        }
        if other.user_id.is_some() {
            self.user_id = other.user_id;
        }
        self.text_width = other.text_width;
        self.lookahead_rows = other.lookahead_rows;
        self.focus_top_percent = other.focus_top_percent;
        self.focus_bottom_percent = other.focus_bottom_percent;
        self.max_window_chapters = other.max_window_chapters;
        self.independent_edge_guards = other.independent_edge_guards;
        self.highlight_millis = other.highlight_millis;
        self.show_verse_numbers = other.show_verse_numbers;
    }

    pub fn dataset_location(&self, data_dir: &Path) -> String {
        match &self.dataset_source {
            Some(source) if !source.trim().is_empty() => source.trim().to_string(),
            _ => data_dir.join(DEFAULT_DATASET_FILE).to_string_lossy().into_owned(),
        }
    }

    pub fn window_options(&self) -> WindowOptions {
        WindowOptions {
            guard: if self.independent_edge_guards {
                GuardPolicy::PerEdge
            } else {
                GuardPolicy::Shared
            },
            max_chapters: (self.max_window_chapters > 0).then_some(self.max_window_chapters),
        }
    }

    /// Focus percentages are clamped so the focus region keeps at least
    /// one row's worth of height.
    pub fn coordinator_options(&self) -> CoordinatorOptions {
        let top = self.focus_top_percent.min(90);
        let bottom = self.focus_bottom_percent.min(99 - top);
        CoordinatorOptions {
            lookahead_rows: self.lookahead_rows,
            focus_top_percent: top,
            focus_bottom_percent: bottom,
            highlight: Duration::from_millis(self.highlight_millis),
        }
    }

    pub fn text_width(&self) -> usize {
        self.text_width.clamp(20, 200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_location_defaults_to_data_dir() {
        let settings = Settings::default();
        let location = settings.dataset_location(Path::new("/tmp/luz"));
        assert!(location.ends_with("bible.json"));
        assert!(location.starts_with("/tmp/luz"));

        let remote = Settings {
            dataset_source: Some(" https://example.org/bible.json ".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            remote.dataset_location(Path::new("/tmp/luz")),
            "https://example.org/bible.json"
        );
    }

    #[test]
    fn test_window_options() {
        let mut settings = Settings::default();
        let options = settings.window_options();
        assert_eq!(options.guard, GuardPolicy::Shared);
        assert_eq!(options.max_chapters, Some(9));

        settings.max_window_chapters = 0;
        settings.independent_edge_guards = true;
        let options = settings.window_options();
        assert_eq!(options.guard, GuardPolicy::PerEdge);
        assert_eq!(options.max_chapters, None);
    }

    #[test]
    fn test_coordinator_options_are_clamped() {
        let settings = Settings {
            focus_top_percent: 95,
            focus_bottom_percent: 80,
            ..Settings::default()
        };
        let options = settings.coordinator_options();
        assert_eq!(options.focus_top_percent, 90);
        assert_eq!(options.focus_bottom_percent, 9);
        assert_eq!(options.highlight, Duration::from_millis(2000));
    }

    #[test]
    fn test_merge_keeps_existing_user() {
        let mut settings = Settings {
            user_id: Some("ana".to_string()),
            ..Settings::default()
        };
        settings.merge(Settings {
            text_width: 60,
            ..Settings::default()
        });
        assert_eq!(settings.user_id.as_deref(), Some("ana"));
        assert_eq!(settings.text_width, 60);
    }
}
