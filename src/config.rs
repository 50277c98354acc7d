use crate::settings::Settings;
use eyre::Result;
use std::{fs, path::PathBuf};

pub const APP_DIR_NAME: &str = "luz";

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    filepath: PathBuf,
}

impl Config {
    /// Load `configuration.json` from the data directory, writing the
    /// defaults on first run.
    pub fn new() -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        let filepath = prefix.join("configuration.json");
        let existed = filepath.exists();

        let config = Self::load_from(filepath)?;
        if !existed {
            config.save()?;
        }
        Ok(config)
    }

    /// Load configuration from a custom path. A missing or unreadable
    /// file, and any key with the wrong type, falls back to the defaults.
    pub fn load_from(filepath: PathBuf) -> Result<Self> {
        let mut settings = Settings::default();

        if filepath.exists() {
            let config_str = fs::read_to_string(&filepath)?;
            match serde_json::from_str::<serde_json::Value>(&config_str) {
                Ok(user_config) => {
                    if let Some(user_settings_map) =
                        user_config.get("Setting").and_then(|v| v.as_object())
                    {
                        apply_user_settings(&mut settings, user_settings_map);
                    }
                }
                Err(err) => log::warn!(
                    "ignoring malformed configuration {}: {}",
                    filepath.display(),
                    err
                ),
            }
        }

        Ok(Self { settings, filepath })
    }

    /// Get the configuration file path
    pub fn filepath(&self) -> &PathBuf {
        &self.filepath
    }

    /// Directory holding the configuration, database, log and default dataset.
    pub fn data_dir(&self) -> PathBuf {
        self.filepath
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn dataset_location(&self) -> String {
        self.settings.dataset_location(&self.data_dir())
    }

    /// Save current configuration to file
    pub fn save(&self) -> Result<()> {
        let config_json = serde_json::json!({
            "Setting": self.settings,
        });

        let config_str = serde_json::to_string_pretty(&config_json)?;

        if let Some(parent) = self.filepath.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.filepath, config_str)?;
        Ok(())
    }
}

fn apply_user_settings(
    settings: &mut Settings,
    user_settings_map: &serde_json::Map<String, serde_json::Value>,
) {
    if let Some(val) = user_settings_map
        .get("dataset_source")
        .and_then(|v| v.as_str())
    {
        settings.dataset_source = Some(val.to_string());
    }
    if let Some(val) = user_settings_map.get("user_id").and_then(|v| v.as_str()) {
        settings.user_id = Some(val.to_string());
    }
    if let Some(val) = user_settings_map.get("text_width").and_then(|v| v.as_u64()) {
        settings.text_width = val as usize;
    }
    if let Some(val) = user_settings_map
        .get("lookahead_rows")
        .and_then(|v| v.as_u64())
    {
        settings.lookahead_rows = val as usize;
    }
    if let Some(val) = user_settings_map
        .get("focus_top_percent")
        .and_then(|v| v.as_u64())
    {
        settings.focus_top_percent = val.min(100) as u16;
    }
    if let Some(val) = user_settings_map
        .get("focus_bottom_percent")
        .and_then(|v| v.as_u64())
    {
        settings.focus_bottom_percent = val.min(100) as u16;
    }
    if let Some(val) = user_settings_map
        .get("max_window_chapters")
        .and_then(|v| v.as_u64())
    {
        settings.max_window_chapters = val as usize;
    }
    if let Some(val) = user_settings_map
        .get("independent_edge_guards")
        .and_then(|v| v.as_bool())
    {
        settings.independent_edge_guards = val;
    }
    if let Some(val) = user_settings_map
        .get("highlight_millis")
        .and_then(|v| v.as_u64())
    {
        settings.highlight_millis = val;
    }
    if let Some(val) = user_settings_map
        .get("show_verse_numbers")
        .and_then(|v| v.as_bool())
    {
        settings.show_verse_numbers = val;
    }
}

pub fn get_app_data_prefix() -> Result<PathBuf> {
    if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
        let path = PathBuf::from(config_home).join(APP_DIR_NAME);
        return Ok(path);
    } else if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home.clone()).join(".config").join(APP_DIR_NAME);
        if path.exists() {
            return Ok(path);
        } else {
            return Ok(PathBuf::from(home).join(format!(".{}", APP_DIR_NAME)));
        }
    } else if let Some(user_profile) = std::env::var_os("USERPROFILE") {
        return Ok(PathBuf::from(user_profile).join(format!(".{}", APP_DIR_NAME)));
    }

    Err(eyre::eyre!(
        "Could not determine application data directory"
    ))
}
