//! Host settings read from `settings.toml` in the user config dir.
//!
//! Loading never fails: problems are returned as warnings and the affected
//! values fall back to their defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use sheetwise_core::GridDims;

use crate::error::SettingsError;

const MAX_SETTINGS_FILE_BYTES: u64 = 1_048_576; // 1 MiB
const MAX_GRID_ROWS: usize = 100_000;
const MAX_GRID_COLS: usize = 702; // A..ZZ

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub grid_rows: usize,
    pub grid_cols: usize,
    pub title_debounce_ms: u64,
    pub error_flash_ms: u64,
    pub notification_ms: u64,
    /// Key combo (e.g. `"C-s"`) to host action name.
    pub bindings: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            grid_rows: GridDims::DEFAULT_ROWS,
            grid_cols: GridDims::DEFAULT_COLS,
            title_debounce_ms: 500,
            error_flash_ms: 2_000,
            notification_ms: 2_000,
            bindings: HashMap::new(),
        }
    }
}

impl Settings {
    pub fn dims(&self) -> GridDims {
        GridDims::new(self.grid_rows, self.grid_cols)
    }

    pub fn title_debounce(&self) -> Duration {
        Duration::from_millis(self.title_debounce_ms)
    }

    pub fn error_flash(&self) -> Duration {
        Duration::from_millis(self.error_flash_ms)
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }

    fn validate(&mut self) -> Vec<String> {
        let defaults = Settings::default();
        let mut warnings = Vec::new();
        if self.grid_rows == 0 || self.grid_rows > MAX_GRID_ROWS {
            warnings.push(format!(
                "grid_rows must be between 1 and {} (got {}); using {}",
                MAX_GRID_ROWS, self.grid_rows, defaults.grid_rows
            ));
            self.grid_rows = defaults.grid_rows;
        }
        if self.grid_cols == 0 || self.grid_cols > MAX_GRID_COLS {
            warnings.push(format!(
                "grid_cols must be between 1 and {} (got {}); using {}",
                MAX_GRID_COLS, self.grid_cols, defaults.grid_cols
            ));
            self.grid_cols = defaults.grid_cols;
        }
        warnings
    }
}

/// Load settings from `settings_file`, or from the user config dir when
/// `None`. A missing default file is not worth a warning; a missing
/// explicit one is.
pub fn load_settings(settings_file: Option<&Path>) -> (Settings, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();
    let Some(path) = settings_file
        .map(Path::to_path_buf)
        .or_else(user_settings_path)
    else {
        return (Settings::default(), warnings);
    };

    if !path.exists() {
        if settings_file.is_some() {
            warnings.push(format!("Settings file not found: {}", path.display()));
        }
        return (Settings::default(), warnings);
    }

    let parsed = read_settings(&path).and_then(|content| parse_settings(&content));
    match parsed {
        Ok((settings, mut extra)) => {
            warnings.append(&mut extra);
            (settings, warnings)
        }
        Err(err) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), err));
            (Settings::default(), warnings)
        }
    }
}

/// Parse settings text, returning validation warnings alongside.
pub fn parse_settings(content: &str) -> Result<(Settings, Vec<String>), SettingsError> {
    let mut settings: Settings = toml::from_str(content)?;
    let warnings = settings.validate();
    Ok((settings, warnings))
}

pub fn user_settings_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "sheetwise")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("settings.toml");
    Some(path)
}

fn read_settings(path: &Path) -> Result<String, SettingsError> {
    let size = std::fs::metadata(path)?.len();
    if size > MAX_SETTINGS_FILE_BYTES {
        return Err(SettingsError::TooLarge {
            size,
            max: MAX_SETTINGS_FILE_BYTES,
        });
    }
    Ok(std::fs::read_to_string(path)?)
}
