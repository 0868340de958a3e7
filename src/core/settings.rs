//! Settings with default/override merging
//!
//! Defaults live in code so an update or a broken settings file can never
//! lose them. User overrides come from a JSON file in the config directory
//! and are merged key by key:
//! - a user key is honored only if it exists in the defaults and has the
//!   same JSON type, otherwise the default wins;
//! - unknown user keys are ignored;
//! - nested objects merge recursively.
//!
//! Saving goes the other way: only non-default values are written back, so
//! rejected overrides disappear and users on pure defaults pick up new
//! defaults after an update.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.json";

/// External tool locations. Empty string means "discover" (see the
/// transcode module's tool resolution).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolSettings {
    #[serde(default)]
    pub flac: String,
    #[serde(default)]
    pub lame: String,
    #[serde(default)]
    pub metaflac: String,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Where transcoded and passthrough audio files end up
    pub import_dir: PathBuf,
    /// Where `folder.jpg` copies end up (created if missing)
    pub cover_art_dir: PathBuf,
    /// External tool paths
    pub tools: ToolSettings,
    /// LAME VBR quality level (`-V<n>`, 0 = best)
    pub lame_quality: u32,
    /// Poll interval for watch mode, in milliseconds
    pub watch_poll_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            import_dir: home
                .join("Music")
                .join("iTunes")
                .join("iTunes Media")
                .join("Automatically Add to iTunes.localized"),
            cover_art_dir: home.join("Downloads").join("iTunes Cover Art"),
            tools: ToolSettings::default(),
            lame_quality: 0,
            watch_poll_ms: 2000,
        }
    }
}

impl Settings {
    /// Get the config directory (~/.config/dropcode or platform equivalent)
    fn config_dir() -> Result<PathBuf, String> {
        let base = dirs::config_dir()
            .ok_or_else(|| "Could not determine config directory".to_string())?;
        let dir = base.join("dropcode");
        if !dir.exists() {
            std::fs::create_dir_all(&dir)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }
        Ok(dir)
    }

    /// Load settings, merging the user file over the in-code defaults.
    /// Any problem with the file just means defaults.
    pub fn load() -> Self {
        match Self::config_dir() {
            Ok(dir) => Self::load_and_clean(&dir.join(SETTINGS_FILE)),
            Err(e) => {
                log::debug!("Using default settings: {}", e);
                Self::default()
            }
        }
    }

    /// Load settings and rewrite the file in compressed form, so rejected
    /// overrides and unknown keys disappear from it. A missing file stays
    /// missing.
    fn load_and_clean(path: &Path) -> Self {
        let settings = Self::load_from(path);
        if path.exists() {
            if let Err(e) = settings.save_to(path) {
                log::debug!("Could not rewrite settings file: {}", e);
            }
        }
        settings
    }

    /// Load settings from an explicit file path
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let user: Value = match std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read settings: {}", e))
            .and_then(|s| {
                serde_json::from_str(&s).map_err(|e| format!("Failed to parse settings: {}", e))
            }) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Ignoring settings file {:?}: {}", path, e);
                return Self::default();
            }
        };

        let defaults = serde_json::to_value(Self::default())
            .expect("default settings always serialize");
        let unified = unify(&defaults, &user);

        match serde_json::from_value(unified) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Settings merge produced invalid values ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Save non-default values to an explicit file path
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        let defaults = serde_json::to_value(Self::default())
            .map_err(|e| format!("Failed to serialize defaults: {}", e))?;
        let current = serde_json::to_value(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        let overrides = compress(&defaults, &current);
        let json = serde_json::to_string_pretty(&overrides)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        std::fs::write(path, json).map_err(|e| format!("Failed to write settings: {}", e))?;
        log::debug!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// Merge user overrides over defaults (see module docs for the rules)
pub fn unify(defaults: &Value, user: &Value) -> Value {
    let (default_map, user_map) = match (defaults, user) {
        (Value::Object(d), Value::Object(u)) => (d, u),
        _ => return defaults.clone(),
    };

    let mut unified = serde_json::Map::new();
    for (key, default_val) in default_map {
        let merged = match user_map.get(key) {
            Some(user_val) if default_val.is_object() => unify(default_val, user_val),
            Some(user_val) if same_json_kind(default_val, user_val) => user_val.clone(),
            _ => default_val.clone(),
        };
        unified.insert(key.clone(), merged);
    }
    Value::Object(unified)
}

/// Keep only non-default leaves (the inverse of `unify`)
pub fn compress(defaults: &Value, current: &Value) -> Value {
    let (default_map, current_map) = match (defaults, current) {
        (Value::Object(d), Value::Object(c)) => (d, c),
        _ => return Value::Object(serde_json::Map::new()),
    };

    let mut compressed = serde_json::Map::new();
    for (key, default_val) in default_map {
        let current_val = match current_map.get(key) {
            Some(v) => v,
            None => continue,
        };

        if default_val.is_object() {
            let nested = compress(default_val, current_val);
            if nested.as_object().map(|m| !m.is_empty()).unwrap_or(false) {
                compressed.insert(key.clone(), nested);
            }
        } else if current_val != default_val {
            compressed.insert(key.clone(), current_val.clone());
        }
    }
    Value::Object(compressed)
}

/// Type check for the merge: integer and float count as different kinds,
/// matching the strictness of the original type filter.
fn same_json_kind(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(_), Value::Bool(_)) => true,
        (Value::String(_), Value::String(_)) => true,
        (Value::Array(_), Value::Array(_)) => true,
        (Value::Object(_), Value::Object(_)) => true,
        (Value::Number(x), Value::Number(y)) => x.is_f64() == y.is_f64(),
        _ => false,
    }
}
