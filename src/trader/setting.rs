//! Global setting of the chart application.
//!
//! Settings are a flat `key -> value` map. Built-in defaults are overlaid by
//! `chart_setting.json` in the application folder when that file exists.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{LazyLock, RwLock};

use super::utility::get_file_path;

/// Setting filename
pub const SETTING_FILENAME: &str = "chart_setting.json";

/// Default settings
fn default_settings() -> HashMap<String, SettingValue> {
    let mut settings = HashMap::new();

    // Log settings
    settings.insert("log.level".to_string(), SettingValue::Int(20)); // INFO level
    settings.insert("log.console".to_string(), SettingValue::Bool(true));
    settings.insert("log.file".to_string(), SettingValue::Bool(false));

    // Backend API
    settings.insert(
        "api.base_url".to_string(),
        SettingValue::String("http://localhost:5000".to_string()),
    );
    settings.insert("api.page_size".to_string(), SettingValue::Int(10));

    // Indicator default parameters
    settings.insert("indicator.sma.period".to_string(), SettingValue::Int(20));
    settings.insert("indicator.ema.period".to_string(), SettingValue::Int(21));
    settings.insert("indicator.bollinger.period".to_string(), SettingValue::Int(20));
    settings.insert("indicator.bollinger.stdDev".to_string(), SettingValue::Float(2.0));
    settings.insert("indicator.rsi.period".to_string(), SettingValue::Int(14));
    settings.insert("indicator.macd.fastPeriod".to_string(), SettingValue::Int(12));
    settings.insert("indicator.macd.slowPeriod".to_string(), SettingValue::Int(26));
    settings.insert("indicator.macd.signalPeriod".to_string(), SettingValue::Int(9));
    settings.insert("indicator.stochastic.period".to_string(), SettingValue::Int(14));
    settings.insert("indicator.stochastic.kPeriod".to_string(), SettingValue::Int(3));
    settings.insert("indicator.stochastic.dPeriod".to_string(), SettingValue::Int(3));

    // Indicator default colors
    for (kind, color) in [
        ("sma", "#0288d1"),
        ("ema", "#1976d2"),
        ("bollinger", "#9c27b0"),
        ("rsi", "#ed6c02"),
        ("macd", "#0288d1"),
        ("stochastic", "#ed6c02"),
    ] {
        settings.insert(
            format!("indicator.{}.color", kind),
            SettingValue::String(color.to_string()),
        );
    }

    // Reference levels for oscillator panes
    settings.insert("level.rsi.overbought".to_string(), SettingValue::Float(70.0));
    settings.insert("level.rsi.oversold".to_string(), SettingValue::Float(30.0));
    settings.insert("level.rsi.middle".to_string(), SettingValue::Float(50.0));
    settings.insert("level.stochastic.overbought".to_string(), SettingValue::Float(80.0));
    settings.insert("level.stochastic.oversold".to_string(), SettingValue::Float(20.0));

    // Indicators the demo application adds on start
    settings.insert(
        "chart.indicators".to_string(),
        SettingValue::String("sma,bollinger,rsi,macd".to_string()),
    );

    settings
}

/// Setting value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl SettingValue {
    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingValue::Float(f) => Some(*f),
            SettingValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Settings container
pub struct Settings {
    settings: RwLock<HashMap<String, SettingValue>>,
}

impl Settings {
    /// Create new Settings from defaults and the application setting file
    pub fn new() -> Self {
        let settings = Self::with_defaults();
        if let Some(file_settings) = load_settings_from_file(&get_file_path(SETTING_FILENAME)) {
            settings.update(file_settings);
        }
        settings
    }

    /// Create Settings holding only the built-in defaults
    pub fn with_defaults() -> Self {
        Self {
            settings: RwLock::new(default_settings()),
        }
    }

    /// Create Settings from defaults overlaid by a specific JSON file
    pub fn from_file(path: &Path) -> Self {
        let settings = Self::with_defaults();
        if let Some(file_settings) = load_settings_from_file(path) {
            settings.update(file_settings);
        }
        settings
    }

    /// Get a setting value
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.settings.read().ok()?.get(key).cloned()
    }

    /// Get a string setting
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    /// Get an integer setting
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int())
    }

    /// Get a float setting
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_float())
    }

    /// Get a bool setting
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// Set a setting value
    pub fn set(&self, key: impl Into<String>, value: SettingValue) {
        if let Ok(mut settings) = self.settings.write() {
            settings.insert(key.into(), value);
        }
    }

    /// Update settings from a map
    pub fn update(&self, new_settings: HashMap<String, SettingValue>) {
        if let Ok(mut settings) = self.settings.write() {
            settings.extend(new_settings);
        }
    }

    /// Get all settings as HashMap
    pub fn get_all(&self) -> HashMap<String, SettingValue> {
        self.settings
            .read()
            .map(|settings| settings.clone())
            .unwrap_or_default()
    }

    /// Save settings to the application setting file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&get_file_path(SETTING_FILENAME))
    }

    /// Save settings to a specific file
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let settings = self.settings.read().map_err(|e| e.to_string())?;
        let json = serde_json::to_string_pretty(&*settings)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Clone for Settings {
    fn clone(&self) -> Self {
        Self {
            settings: RwLock::new(self.get_all()),
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("settings", &self.get_all())
            .finish()
    }
}

/// Load settings from a JSON file
fn load_settings_from_file(path: &Path) -> Option<HashMap<String, SettingValue>> {
    if !path.exists() {
        return None;
    }
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed setting file");
            None
        }
    }
}

/// Global settings instance
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new);
