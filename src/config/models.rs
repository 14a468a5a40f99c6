use crate::pagination::Viewport;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_screen_width")]
    pub screen_width_px: f32,
    #[serde(default = "crate::config::defaults::default_screen_height")]
    pub screen_height_px: f32,
    #[serde(default = "crate::config::defaults::default_horizontal_inset")]
    pub horizontal_inset_px: f32,
    #[serde(default = "crate::config::defaults::default_padding")]
    pub padding_px: f32,
    #[serde(default = "crate::config::defaults::default_debounce_ms")]
    pub position_debounce_ms: u64,
    #[serde(default = "crate::config::defaults::default_font_size_step")]
    pub font_size_step: f32,
    #[serde(default = "crate::config::defaults::default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            screen_width_px: crate::config::defaults::default_screen_width(),
            screen_height_px: crate::config::defaults::default_screen_height(),
            horizontal_inset_px: crate::config::defaults::default_horizontal_inset(),
            padding_px: crate::config::defaults::default_padding(),
            position_debounce_ms: crate::config::defaults::default_debounce_ms(),
            font_size_step: crate::config::defaults::default_font_size_step(),
            cache_dir: crate::config::defaults::default_cache_dir(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

impl AppConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport {
            screen_width_px: self.screen_width_px,
            screen_height_px: self.screen_height_px,
            horizontal_inset_px: self.horizontal_inset_px,
            padding_px: self.padding_px,
        }
    }

    pub fn position_debounce(&self) -> Duration {
        Duration::from_millis(self.position_debounce_ms)
    }

    pub fn cache_root(&self) -> PathBuf {
        PathBuf::from(&self.cache_dir)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
