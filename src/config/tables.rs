use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;

/// Section names accepted in the sectioned config layout.
pub(super) const SECTION_NAMES: [&str; 4] = ["viewport", "reading", "storage", "logging"];

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    viewport: ViewportConfig,
    #[serde(default)]
    reading: ReadingConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            screen_width_px: tables.viewport.screen_width_px,
            screen_height_px: tables.viewport.screen_height_px,
            horizontal_inset_px: tables.viewport.horizontal_inset_px,
            padding_px: tables.viewport.padding_px,
            position_debounce_ms: tables.reading.position_debounce_ms,
            font_size_step: tables.reading.font_size_step,
            cache_dir: tables.storage.cache_dir,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            viewport: ViewportConfig {
                screen_width_px: config.screen_width_px,
                screen_height_px: config.screen_height_px,
                horizontal_inset_px: config.horizontal_inset_px,
                padding_px: config.padding_px,
            },
            reading: ReadingConfig {
                position_debounce_ms: config.position_debounce_ms,
                font_size_step: config.font_size_step,
            },
            storage: StorageConfig {
                cache_dir: config.cache_dir.clone(),
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ViewportConfig {
    #[serde(default = "defaults::default_screen_width")]
    screen_width_px: f32,
    #[serde(default = "defaults::default_screen_height")]
    screen_height_px: f32,
    #[serde(default = "defaults::default_horizontal_inset")]
    horizontal_inset_px: f32,
    #[serde(default = "defaults::default_padding")]
    padding_px: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        ViewportConfig {
            screen_width_px: defaults::default_screen_width(),
            screen_height_px: defaults::default_screen_height(),
            horizontal_inset_px: defaults::default_horizontal_inset(),
            padding_px: defaults::default_padding(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ReadingConfig {
    #[serde(default = "defaults::default_debounce_ms")]
    position_debounce_ms: u64,
    #[serde(default = "defaults::default_font_size_step")]
    font_size_step: f32,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        ReadingConfig {
            position_debounce_ms: defaults::default_debounce_ms(),
            font_size_step: defaults::default_font_size_step(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_cache_dir")]
    cache_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            cache_dir: defaults::default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
