//! Durable reader preferences.
//!
//! The reader only needs a small key/value surface: position fields written
//! by the tracker and a handful of display settings. `MemoryPreferences` backs
//! tests; `FilePreferences` persists to a TOML file per library.

mod file;

pub use file::{FilePreferences, library_cache_dir};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

/// Keys recognised by the preferences store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrefKey {
    LastChapterId,
    ScrollOffset,
    PageNumber,
    ReadingMode,
    FontSize,
    FontFamily,
    GestureNavigationEnabled,
}

impl PrefKey {
    pub const ALL: [PrefKey; 7] = [
        PrefKey::LastChapterId,
        PrefKey::ScrollOffset,
        PrefKey::PageNumber,
        PrefKey::ReadingMode,
        PrefKey::FontSize,
        PrefKey::FontFamily,
        PrefKey::GestureNavigationEnabled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PrefKey::LastChapterId => "last_chapter_id",
            PrefKey::ScrollOffset => "scroll_offset",
            PrefKey::PageNumber => "page_number",
            PrefKey::ReadingMode => "reading_mode",
            PrefKey::FontSize => "font_size",
            PrefKey::FontFamily => "font_family",
            PrefKey::GestureNavigationEnabled => "gesture_navigation_enabled",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl std::fmt::Display for PrefKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored preference value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl PrefValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PrefValue::Int(v) => Some(*v),
            PrefValue::Float(v) if v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PrefValue::Float(v) => Some(*v),
            PrefValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrefValue::Bool(v) => Some(*v),
            PrefValue::Text(v) => match v.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PrefValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Durable key/value settings with asynchronous access.
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    async fn get(&self, key: PrefKey) -> Result<Option<PrefValue>>;

    async fn set(&self, key: PrefKey, value: PrefValue) -> Result<()>;

    async fn remove(&self, key: PrefKey) -> Result<()>;

    /// Forget the saved chapter and position.
    async fn clear_reading_position(&self) -> Result<()> {
        self.remove(PrefKey::LastChapterId).await?;
        self.remove(PrefKey::ScrollOffset).await?;
        self.remove(PrefKey::PageNumber).await
    }
}

/// Preferences held in memory only.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<PrefKey, PrefValue>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferencesStore for MemoryPreferences {
    async fn get(&self, key: PrefKey) -> Result<Option<PrefValue>> {
        Ok(self.values.lock().await.get(&key).cloned())
    }

    async fn set(&self, key: PrefKey, value: PrefValue) -> Result<()> {
        self.values.lock().await.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: PrefKey) -> Result<()> {
        self.values.lock().await.remove(&key);
        Ok(())
    }
}

/// How chapter text is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingMode {
    #[default]
    Continuous,
    Paginated,
}

impl ReadingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadingMode::Continuous => "continuous",
            ReadingMode::Paginated => "paginated",
        }
    }

    /// Anything other than "paginated" reads as continuous.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("paginated") {
            ReadingMode::Paginated
        } else {
            ReadingMode::Continuous
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            ReadingMode::Continuous => ReadingMode::Paginated,
            ReadingMode::Paginated => ReadingMode::Continuous,
        }
    }
}

impl std::fmt::Display for ReadingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ReadingMode::Continuous => "Continuous",
            ReadingMode::Paginated => "Paginated",
        };
        write!(f, "{}", label)
    }
}

pub const DEFAULT_FONT_SIZE: f32 = 16.0;
pub const DEFAULT_FONT_FAMILY: &str = "Serif";

/// Display settings read from the preferences store.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingPreferences {
    pub reading_mode: ReadingMode,
    pub font_size: f32,
    pub font_family: String,
    pub gesture_navigation_enabled: bool,
}

impl Default for ReadingPreferences {
    fn default() -> Self {
        Self {
            reading_mode: ReadingMode::Continuous,
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            gesture_navigation_enabled: true,
        }
    }
}

impl ReadingPreferences {
    /// Read all display settings, falling back to defaults per key.
    pub async fn load<P: PreferencesStore + ?Sized>(store: &P) -> Result<Self> {
        let defaults = Self::default();
        let reading_mode = store
            .get(PrefKey::ReadingMode)
            .await?
            .and_then(|v| v.as_text().map(ReadingMode::parse))
            .unwrap_or(defaults.reading_mode);
        let font_size = store
            .get(PrefKey::FontSize)
            .await?
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
            .filter(|v| v.is_finite() && *v > 0.0)
            .unwrap_or(defaults.font_size);
        let font_family = store
            .get(PrefKey::FontFamily)
            .await?
            .and_then(|v| v.as_text().map(str::to_string))
            .unwrap_or(defaults.font_family);
        // Only an explicit "false" disables gestures.
        let gesture_navigation_enabled = store
            .get(PrefKey::GestureNavigationEnabled)
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(true);
        Ok(Self {
            reading_mode,
            font_size,
            font_family,
            gesture_navigation_enabled,
        })
    }
}
