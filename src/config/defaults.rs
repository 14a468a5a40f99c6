pub(crate) fn default_screen_width() -> f32 {
    720.0
}

pub(crate) fn default_screen_height() -> f32 {
    1280.0
}

pub(crate) fn default_horizontal_inset() -> f32 {
    48.0
}

pub(crate) fn default_padding() -> f32 {
    crate::pagination::DEFAULT_PADDING_PX
}

pub(crate) fn default_debounce_ms() -> u64 {
    2000
}

pub(crate) fn default_font_size_step() -> f32 {
    2.0
}

pub(crate) fn default_cache_dir() -> String {
    ".cache".to_string()
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}
