//! Line-count estimation.
//!
//! There is no shaping engine behind the paginator, so wrapped line counts
//! are guessed from an average glyph width. Page-break decisions depend on
//! the exact numbers produced here; the constants and clamps must not drift.

/// Average glyph width as a fraction of the font size.
pub const CHAR_WIDTH_RATIO: f32 = 0.5;

/// Strategy for guessing how many wrapped lines a span of text occupies.
pub trait LineEstimator {
    /// Estimated line count for `text`; always at least 1.
    fn estimate_lines(&self, text: &str, max_width_px: f32, font_size_px: f32) -> usize;
}

/// Average-character-width model: every glyph is `font_size * 0.5` wide.
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageCharWidth;

impl LineEstimator for AverageCharWidth {
    fn estimate_lines(&self, text: &str, max_width_px: f32, font_size_px: f32) -> usize {
        estimate_lines(text, max_width_px, font_size_px)
    }
}

/// Free-function form of [`AverageCharWidth`].
pub fn estimate_lines(text: &str, max_width_px: f32, font_size_px: f32) -> usize {
    let chars_per_line = chars_per_line(max_width_px, font_size_px);
    (text.chars().count() / chars_per_line).max(1)
}

/// Characters that fit on one line; at least 1.
pub fn chars_per_line(max_width_px: f32, font_size_px: f32) -> usize {
    let char_width = sanitize_font_size(font_size_px) * CHAR_WIDTH_RATIO;
    // NaN and negative widths cast to 0.
    ((max_width_px / char_width).floor() as usize).max(1)
}

/// Font sizes below 1 px (and non-finite ones) are treated as 1 px.
pub(crate) fn sanitize_font_size(font_size_px: f32) -> f32 {
    if font_size_px.is_finite() {
        font_size_px.max(1.0)
    } else {
        1.0
    }
}
