//! Continuous-scroll helpers.
//!
//! Continuous mode skips pagination: paragraphs are streamed as list items and
//! the reading position is a virtual coordinate of
//! `item_index * 1000 + pixel offset inside the item`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Virtual pixels reserved per list item in a scroll coordinate.
pub const SCROLL_ITEM_STRIDE: f32 = 1000.0;

static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").unwrap());

/// Paragraphs for continuous mode: split on blank lines, trimmed, blanks dropped.
pub fn continuous_paragraphs(text: &str) -> Vec<&str> {
    RE_PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .collect()
}

/// Decoded continuous-mode scroll position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollOffset {
    pub item_index: usize,
    pub pixel_offset: f32,
}

impl ScrollOffset {
    pub fn new(item_index: usize, pixel_offset: f32) -> Self {
        Self {
            item_index,
            pixel_offset,
        }
    }

    pub fn to_virtual(self) -> f32 {
        self.item_index as f32 * SCROLL_ITEM_STRIDE + self.pixel_offset
    }

    pub fn from_virtual(offset: f32) -> Self {
        if !offset.is_finite() || offset <= 0.0 {
            return Self::new(0, 0.0);
        }
        let item_index = (offset / SCROLL_ITEM_STRIDE).floor();
        Self {
            item_index: item_index as usize,
            pixel_offset: offset - item_index * SCROLL_ITEM_STRIDE,
        }
    }
}

/// Page shown at a given scroll offset when pages are laid out end to end.
pub fn page_for_scroll_offset(page_count: usize, scroll_offset: f32, page_height_px: f32) -> usize {
    let last = page_count.saturating_sub(1);
    let page_height = if page_height_px.is_finite() {
        page_height_px.max(1.0)
    } else {
        1.0
    };
    // Negative and NaN offsets cast to 0.
    ((scroll_offset / page_height) as usize).min(last)
}

pub fn scroll_offset_for_page(page: usize, page_height_px: f32) -> f32 {
    page as f32 * page_height_px
}
