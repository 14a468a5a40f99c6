//! Pagination utilities.
//!
//! The strategy here is intentionally simple: line wrapping is estimated from
//! an average glyph width instead of shaping text, and paragraphs are packed
//! greedily into pages of a fixed line budget. The estimator is a trait so a
//! real measurement pass can replace it without touching the break policy.

mod continuous;
mod estimate;

pub use continuous::{
    SCROLL_ITEM_STRIDE, ScrollOffset, continuous_paragraphs, page_for_scroll_offset,
    scroll_offset_for_page,
};
pub use estimate::{AverageCharWidth, CHAR_WIDTH_RATIO, LineEstimator, chars_per_line, estimate_lines};

use estimate::sanitize_font_size;
use serde::{Deserialize, Serialize};

/// Vertical padding applied above and below the page body.
pub const DEFAULT_PADDING_PX: f32 = 64.0;
/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_RATIO: f32 = 1.5;
/// Font size range offered to the reader.
pub const MIN_FONT_SIZE: f32 = 8.0;
pub const MAX_FONT_SIZE: f32 = 48.0;

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// One page of a chapter. Derived on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub text: String,
    pub index: usize,
    pub total_in_chapter: usize,
}

impl Page {
    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.total_in_chapter
    }
}

/// Screen dimensions supplied by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub screen_width_px: f32,
    pub screen_height_px: f32,
    /// Horizontal space taken by side margins; subtracted from the width.
    pub horizontal_inset_px: f32,
    pub padding_px: f32,
}

impl Viewport {
    pub fn max_width_px(&self) -> f32 {
        self.screen_width_px - self.horizontal_inset_px
    }

    pub fn geometry(&self, font_size_px: f32) -> PageGeometry {
        PageGeometry::new(self.max_width_px(), self.screen_height_px, font_size_px)
            .with_padding(self.padding_px)
    }
}

/// Inputs of one pagination pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub max_width_px: f32,
    pub screen_height_px: f32,
    pub font_size_px: f32,
    pub padding_px: f32,
}

impl PageGeometry {
    pub fn new(max_width_px: f32, screen_height_px: f32, font_size_px: f32) -> Self {
        Self {
            max_width_px,
            screen_height_px,
            font_size_px,
            padding_px: DEFAULT_PADDING_PX,
        }
    }

    pub fn with_padding(mut self, padding_px: f32) -> Self {
        self.padding_px = padding_px;
        self
    }

    pub fn line_height_px(&self) -> f32 {
        sanitize_font_size(self.font_size_px) * LINE_HEIGHT_RATIO
    }

    pub fn available_height_px(&self) -> f32 {
        self.screen_height_px - 2.0 * self.padding_px
    }

    /// Lines that fit between the paddings; at least 1.
    pub fn lines_per_page(&self) -> usize {
        ((self.available_height_px() / self.line_height_px()).floor() as usize).max(1)
    }
}

/// Splits chapter text into pages using a [`LineEstimator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Paginator<E = AverageCharWidth> {
    estimator: E,
}

impl Paginator<AverageCharWidth> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: LineEstimator> Paginator<E> {
    pub fn with_estimator(estimator: E) -> Self {
        Self { estimator }
    }

    /// Split `text` into page strings. Never returns an empty vector.
    pub fn paginate(&self, text: &str, geometry: &PageGeometry) -> Vec<String> {
        let lines_per_page = geometry.lines_per_page();
        let estimate = |span: &str| {
            self.estimator
                .estimate_lines(span, geometry.max_width_px, geometry.font_size_px)
        };
        let mut builder = PageBuilder::default();

        for paragraph in text.split(PARAGRAPH_SEPARATOR) {
            let paragraph_lines = estimate(paragraph);

            if builder.running_lines + paragraph_lines + 1 > lines_per_page
                && !builder.buffer.is_empty()
            {
                builder.finish_page();
            }

            if paragraph_lines > lines_per_page {
                builder.push_wrapped(paragraph, lines_per_page, &estimate);
            } else {
                builder.buffer.push_str(paragraph);
                builder.buffer.push_str(PARAGRAPH_SEPARATOR);
                builder.running_lines += paragraph_lines + 1;
            }
        }

        if !builder.buffer.is_empty() {
            builder.finish_page();
        }

        if builder.pages.is_empty() {
            return vec![text.to_string()];
        }
        builder.pages
    }

    /// Like [`Paginator::paginate`] but numbered.
    pub fn pages(&self, text: &str, geometry: &PageGeometry) -> Vec<Page> {
        let texts = self.paginate(text, geometry);
        let total_in_chapter = texts.len();
        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Page {
                text,
                index,
                total_in_chapter,
            })
            .collect()
    }
}

/// Paginate with the average-width estimator.
pub fn paginate(
    text: &str,
    max_width_px: f32,
    screen_height_px: f32,
    font_size_px: f32,
    padding_px: f32,
) -> Vec<String> {
    let geometry =
        PageGeometry::new(max_width_px, screen_height_px, font_size_px).with_padding(padding_px);
    Paginator::new().paginate(text, &geometry)
}

#[derive(Default)]
struct PageBuilder {
    pages: Vec<String>,
    buffer: String,
    running_lines: usize,
}

impl PageBuilder {
    fn finish_page(&mut self) {
        let page = self.buffer.trim_end();
        if !page.is_empty() {
            self.pages.push(page.to_string());
        }
        self.buffer.clear();
        self.running_lines = 0;
    }

    /// Word-level fallback for a paragraph taller than a whole page.
    ///
    /// Committed lines of the paragraph are joined by single spaces, so the
    /// page text keeps every word exactly once.
    fn push_wrapped(
        &mut self,
        paragraph: &str,
        lines_per_page: usize,
        estimate: &impl Fn(&str) -> usize,
    ) {
        let mut line = String::new();
        let mut line_words = 0usize;

        for word in paragraph.split(' ') {
            let committed_len = line.len();
            if line_words > 0 {
                line.push(' ');
            }
            line.push_str(word);

            if estimate(&line) > 1 || self.running_lines >= lines_per_page {
                if self.running_lines >= lines_per_page {
                    self.finish_page();
                }
                if line_words > 0 {
                    self.buffer.push_str(&line[..committed_len]);
                    self.buffer.push(' ');
                    self.running_lines += 1;
                }
                line.clear();
                line.push_str(word);
                line_words = 1;
            } else {
                line_words += 1;
            }
        }

        if line_words > 0 {
            self.buffer.push_str(&line);
            self.buffer.push_str(PARAGRAPH_SEPARATOR);
            self.running_lines += estimate(&line);
        }
    }
}
