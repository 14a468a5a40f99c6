//! Chapter records and their ordering key.

use serde::{Deserialize, Serialize};

/// Identifier assigned to a chapter when a library is imported.
pub type ChapterId = i64;

/// One chapter of a serialized book. Immutable once imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub order_index: Option<i64>,
    #[serde(default)]
    pub book_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Chapter {
    pub fn new(id: ChapterId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: None,
            order_index: None,
            book_id: None,
            url: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_order_index(mut self, order_index: Option<i64>) -> Self {
        self.order_index = order_index;
        self
    }

    /// The explicit order index when present, otherwise the id.
    ///
    /// Every listing and next/previous query orders by this value so they all
    /// agree on where a chapter without an explicit index belongs.
    pub fn effective_order(&self) -> i64 {
        self.order_index.unwrap_or(self.id)
    }

    /// Total ordering key: effective order, ties broken by id.
    pub fn sort_key(&self) -> (i64, ChapterId) {
        (self.effective_order(), self.id)
    }

    /// Chapter text, or the empty string for chapters that were never fetched.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_order_falls_back_to_id() {
        let implicit = Chapter::new(7, "Seven");
        let explicit = Chapter::new(7, "Seven").with_order_index(Some(2));
        assert_eq!(implicit.effective_order(), 7);
        assert_eq!(explicit.effective_order(), 2);
    }

    #[test]
    fn sort_key_orders_mixed_chapters() {
        let mut chapters = vec![
            Chapter::new(1, "a"),
            Chapter::new(2, "b"),
            Chapter::new(3, "c").with_order_index(Some(5)),
            Chapter::new(4, "d").with_order_index(Some(2)),
        ];
        chapters.sort_by_key(Chapter::sort_key);
        let ids: Vec<_> = chapters.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 4, 3]);
    }

    #[test]
    fn missing_content_reads_as_empty() {
        assert_eq!(Chapter::new(1, "x").text(), "");
        assert_eq!(Chapter::new(1, "x").with_content("body").text(), "body");
    }
}
