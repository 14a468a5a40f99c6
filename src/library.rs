//! Chapter import from the scraper's JSON export.
//!
//! The scraping scripts write either a bare array of chapters or an object of
//! the form `{ "book_info": {...}, "chapters": [...] }`. Chapter text is
//! cleaned once here so pagination never sees carriage returns or runs of
//! blank lines.

use crate::chapter::{Chapter, ChapterId};
use crate::error::{ReaderError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

const UNTITLED: &str = "Untitled";

static RE_EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Chapters read from one export, ready for `ChapterStore::replace_all`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedLibrary {
    pub book_id: Option<String>,
    pub book_title: Option<String>,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LibraryFile {
    Bare(Vec<RawChapter>),
    Wrapped {
        #[serde(default)]
        book_info: Option<BookInfo>,
        chapters: Vec<RawChapter>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct BookInfo {
    #[serde(default, alias = "book_id")]
    id: Option<serde_json::Value>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawChapter {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, alias = "order_index")]
    order: Option<i64>,
    #[serde(default)]
    url: Option<String>,
}

/// Read and clean a library export from disk.
pub async fn load_library(path: &Path) -> Result<ImportedLibrary> {
    let data = tokio::fs::read_to_string(path).await?;
    let library = parse_library(&data)
        .map_err(|err| ReaderError::Library(format!("{}: {err}", path.display())))?;
    info!(
        path = %path.display(),
        chapters = library.chapters.len(),
        book_id = ?library.book_id,
        "Loaded chapter library"
    );
    Ok(library)
}

/// Parse an export already held in memory. Ids are assigned `1..=n` in file
/// order.
pub fn parse_library(data: &str) -> Result<ImportedLibrary> {
    let (book_info, raw_chapters) = match serde_json::from_str::<LibraryFile>(data)? {
        LibraryFile::Bare(chapters) => (BookInfo::default(), chapters),
        LibraryFile::Wrapped {
            book_info,
            chapters,
        } => (book_info.unwrap_or_default(), chapters),
    };

    let book_id = book_info.id.and_then(|value| match value {
        serde_json::Value::String(id) => Some(id),
        serde_json::Value::Number(id) => Some(id.to_string()),
        serde_json::Value::Null => None,
        other => {
            warn!(%other, "Ignoring unsupported book id");
            None
        }
    });

    let chapters = raw_chapters
        .into_iter()
        .zip(1..)
        .map(|(raw, id): (RawChapter, ChapterId)| {
            let title = raw
                .title
                .map(|title| title.trim().to_string())
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| UNTITLED.to_string());
            let content = raw.content.map(|text| clean_content(&text));
            if content.as_deref().is_none_or(str::is_empty) {
                debug!(id, %title, "Chapter has no content");
            }
            Chapter {
                id,
                title,
                content,
                order_index: raw.order,
                book_id: book_id.clone(),
                url: raw.url,
            }
        })
        .collect();

    Ok(ImportedLibrary {
        book_id,
        book_title: book_info.title,
        chapters,
    })
}

/// NFC-normalize, fold line endings to `\n`, collapse runs of blank lines and
/// trim.
pub fn clean_content(text: &str) -> String {
    let normalized: String = text.nfc().collect();
    let unix = normalized.replace("\r\n", "\n").replace('\r', "\n");
    RE_EXCESS_NEWLINES
        .replace_all(&unix, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_array_gets_sequential_ids() {
        let library = parse_library(
            r#"[
                {"title": "Crimson", "content": "Pain."},
                {"title": "Situation", "content": "Light.", "order": 7},
                {"title": "Melissa"}
            ]"#,
        )
        .unwrap();
        let ids: Vec<_> = library.chapters.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(library.chapters[1].order_index, Some(7));
        assert_eq!(library.chapters[2].content, None);
        assert_eq!(library.book_id, None);
    }

    #[test]
    fn wrapped_export_carries_book_info() {
        let library = parse_library(
            r#"{
                "book_info": {"book_id": 1023, "title": "Lord of the Mysteries", "total_chapters": 2},
                "chapters": [
                    {"title": "One", "content": "a", "order_index": 0, "url": "https://x/1"},
                    {"title": "Two", "content": "b", "order_index": 1}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(library.book_id.as_deref(), Some("1023"));
        assert_eq!(library.book_title.as_deref(), Some("Lord of the Mysteries"));
        assert_eq!(library.chapters[0].order_index, Some(0));
        assert_eq!(library.chapters[0].url.as_deref(), Some("https://x/1"));
        assert_eq!(library.chapters[1].book_id.as_deref(), Some("1023"));
    }

    #[test]
    fn blank_titles_become_untitled() {
        let library = parse_library(r#"[{"title": "   "}, {}]"#).unwrap();
        assert_eq!(library.chapters[0].title, UNTITLED);
        assert_eq!(library.chapters[1].title, UNTITLED);
    }

    #[test]
    fn content_is_cleaned() {
        assert_eq!(
            clean_content("  First.\r\n\r\n\r\n\r\nSecond.\rThird.\n\n"),
            "First.\n\nSecond.\nThird."
        );
        // "e" followed by a combining acute accent composes to "é".
        assert_eq!(clean_content("cafe\u{301}"), "caf\u{e9}");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            parse_library("{\"chapters\": 3}"),
            Err(ReaderError::Json(_))
        ));
    }

    #[tokio::test]
    async fn load_reads_from_disk() {
        let missing = load_library(Path::new("/nonexistent/serial-reader/library.json")).await;
        assert!(matches!(missing, Err(ReaderError::Io(_))));

        let path = std::env::temp_dir().join(format!(
            "serial-reader-library-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"[{"title": "One", "content": "Text."}]"#).unwrap();
        let library = load_library(&path).await.unwrap();
        assert_eq!(library.chapters.len(), 1);
        assert_eq!(library.chapters[0].text(), "Text.");

        std::fs::write(&path, "[oops").unwrap();
        assert!(matches!(
            load_library(&path).await,
            Err(ReaderError::Library(_))
        ));
        let _ = std::fs::remove_file(&path);
    }
}
