//! Error types for the reader core.

use std::io;

/// Errors surfaced by the reader core and its reference collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("chapter {id} not found")]
    ChapterNotFound { id: i64 },

    #[error("preferences error: {0}")]
    Preferences(String),

    #[error("library error: {0}")]
    Library(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ReaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_not_found_display() {
        let e = ReaderError::ChapterNotFound { id: 42 };
        assert_eq!(format!("{e}"), "chapter 42 not found");
    }

    #[test]
    fn preferences_error_display() {
        let e = ReaderError::Preferences("disk full".into());
        assert_eq!(format!("{e}"), "preferences error: disk full");
    }

    #[test]
    fn io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let e: ReaderError = io_err.into();
        assert!(matches!(e, ReaderError::Io(_)));
        assert!(format!("{e}").starts_with("I/O error:"));
    }
}
