//! Next/previous chapter resolution.

use crate::chapter::ChapterId;
use crate::error::{ReaderError, Result};
use crate::store::ChapterStore;
use std::sync::Arc;
use tracing::debug;

/// Where a chapter sits in the library, for enabling navigation controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterNavigation {
    /// Zero-based place in reading order; not the chapter id.
    pub index: usize,
    pub total_chapters: usize,
    pub next_id: Option<ChapterId>,
    pub previous_id: Option<ChapterId>,
}

impl ChapterNavigation {
    pub fn has_next(&self) -> bool {
        self.next_id.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous_id.is_some()
    }
}

/// Resolves neighbours of a chapter over any `ChapterStore`.
pub struct NavigationResolver<S: ChapterStore> {
    store: Arc<S>,
}

impl<S: ChapterStore> Clone for NavigationResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ChapterStore> NavigationResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Chapter after `current` in reading order, or `None` at the end.
    pub async fn next_chapter_id(&self, current: ChapterId) -> Result<Option<ChapterId>> {
        self.ensure_exists(current).await?;
        let next = self.store.next_id_after(current).await?;
        debug!(current, ?next, "Resolved next chapter");
        Ok(next)
    }

    /// Chapter before `current` in reading order, or `None` at the start.
    pub async fn previous_chapter_id(&self, current: ChapterId) -> Result<Option<ChapterId>> {
        self.ensure_exists(current).await?;
        let previous = self.store.previous_id_before(current).await?;
        debug!(current, ?previous, "Resolved previous chapter");
        Ok(previous)
    }

    pub async fn summary(&self, current: ChapterId) -> Result<ChapterNavigation> {
        let next_id = self.next_chapter_id(current).await?;
        let previous_id = self.previous_chapter_id(current).await?;
        let total_chapters = self.store.count().await?;
        let index = self
            .store
            .position_of(current)
            .await?
            .ok_or(ReaderError::ChapterNotFound { id: current })?;
        Ok(ChapterNavigation {
            index,
            total_chapters,
            next_id,
            previous_id,
        })
    }

    async fn ensure_exists(&self, id: ChapterId) -> Result<()> {
        match self.store.get_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(ReaderError::ChapterNotFound { id }),
        }
    }
}
