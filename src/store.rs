//! Chapter storage.
//!
//! `ChapterStore` is the seam the reader talks to; `MemoryChapterStore` keeps
//! the whole library in memory, sorted once by `Chapter::sort_key` whenever
//! the set is replaced.

use crate::chapter::{Chapter, ChapterId};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info};

/// Keyed, ordered chapter collection.
#[async_trait]
pub trait ChapterStore: Send + Sync {
    async fn get_by_id(&self, id: ChapterId) -> Result<Option<Chapter>>;

    /// First chapter (by id) whose effective order key equals `key`.
    async fn get_by_order(&self, key: i64) -> Result<Option<Chapter>>;

    async fn count(&self) -> Result<usize>;

    /// Zero-based place of `id` in reading order.
    async fn position_of(&self, id: ChapterId) -> Result<Option<usize>>;

    /// Id of the chapter right after `id` in reading order. Chapters sharing
    /// an effective order key are visited in id order.
    async fn next_id_after(&self, id: ChapterId) -> Result<Option<ChapterId>>;

    /// Id of the chapter right before `id` in reading order, with the same
    /// tie-break as [`ChapterStore::next_id_after`].
    async fn previous_id_before(&self, id: ChapterId) -> Result<Option<ChapterId>>;

    /// Atomically swap the whole chapter set.
    async fn replace_all(&self, chapters: Vec<Chapter>) -> Result<()>;

    /// All chapters in reading order.
    async fn list_ordered(&self) -> Result<Vec<Chapter>>;
}

#[derive(Debug, Default)]
struct Library {
    ordered: Vec<Chapter>,
    position_by_id: HashMap<ChapterId, usize>,
}

impl Library {
    fn build(chapters: Vec<Chapter>) -> Self {
        // Later duplicates replace earlier ones, like an insert-or-replace.
        let mut by_id: HashMap<ChapterId, Chapter> = HashMap::with_capacity(chapters.len());
        for chapter in chapters {
            by_id.insert(chapter.id, chapter);
        }
        let mut chapters: Vec<Chapter> = by_id.into_values().collect();
        chapters.sort_by_key(Chapter::sort_key);
        let position_by_id = chapters
            .iter()
            .enumerate()
            .map(|(pos, chapter)| (chapter.id, pos))
            .collect();
        Self {
            ordered: chapters,
            position_by_id,
        }
    }
}

/// In-memory chapter store.
#[derive(Debug, Default)]
pub struct MemoryChapterStore {
    library: RwLock<Library>,
}

impl MemoryChapterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chapters(chapters: Vec<Chapter>) -> Self {
        Self {
            library: RwLock::new(Library::build(chapters)),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Library) -> T) -> T {
        let guard = self
            .library
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }
}

#[async_trait]
impl ChapterStore for MemoryChapterStore {
    async fn get_by_id(&self, id: ChapterId) -> Result<Option<Chapter>> {
        Ok(self.read(|lib| {
            lib.position_by_id
                .get(&id)
                .map(|&pos| lib.ordered[pos].clone())
        }))
    }

    async fn get_by_order(&self, key: i64) -> Result<Option<Chapter>> {
        Ok(self.read(|lib| {
            let start = lib
                .ordered
                .partition_point(|chapter| chapter.effective_order() < key);
            lib.ordered
                .get(start)
                .filter(|chapter| chapter.effective_order() == key)
                .cloned()
        }))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read(|lib| lib.ordered.len()))
    }

    async fn position_of(&self, id: ChapterId) -> Result<Option<usize>> {
        Ok(self.read(|lib| lib.position_by_id.get(&id).copied()))
    }

    async fn next_id_after(&self, id: ChapterId) -> Result<Option<ChapterId>> {
        Ok(self.read(|lib| {
            let pos = *lib.position_by_id.get(&id)?;
            lib.ordered.get(pos + 1).map(|chapter| chapter.id)
        }))
    }

    async fn previous_id_before(&self, id: ChapterId) -> Result<Option<ChapterId>> {
        Ok(self.read(|lib| {
            let pos = *lib.position_by_id.get(&id)?;
            pos.checked_sub(1).map(|prev| lib.ordered[prev].id)
        }))
    }

    async fn replace_all(&self, chapters: Vec<Chapter>) -> Result<()> {
        let incoming = chapters.len();
        let rebuilt = Library::build(chapters);
        let stored = rebuilt.ordered.len();
        let mut guard = self
            .library
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = rebuilt;
        if stored != incoming {
            debug!(incoming, stored, "Dropped duplicate chapter ids on replace");
        }
        info!(chapters = stored, "Replaced chapter library");
        Ok(())
    }

    async fn list_ordered(&self) -> Result<Vec<Chapter>> {
        Ok(self.read(|lib| lib.ordered.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> MemoryChapterStore {
        MemoryChapterStore::with_chapters(vec![
            Chapter::new(1, "One"),
            Chapter::new(2, "Two"),
            Chapter::new(3, "Three").with_order_index(Some(5)),
            Chapter::new(4, "Four").with_order_index(Some(2)),
        ])
    }

    #[tokio::test]
    async fn lists_in_effective_order() {
        let store = sample_store();
        let ids: Vec<_> = store
            .list_ordered()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 4, 3]);
        assert_eq!(store.count().await.unwrap(), 4);
        assert_eq!(store.position_of(4).await.unwrap(), Some(2));
        assert_eq!(store.position_of(3).await.unwrap(), Some(3));
        assert_eq!(store.position_of(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn next_and_previous_follow_order() {
        let store = sample_store();
        assert_eq!(store.next_id_after(1).await.unwrap(), Some(2));
        assert_eq!(store.next_id_after(2).await.unwrap(), Some(4));
        assert_eq!(store.next_id_after(4).await.unwrap(), Some(3));
        assert_eq!(store.next_id_after(3).await.unwrap(), None);
        assert_eq!(store.previous_id_before(3).await.unwrap(), Some(4));
        assert_eq!(store.previous_id_before(1).await.unwrap(), None);
        assert_eq!(store.next_id_after(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn get_by_order_uses_effective_key() {
        let store = sample_store();
        // Chapter 2 (implicit key 2) and chapter 4 (explicit key 2) tie; lowest id wins.
        assert_eq!(store.get_by_order(2).await.unwrap().map(|c| c.id), Some(2));
        assert_eq!(store.get_by_order(5).await.unwrap().map(|c| c.id), Some(3));
        assert!(store.get_by_order(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_all_swaps_the_whole_set() {
        let store = sample_store();
        store
            .replace_all(vec![Chapter::new(10, "Ten"), Chapter::new(11, "Eleven")])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
        assert!(store.get_by_id(1).await.unwrap().is_none());
        assert_eq!(store.next_id_after(10).await.unwrap(), Some(11));
    }

    #[tokio::test]
    async fn duplicate_ids_keep_the_last_copy() {
        let store = MemoryChapterStore::new();
        store
            .replace_all(vec![Chapter::new(1, "old"), Chapter::new(1, "new")])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get_by_id(1).await.unwrap().unwrap().title, "new");
    }
}
