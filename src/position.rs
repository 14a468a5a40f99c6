//! Reading position tracking.
//!
//! Scroll and page updates arrive on every scroll tick or page flip. They are
//! kept in memory and written to the preferences store only after a quiet
//! interval; a new update supersedes the running timer, so at most one write
//! is ever pending and the last value wins. A write that has already started
//! is never cancelled, and all writes go through one async lock so they land
//! in order. Chapter changes bypass the timer and persist the reset
//! immediately.

use crate::chapter::ChapterId;
use crate::error::Result;
use crate::prefs::{PrefKey, PrefValue, PreferencesStore, ReadingMode};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Quiet interval before a position update is persisted.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

/// The reader's place in the library.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReadingPosition {
    pub last_chapter_id: Option<ChapterId>,
    /// Continuous mode: `item_index * 1000 + pixel offset`.
    pub scroll_offset: f32,
    /// Paginated mode: zero-based page index.
    pub page_number: usize,
}

/// Position restored for the active reading mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RestoredPosition {
    Scroll(f32),
    Page(usize),
}

#[derive(Default)]
struct TrackerState {
    position: ReadingPosition,
    pending_scroll: Option<f32>,
    pending_page: Option<usize>,
    /// Bumped on every update, reset and flush; a sleeping timer only writes
    /// if the generation it was spawned for is still current.
    generation: u64,
}

impl TrackerState {
    fn supersede_timer(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    fn take_pending(&mut self) -> (Option<f32>, Option<usize>) {
        (self.pending_scroll.take(), self.pending_page.take())
    }
}

/// Debounced reading-position persistence over a [`PreferencesStore`].
///
/// Updates spawn onto the ambient Tokio runtime, so the tracker must be used
/// from within one.
pub struct PositionTracker<P: PreferencesStore + 'static> {
    store: Arc<P>,
    debounce: Duration,
    state: Arc<Mutex<TrackerState>>,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl<P: PreferencesStore + 'static> PositionTracker<P> {
    pub fn new(store: Arc<P>, debounce: Duration) -> Self {
        Self {
            store,
            debounce,
            state: Arc::new(Mutex::new(TrackerState::default())),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn store(&self) -> &Arc<P> {
        &self.store
    }

    /// In-memory position, including updates not yet persisted.
    pub fn position(&self) -> ReadingPosition {
        lock_state(&self.state).position
    }

    pub fn update_scroll(&self, offset: f32) {
        let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
        let mut state = lock_state(&self.state);
        state.position.scroll_offset = offset;
        state.pending_scroll = Some(offset);
        self.restart_timer(&mut state);
    }

    pub fn update_page(&self, page: usize) {
        let mut state = lock_state(&self.state);
        state.position.page_number = page;
        state.pending_page = Some(page);
        self.restart_timer(&mut state);
    }

    /// Zero both fields and persist immediately, dropping any pending write.
    pub async fn reset_position(&self) -> Result<()> {
        {
            let mut state = lock_state(&self.state);
            state.supersede_timer();
            state.take_pending();
            state.position.scroll_offset = 0.0;
            state.position.page_number = 0;
        }
        // A debounced write already in progress lands before the zeros.
        let _write = self.write_lock.lock().await;
        self.store
            .set(PrefKey::ScrollOffset, PrefValue::Float(0.0))
            .await?;
        self.store.set(PrefKey::PageNumber, PrefValue::Int(0)).await?;
        info!("Reset reading position");
        Ok(())
    }

    /// Persist a pending update now instead of waiting for the timer.
    pub async fn flush(&self) -> Result<()> {
        let _write = self.write_lock.lock().await;
        let (scroll, page) = {
            let mut state = lock_state(&self.state);
            state.supersede_timer();
            state.take_pending()
        };
        if scroll.is_none() && page.is_none() {
            return Ok(());
        }
        persist(self.store.as_ref(), scroll, page).await?;
        debug!(?scroll, ?page, "Flushed reading position");
        Ok(())
    }

    pub async fn save_last_chapter(&self, id: ChapterId) -> Result<()> {
        lock_state(&self.state).position.last_chapter_id = Some(id);
        self.store
            .set(PrefKey::LastChapterId, PrefValue::Int(id))
            .await
    }

    pub async fn last_chapter(&self) -> Result<Option<ChapterId>> {
        let stored = self
            .store
            .get(PrefKey::LastChapterId)
            .await?
            .and_then(|v| v.as_i64());
        if stored.is_some() {
            lock_state(&self.state).position.last_chapter_id = stored;
        }
        Ok(stored)
    }

    /// Restore the scroll offset; a not-yet-persisted update takes precedence.
    pub async fn restore_scroll(&self) -> Result<f32> {
        let _write = self.write_lock.lock().await;
        if let Some(pending) = lock_state(&self.state).pending_scroll {
            return Ok(pending);
        }
        let offset = self
            .store
            .get(PrefKey::ScrollOffset)
            .await?
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(0.0);
        lock_state(&self.state).position.scroll_offset = offset;
        debug!(offset, "Restored scroll offset");
        Ok(offset)
    }

    /// Restore the page index, clamped to the freshly computed page count.
    pub async fn restore_page(&self, total_pages: usize) -> Result<usize> {
        let _write = self.write_lock.lock().await;
        let pending = lock_state(&self.state).pending_page;
        let saved = match pending {
            Some(page) => page,
            None => self
                .store
                .get(PrefKey::PageNumber)
                .await?
                .and_then(|v| v.as_i64())
                .map(|v| v.max(0) as usize)
                .unwrap_or(0),
        };
        let page = saved.min(total_pages.saturating_sub(1));
        lock_state(&self.state).position.page_number = page;
        if page != saved {
            debug!(saved, page, total_pages, "Clamped restored page");
        }
        Ok(page)
    }

    /// Restore only the field that is meaningful for `mode`.
    pub async fn restore(&self, mode: ReadingMode, total_pages: usize) -> Result<RestoredPosition> {
        match mode {
            ReadingMode::Continuous => self.restore_scroll().await.map(RestoredPosition::Scroll),
            ReadingMode::Paginated => self
                .restore_page(total_pages)
                .await
                .map(RestoredPosition::Page),
        }
    }

    fn restart_timer(&self, state: &mut TrackerState) {
        let generation = state.supersede_timer();
        let store = Arc::clone(&self.store);
        let shared = Arc::clone(&self.state);
        let write_lock = Arc::clone(&self.write_lock);
        let delay = self.debounce;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _write = write_lock.lock().await;
            let (scroll, page) = {
                let mut state = lock_state(&shared);
                if state.generation != generation {
                    return;
                }
                state.take_pending()
            };
            if let Err(err) = persist(store.as_ref(), scroll, page).await {
                warn!("Failed to persist reading position: {err}");
            }
        });
    }
}

async fn persist<P: PreferencesStore + ?Sized>(
    store: &P,
    scroll: Option<f32>,
    page: Option<usize>,
) -> Result<()> {
    if let Some(offset) = scroll {
        store
            .set(PrefKey::ScrollOffset, PrefValue::Float(f64::from(offset)))
            .await?;
    }
    if let Some(page) = page {
        store
            .set(PrefKey::PageNumber, PrefValue::Int(page as i64))
            .await?;
    }
    Ok(())
}

fn lock_state(state: &Mutex<TrackerState>) -> MutexGuard<'_, TrackerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::prefs::MemoryPreferences;
    use async_trait::async_trait;

    /// Records every write in order, on top of an in-memory store.
    #[derive(Default)]
    pub(crate) struct RecordingPreferences {
        inner: MemoryPreferences,
        writes: std::sync::Mutex<Vec<(PrefKey, PrefValue)>>,
    }

    impl RecordingPreferences {
        pub(crate) fn writes(&self) -> Vec<(PrefKey, PrefValue)> {
            self.writes.lock().unwrap().clone()
        }

        pub(crate) fn writes_of(&self, key: PrefKey) -> Vec<PrefValue> {
            self.writes()
                .into_iter()
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v)
                .collect()
        }
    }

    #[async_trait]
    impl PreferencesStore for RecordingPreferences {
        async fn get(&self, key: PrefKey) -> Result<Option<PrefValue>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: PrefKey, value: PrefValue) -> Result<()> {
            self.writes.lock().unwrap().push((key, value.clone()));
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: PrefKey) -> Result<()> {
            self.inner.remove(key).await
        }
    }

    fn tracker() -> (Arc<RecordingPreferences>, PositionTracker<RecordingPreferences>) {
        let store = Arc::new(RecordingPreferences::default());
        let tracker = PositionTracker::new(Arc::clone(&store), DEFAULT_DEBOUNCE);
        (store, tracker)
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_updates_coalesce_into_one_write() {
        let (store, tracker) = tracker();
        for i in 0..10 {
            tracker.update_scroll(i as f32 * 100.0);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(store.writes().is_empty());
        assert_eq!(tracker.position().scroll_offset, 900.0);

        tokio::time::sleep(Duration::from_millis(2_100)).await;
        assert_eq!(
            store.writes(),
            vec![(PrefKey::ScrollOffset, PrefValue::Float(900.0))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn updates_in_separate_windows_write_separately() {
        let (store, tracker) = tracker();
        tracker.update_page(1);
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        tracker.update_page(2);
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(
            store.writes_of(PrefKey::PageNumber),
            vec![PrefValue::Int(1), PrefValue::Int(2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reset_is_immediate_and_cancels_pending_write() {
        let (store, tracker) = tracker();
        tracker.update_page(7);
        tracker.update_scroll(4_200.0);
        tracker.reset_position().await.unwrap();

        let position = tracker.position();
        assert_eq!(position.page_number, 0);
        assert_eq!(position.scroll_offset, 0.0);
        assert_eq!(
            store.writes(),
            vec![
                (PrefKey::ScrollOffset, PrefValue::Float(0.0)),
                (PrefKey::PageNumber, PrefValue::Int(0)),
            ]
        );

        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(store.writes().len(), 2, "stale update written after reset");
    }

    #[tokio::test(start_paused = true)]
    async fn flush_writes_pending_value_now() {
        let (store, tracker) = tracker();
        tracker.update_page(3);
        tracker.flush().await.unwrap();
        assert_eq!(store.writes_of(PrefKey::PageNumber), vec![PrefValue::Int(3)]);

        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(store.writes().len(), 1);

        tracker.flush().await.unwrap();
        assert_eq!(store.writes().len(), 1, "flush without pending update wrote");
    }

    /// Every write takes 10ms, like a file-backed store.
    #[derive(Default)]
    struct SlowPreferences {
        inner: MemoryPreferences,
    }

    #[async_trait]
    impl PreferencesStore for SlowPreferences {
        async fn get(&self, key: PrefKey) -> Result<Option<PrefValue>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: PrefKey, value: PrefValue) -> Result<()> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: PrefKey) -> Result<()> {
            self.inner.remove(key).await
        }
    }

    fn slow_tracker() -> (Arc<SlowPreferences>, PositionTracker<SlowPreferences>) {
        let store = Arc::new(SlowPreferences::default());
        let tracker = PositionTracker::new(Arc::clone(&store), DEFAULT_DEBOUNCE);
        (store, tracker)
    }

    #[tokio::test(start_paused = true)]
    async fn update_during_write_keeps_the_write() {
        let (store, tracker) = slow_tracker();
        tracker.update_page(5);
        // The timer fired at 2000ms and is still inside its 10ms write.
        tokio::time::sleep(Duration::from_millis(2_005)).await;
        tracker.update_scroll(1.0);
        tokio::time::sleep(Duration::from_secs(5)).await;
        tracker.flush().await.unwrap();

        assert_eq!(
            store.get(PrefKey::PageNumber).await.unwrap(),
            Some(PrefValue::Int(5))
        );
        assert_eq!(
            store.get(PrefKey::ScrollOffset).await.unwrap(),
            Some(PrefValue::Float(1.0))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn flush_during_write_keeps_both_values() {
        let (store, tracker) = slow_tracker();
        tracker.update_page(5);
        tokio::time::sleep(Duration::from_millis(2_005)).await;
        tracker.update_page(6);
        tracker.flush().await.unwrap();
        assert_eq!(
            store.get(PrefKey::PageNumber).await.unwrap(),
            Some(PrefValue::Int(6))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reset_during_write_lands_last() {
        let (store, tracker) = slow_tracker();
        tracker.update_page(5);
        tokio::time::sleep(Duration::from_millis(2_005)).await;
        tracker.reset_position().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(
            store.get(PrefKey::PageNumber).await.unwrap(),
            Some(PrefValue::Int(0))
        );
    }

    #[tokio::test]
    async fn restored_page_is_clamped_to_page_count() {
        let (store, tracker) = tracker();
        store.set(PrefKey::PageNumber, PrefValue::Int(12)).await.unwrap();
        assert_eq!(tracker.restore_page(5).await.unwrap(), 4);
        assert_eq!(tracker.position().page_number, 4);
        assert_eq!(tracker.restore_page(0).await.unwrap(), 0);
        assert_eq!(tracker.restore_page(20).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn restore_reads_only_the_active_mode() {
        let (store, tracker) = tracker();
        store.set(PrefKey::PageNumber, PrefValue::Int(2)).await.unwrap();
        store
            .set(PrefKey::ScrollOffset, PrefValue::Float(3_040.0))
            .await
            .unwrap();

        assert_eq!(
            tracker.restore(ReadingMode::Continuous, 10).await.unwrap(),
            RestoredPosition::Scroll(3_040.0)
        );
        assert_eq!(tracker.position().page_number, 0);

        assert_eq!(
            tracker.restore(ReadingMode::Paginated, 10).await.unwrap(),
            RestoredPosition::Page(2)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restore_prefers_unsaved_update() {
        let (_store, tracker) = tracker();
        tracker.update_page(6);
        assert_eq!(tracker.restore_page(10).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn last_chapter_is_saved_immediately() {
        let (store, tracker) = tracker();
        assert_eq!(tracker.last_chapter().await.unwrap(), None);
        tracker.save_last_chapter(8).await.unwrap();
        assert_eq!(
            store.writes(),
            vec![(PrefKey::LastChapterId, PrefValue::Int(8))]
        );
        assert_eq!(tracker.position().last_chapter_id, Some(8));
        assert_eq!(tracker.last_chapter().await.unwrap(), Some(8));
    }
}
