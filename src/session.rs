//! Reader session: ties chapter loading, layout, position tracking and
//! navigation together for a front end.
//!
//! A session holds at most one loaded chapter. Loading a chapter records it as
//! the last one read, lays it out for the active reading mode and restores the
//! saved position for that mode. Moving to another chapter always resets the
//! position before the new chapter is requested.

use crate::chapter::{Chapter, ChapterId};
use crate::config::AppConfig;
use crate::error::{ReaderError, Result};
use crate::navigation::{ChapterNavigation, NavigationResolver};
use crate::pagination::{MAX_FONT_SIZE, MIN_FONT_SIZE, Page, Paginator, Viewport, continuous_paragraphs};
use crate::position::{PositionTracker, ReadingPosition};
use crate::prefs::{PrefKey, PrefValue, PreferencesStore, ReadingMode, ReadingPreferences};
use crate::store::ChapterStore;
use std::sync::Arc;
use tracing::{debug, info};

/// How the loaded chapter is presented.
#[derive(Debug, Clone, PartialEq)]
pub enum ChapterLayout {
    Paginated { pages: Vec<Page>, current_page: usize },
    Continuous { paragraphs: Vec<String>, scroll_offset: f32 },
}

/// The chapter currently open in a session.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedChapter {
    pub chapter: Chapter,
    pub layout: ChapterLayout,
    pub navigation: ChapterNavigation,
}

impl LoadedChapter {
    pub fn id(&self) -> ChapterId {
        self.chapter.id
    }

    /// The visible page in paginated mode.
    pub fn current_page(&self) -> Option<&Page> {
        match &self.layout {
            ChapterLayout::Paginated {
                pages,
                current_page,
            } => pages.get(*current_page),
            ChapterLayout::Continuous { .. } => None,
        }
    }

    pub fn page_count(&self) -> usize {
        match &self.layout {
            ChapterLayout::Paginated { pages, .. } => pages.len(),
            ChapterLayout::Continuous { .. } => 0,
        }
    }
}

/// Result of a page turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTurn {
    /// Moved within the chapter to this page.
    Page(usize),
    /// Crossed into another chapter.
    Chapter(ChapterId),
    /// Already at the first or last page of the library.
    Boundary,
}

pub struct ReaderSession<S: ChapterStore, P: PreferencesStore + 'static> {
    store: Arc<S>,
    navigator: NavigationResolver<S>,
    tracker: PositionTracker<P>,
    preferences: ReadingPreferences,
    viewport: Viewport,
    paginator: Paginator,
    current: Option<LoadedChapter>,
}

impl<S: ChapterStore, P: PreferencesStore + 'static> ReaderSession<S, P> {
    /// Open a session over the given stores; display settings are read now.
    pub async fn open(store: Arc<S>, prefs: Arc<P>, config: &AppConfig) -> Result<Self> {
        let mut preferences = ReadingPreferences::load(prefs.as_ref()).await?;
        preferences.font_size = preferences.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        info!(
            mode = %preferences.reading_mode,
            font_size = preferences.font_size,
            font_family = %preferences.font_family,
            "Opened reader session"
        );
        Ok(Self {
            navigator: NavigationResolver::new(Arc::clone(&store)),
            tracker: PositionTracker::new(prefs, config.position_debounce()),
            store,
            preferences,
            viewport: config.viewport(),
            paginator: Paginator::new(),
            current: None,
        })
    }

    pub fn preferences(&self) -> &ReadingPreferences {
        &self.preferences
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn current(&self) -> Option<&LoadedChapter> {
        self.current.as_ref()
    }

    pub fn position(&self) -> ReadingPosition {
        self.tracker.position()
    }

    /// Reopen the last chapter read, or the first chapter of the library.
    pub async fn resume(&mut self) -> Result<Option<&LoadedChapter>> {
        if let Some(id) = self.tracker.last_chapter().await? {
            if self.store.get_by_id(id).await?.is_some() {
                return self.load_chapter(id).await.map(Some);
            }
            info!(id, "Last chapter no longer in library; starting over");
            self.tracker.reset_position().await?;
        }
        let first = self.store.list_ordered().await?.into_iter().next();
        match first {
            Some(chapter) => self.load_chapter(chapter.id).await.map(Some),
            None => {
                debug!("Library is empty");
                Ok(None)
            }
        }
    }

    /// Load a chapter and restore the saved position for the active mode.
    pub async fn load_chapter(&mut self, id: ChapterId) -> Result<&LoadedChapter> {
        let chapter = self
            .store
            .get_by_id(id)
            .await?
            .ok_or(ReaderError::ChapterNotFound { id })?;
        self.tracker.save_last_chapter(id).await?;
        let layout = self.restored_layout(&chapter).await?;
        let navigation = self.navigator.summary(id).await?;
        info!(
            id,
            title = %chapter.title,
            mode = %self.preferences.reading_mode,
            "Loaded chapter"
        );
        Ok(&*self.current.insert(LoadedChapter {
            chapter,
            layout,
            navigation,
        }))
    }

    pub async fn next_chapter(&mut self) -> Result<Option<&LoadedChapter>> {
        let Some(current) = self.current_id() else {
            return Ok(None);
        };
        match self.navigator.next_chapter_id(current).await? {
            Some(next) => self.enter_chapter(next).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn previous_chapter(&mut self) -> Result<Option<&LoadedChapter>> {
        let Some(current) = self.current_id() else {
            return Ok(None);
        };
        match self.navigator.previous_chapter_id(current).await? {
            Some(previous) => self.enter_chapter(previous).await.map(Some),
            None => Ok(None),
        }
    }

    /// Turn forward. Past the last page this opens the next chapter; in
    /// continuous mode the whole chapter is one scroll, so it always does.
    pub async fn next_page(&mut self) -> Result<PageTurn> {
        let Some(loaded) = self.current.as_mut() else {
            return Ok(PageTurn::Boundary);
        };
        if let ChapterLayout::Paginated {
            pages,
            current_page,
        } = &mut loaded.layout
            && *current_page + 1 < pages.len()
        {
            *current_page += 1;
            let page = *current_page;
            self.tracker.update_page(page);
            debug!(page, "Next page");
            return Ok(PageTurn::Page(page));
        }
        Ok(match self.next_chapter().await? {
            Some(loaded) => PageTurn::Chapter(loaded.id()),
            None => PageTurn::Boundary,
        })
    }

    /// Turn back. Before page 0 this opens the previous chapter at its start.
    pub async fn previous_page(&mut self) -> Result<PageTurn> {
        let Some(loaded) = self.current.as_mut() else {
            return Ok(PageTurn::Boundary);
        };
        if let ChapterLayout::Paginated { current_page, .. } = &mut loaded.layout
            && *current_page > 0
        {
            *current_page -= 1;
            let page = *current_page;
            self.tracker.update_page(page);
            debug!(page, "Previous page");
            return Ok(PageTurn::Page(page));
        }
        Ok(match self.previous_chapter().await? {
            Some(loaded) => PageTurn::Chapter(loaded.id()),
            None => PageTurn::Boundary,
        })
    }

    /// Jump to a page, clamped to the chapter. `None` outside paginated mode.
    pub fn go_to_page(&mut self, page: usize) -> Option<usize> {
        let loaded = self.current.as_mut()?;
        let ChapterLayout::Paginated {
            pages,
            current_page,
        } = &mut loaded.layout
        else {
            return None;
        };
        *current_page = page.min(pages.len().saturating_sub(1));
        self.tracker.update_page(*current_page);
        Some(*current_page)
    }

    /// Record a continuous-mode scroll offset.
    pub fn update_scroll(&mut self, offset: f32) {
        if let Some(LoadedChapter {
            layout: ChapterLayout::Continuous { scroll_offset, .. },
            ..
        }) = self.current.as_mut()
        {
            self.tracker.update_scroll(offset);
            *scroll_offset = self.tracker.position().scroll_offset;
        }
    }

    pub async fn set_reading_mode(&mut self, mode: ReadingMode) -> Result<()> {
        self.tracker
            .store()
            .set(PrefKey::ReadingMode, PrefValue::Text(mode.as_str().to_string()))
            .await?;
        if self.preferences.reading_mode == mode {
            return Ok(());
        }
        self.preferences.reading_mode = mode;
        info!(%mode, "Changed reading mode");
        if let Some(chapter) = self.current.as_ref().map(|loaded| loaded.chapter.clone()) {
            let layout = self.restored_layout(&chapter).await?;
            if let Some(loaded) = self.current.as_mut() {
                loaded.layout = layout;
            }
        }
        Ok(())
    }

    /// Persist a new font size, clamped to the supported range, and
    /// re-paginate. Returns the size applied.
    pub async fn set_font_size(&mut self, font_size: f32) -> Result<f32> {
        let font_size = if font_size.is_finite() {
            font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
        } else {
            self.preferences.font_size
        };
        self.tracker
            .store()
            .set(PrefKey::FontSize, PrefValue::Float(f64::from(font_size)))
            .await?;
        if font_size != self.preferences.font_size {
            self.preferences.font_size = font_size;
            debug!(font_size, "Changed font size");
            self.repaginate();
        }
        Ok(font_size)
    }

    pub async fn set_font_family(&mut self, family: &str) -> Result<()> {
        self.tracker
            .store()
            .set(PrefKey::FontFamily, PrefValue::Text(family.to_string()))
            .await?;
        self.preferences.font_family = family.to_string();
        Ok(())
    }

    pub async fn set_gesture_navigation(&mut self, enabled: bool) -> Result<()> {
        self.tracker
            .store()
            .set(PrefKey::GestureNavigationEnabled, PrefValue::Bool(enabled))
            .await?;
        self.preferences.gesture_navigation_enabled = enabled;
        Ok(())
    }

    /// Apply new screen dimensions; pages are recomputed from scratch.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.viewport == viewport {
            return;
        }
        self.viewport = viewport;
        self.repaginate();
    }

    /// Persist any pending position update.
    pub async fn close(&self) -> Result<()> {
        self.tracker.flush().await?;
        info!("Closed reader session");
        Ok(())
    }

    fn current_id(&self) -> Option<ChapterId> {
        self.current.as_ref().map(LoadedChapter::id)
    }

    async fn enter_chapter(&mut self, id: ChapterId) -> Result<&LoadedChapter> {
        self.tracker.reset_position().await?;
        self.load_chapter(id).await
    }

    async fn restored_layout(&self, chapter: &Chapter) -> Result<ChapterLayout> {
        Ok(match self.preferences.reading_mode {
            ReadingMode::Paginated => {
                let pages = self.paginate(chapter);
                let current_page = self.tracker.restore_page(pages.len()).await?;
                ChapterLayout::Paginated {
                    pages,
                    current_page,
                }
            }
            ReadingMode::Continuous => ChapterLayout::Continuous {
                paragraphs: continuous_paragraphs(chapter.text())
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                scroll_offset: self.tracker.restore_scroll().await?,
            },
        })
    }

    fn paginate(&self, chapter: &Chapter) -> Vec<Page> {
        let geometry = self.viewport.geometry(self.preferences.font_size);
        self.paginator.pages(chapter.text(), &geometry)
    }

    /// Recompute pages for the loaded chapter and clamp the current page.
    fn repaginate(&mut self) {
        let Some(loaded) = self.current.as_ref() else {
            return;
        };
        if !matches!(loaded.layout, ChapterLayout::Paginated { .. }) {
            return;
        }
        let fresh = self.paginate(&loaded.chapter);
        let Some(LoadedChapter {
            layout:
                ChapterLayout::Paginated {
                    pages,
                    current_page,
                },
            ..
        }) = self.current.as_mut()
        else {
            return;
        };
        *pages = fresh;
        let clamped = (*current_page).min(pages.len().saturating_sub(1));
        debug!(pages = pages.len(), page = clamped, "Re-paginated chapter");
        if clamped != *current_page {
            *current_page = clamped;
            self.tracker.update_page(clamped);
        }
    }
}
