//! Document model and page cache

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use super::types::{Manifest, PageIndexEntry, SearchIndex, TalyaPage};

/// Load state of a single page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    NotRequested,
    Loading,
    Cached,
}

/// Parsed archive structure plus the page cache
///
/// Manifest, page index and search index are fixed at construction. Pages
/// are added as they load; with a budget the least recently used page is
/// evicted once the cache is full.
pub struct DocumentModel {
    manifest: Manifest,
    page_index: Vec<PageIndexEntry>,
    search_index: Option<SearchIndex>,
    pages: Mutex<LruCache<usize, Arc<TalyaPage>>>,
}

impl DocumentModel {
    pub fn new(
        manifest: Manifest,
        page_index: Vec<PageIndexEntry>,
        search_index: Option<SearchIndex>,
        max_cached_pages: Option<NonZeroUsize>,
    ) -> Self {
        let pages = match max_cached_pages {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };

        Self {
            manifest,
            page_index,
            search_index,
            pages: Mutex::new(pages),
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Number of pages, as listed by the page index
    pub fn page_count(&self) -> usize {
        self.page_index.len()
    }

    pub fn page_index(&self) -> &[PageIndexEntry] {
        &self.page_index
    }

    pub fn page_entry(&self, index: usize) -> Option<&PageIndexEntry> {
        self.page_index.get(index)
    }

    pub fn search_index(&self) -> Option<&SearchIndex> {
        self.search_index.as_ref()
    }

    pub fn has_search_index(&self) -> bool {
        self.search_index.is_some()
    }

    /// Cached page, marking it most recently used
    pub fn cached_page(&self, index: usize) -> Option<Arc<TalyaPage>> {
        self.pages.lock().get(&index).cloned()
    }

    pub fn is_cached(&self, index: usize) -> bool {
        self.pages.lock().contains(&index)
    }

    /// Store a loaded page
    ///
    /// If another load already cached this index the existing page is kept
    /// and returned, so every caller observes the same `Arc`.
    pub fn insert_page(&self, index: usize, page: TalyaPage) -> Arc<TalyaPage> {
        let mut pages = self.pages.lock();
        if let Some(existing) = pages.get(&index) {
            return Arc::clone(existing);
        }
        let page = Arc::new(page);
        pages.put(index, Arc::clone(&page));
        page
    }

    pub fn cached_page_count(&self) -> usize {
        self.pages.lock().len()
    }
}

impl std::fmt::Debug for DocumentModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentModel")
            .field("doc_id", &self.manifest.doc_id)
            .field("page_count", &self.page_count())
            .field("search_index", &self.has_search_index())
            .field("cached_pages", &self.cached_page_count())
            .finish()
    }
}
