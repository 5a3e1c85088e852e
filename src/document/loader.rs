//! Document opening and on-demand page loading
//!
//! Archive access and parsing always run on the blocking pool. Concurrent
//! requests for the same uncached page share one in-flight load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;

use super::bundle::parse_page_bundle;
use super::error::{Result, TalyaError};
use super::model::{DocumentModel, PageState};
use super::types::{Manifest, PageIndexEntry, SearchIndex, TalyaPage};
use crate::archive::{ArchiveAccessor, ZipArchiveAccessor};
use crate::config::LoaderConfig;

pub const DOCUMENT_EXTENSION: &str = "talya";
pub const MANIFEST_ENTRY: &str = "manifest.json";
pub const SEARCH_INDEX_ENTRY: &str = "search_index.json";
pub const PAGE_INDEX_ENTRY: &str = "pages/index.json";

type PageCell = Arc<OnceCell<Arc<TalyaPage>>>;

/// Top-level entries read once at open time
struct DocumentStructure {
    manifest: Manifest,
    search_index: Option<SearchIndex>,
    page_index: Vec<PageIndexEntry>,
}

/// An open `.talya` document
pub struct TalyaDocument {
    path: Option<PathBuf>,
    model: Arc<DocumentModel>,
    archive: Arc<dyn ArchiveAccessor>,
    in_flight: Mutex<HashMap<usize, InFlightLoad>>,
    config: LoaderConfig,
}

impl TalyaDocument {
    /// Open a document on disk
    pub async fn open<P: AsRef<Path>>(path: P, config: LoaderConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if config.enforce_extension && !has_document_extension(&path) {
            return Err(TalyaError::InvalidFileType(path.display().to_string()));
        }

        tracing::info!(path = %path.display(), "Opening document");

        let archive_path = path.clone();
        let (archive, structure) = tokio::task::spawn_blocking(move || {
            let archive = ZipArchiveAccessor::open(&archive_path)?;
            let structure = read_structure(&archive)?;
            Ok::<_, TalyaError>((archive, structure))
        })
        .await
        .map_err(|e| TalyaError::TaskFailed(format!("Task join error: {}", e)))??;

        let mut document = Self::assemble(Arc::new(archive), structure, config);
        document.path = Some(path);
        Ok(document)
    }

    /// Open a document over any archive implementation
    pub async fn from_accessor(
        archive: Arc<dyn ArchiveAccessor>,
        config: LoaderConfig,
    ) -> Result<Self> {
        let reader = Arc::clone(&archive);
        let structure = tokio::task::spawn_blocking(move || read_structure(reader.as_ref()))
            .await
            .map_err(|e| TalyaError::TaskFailed(format!("Task join error: {}", e)))??;

        Ok(Self::assemble(archive, structure, config))
    }

    fn assemble(
        archive: Arc<dyn ArchiveAccessor>,
        structure: DocumentStructure,
        config: LoaderConfig,
    ) -> Self {
        let model = DocumentModel::new(
            structure.manifest,
            structure.page_index,
            structure.search_index,
            config.max_cached_pages,
        );

        Self {
            path: None,
            model: Arc::new(model),
            archive,
            in_flight: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn model(&self) -> &DocumentModel {
        &self.model
    }

    pub fn manifest(&self) -> &Manifest {
        self.model.manifest()
    }

    pub fn page_count(&self) -> usize {
        self.model.page_count()
    }

    pub fn page_index(&self) -> &[PageIndexEntry] {
        self.model.page_index()
    }

    pub fn search_index(&self) -> Option<&SearchIndex> {
        self.model.search_index()
    }

    pub fn has_search_index(&self) -> bool {
        self.model.has_search_index()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Cached page, without triggering a load
    pub fn cached_page(&self, index: usize) -> Option<Arc<TalyaPage>> {
        self.model.cached_page(index)
    }

    pub fn page_state(&self, index: usize) -> PageState {
        if self.model.is_cached(index) {
            PageState::Cached
        } else if self.in_flight.lock().contains_key(&index) {
            PageState::Loading
        } else {
            PageState::NotRequested
        }
    }

    /// Load a page, serving it from the cache when possible
    ///
    /// Out-of-range indices fail before the archive is touched. A failed
    /// load is not cached; the next request retries. Dropping the returned
    /// future does not lose a fetch already underway: the page still lands
    /// in the cache.
    pub async fn load_page(&self, index: usize) -> Result<Arc<TalyaPage>> {
        let page_count = self.page_count();
        if index >= page_count {
            return Err(TalyaError::InvalidPageIndex { index, page_count });
        }

        if let Some(page) = self.model.cached_page(index) {
            tracing::debug!(page = index, "Page served from cache");
            return Ok(page);
        }

        let waiter = InFlightWaiter::join(&self.in_flight, index);
        let page = waiter
            .cell
            .get_or_try_init(|| self.cached_or_fetch(index))
            .await
            .map(Arc::clone);
        page
    }

    /// Load several pages concurrently; results are in request order
    pub async fn load_pages(&self, indices: &[usize]) -> Vec<Result<Arc<TalyaPage>>> {
        join_all(indices.iter().map(|&index| self.load_page(index))).await
    }

    /// A load that finished between the caller's cache miss and joining
    /// the in-flight cell is picked up here instead of fetched again
    async fn cached_or_fetch(&self, index: usize) -> Result<Arc<TalyaPage>> {
        match self.model.cached_page(index) {
            Some(page) => Ok(page),
            None => self.fetch_page(index).await,
        }
    }

    /// Extract and parse on the blocking pool
    ///
    /// The blocking task inserts into the cache itself, so a page finished
    /// after every waiter gave up is still kept.
    async fn fetch_page(&self, index: usize) -> Result<Arc<TalyaPage>> {
        let page_count = self.page_count();
        let entry = self
            .model
            .page_entry(index)
            .cloned()
            .ok_or(TalyaError::InvalidPageIndex { index, page_count })?;

        tracing::info!(page = index, filename = %entry.filename, "Loading page");

        let archive = Arc::clone(&self.archive);
        let model = Arc::clone(&self.model);
        let verify = self.config.verify_checksums;
        tokio::task::spawn_blocking(move || {
            let archive_entry = archive
                .entry(&entry.filename)
                .ok_or_else(|| TalyaError::PageNotFound(entry.filename.clone()))?;
            let bytes = archive.extract(&archive_entry)?;
            if verify {
                verify_page_bytes(&entry, &bytes);
            }
            let page = parse_page_bundle(bytes)?;

            tracing::info!(
                page = index,
                strokes = page.strokes().len(),
                images = page.images().len(),
                "Page loaded"
            );

            Ok::<_, TalyaError>(model.insert_page(index, page))
        })
        .await
        .map_err(|e| TalyaError::TaskFailed(format!("Task join error: {}", e)))?
    }
}

/// Shared cell for one page plus the number of callers waiting on it
struct InFlightLoad {
    cell: PageCell,
    waiters: usize,
}

/// One caller's share of an in-flight page load
///
/// The map entry is removed when the last waiter leaves, whether it
/// finished, failed or was dropped mid-load.
struct InFlightWaiter<'a> {
    in_flight: &'a Mutex<HashMap<usize, InFlightLoad>>,
    index: usize,
    cell: PageCell,
}

impl<'a> InFlightWaiter<'a> {
    fn join(in_flight: &'a Mutex<HashMap<usize, InFlightLoad>>, index: usize) -> Self {
        let mut loads = in_flight.lock();
        let load = loads.entry(index).or_insert_with(|| InFlightLoad {
            cell: PageCell::default(),
            waiters: 0,
        });
        load.waiters += 1;

        Self {
            in_flight,
            index,
            cell: Arc::clone(&load.cell),
        }
    }
}

impl Drop for InFlightWaiter<'_> {
    fn drop(&mut self) {
        let mut loads = self.in_flight.lock();
        if let Some(load) = loads.get_mut(&self.index) {
            if Arc::ptr_eq(&load.cell, &self.cell) {
                load.waiters -= 1;
                if load.waiters == 0 {
                    loads.remove(&self.index);
                }
            }
        }
    }
}

impl std::fmt::Debug for TalyaDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TalyaDocument")
            .field("path", &self.path)
            .field("model", &self.model)
            .finish()
    }
}

fn has_document_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION))
}

fn read_structure(archive: &dyn ArchiveAccessor) -> Result<DocumentStructure> {
    let manifest = load_manifest(archive)?;
    tracing::info!(title = %manifest.title, doc_id = %manifest.doc_id, "Loaded manifest");

    let search_index = match load_search_index(archive) {
        Ok(index) => {
            tracing::info!(
                total_words = index.statistics.total_words,
                unique_words = index.statistics.unique_words,
                "Search index loaded"
            );
            Some(index)
        }
        Err(TalyaError::MissingSearchIndex) => {
            tracing::info!("No search index found");
            None
        }
        Err(e) => {
            tracing::warn!("Ignoring unreadable search index: {}", e);
            None
        }
    };

    let page_index = load_page_index(archive)?;
    check_page_index(&manifest, &page_index);
    tracing::info!(pages = page_index.len(), "Loaded page index");

    Ok(DocumentStructure {
        manifest,
        search_index,
        page_index,
    })
}

pub fn load_manifest(archive: &dyn ArchiveAccessor) -> Result<Manifest> {
    let entry = archive
        .entry(MANIFEST_ENTRY)
        .ok_or_else(|| TalyaError::MissingManifest(format!("{} not found", MANIFEST_ENTRY)))?;
    let data = archive.extract(&entry)?;
    serde_json::from_slice(&data)
        .map_err(|e| TalyaError::MissingManifest(format!("invalid {}: {}", MANIFEST_ENTRY, e)))
}

/// Absent and malformed search indexes both report `MissingSearchIndex`
pub fn load_search_index(archive: &dyn ArchiveAccessor) -> Result<SearchIndex> {
    let entry = archive
        .entry(SEARCH_INDEX_ENTRY)
        .ok_or(TalyaError::MissingSearchIndex)?;
    let data = archive.extract(&entry)?;
    serde_json::from_slice(&data).map_err(|e| {
        tracing::warn!("Malformed {}: {}", SEARCH_INDEX_ENTRY, e);
        TalyaError::MissingSearchIndex
    })
}

pub fn load_page_index(archive: &dyn ArchiveAccessor) -> Result<Vec<PageIndexEntry>> {
    let entry = archive
        .entry(PAGE_INDEX_ENTRY)
        .ok_or_else(|| TalyaError::MissingPageIndex(format!("{} not found", PAGE_INDEX_ENTRY)))?;
    let data = archive.extract(&entry)?;
    serde_json::from_slice(&data)
        .map_err(|e| TalyaError::MissingPageIndex(format!("invalid {}: {}", PAGE_INDEX_ENTRY, e)))
}

/// Log inconsistencies; the page index stays authoritative
fn check_page_index(manifest: &Manifest, page_index: &[PageIndexEntry]) {
    if manifest.page_count != page_index.len() {
        tracing::warn!(
            manifest_pages = manifest.page_count,
            indexed_pages = page_index.len(),
            "Manifest page count disagrees with page index"
        );
    }
    for (position, entry) in page_index.iter().enumerate() {
        if entry.index != position {
            tracing::warn!(
                position,
                index = entry.index,
                filename = %entry.filename,
                "Page index entry out of order"
            );
        }
    }
}

fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compare bundle bytes against the size and sha256 recorded in the index
///
/// Mismatches are logged, never fatal. Returns whether every check that
/// could be made passed.
fn verify_page_bytes(entry: &PageIndexEntry, bytes: &[u8]) -> bool {
    let mut ok = true;

    if entry.size != 0 && entry.size != bytes.len() as u64 {
        tracing::warn!(
            page = entry.index,
            expected = entry.size,
            actual = bytes.len(),
            "Page bundle size mismatch"
        );
        ok = false;
    }

    let expected = entry.checksum.trim();
    let expected = expected.strip_prefix("sha256:").unwrap_or(expected);
    if expected.is_empty() {
        return ok;
    }
    if expected.len() != 64 {
        tracing::debug!(page = entry.index, "Unsupported checksum format, skipping");
        return ok;
    }

    let actual = compute_checksum(bytes);
    if !actual.eq_ignore_ascii_case(expected) {
        tracing::warn!(
            page = entry.index,
            expected,
            actual = %actual,
            "Page bundle checksum mismatch"
        );
        ok = false;
    }

    ok
}
