//! `.talya` document loading
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  DocumentManager                        │
//! │  (current document, NoDocumentLoaded when empty)        │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                  TalyaDocument                          │
//! │  open: manifest, search index, page index               │
//! │  load_page: cache hit, or single-flight fetch           │
//! └─────────────────────────────────────────────────────────┘
//!           │                                 │
//!           ▼                                 ▼
//!   ┌──────────────────┐            ┌──────────────────────┐
//!   │  DocumentModel   │            │   ArchiveAccessor    │
//!   │  (LRU page cache)│            │  (document archive)  │
//!   └──────────────────┘            └──────────────────────┘
//!                                             │ page bundle bytes
//!                                             ▼
//!                                   ┌──────────────────────┐
//!                                   │  parse_page_bundle   │
//!                                   │  (nested archive,    │
//!                                   │   strokes.bin codec) │
//!                                   └──────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use talya_viewer::config::LoaderConfig;
//! use talya_viewer::document::TalyaDocument;
//!
//! let document = TalyaDocument::open("notes.talya", LoaderConfig::default()).await?;
//! let page = document.load_page(0).await?;
//! for stroke in page.strokes() {
//!     println!("{} points", stroke.points.len());
//! }
//! ```

mod bundle;
mod error;
mod loader;
mod manager;
mod model;
mod strokes;
mod types;

#[cfg(test)]
mod fixtures;

pub use bundle::{parse_page_archive, parse_page_bundle};
pub use error::{Result, TalyaError};
pub use loader::{
    load_manifest, load_page_index, load_search_index, TalyaDocument, DOCUMENT_EXTENSION,
    MANIFEST_ENTRY, PAGE_INDEX_ENTRY, SEARCH_INDEX_ENTRY,
};
pub use manager::DocumentManager;
pub use model::{DocumentModel, PageState};
pub use strokes::{encode_stroke, encode_strokes, parse_stroke, parse_strokes, MAX_STROKE_COUNT};
pub use types::{
    Manifest, PageDimensions, PageIndexEntry, PageMetadata, SearchIndex, SearchStatistics, Shape,
    Stroke, StrokePoint, TalyaPage, TextElement, TextElementInfo, TextStyle, WordMatch,
};
