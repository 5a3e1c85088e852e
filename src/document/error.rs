//! Document error types

use thiserror::Error;

use crate::archive::ArchiveError;

/// Errors raised while opening documents and loading pages
#[derive(Debug, Error)]
pub enum TalyaError {
    /// Path does not carry the `.talya` extension
    #[error("Not a .talya file: {0}")]
    InvalidFileType(String),

    /// Container cannot be opened as an archive
    #[error("Failed to open archive: {0}")]
    ArchiveOpenFailed(String),

    /// `manifest.json` absent or undecodable
    #[error("Invalid Talya file: missing manifest ({0})")]
    MissingManifest(String),

    /// `pages/index.json` absent or undecodable
    #[error("Invalid Talya file: missing page index ({0})")]
    MissingPageIndex(String),

    /// Optional; callers treat this as "no search index"
    #[error("Search index not found")]
    MissingSearchIndex,

    #[error("Invalid page index {index} (document has {page_count} pages)")]
    InvalidPageIndex { index: usize, page_count: usize },

    /// Page index references an entry that is not in the archive
    #[error("Page file not found: {0}")]
    PageNotFound(String),

    /// Page bundle bytes are not a valid nested archive
    #[error("Failed to open page bundle: {0}")]
    PageBundleOpenFailed(String),

    /// Entry data could not be extracted
    #[error("Archive read error: {0}")]
    ArchiveRead(String),

    #[error("No document loaded")]
    NoDocumentLoaded,

    /// Background task panicked or was cancelled
    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

/// Result type alias for document operations
pub type Result<T> = std::result::Result<T, TalyaError>;

impl From<ArchiveError> for TalyaError {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Open(reason) => TalyaError::ArchiveOpenFailed(reason),
            ArchiveError::EntryNotFound(path) => TalyaError::PageNotFound(path),
            read @ ArchiveError::Read { .. } => TalyaError::ArchiveRead(read.to_string()),
        }
    }
}
