//! Current-document holder

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::error::{Result, TalyaError};
use super::loader::TalyaDocument;
use super::types::TalyaPage;
use crate::config::LoaderConfig;

/// Owns at most one open document and routes page requests to it
///
/// Cloning is cheap; clones share the same current document.
#[derive(Clone, Default)]
pub struct DocumentManager {
    config: LoaderConfig,
    current: Arc<RwLock<Option<Arc<TalyaDocument>>>>,
}

impl DocumentManager {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Open a document and make it current
    ///
    /// On failure the previously open document stays current.
    pub async fn load_document<P: AsRef<Path>>(&self, path: P) -> Result<Arc<TalyaDocument>> {
        let document = Arc::new(TalyaDocument::open(path, self.config.clone()).await?);

        let mut current = self.current.write().await;
        *current = Some(Arc::clone(&document));

        tracing::info!(
            title = %document.manifest().title,
            pages = document.page_count(),
            "Document is now current"
        );
        Ok(document)
    }

    /// Replace the current document with one opened elsewhere
    pub async fn set_document(&self, document: Arc<TalyaDocument>) {
        *self.current.write().await = Some(document);
    }

    pub async fn current_document(&self) -> Option<Arc<TalyaDocument>> {
        self.current.read().await.clone()
    }

    /// Load a page from the current document
    pub async fn load_page(&self, index: usize) -> Result<Arc<TalyaPage>> {
        let document = self.current_document().await.ok_or_else(|| {
            tracing::debug!(page = index, "Page requested with no document loaded");
            TalyaError::NoDocumentLoaded
        })?;
        document.load_page(index).await
    }

    /// Close the current document, returning it if one was open
    pub async fn close(&self) -> Option<Arc<TalyaDocument>> {
        self.current.write().await.take()
    }
}
