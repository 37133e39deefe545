//! Mock source for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::source::{paginate, FileDescriptor, FilePage, Source, SourceError};

/// Mock implementation of the Source trait.
///
/// Serves a fixed listing, optionally paginated, and records every page
/// requested. Clones share state, so a test can keep one handle while the
/// processor owns another.
#[derive(Debug, Clone)]
pub struct MockSource {
    name: String,
    page_size: Option<usize>,
    files: Arc<RwLock<Vec<FileDescriptor>>>,
    requested_pages: Arc<RwLock<Vec<Option<usize>>>>,
    /// If set, the next listing call fails with this message.
    next_error: Arc<RwLock<Option<String>>>,
}

impl MockSource {
    /// Unpaginated source.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            page_size: None,
            files: Arc::new(RwLock::new(Vec::new())),
            requested_pages: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Source that serves `page_size` files per page.
    pub fn paginated(name: &str, page_size: usize) -> Self {
        Self {
            page_size: Some(page_size),
            ..Self::new(name)
        }
    }

    pub async fn set_files(&self, files: Vec<FileDescriptor>) {
        *self.files.write().await = files;
    }

    pub async fn requested_pages(&self) -> Vec<Option<usize>> {
        self.requested_pages.read().await.clone()
    }

    /// Make the next listing call fail.
    pub async fn fail_next(&self, message: &str) {
        *self.next_error.write().await = Some(message.to_string());
    }
}

#[async_trait]
impl Source for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_pagination(&self) -> bool {
        self.page_size.is_some()
    }

    async fn get_files(&self, page: Option<usize>) -> Result<FilePage, SourceError> {
        self.requested_pages.write().await.push(page);

        if let Some(message) = self.next_error.write().await.take() {
            return Err(SourceError::ServerError {
                status: 503,
                message,
            });
        }

        let files = self.files.read().await;
        let total = Some(files.len());
        match (page, self.page_size) {
            (Some(page), Some(page_size)) => {
                let (files, has_more) = paginate(files.as_slice(), page, page_size);
                Ok(FilePage {
                    files,
                    has_more,
                    total,
                })
            }
            _ => Ok(FilePage {
                files: files.clone(),
                has_more: false,
                total,
            }),
        }
    }

    async fn total_files(&self) -> Result<usize, SourceError> {
        Ok(self.files.read().await.len())
    }

    async fn page_count(&self) -> Result<usize, SourceError> {
        let total = self.files.read().await.len();
        Ok(match self.page_size {
            Some(page_size) => total.div_ceil(page_size).max(1),
            None => 1,
        })
    }
}
