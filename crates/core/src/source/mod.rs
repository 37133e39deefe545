//! Media file sources.
//!
//! A `Source` lists the files under a configured root, either in one call
//! or page by page. Listings are taken as-is by the task processor; a source
//! that fails aborts its task.

mod local_folder;
mod webdav;

pub use local_folder::LocalFolderSource;
pub use webdav::WebDavSource;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{ConfigError, SourceConfig};

/// Errors that can occur while enumerating a source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Server answered with an unexpected status.
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Listing response could not be parsed.
    #[error("Failed to parse listing: {0}")]
    ParseError(String),

    /// Local filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source misconfigured for its backend.
    #[error("Source not configured: {0}")]
    NotConfigured(String),
}

/// One listed file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    /// Basename including extension.
    pub filename: String,
    /// Path as reported by the source.
    pub path: String,
    /// URL written into the reference file.
    pub access_url: String,
    pub source: Arc<SourceConfig>,
}

/// One page (or the whole) of a listing.
#[derive(Debug, Clone, Default)]
pub struct FilePage {
    pub files: Vec<FileDescriptor>,
    pub has_more: bool,
    pub total: Option<usize>,
}

/// A listable media location.
#[async_trait]
pub trait Source: Send + Sync {
    /// Name of the configured source, for logs and audit.
    fn name(&self) -> &str;

    fn supports_pagination(&self) -> bool;

    /// Returns a page of files. Page numbers start at 1; `None` returns the
    /// whole listing regardless of pagination support.
    async fn get_files(&self, page: Option<usize>) -> Result<FilePage, SourceError>;

    async fn total_files(&self) -> Result<usize, SourceError>;

    async fn page_count(&self) -> Result<usize, SourceError>;
}

/// Create a source for the configured backend type.
pub fn create_source(config: Arc<SourceConfig>) -> Result<Box<dyn Source>, ConfigError> {
    match config.kind.as_str() {
        "webdav" => {
            let source = WebDavSource::new(config)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
            Ok(Box::new(source))
        }
        "local_folder" => Ok(Box::new(LocalFolderSource::new(config))),
        other => Err(ConfigError::unsupported("source", other)),
    }
}

/// Drain every page of a source into one listing.
pub async fn collect_files(source: &dyn Source) -> Result<Vec<FileDescriptor>, SourceError> {
    if !source.supports_pagination() {
        let page = source.get_files(None).await?;
        tracing::info!("Source '{}' listed {} files", source.name(), page.files.len());
        return Ok(page.files);
    }

    let mut files = Vec::new();
    let mut page_number = 1;
    loop {
        let page = source.get_files(Some(page_number)).await?;
        tracing::debug!(
            "Source '{}' page {}: {} files",
            source.name(),
            page_number,
            page.files.len()
        );
        files.extend(page.files);
        if !page.has_more {
            break;
        }
        page_number += 1;
    }

    tracing::info!("Source '{}' listed {} files", source.name(), files.len());
    Ok(files)
}

/// Slice a cached listing into a page. `page` starts at 1.
pub(crate) fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> (Vec<T>, bool) {
    let start = page.saturating_sub(1).saturating_mul(page_size);
    if start >= items.len() {
        return (Vec::new(), false);
    }
    let end = (start + page_size).min(items.len());
    (items[start..end].to_vec(), end < items.len())
}

/// Join an access URL prefix with a path relative to the source root,
/// percent-encoding each segment.
pub(crate) fn build_access_url(prefix: &str, relative_path: &str) -> String {
    let encoded: Vec<String> = relative_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", prefix.trim_end_matches('/'), encoded.join("/"))
}
