//! Local folder source.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use walkdir::WalkDir;

use super::{build_access_url, FileDescriptor, FilePage, Source, SourceError};
use crate::config::SourceConfig;

/// Lists files under a directory on the local filesystem. Never paginated.
pub struct LocalFolderSource {
    config: Arc<SourceConfig>,
    listing: OnceCell<Vec<FileDescriptor>>,
}

impl LocalFolderSource {
    pub fn new(config: Arc<SourceConfig>) -> Self {
        Self {
            config,
            listing: OnceCell::new(),
        }
    }

    async fn listing(&self) -> Result<&Vec<FileDescriptor>, SourceError> {
        self.listing
            .get_or_try_init(|| async {
                let config = Arc::clone(&self.config);
                tokio::task::spawn_blocking(move || scan(&config))
                    .await
                    .map_err(|e| SourceError::Io(std::io::Error::other(e)))?
            })
            .await
    }
}

fn scan(config: &Arc<SourceConfig>) -> Result<Vec<FileDescriptor>, SourceError> {
    let root = PathBuf::from(&config.path);
    if !root.is_dir() {
        return Err(SourceError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| SourceError::Io(std::io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        files.push(describe(config, &root, entry.path()));
    }

    tracing::info!(
        "Local source '{}' holds {} files under {}",
        config.name,
        files.len(),
        root.display()
    );
    Ok(files)
}

fn describe(config: &Arc<SourceConfig>, root: &Path, path: &Path) -> FileDescriptor {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let full_path = path.to_string_lossy().to_string();

    let access_url = match &config.visit_url_prefix {
        Some(prefix) => {
            let relative = path.strip_prefix(root).unwrap_or(path);
            let relative: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect();
            build_access_url(prefix, &relative.join("/"))
        }
        None => full_path.clone(),
    };

    FileDescriptor {
        filename,
        path: full_path,
        access_url,
        source: Arc::clone(config),
    }
}

#[async_trait]
impl Source for LocalFolderSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn supports_pagination(&self) -> bool {
        false
    }

    async fn get_files(&self, _page: Option<usize>) -> Result<FilePage, SourceError> {
        let files = self.listing().await?.clone();
        let total = files.len();
        Ok(FilePage {
            files,
            has_more: false,
            total: Some(total),
        })
    }

    async fn total_files(&self) -> Result<usize, SourceError> {
        Ok(self.listing().await?.len())
    }

    async fn page_count(&self) -> Result<usize, SourceError> {
        Ok(1)
    }
}
