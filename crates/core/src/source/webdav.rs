//! WebDAV source.
//!
//! Walks the configured root with `PROPFIND` (Depth: 1) requests, one per
//! directory, and caches the flattened listing for the lifetime of the
//! source.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, Method, Url};
use tokio::sync::OnceCell;
use tracing::debug;

use super::{build_access_url, paginate, FileDescriptor, FilePage, Source, SourceError};
use crate::config::SourceConfig;

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<D:propfind xmlns:D="DAV:">
  <D:prop>
    <D:resourcetype/>
  </D:prop>
</D:propfind>"#;

/// A single `<response>` of a multistatus body.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DavEntry {
    /// Decoded path, relative to the server base path, without trailing slash.
    path: String,
    is_collection: bool,
}

/// WebDAV source backed by reqwest.
pub struct WebDavSource {
    client: Client,
    config: Arc<SourceConfig>,
    server_address: String,
    /// Path component of `server_address`, stripped from returned hrefs.
    server_base_path: String,
    /// Configured root in the same form `normalize_href` produces.
    root: String,
    listing: OnceCell<Vec<String>>,
}

impl WebDavSource {
    pub fn new(config: Arc<SourceConfig>) -> Result<Self, SourceError> {
        let server_address = config
            .server_address
            .clone()
            .ok_or_else(|| {
                SourceError::NotConfigured(format!(
                    "WebDAV source '{}' needs a server_address",
                    config.name
                ))
            })?
            .trim_end_matches('/')
            .to_string();

        let server_base_path = Url::parse(&server_address)
            .map_err(|e| {
                SourceError::NotConfigured(format!("Invalid server_address '{}': {}", server_address, e))
            })?
            .path()
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        let root = normalize_root(&config.path);

        Ok(Self {
            client,
            config,
            server_address,
            server_base_path,
            root,
            listing: OnceCell::new(),
        })
    }

    fn page_size(&self) -> usize {
        self.config.page_size.max(1)
    }

    async fn listing(&self) -> Result<&Vec<String>, SourceError> {
        self.listing
            .get_or_try_init(|| async {
                let files = self.walk().await?;
                tracing::info!(
                    "WebDAV source '{}' holds {} files under {}",
                    self.config.name,
                    files.len(),
                    self.config.path
                );
                Ok(files)
            })
            .await
    }

    /// Breadth-first traversal collecting file paths. Each directory is
    /// requested at most once and each file is listed once.
    async fn walk(&self) -> Result<Vec<String>, SourceError> {
        let mut visited = HashSet::from([self.root.clone()]);
        let mut pending = VecDeque::from([self.root.clone()]);
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        while let Some(dir) = pending.pop_front() {
            debug!("PROPFIND {}", dir);
            for entry in self.propfind(&dir).await? {
                if entry.is_collection {
                    if visited.insert(entry.path.clone()) {
                        pending.push_back(entry.path);
                    }
                } else if seen.insert(entry.path.clone()) {
                    files.push(entry.path);
                }
            }
        }

        Ok(files)
    }

    async fn propfind(&self, dir: &str) -> Result<Vec<DavEntry>, SourceError> {
        let url = format!("{}/", build_access_url(&self.server_address, dir).trim_end_matches('/'));
        let method = Method::from_bytes(b"PROPFIND")
            .map_err(|e| SourceError::ParseError(e.to_string()))?;

        let mut request = self
            .client
            .request(method, &url)
            .header("Depth", "1")
            .header("Content-Type", "application/xml")
            .body(PROPFIND_BODY);

        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::ServerError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        parse_multistatus(&body, &self.server_base_path)
    }

    fn describe(&self, path: &str) -> FileDescriptor {
        let filename = path.rsplit('/').next().unwrap_or(path).to_string();
        let root = self.root.trim_end_matches('/');
        let access_url = match &self.config.visit_url_prefix {
            Some(prefix) => build_access_url(prefix, path.strip_prefix(root).unwrap_or(path)),
            None => build_access_url(&self.server_address, path),
        };

        FileDescriptor {
            filename,
            path: path.to_string(),
            access_url,
            source: Arc::clone(&self.config),
        }
    }
}

#[async_trait]
impl Source for WebDavSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn supports_pagination(&self) -> bool {
        self.config.use_pagination
    }

    async fn get_files(&self, page: Option<usize>) -> Result<FilePage, SourceError> {
        let listing = self.listing().await?;
        let total = listing.len();

        match page {
            Some(page) if self.supports_pagination() => {
                let (paths, has_more) = paginate(listing.as_slice(), page, self.page_size());
                debug!(
                    "WebDAV source '{}' page {}: {} files",
                    self.config.name,
                    page,
                    paths.len()
                );
                Ok(FilePage {
                    files: paths.iter().map(|p| self.describe(p)).collect(),
                    has_more,
                    total: Some(total),
                })
            }
            _ => Ok(FilePage {
                files: listing.iter().map(|p| self.describe(p)).collect(),
                has_more: false,
                total: Some(total),
            }),
        }
    }

    async fn total_files(&self) -> Result<usize, SourceError> {
        Ok(self.listing().await?.len())
    }

    async fn page_count(&self) -> Result<usize, SourceError> {
        if !self.supports_pagination() {
            return Ok(1);
        }
        let total = self.total_files().await?;
        Ok(total.div_ceil(self.page_size()))
    }
}

/// Parse a `207 Multi-Status` body into entries.
fn parse_multistatus(xml: &str, server_base_path: &str) -> Result<Vec<DavEntry>, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut href = String::new();
    let mut in_href = false;
    let mut is_collection = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"response" => {
                    href.clear();
                    is_collection = false;
                }
                b"href" => in_href = true,
                b"collection" => is_collection = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"collection" {
                    is_collection = true;
                }
            }
            Ok(Event::Text(text)) if in_href => {
                let value = text
                    .unescape()
                    .map_err(|e| SourceError::ParseError(e.to_string()))?;
                href.push_str(&value);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"href" => in_href = false,
                b"response" => entries.push(DavEntry {
                    path: normalize_href(&href, server_base_path)?,
                    is_collection,
                }),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SourceError::ParseError(format!(
                    "Invalid multistatus at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(entries)
}

/// Turn an href (absolute URL or absolute path, percent-encoded) into a
/// decoded path relative to the server base path.
fn normalize_href(href: &str, server_base_path: &str) -> Result<String, SourceError> {
    let path = match href.find("://") {
        Some(scheme_end) => {
            let rest = &href[scheme_end + 3..];
            rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
        }
        None => href,
    };

    let decoded = urlencoding::decode(path)
        .map_err(|e| SourceError::ParseError(format!("Invalid href '{}': {}", href, e)))?;

    let relative = decoded
        .strip_prefix(server_base_path)
        .unwrap_or(decoded.as_ref())
        .trim_end_matches('/');

    if relative.is_empty() {
        Ok("/".to_string())
    } else if relative.starts_with('/') {
        Ok(relative.to_string())
    } else {
        Ok(format!("/{}", relative))
    }
}

/// Configured root as `/a/b`: leading slash, no trailing slash, `/` when empty.
fn normalize_root(path: &str) -> String {
    match path.trim_matches('/') {
        "" => "/".to_string(),
        trimmed => format!("/{}", trimmed),
    }
}
