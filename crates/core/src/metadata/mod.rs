//! Metadata lookup against an external catalog.
//!
//! A provider turns a parsed title into an [`EnrichmentRecord`]. Not finding
//! anything is an ordinary outcome and is reported as `None`, never as an
//! error.

mod tmdb;

pub use tmdb::TmdbProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, MediaType, MetadataProviderConfig};

/// Errors raised while talking to a metadata catalog.
///
/// These never leave a provider's `fetch_info`; they are logged and turned
/// into an absent result.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// What to look up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataQuery {
    pub title: String,
    pub year: Option<String>,
    pub media_type: MediaType,
    /// Display language code, e.g. "en" or "zh-CN".
    pub language: String,
}

impl MetadataQuery {
    pub fn new(
        title: impl Into<String>,
        year: Option<String>,
        media_type: MediaType,
        language: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            year,
            media_type,
            language: language.into(),
        }
    }
}

/// Fields fetched from a catalog for one title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    /// Identifier in the catalog that produced this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    /// Content rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpaa: Option<String>,

    // Episodic media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aired: Option<String>,

    // Music
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

/// A catalog that can enrich parsed titles.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Configured name of this provider.
    fn name(&self) -> &str;

    /// Look up a title. `None` when the catalog has nothing or could not be
    /// reached.
    async fn fetch_info(&self, query: &MetadataQuery) -> Option<EnrichmentRecord>;
}

/// Build a provider from its configuration.
pub fn create_provider(
    config: &MetadataProviderConfig,
) -> Result<Box<dyn MetadataProvider>, ConfigError> {
    match config.kind.as_str() {
        "tmdb" => {
            let provider = TmdbProvider::new(config)
                .map_err(|e| ConfigError::ValidationError(format!("{}: {}", config.name, e)))?;
            Ok(Box::new(provider))
        }
        other => Err(ConfigError::unsupported("metadata provider", other)),
    }
}
