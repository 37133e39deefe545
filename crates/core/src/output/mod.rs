//! Library output.
//!
//! Writers materialize a resolved title into a media-server library: a
//! stream-reference (`.strm`) file pointing at the source, a metadata
//! sidecar, and an append-only audit log. Every write is idempotent with
//! respect to identical input, except the audit log.

mod jellyfin;
mod nfo;

pub use jellyfin::{JellyfinWriter, AUDIT_LOG_FILE};
pub use nfo::{nfo_file_name, render_nfo};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, MediaType, OutputConfig};
use crate::metadata::EnrichmentRecord;

/// Errors that can occur while writing library files.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to check {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize audit record: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl OutputError {
    pub fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source,
        }
    }
}

/// Result of an idempotent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Existing content already matched; nothing touched.
    Unchanged,
}

/// One line of the audit log, written once per processed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub executed_at: DateTime<Utc>,
    pub task_started_at: DateTime<Utc>,
    pub task: String,

    pub source_name: String,
    pub source_path: String,
    pub file_path: String,
    pub access_url: String,

    pub title: String,
    pub year: Option<String>,
    /// Absent when the title came from the bare filename.
    pub naming_rule: Option<String>,
    pub naming_rule_regex: Option<String>,
    pub subtitle: Option<String>,
    pub nonengtitle: Option<String>,

    pub metadata_provider: String,
    pub catalog_id: Option<String>,
    pub catalog_title: Option<String>,
    pub catalog_original_title: Option<String>,
    pub catalog_release_date: Option<String>,
    pub catalog_rating: Option<f32>,

    pub output_type: String,
    pub output_dir: String,
    pub library_name: String,
}

/// A library layout a task writes into.
///
/// `dest` is the task's destination directory; the writer derives the
/// per-title folder from `title` and `year`.
#[async_trait]
pub trait OutputWriter: Send + Sync {
    /// Configured name of this output.
    fn name(&self) -> &str;

    /// Whether a metadata sidecar for this title is already present.
    async fn metadata_exists(
        &self,
        dest: &Path,
        title: &str,
        year: Option<&str>,
        media_type: MediaType,
    ) -> Result<bool, OutputError>;

    /// Write `<stem>.strm` holding `access_url`, unless it already does.
    async fn write_reference_file(
        &self,
        dest: &Path,
        title: &str,
        year: Option<&str>,
        file_stem: &str,
        access_url: &str,
    ) -> Result<WriteOutcome, OutputError>;

    /// Write (or replace) the metadata sidecar.
    async fn write_metadata_file(
        &self,
        dest: &Path,
        title: &str,
        year: Option<&str>,
        media_type: MediaType,
        language: &str,
        record: &EnrichmentRecord,
    ) -> Result<(), OutputError>;

    /// Append one record to the audit log.
    async fn write_audit_record(
        &self,
        dest: &Path,
        title: &str,
        year: Option<&str>,
        record: &AuditRecord,
    ) -> Result<(), OutputError>;
}

/// Build an output writer from its configuration.
pub fn create_output(config: &OutputConfig) -> Result<Box<dyn OutputWriter>, ConfigError> {
    match config.kind.as_str() {
        "jellyfin" => Ok(Box::new(JellyfinWriter::new(config.clone()))),
        other => Err(ConfigError::unsupported("output", other)),
    }
}
