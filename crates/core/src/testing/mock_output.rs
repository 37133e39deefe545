//! Mock output writer for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::MediaType;
use crate::metadata::EnrichmentRecord;
use crate::output::{AuditRecord, OutputError, OutputWriter, WriteOutcome};

/// A recorded output call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedOutputCall {
    MetadataExists {
        title: String,
        year: Option<String>,
        media_type: MediaType,
    },
    ReferenceFile {
        title: String,
        year: Option<String>,
        file_stem: String,
        access_url: String,
        outcome: WriteOutcome,
    },
    MetadataFile {
        title: String,
        year: Option<String>,
        media_type: MediaType,
        language: String,
        record: EnrichmentRecord,
    },
    AuditRecord {
        title: String,
        year: Option<String>,
        record: AuditRecord,
    },
}

type MetadataKey = (String, Option<String>, MediaType);
type ReferenceKey = (String, Option<String>, String);

/// Mock implementation of the OutputWriter trait.
///
/// Keeps written sidecars and reference files in memory so the idempotency
/// rules of a real library hold: an identical reference write is reported
/// as unchanged and an existing sidecar is reported by `metadata_exists`.
#[derive(Debug, Clone)]
pub struct MockOutputWriter {
    name: String,
    metadata: Arc<RwLock<HashSet<MetadataKey>>>,
    references: Arc<RwLock<HashMap<ReferenceKey, String>>>,
    calls: Arc<RwLock<Vec<RecordedOutputCall>>>,
    /// When set, every write fails.
    fail_writes: Arc<RwLock<bool>>,
}

fn owned(year: Option<&str>) -> Option<String> {
    year.map(String::from)
}

impl MockOutputWriter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            metadata: Arc::new(RwLock::new(HashSet::new())),
            references: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            fail_writes: Arc::new(RwLock::new(false)),
        }
    }

    /// Pretend a sidecar was written by an earlier run.
    pub async fn mark_metadata_exists(&self, title: &str, year: Option<&str>, media_type: MediaType) {
        self.metadata
            .write()
            .await
            .insert((title.to_string(), owned(year), media_type));
    }

    pub async fn has_metadata(&self, title: &str, year: Option<&str>, media_type: MediaType) -> bool {
        self.metadata
            .read()
            .await
            .contains(&(title.to_string(), owned(year), media_type))
    }

    /// Make every subsequent write fail.
    pub async fn fail_writes(&self, fail: bool) {
        *self.fail_writes.write().await = fail;
    }

    pub async fn calls(&self) -> Vec<RecordedOutputCall> {
        self.calls.read().await.clone()
    }

    /// Reference writes that actually changed content.
    pub async fn reference_writes(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    RecordedOutputCall::ReferenceFile {
                        outcome: WriteOutcome::Written,
                        ..
                    }
                )
            })
            .count()
    }

    pub async fn metadata_writes(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| matches!(call, RecordedOutputCall::MetadataFile { .. }))
            .count()
    }

    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| match call {
                RecordedOutputCall::AuditRecord { record, .. } => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    async fn check_writable(&self, dest: &Path) -> Result<(), OutputError> {
        if *self.fail_writes.read().await {
            return Err(OutputError::write_failed(
                dest,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "mock write failure"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl OutputWriter for MockOutputWriter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn metadata_exists(
        &self,
        _dest: &Path,
        title: &str,
        year: Option<&str>,
        media_type: MediaType,
    ) -> Result<bool, OutputError> {
        self.calls
            .write()
            .await
            .push(RecordedOutputCall::MetadataExists {
                title: title.to_string(),
                year: owned(year),
                media_type,
            });
        Ok(self.has_metadata(title, year, media_type).await)
    }

    async fn write_reference_file(
        &self,
        dest: &Path,
        title: &str,
        year: Option<&str>,
        file_stem: &str,
        access_url: &str,
    ) -> Result<WriteOutcome, OutputError> {
        self.check_writable(dest).await?;

        let key = (title.to_string(), owned(year), file_stem.to_string());
        let outcome = {
            let mut references = self.references.write().await;
            if references.get(&key).map(String::as_str) == Some(access_url) {
                WriteOutcome::Unchanged
            } else {
                references.insert(key, access_url.to_string());
                WriteOutcome::Written
            }
        };

        self.calls
            .write()
            .await
            .push(RecordedOutputCall::ReferenceFile {
                title: title.to_string(),
                year: owned(year),
                file_stem: file_stem.to_string(),
                access_url: access_url.to_string(),
                outcome,
            });
        Ok(outcome)
    }

    async fn write_metadata_file(
        &self,
        dest: &Path,
        title: &str,
        year: Option<&str>,
        media_type: MediaType,
        language: &str,
        record: &EnrichmentRecord,
    ) -> Result<(), OutputError> {
        self.check_writable(dest).await?;

        self.mark_metadata_exists(title, year, media_type).await;
        self.calls
            .write()
            .await
            .push(RecordedOutputCall::MetadataFile {
                title: title.to_string(),
                year: owned(year),
                media_type,
                language: language.to_string(),
                record: record.clone(),
            });
        Ok(())
    }

    async fn write_audit_record(
        &self,
        dest: &Path,
        title: &str,
        year: Option<&str>,
        record: &AuditRecord,
    ) -> Result<(), OutputError> {
        self.check_writable(dest).await?;

        self.calls
            .write()
            .await
            .push(RecordedOutputCall::AuditRecord {
                title: title.to_string(),
                year: owned(year),
                record: record.clone(),
            });
        Ok(())
    }
}
