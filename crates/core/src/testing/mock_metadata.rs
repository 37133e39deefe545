//! Mock metadata provider for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::metadata::{EnrichmentRecord, MetadataProvider, MetadataQuery};

/// Mock implementation of the MetadataProvider trait.
///
/// Answers queries by exact title and records every query for assertions.
/// Titles without a configured record resolve to nothing.
///
/// # Example
///
/// ```rust,ignore
/// use autostrm_core::testing::{fixtures, MockMetadataProvider};
///
/// let provider = MockMetadataProvider::new("tmdb");
/// provider.add_record("Inception", fixtures::enrichment("Inception", "2010")).await;
/// ```
#[derive(Debug, Clone)]
pub struct MockMetadataProvider {
    name: String,
    records: Arc<RwLock<HashMap<String, EnrichmentRecord>>>,
    queries: Arc<RwLock<Vec<MetadataQuery>>>,
}

impl MockMetadataProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Arc::new(RwLock::new(HashMap::new())),
            queries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Answer queries for `title` with `record`.
    pub async fn add_record(&self, title: &str, record: EnrichmentRecord) {
        self.records.write().await.insert(title.to_string(), record);
    }

    /// Every query received, in order.
    pub async fn queries(&self) -> Vec<MetadataQuery> {
        self.queries.read().await.clone()
    }
}

#[async_trait]
impl MetadataProvider for MockMetadataProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_info(&self, query: &MetadataQuery) -> Option<EnrichmentRecord> {
        self.queries.write().await.push(query.clone());
        self.records.read().await.get(&query.title).cloned()
    }
}
