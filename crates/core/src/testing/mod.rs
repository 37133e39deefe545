//! Testing utilities and mock implementations.
//!
//! Mocks for every collaborator the task processor talks to, so the whole
//! pipeline can be exercised without a file share, a catalog or a library
//! directory.
//!
//! # Example
//!
//! ```rust,ignore
//! use autostrm_core::testing::{fixtures, MockMetadataProvider, MockOutputWriter, MockSource};
//!
//! let source = MockSource::new("nas");
//! source.set_files(vec![fixtures::file("Inception.2010.1080p.mkv")]).await;
//!
//! let provider = MockMetadataProvider::new("tmdb");
//! provider.add_record("Inception", fixtures::enrichment("Inception", "2010")).await;
//!
//! let output = MockOutputWriter::new("library");
//! // Hand clones to a TaskProcessor, assert on the originals.
//! ```

mod mock_metadata;
mod mock_output;
mod mock_source;

pub use mock_metadata::MockMetadataProvider;
pub use mock_output::{MockOutputWriter, RecordedOutputCall};
pub use mock_source::MockSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::PathBuf;
    use std::sync::Arc;

    use chrono::Utc;

    use crate::config::{
        MediaType, MetadataProviderConfig, NamingRule, OutputConfig, SourceConfig, TaskContext,
    };
    use crate::metadata::EnrichmentRecord;
    use crate::output::AuditRecord;
    use crate::source::FileDescriptor;

    pub const VISIT_URL_PREFIX: &str = "http://nas:5005/d/movies";

    /// A local folder source rooted at `/media/movies`.
    pub fn source_config(name: &str) -> SourceConfig {
        SourceConfig {
            kind: "local_folder".to_string(),
            name: name.to_string(),
            path: "/media/movies".to_string(),
            server_address: None,
            visit_url_prefix: Some(VISIT_URL_PREFIX.to_string()),
            username: None,
            password: None,
            use_pagination: false,
            page_size: 1000,
        }
    }

    /// A file directly under the fixture source root.
    pub fn file(filename: &str) -> FileDescriptor {
        FileDescriptor {
            filename: filename.to_string(),
            path: format!("/media/movies/{}", filename),
            access_url: format!("{}/{}", VISIT_URL_PREFIX, urlencoding::encode(filename)),
            source: Arc::new(source_config("nas")),
        }
    }

    pub fn rule(name: &str, regex: &str, media_types: &[MediaType]) -> NamingRule {
        NamingRule {
            name: name.to_string(),
            regex: regex.to_string(),
            supported_media_types: media_types.to_vec(),
            example: String::new(),
        }
    }

    /// A TMDB provider that never reaches the real API in tests.
    pub fn provider_config(name: &str) -> MetadataProviderConfig {
        MetadataProviderConfig {
            kind: "tmdb".to_string(),
            name: name.to_string(),
            api_key: "test-key".to_string(),
            base_url: None,
            image_base_url: None,
            timeout_secs: 5,
        }
    }

    pub fn output_config(name: &str) -> OutputConfig {
        OutputConfig {
            kind: "jellyfin".to_string(),
            name: name.to_string(),
            library_name: "Movies".to_string(),
            output_dir: "movies".to_string(),
        }
    }

    /// A task over `.mkv` files with no naming rules; tests add their own.
    pub fn task_context(name: &str, media_type: MediaType) -> TaskContext {
        TaskContext {
            name: name.to_string(),
            source: Arc::new(source_config("nas")),
            metadata_provider: provider_config("tmdb"),
            output: output_config("library"),
            media_type,
            file_patterns: vec![r"\.mkv$".to_string()],
            naming_rules: Vec::new(),
            destination: PathBuf::from("/library/movies"),
            language: "en".to_string(),
        }
    }

    pub fn enrichment(title: &str, year: &str) -> EnrichmentRecord {
        EnrichmentRecord {
            title: title.to_string(),
            original_title: Some(title.to_string()),
            year: Some(year.to_string()),
            release_date: Some(format!("{}-07-16", year)),
            rating: Some(8.4),
            plot: Some(format!("A film called {}.", title)),
            catalog_id: Some(format!("{}", title.len() * 1000)),
            poster: Some("https://image.tmdb.org/t/p/w500/poster.jpg".to_string()),
            ..Default::default()
        }
    }

    pub fn audit_record(title: &str, year: Option<&str>) -> AuditRecord {
        let now = Utc::now();
        let file = file(&format!("{}.mkv", title));
        AuditRecord {
            executed_at: now,
            task_started_at: now,
            task: "movies".to_string(),
            source_name: file.source.name.clone(),
            source_path: file.source.path.clone(),
            file_path: file.path.clone(),
            access_url: file.access_url.clone(),
            title: title.to_string(),
            year: year.map(String::from),
            naming_rule: Some("title_year".to_string()),
            naming_rule_regex: Some(r"(?<title>.+?)\.(?<year>\d{4})\..*".to_string()),
            subtitle: None,
            nonengtitle: None,
            metadata_provider: "tmdb".to_string(),
            catalog_id: Some("27205".to_string()),
            catalog_title: Some(title.to_string()),
            catalog_original_title: None,
            catalog_release_date: year.map(|y| format!("{}-07-16", y)),
            catalog_rating: Some(8.4),
            output_type: "jellyfin".to_string(),
            output_dir: "/library/movies".to_string(),
            library_name: "Movies".to_string(),
        }
    }
}
