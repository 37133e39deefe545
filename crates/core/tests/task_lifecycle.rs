//! Task lifecycle integration tests.
//!
//! These tests drive a TaskProcessor end to end:
//! - Against mock collaborators, asserting on recorded calls
//! - Against a real local folder and Jellyfin library in temp directories
//! - Re-running a task over an existing library

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use autostrm_core::{
    config::MediaType,
    output::{JellyfinWriter, OutputWriter, WriteOutcome, AUDIT_LOG_FILE},
    source::{LocalFolderSource, Source},
    testing::{fixtures, MockMetadataProvider, MockOutputWriter, MockSource},
    task::MetadataOutcome,
    AuditRecord, FileOutcome, MetadataProvider, SkipReason, TaskContext, TaskProcessor,
};

const TITLE_YEAR: &str = r"(?<title>.+?)\.(?<year>19[0-9]{2}|20[0-2][0-9]|2030)\..*";
const INCEPTION: &str = "Inception.2010.1080p.BluRay.x264-Group.mkv";

fn movie_context() -> TaskContext {
    let mut context = fixtures::task_context("movies", MediaType::Movie);
    context.naming_rules = vec![fixtures::rule("title_year", TITLE_YEAR, &[MediaType::Movie])];
    context
}

/// Test helper wiring a processor to mocks it shares state with.
struct MockHarness {
    source: MockSource,
    provider: MockMetadataProvider,
    output: MockOutputWriter,
    processor: TaskProcessor,
}

impl MockHarness {
    async fn new() -> Self {
        let source = MockSource::new("nas");
        let provider = MockMetadataProvider::new("tmdb");
        let output = MockOutputWriter::new("library");
        provider
            .add_record("Inception", fixtures::enrichment("Inception", "2010"))
            .await;

        let processor = TaskProcessor::new(
            movie_context(),
            Box::new(source.clone()),
            Box::new(provider.clone()),
            Box::new(output.clone()),
            Utc::now(),
        )
        .expect("Failed to create processor");

        Self {
            source,
            provider,
            output,
            processor,
        }
    }
}

fn read_audit_log(dest: &Path) -> Vec<AuditRecord> {
    let content = std::fs::read_to_string(dest.join(AUDIT_LOG_FILE)).unwrap_or_default();
    content
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid audit line"))
        .collect()
}

// =============================================================================
// Mock collaborators
// =============================================================================

#[tokio::test]
async fn test_matched_movie_is_fully_written() {
    let h = MockHarness::new().await;
    h.source.set_files(vec![fixtures::file(INCEPTION)]).await;

    let summary = h.processor.run().await.unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(h.output.metadata_writes().await, 1);
    assert_eq!(h.output.reference_writes().await, 1);

    let audits = h.output.audit_records().await;
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].title, "Inception");
    assert_eq!(audits[0].year.as_deref(), Some("2010"));
    assert_eq!(audits[0].naming_rule.as_deref(), Some("title_year"));
}

#[tokio::test]
async fn test_unmatched_file_produces_nothing() {
    let h = MockHarness::new().await;
    h.source
        .set_files(vec![fixtures::file("family_holiday.mkv")])
        .await;

    let summary = h.processor.run().await.unwrap();

    assert_eq!(summary.eligible, 1);
    assert_eq!(summary.skipped, 1);
    assert!(h.provider.queries().await.is_empty());
    assert!(h.output.calls().await.is_empty());
}

#[tokio::test]
async fn test_existing_sidecar_skips_catalog() {
    let h = MockHarness::new().await;
    h.output
        .mark_metadata_exists("Inception", Some("2010"), MediaType::Movie)
        .await;

    let outcome = h
        .processor
        .process_file(&fixtures::file(INCEPTION))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        FileOutcome::Processed {
            metadata: MetadataOutcome::AlreadyPresent,
            reference: WriteOutcome::Written,
            ..
        }
    ));
    assert!(h.provider.queries().await.is_empty());
    assert_eq!(h.output.metadata_writes().await, 0);
}

#[tokio::test]
async fn test_second_pass_leaves_reference_untouched() {
    let h = MockHarness::new().await;
    let file = fixtures::file(INCEPTION);

    h.processor.process_file(&file).await.unwrap();
    let second = h.processor.process_file(&file).await.unwrap();

    assert!(matches!(
        second,
        FileOutcome::Processed {
            metadata: MetadataOutcome::AlreadyPresent,
            reference: WriteOutcome::Unchanged,
            ..
        }
    ));
    assert_eq!(h.output.reference_writes().await, 1);
    assert_eq!(h.provider.queries().await.len(), 1);
    // The audit log is append-only: one record per pass.
    assert_eq!(h.output.audit_records().await.len(), 2);
}

#[tokio::test]
async fn test_paginated_source_is_drained() {
    let source = MockSource::paginated("nas", 1);
    let provider = MockMetadataProvider::new("tmdb");
    let output = MockOutputWriter::new("library");
    provider
        .add_record("Inception", fixtures::enrichment("Inception", "2010"))
        .await;
    provider
        .add_record("Heat", fixtures::enrichment("Heat", "1995"))
        .await;
    source
        .set_files(vec![
            fixtures::file(INCEPTION),
            fixtures::file("Heat.1995.720p.mkv"),
        ])
        .await;

    let processor = TaskProcessor::new(
        movie_context(),
        Box::new(source.clone()),
        Box::new(provider),
        Box::new(output.clone()),
        Utc::now(),
    )
    .unwrap();
    let summary = processor.run().await.unwrap();

    assert_eq!(summary.listed, 2);
    assert_eq!(summary.processed, 2);
    assert_eq!(source.requested_pages().await, vec![Some(1), Some(2)]);
}

// =============================================================================
// Real filesystem
// =============================================================================

struct LibraryHarness {
    media: TempDir,
    library: TempDir,
    provider: MockMetadataProvider,
}

impl LibraryHarness {
    async fn new() -> Self {
        let provider = MockMetadataProvider::new("tmdb");
        provider
            .add_record("Inception", fixtures::enrichment("Inception", "2010"))
            .await;
        Self {
            media: TempDir::new().expect("Failed to create media dir"),
            library: TempDir::new().expect("Failed to create library dir"),
            provider,
        }
    }

    fn add_media(&self, relative: &str) {
        let path = self.media.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"video").unwrap();
    }

    fn processor(&self) -> TaskProcessor {
        let mut context = movie_context();
        let mut source_config = fixtures::source_config("local");
        source_config.path = self.media.path().to_string_lossy().to_string();
        context.source = Arc::new(source_config);
        context.destination = self.library.path().join("movies");

        let source: Box<dyn Source> = Box::new(LocalFolderSource::new(Arc::clone(&context.source)));
        let provider: Box<dyn MetadataProvider> = Box::new(self.provider.clone());
        let output: Box<dyn OutputWriter> =
            Box::new(JellyfinWriter::new(fixtures::output_config("library")));

        TaskProcessor::new(context, source, provider, output, Utc::now()).unwrap()
    }

    fn dest(&self) -> std::path::PathBuf {
        self.library.path().join("movies")
    }
}

#[tokio::test]
async fn test_jellyfin_library_layout() {
    let h = LibraryHarness::new().await;
    h.add_media(&format!("Sci Fi/{}", INCEPTION));
    h.add_media("Sci Fi/Inception.2010.1080p.BluRay.x264-Group.srt");

    let summary = h.processor().run().await.unwrap();
    assert_eq!(summary.listed, 2);
    assert_eq!(summary.eligible, 1);
    assert_eq!(summary.processed, 1);

    let title_dir = h.dest().join("Inception (2010)");
    let strm = std::fs::read_to_string(
        title_dir.join("Inception.2010.1080p.BluRay.x264-Group.strm"),
    )
    .unwrap();
    assert_eq!(
        strm,
        format!("{}/Sci%20Fi/{}", fixtures::VISIT_URL_PREFIX, INCEPTION)
    );

    let nfo = std::fs::read_to_string(title_dir.join("movie.nfo")).unwrap();
    assert!(nfo.contains("<title>Inception</title>"));
    assert!(nfo.contains("<year>2010</year>"));
    assert!(nfo.contains("<language>en</language>"));

    let audits = read_audit_log(&h.dest());
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].access_url, strm);
}

#[tokio::test]
async fn test_rerun_does_not_touch_existing_files() {
    let h = LibraryHarness::new().await;
    h.add_media(INCEPTION);

    h.processor().run().await.unwrap();
    let title_dir = h.dest().join("Inception (2010)");
    let strm_path = title_dir.join("Inception.2010.1080p.BluRay.x264-Group.strm");
    let strm_modified = std::fs::metadata(&strm_path).unwrap().modified().unwrap();

    let outcome = h
        .processor()
        .process_file(&autostrm_core::FileDescriptor {
            filename: INCEPTION.to_string(),
            path: h.media.path().join(INCEPTION).to_string_lossy().to_string(),
            access_url: std::fs::read_to_string(&strm_path).unwrap(),
            source: Arc::new(fixtures::source_config("local")),
        })
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        FileOutcome::Processed {
            metadata: MetadataOutcome::AlreadyPresent,
            reference: WriteOutcome::Unchanged,
            ..
        }
    ));
    assert_eq!(
        std::fs::metadata(&strm_path).unwrap().modified().unwrap(),
        strm_modified
    );
    // Only the first pass needed the catalog.
    assert_eq!(h.provider.queries().await.len(), 1);
    assert_eq!(read_audit_log(&h.dest()).len(), 2);
}

#[tokio::test]
async fn test_unmatched_file_leaves_library_empty() {
    let h = LibraryHarness::new().await;
    h.add_media("family_holiday.mkv");

    let outcome = h
        .processor()
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.skipped, 1);
    assert!(!h.dest().exists());
}

#[tokio::test]
async fn test_skip_reason_for_unknown_title() {
    let h = LibraryHarness::new().await;
    h.add_media("Obscure.Film.1987.576p.mkv");

    let processor = h.processor();
    let summary = processor.run().await.unwrap();
    assert_eq!(summary.skipped, 1);

    let outcome = processor
        .process_file(&fixtures::file("Obscure.Film.1987.576p.mkv"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        FileOutcome::Skipped(SkipReason::NoResolvableCandidate)
    );
    assert!(read_audit_log(&h.dest()).is_empty());
}
