//! Jellyfin library layout.
//!
//! ```text
//! <dest>/
//!   record_info.jsonl
//!   Inception (2010)/
//!     movie.nfo
//!     Inception.2010.1080p.BluRay.x264-Group.strm
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::nfo::{nfo_file_name, render_nfo};
use super::{AuditRecord, OutputError, OutputWriter, WriteOutcome};
use crate::config::{MediaType, OutputConfig};
use crate::metadata::EnrichmentRecord;

/// Audit log filename inside the destination directory.
pub const AUDIT_LOG_FILE: &str = "record_info.jsonl";

pub struct JellyfinWriter {
    config: OutputConfig,
}

impl JellyfinWriter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Folder for one title: `Title (Year)`, or `Title` without a year.
    pub fn title_dir(dest: &Path, title: &str, year: Option<&str>) -> PathBuf {
        let title = sanitize(title);
        match year.filter(|y| !y.is_empty()) {
            Some(year) => dest.join(format!("{} ({})", title, year)),
            None => dest.join(title),
        }
    }

    async fn ensure_title_dir(
        dest: &Path,
        title: &str,
        year: Option<&str>,
    ) -> Result<PathBuf, OutputError> {
        let dir = Self::title_dir(dest, title, year);
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| OutputError::DirectoryCreationFailed {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }
}

/// Replace characters that are invalid in file names on common filesystems
/// and collapse runs of whitespace.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl OutputWriter for JellyfinWriter {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn metadata_exists(
        &self,
        dest: &Path,
        title: &str,
        year: Option<&str>,
        media_type: MediaType,
    ) -> Result<bool, OutputError> {
        let path = Self::title_dir(dest, title, year).join(nfo_file_name(media_type));
        fs::try_exists(&path)
            .await
            .map_err(|source| OutputError::ReadFailed { path, source })
    }

    async fn write_reference_file(
        &self,
        dest: &Path,
        title: &str,
        year: Option<&str>,
        file_stem: &str,
        access_url: &str,
    ) -> Result<WriteOutcome, OutputError> {
        let dir = Self::ensure_title_dir(dest, title, year).await?;
        let path = dir.join(format!("{}.strm", sanitize(file_stem)));

        if let Ok(existing) = fs::read_to_string(&path).await {
            if existing.trim() == access_url {
                debug!("{} is up to date", path.display());
                return Ok(WriteOutcome::Unchanged);
            }
        }

        fs::write(&path, access_url)
            .await
            .map_err(|e| OutputError::write_failed(&path, e))?;
        info!("Wrote {}", path.display());
        Ok(WriteOutcome::Written)
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
        let dir = Self::ensure_title_dir(dest, title, year).await?;
        let path = dir.join(nfo_file_name(media_type));

        let document = render_nfo(media_type, language, year, record);
        fs::write(&path, document)
            .await
            .map_err(|e| OutputError::write_failed(&path, e))?;
        info!("Wrote {}", path.display());
        Ok(())
    }

    async fn write_audit_record(
        &self,
        dest: &Path,
        title: &str,
        year: Option<&str>,
        record: &AuditRecord,
    ) -> Result<(), OutputError> {
        Self::ensure_title_dir(dest, title, year).await?;
        let path = dest.join(AUDIT_LOG_FILE);

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| OutputError::write_failed(&path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| OutputError::write_failed(&path, e))?;
        file.flush()
            .await
            .map_err(|e| OutputError::write_failed(&path, e))?;

        debug!("Appended audit record to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use tempfile::TempDir;

    fn writer() -> JellyfinWriter {
        JellyfinWriter::new(fixtures::output_config("library"))
    }

    #[test]
    fn test_title_dir() {
        let dest = Path::new("/lib");
        assert_eq!(
            JellyfinWriter::title_dir(dest, "Inception", Some("2010")),
            PathBuf::from("/lib/Inception (2010)")
        );
        assert_eq!(
            JellyfinWriter::title_dir(dest, "Inception", None),
            PathBuf::from("/lib/Inception")
        );
        assert_eq!(
            JellyfinWriter::title_dir(dest, "Inception", Some("")),
            PathBuf::from("/lib/Inception")
        );
        assert_eq!(
            JellyfinWriter::title_dir(dest, "AC/DC: Live", None),
            PathBuf::from("/lib/AC DC Live")
        );
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Inception"), "Inception");
        assert_eq!(sanitize("What If...?"), "What If...");
        assert_eq!(sanitize("  Tom  &  Jerry "), "Tom & Jerry");
    }

    #[tokio::test]
    async fn test_reference_file_is_written_once() {
        let temp = TempDir::new().unwrap();
        let writer = writer();
        let url = "http://nas/d/Inception.2010.mkv";

        let first = writer
            .write_reference_file(temp.path(), "Inception", Some("2010"), "Inception.2010", url)
            .await
            .unwrap();
        let second = writer
            .write_reference_file(temp.path(), "Inception", Some("2010"), "Inception.2010", url)
            .await
            .unwrap();

        assert_eq!(first, WriteOutcome::Written);
        assert_eq!(second, WriteOutcome::Unchanged);
        let path = temp.path().join("Inception (2010)/Inception.2010.strm");
        assert_eq!(std::fs::read_to_string(path).unwrap(), url);
    }

    #[tokio::test]
    async fn test_reference_file_is_rewritten_when_url_changes() {
        let temp = TempDir::new().unwrap();
        let writer = writer();

        writer
            .write_reference_file(temp.path(), "Heat", None, "Heat", "http://old/Heat.mkv")
            .await
            .unwrap();
        let outcome = writer
            .write_reference_file(temp.path(), "Heat", None, "Heat", "http://new/Heat.mkv")
            .await
            .unwrap();

        assert_eq!(outcome, WriteOutcome::Written);
        let content = std::fs::read_to_string(temp.path().join("Heat/Heat.strm")).unwrap();
        assert_eq!(content, "http://new/Heat.mkv");
    }

    #[tokio::test]
    async fn test_existing_content_is_compared_trimmed() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("Heat (1995)");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Heat.strm"), "http://nas/Heat.mkv\n").unwrap();

        let outcome = writer()
            .write_reference_file(temp.path(), "Heat", Some("1995"), "Heat", "http://nas/Heat.mkv")
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_metadata_exists_after_write() {
        let temp = TempDir::new().unwrap();
        let writer = writer();
        let record = fixtures::enrichment("Inception", "2010");

        assert!(!writer
            .metadata_exists(temp.path(), "Inception", Some("2010"), MediaType::Movie)
            .await
            .unwrap());

        writer
            .write_metadata_file(temp.path(), "Inception", Some("2010"), MediaType::Movie, "en", &record)
            .await
            .unwrap();

        assert!(writer
            .metadata_exists(temp.path(), "Inception", Some("2010"), MediaType::Movie)
            .await
            .unwrap());
        // A different media type has its own sidecar.
        assert!(!writer
            .metadata_exists(temp.path(), "Inception", Some("2010"), MediaType::TvShow)
            .await
            .unwrap());

        let nfo = std::fs::read_to_string(temp.path().join("Inception (2010)/movie.nfo")).unwrap();
        assert!(nfo.contains("<title>Inception</title>"));
    }

    #[tokio::test]
    async fn test_metadata_exists_does_not_create_dirs() {
        let temp = TempDir::new().unwrap();
        writer()
            .metadata_exists(temp.path(), "Heat", Some("1995"), MediaType::Movie)
            .await
            .unwrap();
        assert!(!temp.path().join("Heat (1995)").exists());
    }

    #[tokio::test]
    async fn test_metadata_exists_reports_io_errors() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = writer()
            .metadata_exists(&blocker, "Heat", Some("1995"), MediaType::Movie)
            .await;
        assert!(matches!(result, Err(OutputError::ReadFailed { .. })));
    }

    #[tokio::test]
    async fn test_audit_records_are_appended() {
        let temp = TempDir::new().unwrap();
        let writer = writer();
        let record = fixtures::audit_record("Inception", Some("2010"));

        writer
            .write_audit_record(temp.path(), "Inception", Some("2010"), &record)
            .await
            .unwrap();
        writer
            .write_audit_record(temp.path(), "Inception", Some("2010"), &record)
            .await
            .unwrap();

        let log = std::fs::read_to_string(temp.path().join(AUDIT_LOG_FILE)).unwrap();
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: AuditRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, record);
    }
}
