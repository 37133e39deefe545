//! Per-task orchestration.
//!
//! For every eligible file of the task's source, the processor ranks the
//! filename interpretations and commits to the first one that resolves
//! end to end:
//!
//! 1. The title must be present.
//! 2. Without a parsed year, the catalog is asked for one.
//! 3. An existing metadata sidecar is reused as-is.
//! 4. Otherwise the catalog record (from step 2, or a fresh lookup) is
//!    required and written as the sidecar.
//! 5. The reference file is written if its content changed.
//!
//! A committed file gets exactly one audit record. Files whose best
//! candidate is not a rule match are skipped without any output.

mod filter;
mod types;

pub use filter::InclusionFilter;
pub use types::{FileOutcome, MetadataOutcome, PipelineError, SkipReason, TaskSummary};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::TaskContext;
use crate::discern::{discern, strip_extension, CompiledRule, ParsedIdentity};
use crate::metadata::{create_provider, EnrichmentRecord, MetadataProvider, MetadataQuery};
use crate::output::{create_output, AuditRecord, OutputWriter, WriteOutcome};
use crate::source::{collect_files, create_source, FileDescriptor, Source};

/// A candidate that made it through metadata and output.
struct Resolution {
    title: String,
    year: Option<String>,
    record: Option<EnrichmentRecord>,
    metadata: MetadataOutcome,
    reference: WriteOutcome,
}

/// Runs one configured task against its collaborators.
pub struct TaskProcessor {
    context: TaskContext,
    source: Box<dyn Source>,
    provider: Box<dyn MetadataProvider>,
    output: Box<dyn OutputWriter>,
    rules: Vec<CompiledRule>,
    filter: InclusionFilter,
    started_at: DateTime<Utc>,
}

impl TaskProcessor {
    pub fn new(
        context: TaskContext,
        source: Box<dyn Source>,
        provider: Box<dyn MetadataProvider>,
        output: Box<dyn OutputWriter>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, PipelineError> {
        let filter = InclusionFilter::new(&context.file_patterns)?;
        let rules = CompiledRule::compile_all(context.naming_rules.iter().cloned());

        Ok(Self {
            context,
            source,
            provider,
            output,
            rules,
            filter,
            started_at,
        })
    }

    /// Build the task's collaborators from their configured backends.
    pub fn from_context(
        context: TaskContext,
        started_at: DateTime<Utc>,
    ) -> Result<Self, PipelineError> {
        let source = create_source(Arc::clone(&context.source))?;
        let provider = create_provider(&context.metadata_provider)?;
        let output = create_output(&context.output)?;
        Self::new(context, source, provider, output, started_at)
    }

    /// Process every eligible file.
    ///
    /// Fails only when the source cannot be listed; per-file failures are
    /// logged and counted.
    pub async fn run(&self) -> Result<TaskSummary, PipelineError> {
        let mut summary = TaskSummary::new(&self.context.name);
        info!(
            "Processing task '{}' ({} from source '{}')",
            self.context.name, self.context.media_type, self.source.name()
        );

        let files = collect_files(self.source.as_ref()).await?;
        summary.listed = files.len();

        for file in files.iter().filter(|f| self.filter.matches(&f.filename)) {
            summary.eligible += 1;

            let outcome = self.process_file(file).await;
            match &outcome {
                Ok(FileOutcome::Processed {
                    title, year, rule, ..
                }) => {
                    info!(
                        task = %self.context.name,
                        file = %file.filename,
                        title = %title,
                        year = year.as_deref().unwrap_or("-"),
                        rule = rule.as_deref().unwrap_or("-"),
                        "Processed file"
                    );
                }
                Ok(FileOutcome::Skipped(reason)) => {
                    warn!(
                        task = %self.context.name,
                        file = %file.filename,
                        reason = %reason,
                        "Skipped file"
                    );
                }
                Err(e) => {
                    error!(
                        task = %self.context.name,
                        file = %file.filename,
                        error = %e,
                        "Failed to process file"
                    );
                }
            }
            summary.record(&outcome);
        }

        info!(
            "Task '{}' done: {} listed, {} eligible, {} processed, {} skipped, {} failed",
            summary.task,
            summary.listed,
            summary.eligible,
            summary.processed,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }

    /// Drive one file to a terminal state.
    pub async fn process_file(&self, file: &FileDescriptor) -> Result<FileOutcome, PipelineError> {
        debug!("Processing file: {}", file.filename);

        let ranked = discern(file, &self.rules, self.context.media_type);
        if !ranked.first().is_some_and(|top| top.is_match()) {
            return Ok(FileOutcome::Skipped(SkipReason::NoMatchingRule));
        }

        for candidate in &ranked {
            let Some(resolution) = self.process_candidate(candidate).await? else {
                continue;
            };

            let audit = self.audit_record(candidate, &resolution);
            self.output
                .write_audit_record(
                    &self.context.destination,
                    &resolution.title,
                    resolution.year.as_deref(),
                    &audit,
                )
                .await?;

            return Ok(FileOutcome::Processed {
                title: resolution.title,
                year: resolution.year,
                rule: candidate.rule().map(|rule| rule.name.clone()),
                metadata: resolution.metadata,
                reference: resolution.reference,
            });
        }

        Ok(FileOutcome::Skipped(SkipReason::NoResolvableCandidate))
    }

    /// Try to fully materialize one candidate. `Ok(None)` means this
    /// candidate cannot be resolved and the next one should be tried.
    async fn process_candidate(
        &self,
        candidate: &ParsedIdentity<'_>,
    ) -> Result<Option<Resolution>, PipelineError> {
        // A title needs at least one letter or digit to name a folder.
        let Some(title) = candidate
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| t.chars().any(char::is_alphanumeric))
        else {
            debug!("Candidate of {} has no usable title", candidate.file.filename);
            return Ok(None);
        };
        let dest = &self.context.destination;
        let media_type = self.context.media_type;

        debug!(
            "Resolving '{}' ({})",
            title,
            candidate.year.as_deref().unwrap_or("year unknown")
        );

        let mut year = candidate.year.clone();
        let mut record = None;
        let mut looked_up = false;

        if year.is_none() {
            record = self.lookup(title, None).await;
            looked_up = true;
            if let Some(found) = record.as_ref().and_then(|r| r.year.clone()) {
                debug!("Catalog supplied year {} for '{}'", found, title);
                year = Some(found);
            }
        }

        let metadata = if self
            .output
            .metadata_exists(dest, title, year.as_deref(), media_type)
            .await?
        {
            debug!("Metadata for '{}' already present", title);
            MetadataOutcome::AlreadyPresent
        } else {
            if !looked_up {
                record = self.lookup(title, year.clone()).await;
            }
            let Some(found) = record.as_ref() else {
                info!("No catalog entry for '{}'", title);
                return Ok(None);
            };
            self.output
                .write_metadata_file(
                    dest,
                    title,
                    year.as_deref(),
                    media_type,
                    &self.context.language,
                    found,
                )
                .await?;
            MetadataOutcome::Written
        };

        let reference = self
            .output
            .write_reference_file(
                dest,
                title,
                year.as_deref(),
                strip_extension(&candidate.file.filename),
                &candidate.file.access_url,
            )
            .await?;

        Ok(Some(Resolution {
            title: title.to_string(),
            year,
            record,
            metadata,
            reference,
        }))
    }

    async fn lookup(&self, title: &str, year: Option<String>) -> Option<EnrichmentRecord> {
        let query = MetadataQuery::new(
            title,
            year,
            self.context.media_type,
            self.context.language.as_str(),
        );
        self.provider.fetch_info(&query).await
    }

    fn audit_record(&self, candidate: &ParsedIdentity<'_>, resolution: &Resolution) -> AuditRecord {
        let file = candidate.file;
        let rule = candidate.rule();
        let record = resolution.record.as_ref();

        AuditRecord {
            executed_at: Utc::now(),
            task_started_at: self.started_at,
            task: self.context.name.clone(),
            source_name: file.source.name.clone(),
            source_path: file.source.path.clone(),
            file_path: file.path.clone(),
            access_url: file.access_url.clone(),
            title: resolution.title.clone(),
            year: resolution.year.clone(),
            naming_rule: rule.map(|r| r.name.clone()),
            naming_rule_regex: rule.map(|r| r.regex.clone()),
            subtitle: candidate.subtitle.clone(),
            nonengtitle: candidate.nonengtitle.clone(),
            metadata_provider: self.provider.name().to_string(),
            catalog_id: record.and_then(|r| r.catalog_id.clone()),
            catalog_title: record.map(|r| r.title.clone()),
            catalog_original_title: record.and_then(|r| r.original_title.clone()),
            catalog_release_date: record.and_then(|r| r.release_date.clone()),
            catalog_rating: record.and_then(|r| r.rating),
            output_type: self.context.output.kind.clone(),
            output_dir: self.context.destination.to_string_lossy().to_string(),
            library_name: self.context.output.library_name.clone(),
        }
    }
}
