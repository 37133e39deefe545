//! Task processing outcomes.

use std::fmt;

use serde::Serialize;

use crate::config::ConfigError;
use crate::output::{OutputError, WriteOutcome};
use crate::source::SourceError;

/// Errors that abort a task, or a single file within it.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Source enumeration failed: {0}")]
    Source(#[from] SourceError),

    #[error("Output failed: {0}")]
    Output(#[from] OutputError),
}

/// What happened to the metadata sidecar of a processed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataOutcome {
    Written,
    AlreadyPresent,
}

/// Why a file produced no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The best candidate did not come from a matching rule.
    NoMatchingRule,
    /// Every candidate failed: no title, or no catalog entry.
    NoResolvableCandidate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoMatchingRule => f.write_str("no naming rule matched"),
            SkipReason::NoResolvableCandidate => f.write_str("no candidate could be resolved"),
        }
    }
}

/// Terminal state of one file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Processed {
        title: String,
        year: Option<String>,
        /// Rule that produced the committed candidate.
        rule: Option<String>,
        metadata: MetadataOutcome,
        reference: WriteOutcome,
    },
    Skipped(SkipReason),
}

/// Counters for one task run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub task: String,
    /// Files the source listed.
    pub listed: usize,
    /// Files that passed the inclusion patterns.
    pub eligible: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TaskSummary {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Default::default()
        }
    }

    pub(crate) fn record(&mut self, outcome: &Result<FileOutcome, PipelineError>) {
        match outcome {
            Ok(FileOutcome::Processed { .. }) => self.processed += 1,
            Ok(FileOutcome::Skipped(_)) => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }
}
