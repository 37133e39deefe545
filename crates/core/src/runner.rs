//! Runs every configured task once, one after another.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::config::Config;
use crate::task::{PipelineError, TaskProcessor, TaskSummary};

/// Totals for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub tasks_completed: usize,
    pub tasks_aborted: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub tasks: Vec<TaskSummary>,
}

impl RunSummary {
    fn add(&mut self, task: TaskSummary) {
        self.tasks_completed += 1;
        self.files_processed += task.processed;
        self.files_skipped += task.skipped;
        self.files_failed += task.failed;
        self.tasks.push(task);
    }
}

pub struct Runner<'a> {
    config: &'a Config,
    base_output_dir: PathBuf,
}

impl<'a> Runner<'a> {
    pub fn new(config: &'a Config, base_output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            base_output_dir: base_output_dir.into(),
        }
    }

    /// Run all tasks in name order. A task that cannot be configured or
    /// listed is logged and counted as aborted; the run goes on.
    pub async fn run(&self) -> RunSummary {
        let started_at = Utc::now();
        let mut summary = RunSummary {
            started_at: Some(started_at),
            ..Default::default()
        };

        info!(
            "Starting run with {} tasks, output under {}",
            self.config.tasks.len(),
            self.base_output_dir.display()
        );

        for name in self.config.tasks.keys() {
            match self.run_task(name, started_at).await {
                Ok(task) => summary.add(task),
                Err(e) => {
                    error!(task = %name, error = %e, "Task aborted");
                    summary.tasks_aborted += 1;
                }
            }
        }

        info!(
            "Run finished: {} tasks completed, {} aborted, {} files processed, {} skipped, {} failed",
            summary.tasks_completed,
            summary.tasks_aborted,
            summary.files_processed,
            summary.files_skipped,
            summary.files_failed
        );
        summary
    }

    async fn run_task(
        &self,
        name: &str,
        started_at: DateTime<Utc>,
    ) -> Result<TaskSummary, PipelineError> {
        let context = self.config.task_context(name, &self.base_output_dir)?;
        let processor = TaskProcessor::from_context(context, started_at)?;
        processor.run().await
    }
}
