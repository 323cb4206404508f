//! Upload engine and orchestration

pub mod dispatch;
pub mod keys;
pub mod report;
pub mod scan;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::progress::ProgressTracker;
use crate::storage::ObjectStore;
use crate::types::RunStats;
use dispatch::Dispatcher;
use report::Report;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of a finished upload run
#[derive(Debug, Clone)]
pub struct UploadSummary {
    pub stats: RunStats,
    pub report: Report,
    pub duration_secs: f64,
}

/// The main upload engine
pub struct UploadEngine<'a> {
    /// Configuration
    config: &'a Config,
    /// Destination store
    store: Arc<dyn ObjectStore>,
    /// Progress tracker
    progress: ProgressTracker,
}

impl<'a> UploadEngine<'a> {
    /// Create a new upload engine
    pub fn new(config: &'a Config, store: Arc<dyn ObjectStore>) -> Self {
        let progress = ProgressTracker::new(config.progress);
        Self {
            config,
            store,
            progress,
        }
    }

    /// Run the upload
    ///
    /// Enumeration and key mapping errors abort before anything is uploaded;
    /// per-file failures end up in the report.
    pub async fn run(&self) -> Result<UploadSummary> {
        let start = std::time::Instant::now();

        // Step 1: Enumerate local files
        tracing::info!(pattern = %self.config.pattern, cwd = %self.config.cwd.display(), "Scanning files...");
        let files =
            scan::enumerate(&self.config.cwd, &self.config.pattern, &self.config.exclude).await?;

        // Step 2: Map to remote keys
        let base = self.resolve_base().await?;
        let jobs = keys::build_jobs(&base, &files, &self.config.remote_prefix)?;
        tracing::info!(files = jobs.len(), base = %base.display(), "Scan complete");

        // Step 3: Upload
        let dispatcher =
            Dispatcher::new(Arc::clone(&self.store), self.config).with_progress(self.progress.clone());
        let outcomes = dispatcher.run(jobs).await;
        self.progress.finish();

        // Step 4: Report
        let report: Report = outcomes.into_iter().collect();
        if let Some(path) = self.config.output_path() {
            report.write_or_log(&path);
        }

        let stats = dispatcher.stats().snapshot();
        tracing::info!(
            total = stats.total,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Upload complete"
        );

        Ok(UploadSummary {
            stats,
            report,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Canonical base directory
    async fn resolve_base(&self) -> Result<PathBuf> {
        let base = self.config.base_dir();
        tokio::fs::canonicalize(&base)
            .await
            .map_err(|e| Error::config(format!("base directory {}: {}", base.display(), e)))
    }
}
