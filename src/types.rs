//! Core domain types for assetpush

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum number of keys in one batch delete call
pub const MAX_DELETE_BATCH: usize = 100;

/// A single file scheduled for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    /// Absolute local path
    pub local_path: PathBuf,

    /// Remote object key (forward-slash separated)
    pub remote_key: String,
}

impl UploadJob {
    pub fn new(local_path: impl Into<PathBuf>, remote_key: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            remote_key: remote_key.into(),
        }
    }
}

/// Result of uploading one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Upload succeeded, or was skipped because the object already existed
    Success {
        local_path: PathBuf,
        remote_key: String,
        skipped: bool,
    },

    /// Upload failed; the run carried on
    Failure {
        local_path: PathBuf,
        remote_key: String,
        message: String,
    },
}

impl UploadOutcome {
    /// Successful upload of a job
    pub fn uploaded(job: UploadJob) -> Self {
        UploadOutcome::Success {
            local_path: job.local_path,
            remote_key: job.remote_key,
            skipped: false,
        }
    }

    /// Job skipped because overwrite protection found an existing object
    pub fn skipped(job: UploadJob) -> Self {
        UploadOutcome::Success {
            local_path: job.local_path,
            remote_key: job.remote_key,
            skipped: true,
        }
    }

    /// Failed job with an error message
    pub fn failed(job: UploadJob, message: impl Into<String>) -> Self {
        UploadOutcome::Failure {
            local_path: job.local_path,
            remote_key: job.remote_key,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success { .. })
    }

    pub fn remote_key(&self) -> &str {
        match self {
            UploadOutcome::Success { remote_key, .. } => remote_key,
            UploadOutcome::Failure { remote_key, .. } => remote_key,
        }
    }
}

/// Counters for an upload run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Files queued for upload
    pub total: u64,

    /// Uploads currently awaiting a remote response
    pub in_flight: u64,

    /// Uploads that succeeded (including skipped)
    pub succeeded: u64,

    /// Uploads that failed
    pub failed: u64,
}

impl RunStats {
    /// Files with an outcome so far
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// One page of a prefix listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    /// Keys on this page
    pub keys: Vec<String>,

    /// Continuation marker; empty when this is the last page
    pub marker: String,
}

impl ListPage {
    pub fn is_last(&self) -> bool {
        self.marker.is_empty()
    }
}

/// Keys submitted together in one batch delete call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteBatch {
    keys: Vec<String>,
}

impl DeleteBatch {
    /// Split keys into batches of at most [`MAX_DELETE_BATCH`]
    pub fn split(keys: &[String]) -> Vec<DeleteBatch> {
        keys.chunks(MAX_DELETE_BATCH)
            .map(|chunk| DeleteBatch {
                keys: chunk.to_vec(),
            })
            .collect()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Keys a backend could not delete inside an otherwise accepted batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDeleteResult {
    pub failed: Vec<String>,
}

/// Totals for a purge run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSummary {
    /// Keys found under the prefix
    pub listed: u64,

    /// Keys confirmed deleted
    pub deleted: u64,

    /// Keys that could not be deleted
    pub failed: u64,

    /// Batch delete calls issued
    pub batches: u64,

    /// Batch delete calls that errored as a whole
    pub failed_batches: u64,
}
