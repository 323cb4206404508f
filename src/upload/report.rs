//! Upload run report
//!
//! Serialized shape: `{"success": [{file, key, skipped}], "fail": [{file, key, msg}]}`.

use crate::error::{Error, Result};
use crate::types::UploadOutcome;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Successful (or skipped) upload entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessEntry {
    pub file: String,
    pub key: String,
    pub skipped: bool,
}

/// Failed upload entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailEntry {
    pub file: String,
    pub key: String,
    pub msg: String,
}

/// Per-file results of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub success: Vec<SuccessEntry>,
    pub fail: Vec<FailEntry>,
}

impl Report {
    /// Record one outcome
    pub fn record(&mut self, outcome: UploadOutcome) {
        match outcome {
            UploadOutcome::Success {
                local_path,
                remote_key,
                skipped,
            } => self.success.push(SuccessEntry {
                file: local_path.display().to_string(),
                key: remote_key,
                skipped,
            }),
            UploadOutcome::Failure {
                local_path,
                remote_key,
                message,
            } => self.fail.push(FailEntry {
                file: local_path.display().to_string(),
                key: remote_key,
                msg: message,
            }),
        }
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report to `path`
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| Error::Report {
            message: format!("writing {}: {}", path.display(), e),
        })
    }

    /// Write the report, logging instead of failing
    pub fn write_or_log(&self, path: &Path) -> bool {
        match self.write(path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Report written");
                true
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Could not write report");
                false
            }
        }
    }
}

impl FromIterator<UploadOutcome> for Report {
    fn from_iter<I: IntoIterator<Item = UploadOutcome>>(iter: I) -> Self {
        let mut report = Report::default();
        for outcome in iter {
            report.record(outcome);
        }
        report
    }
}
