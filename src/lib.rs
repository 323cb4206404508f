//! assetpush - push static build artifacts to object storage
//!
//! Expands a glob against a build directory, uploads every match through a
//! bounded worker pool with optional overwrite protection, and reports the
//! per-file outcome. Remote prefixes can be listed and bulk-deleted.

pub mod cli;
pub mod config;
pub mod error;
pub mod policy;
pub mod progress;
pub mod purge;
pub mod storage;
pub mod types;
pub mod upload;
pub mod uri;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
