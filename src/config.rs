//! Configuration management for assetpush
//!
//! A [`Config`] is assembled once at startup from three layers, later layers
//! winning: built-in defaults, a key=value env file, then explicit overrides
//! (TOML config file first, CLI flags last). The result is immutable and
//! passed by reference to every component.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default include pattern
pub const DEFAULT_PATTERN: &str = "**/*";

/// Default number of upload workers (0 = auto)
pub const DEFAULT_WORKERS: usize = 0;

/// Default upload policy lifetime in seconds
pub const DEFAULT_TOKEN_EXPIRY_SECS: u64 = 3600;

/// Default page size for prefix listings
pub const DEFAULT_LIST_PAGE_SIZE: usize = 1000;

/// Storage credentials and endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible storage (MinIO, R2, ...)
    pub endpoint: Option<String>,
}

impl Credentials {
    fn merge(&mut self, other: &Credentials) {
        if other.access_key.is_some() {
            self.access_key = other.access_key.clone();
        }
        if other.secret_key.is_some() {
            self.secret_key = other.secret_key.clone();
        }
        if other.region.is_some() {
            self.region = other.region.clone();
        }
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint.clone();
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // ==================== Enumeration ====================

    /// Include glob, relative to `cwd`
    pub pattern: String,

    /// Exclusion globs, relative to `cwd`
    pub exclude: Vec<String>,

    /// Working directory the globs are expanded against
    pub cwd: PathBuf,

    /// Directory stripped from local paths to form keys (defaults to `cwd`)
    pub base_dir: Option<PathBuf>,

    // ==================== Destination ====================

    /// Bucket name
    pub bucket: String,

    /// Prefix prepended to every remote key
    pub remote_prefix: String,

    /// Replace objects that already exist
    pub overwrite: bool,

    /// Upload policy lifetime in seconds
    pub token_expiry_secs: u64,

    /// Keys requested per listing page
    pub list_page_size: usize,

    // ==================== Execution ====================

    /// Number of upload workers (0 = auto-detect CPU count)
    pub workers: usize,

    /// Report filename, resolved against `cwd`
    pub output: Option<PathBuf>,

    /// Show a progress bar
    pub progress: bool,

    // ==================== Cloud Storage ====================

    pub credentials: Credentials,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            exclude: Vec::new(),
            cwd: PathBuf::from("."),
            base_dir: None,

            bucket: String::new(),
            remote_prefix: String::new(),
            overwrite: false,
            token_expiry_secs: DEFAULT_TOKEN_EXPIRY_SECS,
            list_page_size: DEFAULT_LIST_PAGE_SIZE,

            workers: DEFAULT_WORKERS,
            output: None,
            progress: true,

            credentials: Credentials::default(),
        }
    }
}

/// One explicit layer of configuration. Unset fields leave the layer below untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub pattern: Option<String>,
    pub exclude: Option<Vec<String>>,
    pub cwd: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
    pub bucket: Option<String>,
    pub remote_prefix: Option<String>,
    pub overwrite: Option<bool>,
    pub token_expiry_secs: Option<u64>,
    pub list_page_size: Option<usize>,
    pub workers: Option<usize>,
    pub output: Option<PathBuf>,
    pub progress: Option<bool>,
    pub credentials: Credentials,
}

impl ConfigOverrides {
    /// Load an explicit layer from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading config {}", path.display()), e))?;
        let layer: Self = toml::from_str(&contents)?;
        Ok(layer)
    }

    /// Build a layer from a key=value env file
    ///
    /// Recognised keys are `ASSETPUSH_*` plus the usual `AWS_*` credential names.
    /// Unknown keys are ignored.
    pub fn from_env_file(path: &Path) -> Result<Self> {
        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| Error::config(format!("reading env file {}: {}", path.display(), e)))?;

        let mut layer = Self::default();
        for item in iter {
            let (key, value) = item
                .map_err(|e| Error::config(format!("parsing env file {}: {}", path.display(), e)))?;
            layer.apply_env_pair(&key, value);
        }
        Ok(layer)
    }

    fn apply_env_pair(&mut self, key: &str, value: String) {
        match key {
            "ASSETPUSH_BUCKET" | "BUCKET" => self.bucket = Some(value),
            "ASSETPUSH_PREFIX" => self.remote_prefix = Some(value),
            "ASSETPUSH_ACCESS_KEY" | "AWS_ACCESS_KEY_ID" | "ACCESS_KEY" => {
                self.credentials.access_key = Some(value)
            }
            "ASSETPUSH_SECRET_KEY" | "AWS_SECRET_ACCESS_KEY" | "SECRET_KEY" => {
                self.credentials.secret_key = Some(value)
            }
            "ASSETPUSH_REGION" | "AWS_REGION" | "AWS_DEFAULT_REGION" => {
                self.credentials.region = Some(value)
            }
            "ASSETPUSH_ENDPOINT" | "AWS_ENDPOINT_URL" => self.credentials.endpoint = Some(value),
            other => tracing::debug!(key = other, "Ignoring unknown env file key"),
        }
    }
}

impl Config {
    /// Assemble a config: defaults, then the env file, then each explicit layer in order
    pub fn layered(env_file: Option<&Path>, explicit: &[ConfigOverrides]) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = env_file {
            config.apply(&ConfigOverrides::from_env_file(path)?);
        }
        for layer in explicit {
            config.apply(layer);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply one layer on top of this config
    pub fn apply(&mut self, layer: &ConfigOverrides) {
        if let Some(ref v) = layer.pattern {
            self.pattern = v.clone();
        }
        if let Some(ref v) = layer.exclude {
            self.exclude = v.clone();
        }
        if let Some(ref v) = layer.cwd {
            self.cwd = v.clone();
        }
        if let Some(ref v) = layer.base_dir {
            self.base_dir = Some(v.clone());
        }
        if let Some(ref v) = layer.bucket {
            self.bucket = v.clone();
        }
        if let Some(ref v) = layer.remote_prefix {
            self.remote_prefix = v.clone();
        }
        if let Some(v) = layer.overwrite {
            self.overwrite = v;
        }
        if let Some(v) = layer.token_expiry_secs {
            self.token_expiry_secs = v;
        }
        if let Some(v) = layer.list_page_size {
            self.list_page_size = v;
        }
        if let Some(v) = layer.workers {
            self.workers = v;
        }
        if let Some(ref v) = layer.output {
            self.output = Some(v.clone());
        }
        if let Some(v) = layer.progress {
            self.progress = v;
        }
        self.credentials.merge(&layer.credentials);
    }

    /// Reject values no run can work with
    pub fn validate(&self) -> Result<()> {
        if self.pattern.trim().is_empty() {
            return Err(Error::config("pattern must not be empty"));
        }
        if self.list_page_size == 0 {
            return Err(Error::config("list_page_size must be at least 1"));
        }
        if self.token_expiry_secs == 0 {
            return Err(Error::config("token_expiry_secs must be at least 1"));
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("assetpush").join("config.toml"))
            .ok_or_else(|| Error::config("could not determine config directory"))
    }

    /// Directory stripped from local paths to form keys
    ///
    /// A relative `base_dir` is taken from the working directory.
    pub fn base_dir(&self) -> PathBuf {
        match self.base_dir {
            Some(ref base) => self.cwd.join(base),
            None => self.cwd.clone(),
        }
    }

    /// Report path resolved against the working directory
    pub fn output_path(&self) -> Option<PathBuf> {
        self.output.as_ref().map(|p| self.cwd.join(p))
    }

    /// Upload policy lifetime
    pub fn token_expiry(&self) -> Duration {
        Duration::from_secs(self.token_expiry_secs)
    }

    /// Copy of this config safe to print
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.credentials.secret_key.is_some() {
            copy.credentials.secret_key = Some("********".to_string());
        }
        copy
    }
}

/// Resolve a worker count: 0 means one per CPU, never more than the job count
pub fn resolve_workers(configured: usize, jobs: usize) -> usize {
    let workers = if configured == 0 {
        num_cpus::get()
    } else {
        configured
    };
    workers.min(jobs).max(1)
}
