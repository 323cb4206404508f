//! CLI argument parsing for assetpush

use crate::config::{Config, ConfigOverrides};
use crate::error::Result;
use crate::uri::Location;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// assetpush - push static build artifacts to object storage
#[derive(Parser, Debug)]
#[command(name = "assetpush")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload files matching a glob
    Upload(UploadArgs),

    /// Delete every remote object under a prefix
    Purge(PurgeArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Options shared by every command
#[derive(Args, Debug, Default)]
pub struct CommonArgs {
    /// Destination: s3://bucket[/prefix], a local directory, or file:// URI
    #[arg(short, long)]
    pub dest: Option<String>,

    /// Bucket name (overrides env file and config file)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key=value file with credentials and bucket
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Configuration file path
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}

impl CommonArgs {
    /// Assemble the config and resolve the destination
    ///
    /// Layers, lowest first: defaults, env file, config file, `cli`.
    pub fn load(&self, mut cli: ConfigOverrides) -> Result<(Config, Location)> {
        let dest = self.dest.as_deref().map(Location::parse).transpose()?;

        if let Some(ref bucket) = self.bucket {
            cli.bucket = Some(bucket.clone());
        }
        if let Some(Location::S3 { bucket, prefix }) = &dest {
            cli.bucket = Some(bucket.clone());
            if !prefix.is_empty() && cli.remote_prefix.is_none() {
                cli.remote_prefix = Some(prefix.clone());
            }
        }

        let mut explicit = Vec::new();
        if let Some(file) = self.config_file()? {
            explicit.push(ConfigOverrides::load_from(&file)?);
        }
        explicit.push(cli);

        let config = Config::layered(self.env_file.as_deref(), &explicit)?;
        let location = match dest {
            Some(Location::Local(path)) => Location::Local(path),
            _ => Location::S3 {
                bucket: config.bucket.clone(),
                prefix: config.remote_prefix.clone(),
            },
        };

        Ok((config, location))
    }

    /// Explicit config file, or the default one when it exists
    fn config_file(&self) -> Result<Option<PathBuf>> {
        if let Some(ref path) = self.config {
            return Ok(Some(path.clone()));
        }
        match Config::default_config_path() {
            Ok(path) if path.exists() => Ok(Some(path)),
            _ => Ok(None),
        }
    }
}

/// Arguments for the upload command
#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// Include glob, relative to the working directory [default: **/*]
    pub pattern: Option<String>,

    /// Exclude pattern (can be specified multiple times)
    #[arg(long = "exclude", action = clap::ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Working directory the pattern is expanded against
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Directory stripped from file paths to form keys [default: cwd]
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// Prefix prepended to every key
    #[arg(long)]
    pub prefix: Option<String>,

    /// Replace objects that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Keep objects that already exist, even if the config file enables overwrite
    #[arg(long, conflicts_with = "overwrite")]
    pub no_overwrite: bool,

    /// Number of parallel uploads [default: auto]
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Write a JSON report to this file (relative to cwd)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl UploadArgs {
    /// CLI layer for the config
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            pattern: self.pattern.clone(),
            exclude: (!self.exclude.is_empty()).then(|| self.exclude.clone()),
            cwd: self.cwd.clone(),
            base_dir: self.base.clone(),
            remote_prefix: self.prefix.clone(),
            overwrite: match (self.overwrite, self.no_overwrite) {
                (true, _) => Some(true),
                (false, true) => Some(false),
                (false, false) => None,
            },
            workers: self.workers,
            output: self.output.clone(),
            progress: self.no_progress.then_some(false),
            ..Default::default()
        }
    }
}

/// Arguments for the purge command
#[derive(Parser, Debug)]
pub struct PurgeArgs {
    /// Prefix to delete, below the configured remote prefix
    #[arg(default_value = "")]
    pub prefix: String,

    /// Allow purging the whole bucket when the prefix is empty
    #[arg(long)]
    pub all: bool,

    /// List what would be deleted without deleting
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Show the default configuration file path
    #[arg(long)]
    pub path: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upload() {
        let cli = Cli::parse_from([
            "assetpush",
            "-vv",
            "upload",
            "dist/**/*",
            "--exclude",
            "**/*.map",
            "--exclude",
            "**/.DS_Store",
            "-j",
            "8",
            "--overwrite",
            "--dest",
            "s3://site/v2",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        let layer = args.to_overrides();
        assert_eq!(layer.pattern.as_deref(), Some("dist/**/*"));
        assert_eq!(layer.exclude.as_ref().map(Vec::len), Some(2));
        assert_eq!(layer.workers, Some(8));
        assert_eq!(layer.overwrite, Some(true));
        assert_eq!(layer.progress, None);
    }

    #[test]
    fn test_no_overwrite_beats_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(&file, "overwrite = true\n").unwrap();

        let cli = Cli::parse_from([
            "assetpush",
            "upload",
            "--no-overwrite",
            "-c",
            file.to_str().unwrap(),
        ]);
        let Commands::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(args.to_overrides().overwrite, Some(false));
        let (config, _) = args.common.load(args.to_overrides()).unwrap();
        assert!(!config.overwrite);

        assert!(Cli::try_parse_from(["assetpush", "upload", "--overwrite", "--no-overwrite"]).is_err());
    }

    #[test]
    fn test_unset_flags_do_not_override() {
        let cli = Cli::parse_from(["assetpush", "upload"]);
        let Commands::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(args.to_overrides(), ConfigOverrides::default());
    }

    #[test]
    fn test_s3_destination_sets_bucket_and_prefix() {
        let common = CommonArgs {
            dest: Some("s3://site/releases".to_string()),
            config: Some(PathBuf::from("/nonexistent/assetpush.toml")),
            ..Default::default()
        };
        // Missing explicit config file is an error
        assert!(common.load(ConfigOverrides::default()).is_err());

        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(&file, "bucket = \"from-file\"\nworkers = 3\n").unwrap();
        let common = CommonArgs {
            dest: Some("s3://site/releases".to_string()),
            config: Some(file),
            ..Default::default()
        };
        let (config, location) = common.load(ConfigOverrides::default()).unwrap();
        assert_eq!(config.bucket, "site");
        assert_eq!(config.remote_prefix, "releases");
        assert_eq!(config.workers, 3);
        assert_eq!(
            location,
            Location::S3 {
                bucket: "site".to_string(),
                prefix: "releases".to_string(),
            }
        );
    }

    #[test]
    fn test_local_destination() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(&file, "").unwrap();
        let common = CommonArgs {
            dest: Some(dir.path().display().to_string()),
            config: Some(file),
            ..Default::default()
        };
        let (_, location) = common.load(ConfigOverrides::default()).unwrap();
        assert_eq!(location, Location::Local(dir.path().to_path_buf()));
    }
}
