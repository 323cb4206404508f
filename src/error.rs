//! Error types for assetpush

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for assetpush operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for assetpush
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors (file system operations)
    #[error("I/O error: {message}: {source}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Glob compilation or directory walk failure
    #[error("Enumeration error for pattern '{pattern}': {message}")]
    Enumeration { pattern: String, message: String },

    /// A local file does not live under the configured base directory
    #[error("{path} is not under base directory {base}")]
    OutsideBase { path: PathBuf, base: PathBuf },

    /// Remote answered with a non-success HTTP status
    #[error("code: {code}")]
    RemoteStatus { code: u16 },

    /// Upload policy does not cover the bucket/key being written
    #[error("policy scope '{scope}' does not permit writing '{target}'")]
    PolicyMismatch { scope: String, target: String },

    /// Upload policy deadline has passed
    #[error("upload policy for '{scope}' expired")]
    PolicyExpired { scope: String },

    /// Insert-only put hit an existing object
    #[error("object already exists: {key}")]
    AlreadyExists { key: String },

    /// Storage backend errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// AWS SDK error without an HTTP status
    #[error("AWS error: {message}")]
    Aws { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid URI format
    #[error("Invalid URI: {uri} - {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Report serialization or write failure
    #[error("Report error: {message}")]
    Report { message: String },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an enumeration error for a pattern
    pub fn enumeration(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Enumeration {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.kind().to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            message: format!("TOML parse error: {}", err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Report {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_status_message() {
        let err = Error::RemoteStatus { code: 599 };
        assert_eq!(err.to_string(), "code: 599");
    }

    #[test]
    fn test_io_message_names_path_and_cause() {
        let err = Error::io(
            "opening /srv/site/a.js",
            std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        );
        assert_eq!(
            err.to_string(),
            "I/O error: opening /srv/site/a.js: No such file or directory"
        );
    }
}
