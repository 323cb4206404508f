//! URI parsing for upload destinations

use crate::error::{Error, Result};
use std::path::PathBuf;
use url::Url;

/// An upload destination - either a local directory or an S3 bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Local directory standing in for a bucket
    Local(PathBuf),

    /// S3 bucket and key prefix
    S3 { bucket: String, prefix: String },
}

impl Location {
    /// Parse a destination string into a Location
    pub fn parse(s: &str) -> Result<Self> {
        if let Some((scheme, _)) = s.split_once("://") {
            match scheme.to_lowercase().as_str() {
                "s3" => return Self::parse_s3(s),
                "file" => {
                    let path = s.strip_prefix("file://").unwrap_or(s);
                    return Ok(Location::Local(PathBuf::from(path)));
                }
                other => {
                    return Err(Error::InvalidUri {
                        uri: s.to_string(),
                        reason: format!("unsupported scheme '{}'", other),
                    })
                }
            }
        }

        Ok(Location::Local(PathBuf::from(s)))
    }

    fn parse_s3(s: &str) -> Result<Self> {
        let url = Url::parse(s).map_err(|e| Error::InvalidUri {
            uri: s.to_string(),
            reason: e.to_string(),
        })?;

        let bucket = url
            .host_str()
            .ok_or_else(|| Error::InvalidUri {
                uri: s.to_string(),
                reason: "missing bucket name".to_string(),
            })?
            .to_string();

        let prefix = url.path().trim_matches('/').to_string();

        Ok(Location::S3 { bucket, prefix })
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::S3 { bucket, prefix } if prefix.is_empty() => write!(f, "s3://{}", bucket),
            Location::S3 { bucket, prefix } => write!(f, "s3://{}/{}", bucket, prefix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local() {
        assert_eq!(
            Location::parse("/srv/out").unwrap(),
            Location::Local(PathBuf::from("/srv/out"))
        );
        assert_eq!(
            Location::parse("file:///tmp/bucket").unwrap(),
            Location::Local(PathBuf::from("/tmp/bucket"))
        );
    }

    #[test]
    fn test_parse_s3() {
        let loc = Location::parse("s3://my-site/releases/v2/").unwrap();
        assert_eq!(
            loc,
            Location::S3 {
                bucket: "my-site".to_string(),
                prefix: "releases/v2".to_string(),
            }
        );
        assert_eq!(loc.to_string(), "s3://my-site/releases/v2");
    }

    #[test]
    fn test_parse_s3_bucket_only() {
        let loc = Location::parse("s3://my-site").unwrap();
        assert_eq!(
            loc,
            Location::S3 {
                bucket: "my-site".to_string(),
                prefix: String::new(),
            }
        );
    }

    #[test]
    fn test_unsupported_scheme() {
        assert!(matches!(
            Location::parse("gs://bucket/x"),
            Err(Error::InvalidUri { .. })
        ));
    }
}
