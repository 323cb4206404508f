//! AWS S3 storage backend

use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::policy::UploadPolicy;
use crate::types::{BatchDeleteResult, ListPage, MAX_DELETE_BATCH};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_sdk_s3::config::{Credentials as AwsCredentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use std::path::Path;

use super::ObjectStore;

/// S3 caps a single listing page at 1000 keys
const MAX_LIST_KEYS: usize = 1000;

/// AWS S3 storage backend
#[derive(Clone)]
pub struct S3Backend {
    /// S3 client
    client: Client,
    /// Bucket name
    bucket: String,
}

impl S3Backend {
    /// Create a new S3 backend
    ///
    /// Explicit credentials, region and endpoint take precedence over the
    /// default AWS provider chain.
    pub async fn new(bucket: String, credentials: &Credentials) -> Result<Self> {
        // Failed calls surface as outcomes; the SDK must not retry them
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .retry_config(RetryConfig::disabled());

        if let Some(ref region) = credentials.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let (Some(ak), Some(sk)) = (&credentials.access_key, &credentials.secret_key) {
            loader = loader.credentials_provider(AwsCredentials::new(
                ak.clone(),
                sk.clone(),
                None,
                None,
                "assetpush",
            ));
        }
        if let Some(ref endpoint) = credentials.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }

        let shared = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if credentials.endpoint.is_some() {
            // Most S3-compatible services only route path-style requests
            builder = builder.force_path_style(true);
        }

        Ok(Self::from_client(Client::from_conf(builder.build()), bucket))
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    fn bucket(&self) -> String {
        self.bucket.clone()
    }

    async fn put_file(&self, policy: &UploadPolicy, key: &str, local_path: &Path) -> Result<()> {
        policy.authorize(&self.bucket, key)?;

        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            Error::storage(format!("reading {}: {}", local_path.display(), e))
        })?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body);

        if let Some(content_type) = content_type_for(key) {
            request = request.content_type(content_type);
        }
        if policy.insert_only() {
            request = request.if_none_match("*");
        }

        request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, key))?;

        Ok(())
    }

    async fn list_by_prefix(&self, prefix: &str, marker: &str, limit: usize) -> Result<ListPage> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(limit.clamp(1, MAX_LIST_KEYS) as i32);

        if !marker.is_empty() {
            request = request.continuation_token(marker);
        }

        let output = request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, prefix))?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();

        let marker = if output.is_truncated().unwrap_or(false) {
            output
                .next_continuation_token()
                .unwrap_or_default()
                .to_string()
        } else {
            String::new()
        };

        Ok(ListPage { keys, marker })
    }

    async fn batch_delete(&self, keys: &[String]) -> Result<BatchDeleteResult> {
        if keys.len() > MAX_DELETE_BATCH {
            return Err(Error::storage(format!(
                "batch of {} keys exceeds limit of {}",
                keys.len(),
                MAX_DELETE_BATCH
            )));
        }
        if keys.is_empty() {
            return Ok(BatchDeleteResult::default());
        }

        let objects = keys
            .iter()
            .map(|key| {
                ObjectIdentifier::builder()
                    .key(key)
                    .build()
                    .map_err(|e| Error::storage(format!("building delete request: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| Error::storage(format!("building delete request: {}", e)))?;

        let output = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &self.bucket))?;

        let failed = output
            .errors()
            .iter()
            .filter_map(|err| {
                tracing::warn!(
                    key = err.key().unwrap_or_default(),
                    code = err.code().unwrap_or_default(),
                    message = err.message().unwrap_or_default(),
                    "Object not deleted"
                );
                err.key().map(str::to_string)
            })
            .collect();

        Ok(BatchDeleteResult { failed })
    }
}

/// Convert an SDK failure into an error carrying the HTTP status when there is one
fn map_sdk_error<E>(err: SdkError<E>, key: &str) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    match status {
        // If-None-Match: * lost against an existing object
        Some(412) => Error::AlreadyExists {
            key: key.to_string(),
        },
        Some(code) if !(200..300).contains(&code) => Error::RemoteStatus { code },
        _ => Error::Aws {
            message: DisplayErrorContext(&err).to_string(),
        },
    }
}

/// Content type for common static build artifacts
fn content_type_for(key: &str) -> Option<&'static str> {
    let ext = key.rsplit_once('.')?.1.to_ascii_lowercase();
    let content_type = match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(content_type)
}
