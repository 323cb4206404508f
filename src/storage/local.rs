//! Local filesystem storage backend
//!
//! Treats a directory as a bucket: keys map to relative paths under the root.
//! Useful for staging a deploy locally and for tests.

use crate::error::{Error, Result};
use crate::policy::UploadPolicy;
use crate::types::{BatchDeleteResult, ListPage, MAX_DELETE_BATCH};
use crate::upload::keys::path_to_key;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use super::ObjectStore;

/// Local filesystem storage backend
#[derive(Clone)]
pub struct LocalBackend {
    /// Root path for this backend
    root: PathBuf,
    /// Bucket label upload policies are checked against
    bucket: String,
}

impl LocalBackend {
    /// Create a new local backend with the given root path
    pub fn new(root: PathBuf, bucket: impl Into<String>) -> Self {
        Self {
            root,
            bucket: bucket.into(),
        }
    }

    /// Resolve a key to a path under the root, refusing keys that escape it
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(Error::storage(format!("invalid object key '{}'", key)));
        }
        Ok(self.root.join(relative))
    }

    /// All keys under the root, sorted
    async fn all_keys(&self) -> Result<Vec<String>> {
        let root = self.root.clone();
        if !fs::try_exists(&root).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        // Use jwalk in a blocking task for parallel directory walking
        let mut keys = tokio::task::spawn_blocking(move || {
            let mut results = Vec::new();

            for entry in jwalk::WalkDir::new(&root)
                .skip_hidden(false)
                .follow_links(false)
                .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()))
            {
                match entry {
                    Ok(e) => {
                        if !e.file_type().is_file() {
                            continue;
                        }
                        let path = e.path();
                        if let Ok(relative) = path.strip_prefix(&root) {
                            results.push(path_to_key(relative));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Error walking directory");
                    }
                }
            }

            results
        })
        .await
        .map_err(|e| Error::storage(format!("directory walk task failed: {}", e)))?;

        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl ObjectStore for LocalBackend {
    fn bucket(&self) -> String {
        self.bucket.clone()
    }

    async fn put_file(&self, policy: &UploadPolicy, key: &str, local_path: &Path) -> Result<()> {
        policy.authorize(&self.bucket, key)?;
        let full_path = self.resolve(key)?;

        // Create parent directories if needed
        let parent = full_path
            .parent()
            .ok_or_else(|| Error::storage(format!("invalid object key '{}'", key)))?
            .to_path_buf();
        fs::create_dir_all(&parent)
            .await
            .map_err(|e| Error::io(format!("creating {}", parent.display()), e))?;

        if policy.insert_only() && fs::try_exists(&full_path).await.unwrap_or(false) {
            return Err(Error::AlreadyExists {
                key: key.to_string(),
            });
        }

        let source = local_path.to_path_buf();
        let insert_only = policy.insert_only();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            write_object(&source, &parent, &full_path, insert_only, &key)
        })
        .await
        .map_err(|e| Error::storage(format!("write task failed: {}", e)))?
    }

    async fn list_by_prefix(&self, prefix: &str, marker: &str, limit: usize) -> Result<ListPage> {
        let limit = limit.max(1);
        let mut matching = self
            .all_keys()
            .await?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .filter(|k| marker.is_empty() || k.as_str() > marker);

        let keys: Vec<String> = matching.by_ref().take(limit).collect();
        let more = matching.next().is_some();

        let marker = match (more, keys.last()) {
            (true, Some(last)) => last.clone(),
            _ => String::new(),
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

        let mut result = BatchDeleteResult::default();
        for key in keys {
            let outcome = match self.resolve(key) {
                Ok(path) => fs::remove_file(&path).await.or_else(|e| {
                    // Deleting a missing key succeeds, as it does on S3
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Ok(())
                    } else {
                        Err(Error::io(format!("removing {}", path.display()), e))
                    }
                }),
                Err(e) => Err(e),
            };

            if let Err(e) = outcome {
                tracing::warn!(key = %key, error = %e, "Object not deleted");
                result.failed.push(key.clone());
            }
        }

        Ok(result)
    }
}

/// Copy `source` into a temp file beside `dest`, then move it into place
///
/// The object only appears once it is complete. With `insert_only` the move
/// refuses to replace an existing object. The temp file is removed on error.
fn write_object(
    source: &Path,
    dir: &Path,
    dest: &Path,
    insert_only: bool,
    key: &str,
) -> Result<()> {
    let mut src = std::fs::File::open(source)
        .map_err(|e| Error::io(format!("opening {}", source.display()), e))?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".assetpush-")
        .tempfile_in(dir)
        .map_err(|e| Error::io(format!("creating temp file in {}", dir.display()), e))?;
    std::io::copy(&mut src, tmp.as_file_mut())
        .map_err(|e| Error::io(format!("copying {}", source.display()), e))?;

    let persisted = if insert_only {
        tmp.persist_noclobber(dest)
    } else {
        tmp.persist(dest)
    };
    match persisted {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Err(Error::AlreadyExists {
            key: key.to_string(),
        }),
        Err(e) => Err(Error::io(format!("writing {}", dest.display()), e.error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn policy(key: &str, overwrite: bool) -> UploadPolicy {
        UploadPolicy::for_key("site", key, overwrite, Duration::from_secs(60))
    }

    fn source_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_local_backend_put() {
        let src = TempDir::new().unwrap();
        let bucket = TempDir::new().unwrap();
        let backend = LocalBackend::new(bucket.path().to_path_buf(), "site");

        let file = source_file(&src, "app.js", "console.log(1)");
        backend
            .put_file(&policy("js/app.js", false), "js/app.js", &file)
            .await
            .unwrap();

        let stored = std::fs::read_to_string(bucket.path().join("js/app.js")).unwrap();
        assert_eq!(stored, "console.log(1)");
    }

    #[tokio::test]
    async fn test_insert_only_keeps_existing_object() {
        let src = TempDir::new().unwrap();
        let bucket = TempDir::new().unwrap();
        let backend = LocalBackend::new(bucket.path().to_path_buf(), "site");

        let first = source_file(&src, "a", "first");
        let second = source_file(&src, "b", "second");
        backend.put_file(&policy("x.txt", false), "x.txt", &first).await.unwrap();

        let err = backend
            .put_file(&policy("x.txt", false), "x.txt", &second)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
        assert_eq!(std::fs::read_to_string(bucket.path().join("x.txt")).unwrap(), "first");

        backend.put_file(&policy("x.txt", true), "x.txt", &second).await.unwrap();
        assert_eq!(std::fs::read_to_string(bucket.path().join("x.txt")).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_failed_put_leaves_no_object() {
        let src = TempDir::new().unwrap();
        let bucket = TempDir::new().unwrap();
        let backend = LocalBackend::new(bucket.path().to_path_buf(), "site");
        let missing = src.path().join("a.js");

        let err = backend
            .put_file(&policy("a.js", false), "a.js", &missing)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("a.js"));
        assert!(!bucket.path().join("a.js").exists());
        assert_eq!(std::fs::read_dir(bucket.path()).unwrap().count(), 0);

        // Once the source exists, the insert-only put goes through
        let file = source_file(&src, "a.js", "real content");
        backend.put_file(&policy("a.js", false), "a.js", &file).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(bucket.path().join("a.js")).unwrap(),
            "real content"
        );
    }

    #[tokio::test]
    async fn test_put_rejects_foreign_policy() {
        let src = TempDir::new().unwrap();
        let bucket = TempDir::new().unwrap();
        let backend = LocalBackend::new(bucket.path().to_path_buf(), "site");
        let file = source_file(&src, "a", "a");

        let err = backend
            .put_file(&policy("other.txt", true), "a.txt", &file)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PolicyMismatch { .. }));
    }

    #[test]
    fn test_resolve_rejects_escaping_keys() {
        let backend = LocalBackend::new(PathBuf::from("/srv/bucket"), "site");
        assert!(backend.resolve("../etc/passwd").is_err());
        assert!(backend.resolve("/abs").is_err());
        assert!(backend.resolve("").is_err());
        assert!(backend.resolve("a/b.js").is_ok());
    }

    #[tokio::test]
    async fn test_list_pages_and_delete() {
        let bucket = TempDir::new().unwrap();
        for name in ["assets/a.js", "assets/b.js", "assets/c.js", "index.html"] {
            let path = bucket.path().join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "x").unwrap();
        }
        let backend = LocalBackend::new(bucket.path().to_path_buf(), "site");

        let page = backend.list_by_prefix("assets/", "", 2).await.unwrap();
        assert_eq!(page.keys, vec!["assets/a.js", "assets/b.js"]);
        assert_eq!(page.marker, "assets/b.js");

        let page = backend.list_by_prefix("assets/", &page.marker, 2).await.unwrap();
        assert_eq!(page.keys, vec!["assets/c.js"]);
        assert!(page.is_last());

        let result = backend
            .batch_delete(&["assets/a.js".to_string(), "assets/missing.js".to_string()])
            .await
            .unwrap();
        assert!(result.failed.is_empty());
        assert!(!bucket.path().join("assets/a.js").exists());
        assert!(bucket.path().join("index.html").exists());
    }

    #[tokio::test]
    async fn test_list_missing_root_is_empty() {
        let backend = LocalBackend::new(PathBuf::from("/nonexistent/assetpush/root"), "site");
        let page = backend.list_by_prefix("", "", 10).await.unwrap();
        assert!(page.keys.is_empty());
        assert!(page.is_last());
    }
}
