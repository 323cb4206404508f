//! S3 Integration Tests
//!
//! These tests are marked with #[ignore] and require real credentials.
//! They will NOT run with normal `cargo test`.
//!
//! To run these tests manually:
//!   export AWS_ACCESS_KEY_ID="your_key"
//!   export AWS_SECRET_ACCESS_KEY="your_secret"
//!   export AWS_REGION="eu-central-1"
//!   export ASSETPUSH_TEST_BUCKET="your-test-bucket"
//!   cargo test --test integration_s3 -- --ignored --nocapture

use assetpush::config::Config;
use assetpush::purge::{list_all_keys, purge};
use assetpush::storage::{ObjectStore, StorageBackend};
use assetpush::upload::UploadEngine;
use std::fs;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

fn test_bucket() -> String {
    std::env::var("ASSETPUSH_TEST_BUCKET").expect("ASSETPUSH_TEST_BUCKET must be set")
}

/// Unique prefix so concurrent runs do not collide
fn run_prefix() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("assetpush-it/{}", nanos)
}

#[tokio::test]
#[ignore]
async fn test_s3_upload_skip_and_purge() {
    let source = TempDir::new().unwrap();
    for i in 0..120 {
        let path = source.path().join(format!("assets/{:03}.js", i));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, format!("console.log({})", i)).unwrap();
    }

    let prefix = run_prefix();
    let config = Config {
        cwd: source.path().to_path_buf(),
        bucket: test_bucket(),
        remote_prefix: prefix.clone(),
        workers: 8,
        progress: false,
        list_page_size: 50,
        ..Default::default()
    };

    let store = StorageBackend::s3(config.bucket.clone(), &config)
        .await
        .expect("Failed to create S3 backend");
    let store: Arc<dyn ObjectStore> = Arc::new(store);

    let first = UploadEngine::new(&config, store.clone()).run().await.unwrap();
    println!("First upload: {:?}", first.stats);
    assert_eq!(first.stats.succeeded, 120);
    assert_eq!(first.stats.failed, 0);

    // Insert-only rerun skips every object
    let second = UploadEngine::new(&config, store.clone()).run().await.unwrap();
    assert_eq!(second.stats.failed, 0);
    assert!(second.report.success.iter().all(|s| s.skipped));

    let listed = list_all_keys(store.as_ref(), &prefix, config.list_page_size).await;
    assert_eq!(listed.len(), 120);

    let summary = purge(store.as_ref(), &prefix, config.list_page_size, false).await;
    println!("Purge: {:?}", summary);
    assert_eq!(summary.deleted, 120);
    assert_eq!(summary.batches, 2);

    let remaining = list_all_keys(store.as_ref(), &prefix, config.list_page_size).await;
    assert!(remaining.is_empty());
}
