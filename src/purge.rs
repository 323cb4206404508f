//! Listing and bulk deletion of remote objects under a prefix
//!
//! Keys are collected across every listing page first, then deleted in
//! batches of at most 100. A failed page or batch is logged and skipped.

use crate::storage::ObjectStore;
use crate::types::{DeleteBatch, DeleteSummary};

/// Collect every key under `prefix`, following continuation markers
///
/// Stops after the page whose marker is empty. A listing error ends
/// pagination early and returns the keys gathered so far.
pub async fn list_all_keys(store: &dyn ObjectStore, prefix: &str, page_size: usize) -> Vec<String> {
    let mut keys = Vec::new();
    let mut marker = String::new();
    let mut pages = 0u64;

    loop {
        let page = match store.list_by_prefix(prefix, &marker, page_size).await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(prefix, marker = %marker, error = %e, "Listing failed, stopping pagination");
                break;
            }
        };
        pages += 1;
        let last = page.is_last();
        keys.extend(page.keys);

        if last {
            break;
        }
        if page.marker == marker {
            tracing::error!(prefix, marker = %marker, "Listing returned the same marker twice, stopping");
            break;
        }
        marker = page.marker;
    }

    tracing::info!(prefix, pages, keys = keys.len(), "Listing complete");
    keys
}

/// Delete `keys` in batches; batch errors are logged and the next batch still runs
pub async fn delete_keys(store: &dyn ObjectStore, keys: &[String]) -> DeleteSummary {
    let mut summary = DeleteSummary {
        listed: keys.len() as u64,
        ..Default::default()
    };

    for (index, batch) in DeleteBatch::split(keys).iter().enumerate() {
        summary.batches += 1;

        match store.batch_delete(batch.keys()).await {
            Ok(result) => {
                let failed = result.failed.len() as u64;
                summary.failed += failed;
                summary.deleted += batch.len() as u64 - failed;
                tracing::debug!(batch = index, keys = batch.len(), failed, "Batch deleted");
            }
            Err(e) => {
                summary.failed_batches += 1;
                summary.failed += batch.len() as u64;
                tracing::error!(batch = index, keys = batch.len(), error = %e, "Batch delete failed");
            }
        }
    }

    summary
}

/// List everything under `prefix` and delete it, or only count it when `dry_run`
pub async fn purge(
    store: &dyn ObjectStore,
    prefix: &str,
    page_size: usize,
    dry_run: bool,
) -> DeleteSummary {
    let keys = list_all_keys(store, prefix, page_size).await;

    if dry_run {
        for key in &keys {
            tracing::info!(key = %key, "Would delete");
        }
        return DeleteSummary {
            listed: keys.len() as u64,
            ..Default::default()
        };
    }

    let summary = delete_keys(store, &keys).await;
    tracing::info!(
        prefix,
        deleted = summary.deleted,
        failed = summary.failed,
        batches = summary.batches,
        "Purge complete"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::MockObjectStore;
    use crate::types::{BatchDeleteResult, ListPage};
    use mockall::Sequence;
    use std::sync::{Arc, Mutex};

    fn page(keys: &[&str], marker: &str) -> ListPage {
        ListPage {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            marker: marker.to_string(),
        }
    }

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("assets/{:04}.js", i)).collect()
    }

    #[tokio::test]
    async fn test_pagination_stops_on_empty_marker() {
        let mut store = MockObjectStore::new();
        let mut seq = Sequence::new();
        for (expected, next, key) in [("", "m1", "a"), ("m1", "m2", "b"), ("m2", "", "c")] {
            store
                .expect_list_by_prefix()
                .withf(move |prefix, marker, limit| {
                    prefix == "assets/" && marker == expected && *limit == 2
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_, _, _| Ok(page(&[key], next)));
        }

        let listed = list_all_keys(&store, "assets/", 2).await;
        assert_eq!(listed, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_listing_error_keeps_collected_keys() {
        let mut store = MockObjectStore::new();
        let mut seq = Sequence::new();
        store
            .expect_list_by_prefix()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(page(&["a", "b"], "m1")));
        store
            .expect_list_by_prefix()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(Error::RemoteStatus { code: 500 }));

        assert_eq!(list_all_keys(&store, "", 1000).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_repeated_marker_stops_listing() {
        let mut store = MockObjectStore::new();
        store
            .expect_list_by_prefix()
            .times(2)
            .returning(|_, _, _| Ok(page(&["a"], "stuck")));

        assert_eq!(list_all_keys(&store, "", 10).await.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_splits_into_batches_of_100() {
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&sizes);

        let mut store = MockObjectStore::new();
        store.expect_batch_delete().times(3).returning(move |batch| {
            seen.lock().unwrap().push(batch.len());
            Ok(BatchDeleteResult::default())
        });

        let summary = delete_keys(&store, &keys(250)).await;
        assert_eq!(*sizes.lock().unwrap(), vec![100, 100, 50]);
        assert_eq!(summary.batches, 3);
        assert_eq!(summary.deleted, 250);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_the_rest() {
        let calls = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&calls);

        let mut store = MockObjectStore::new();
        store.expect_batch_delete().times(3).returning(move |batch| {
            let mut n = counter.lock().unwrap();
            *n += 1;
            match *n {
                1 => Err(Error::RemoteStatus { code: 503 }),
                2 => Ok(BatchDeleteResult {
                    failed: vec![batch[0].clone()],
                }),
                _ => Ok(BatchDeleteResult::default()),
            }
        });

        let summary = delete_keys(&store, &keys(250)).await;
        assert_eq!(summary.batches, 3);
        assert_eq!(summary.failed_batches, 1);
        assert_eq!(summary.failed, 101);
        assert_eq!(summary.deleted, 149);
    }

    #[tokio::test]
    async fn test_dry_run_never_deletes() {
        let mut store = MockObjectStore::new();
        store
            .expect_list_by_prefix()
            .times(1)
            .returning(|_, _, _| Ok(page(&["a", "b"], "")));
        store.expect_batch_delete().never();

        let summary = purge(&store, "", 1000, true).await;
        assert_eq!(summary.listed, 2);
        assert_eq!(summary.deleted, 0);
    }
}
