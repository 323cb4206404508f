//! Upload policies
//!
//! Every put carries an [`UploadPolicy`] minted for exactly one key. Backends
//! refuse writes outside the policy scope or after its deadline, and honour
//! `insert_only` by never replacing an existing object.

use crate::error::{Error, Result};
use std::time::{Duration, SystemTime};

/// Grant to write one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    scope: String,
    deadline: SystemTime,
    insert_only: bool,
}

impl UploadPolicy {
    /// Create a policy for `scope` (`bucket` or `bucket:key`) valid for `expiry`
    pub fn new(scope: impl Into<String>, expiry: Duration, insert_only: bool) -> Self {
        Self {
            scope: scope.into(),
            deadline: SystemTime::now() + expiry,
            insert_only,
        }
    }

    /// Policy covering a single key; overwrite protection when `overwrite` is false
    pub fn for_key(bucket: &str, key: &str, overwrite: bool, expiry: Duration) -> Self {
        Self::new(format!("{}:{}", bucket, key), expiry, !overwrite)
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn insert_only(&self) -> bool {
        self.insert_only
    }

    /// Check this policy permits writing `key` into `bucket` right now
    pub fn authorize(&self, bucket: &str, key: &str) -> Result<()> {
        let permitted = match self.scope.split_once(':') {
            Some((b, k)) => b == bucket && k == key,
            None => self.scope == bucket,
        };
        if !permitted {
            return Err(Error::PolicyMismatch {
                scope: self.scope.clone(),
                target: format!("{}:{}", bucket, key),
            });
        }
        if SystemTime::now() > self.deadline {
            return Err(Error::PolicyExpired {
                scope: self.scope.clone(),
            });
        }
        Ok(())
    }
}
