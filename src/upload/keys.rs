//! Mapping local paths to remote object keys

use crate::error::{Error, Result};
use crate::types::UploadJob;
use std::path::{Component, Path, PathBuf};

/// Join the normal components of a relative path with `/`
pub fn path_to_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Key for `file` relative to `base`
///
/// Matching is per path component, so a trailing separator on `base` makes no
/// difference and `/srv/site2/a.js` is not treated as lying under `/srv/site`.
pub fn map_key(base: &Path, file: &Path) -> Result<String> {
    let outside = || Error::OutsideBase {
        path: file.to_path_buf(),
        base: base.to_path_buf(),
    };

    let relative = file.strip_prefix(base).map_err(|_| outside())?;
    let key = path_to_key(relative);
    if key.is_empty() {
        return Err(outside());
    }
    Ok(key)
}

/// Prepend a remote prefix, joined by exactly one `/`
pub fn with_prefix(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let key = key.trim_start_matches('/');
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (false, true) => format!("{}/", prefix),
        (false, false) => format!("{}/{}", prefix, key),
    }
}

/// Build one job per file; any file outside `base` fails the whole batch
pub fn build_jobs(base: &Path, files: &[PathBuf], prefix: &str) -> Result<Vec<UploadJob>> {
    files
        .iter()
        .map(|file| {
            let key = map_key(base, file)?;
            Ok(UploadJob::new(file.clone(), with_prefix(prefix, &key)))
        })
        .collect()
}
