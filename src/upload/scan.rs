//! File enumeration for upload runs
//!
//! Walks the working directory with jwalk and keeps the files whose path,
//! relative to the working directory, matches the include glob and none of
//! the exclusion globs.

use crate::error::{Error, Result};
use crate::upload::keys::path_to_key;
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

/// Compiled include/exclude globs
#[derive(Debug, Clone)]
pub struct FileMatcher {
    include: GlobSet,
    exclude: GlobSet,
}

impl FileMatcher {
    /// Compile an include pattern and exclusion patterns
    pub fn new(pattern: &str, exclude: &[String]) -> Result<Self> {
        let mut include = GlobSetBuilder::new();
        include.add(compile(pattern)?);

        let mut excluded = GlobSetBuilder::new();
        for p in exclude {
            excluded.add(compile(p)?);
        }

        Ok(Self {
            include: include
                .build()
                .map_err(|e| Error::enumeration(pattern, e.to_string()))?,
            exclude: excluded
                .build()
                .map_err(|e| Error::enumeration(exclude.join(","), e.to_string()))?,
        })
    }

    /// Check a path relative to the working directory
    pub fn is_match(&self, relative: &str) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }
}

/// `*` stays within one path segment; `**` crosses segments
fn compile(pattern: &str) -> Result<Glob> {
    let trimmed = pattern.strip_prefix("./").unwrap_or(pattern);
    GlobBuilder::new(trimmed)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::enumeration(pattern, e.to_string()))
}

/// Expand `pattern` against `cwd` into a sorted list of absolute file paths
pub async fn enumerate(cwd: &Path, pattern: &str, exclude: &[String]) -> Result<Vec<PathBuf>> {
    let root = tokio::fs::canonicalize(cwd)
        .await
        .map_err(|e| Error::enumeration(pattern, format!("{}: {}", cwd.display(), e)))?;
    let matcher = FileMatcher::new(pattern, exclude)?;

    let walk_root = root.clone();
    let mut files = tokio::task::spawn_blocking(move || walk(&walk_root, &matcher))
        .await
        .map_err(|e| Error::enumeration(pattern, format!("walk task failed: {}", e)))?
        .map_err(|message| Error::enumeration(pattern, message))?;

    files.sort();
    files.dedup();

    tracing::debug!(root = %root.display(), pattern, files = files.len(), "Enumerated files");
    Ok(files)
}

/// Any unreadable directory fails the walk; a partial file list is never returned
fn walk(root: &Path, matcher: &FileMatcher) -> std::result::Result<Vec<PathBuf>, String> {
    // jwalk reports an unreadable root as an entry error; check it up front
    std::fs::read_dir(root).map_err(|e| format!("{}: {}", root.display(), e))?;

    let mut results = Vec::new();

    for entry in jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()))
    {
        let e = entry.map_err(|e| e.to_string())?;

        let file_type = e.file_type();
        if file_type.is_dir() {
            continue;
        }
        let path = e.path();
        // Symlinks count only when they point at a regular file
        if file_type.is_symlink() && !path.is_file() {
            continue;
        }

        let relative = match path.strip_prefix(root) {
            Ok(r) => path_to_key(r),
            Err(_) => continue,
        };
        if matcher.is_match(&relative) {
            results.push(path);
        }
    }

    Ok(results)
}
