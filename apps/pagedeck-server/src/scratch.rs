//! Per-request scratch space
//!
//! Every request works inside its own temporary directory, so concurrent
//! requests can never clobber each other's files. The directory is removed
//! when the guard drops, on success and error paths alike.

use crate::error::ApiError;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct RequestScratch {
    dir: TempDir,
}

impl RequestScratch {
    pub fn new() -> Result<Self, ApiError> {
        let dir = TempDir::with_prefix("pagedeck-")?;
        Ok(Self { dir })
    }

    /// Spool uploaded bytes under a sanitized filename, returning the path.
    /// Colliding names get a numeric suffix.
    pub fn spool(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ApiError> {
        let name = sanitize_filename(filename);
        let mut path = self.dir.path().join(&name);
        let mut attempt = 1;
        while path.exists() {
            path = self.dir.path().join(format!("{}_{}", attempt, name));
            attempt += 1;
        }
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Path for this request's single result file.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }
}

/// Strip path components and anything shell-unfriendly from an uploaded
/// filename; spooled names must never escape the scratch directory.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "upload.bin".to_string()
    } else {
        trimmed.to_string()
    }
}
