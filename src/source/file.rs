//! File-based status source.
//!
//! Reads a captured `/json` document from disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::StatusSource;
use crate::document::StatusDocument;
use crate::error::PollError;

/// A source that re-reads a JSON file on every fetch.
///
/// Useful for replaying a document captured with
/// `curl http://<device>/json > status.json`, or for driving the UI from a
/// file another process keeps up to date.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StatusSource for FileSource {
    async fn fetch(&self) -> Result<StatusDocument, PollError> {
        let content = tokio::fs::read(&self.path).await?;
        StatusDocument::from_slice(&content)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
