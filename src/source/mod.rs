//! Status source abstraction.
//!
//! A source produces one [`StatusDocument`] per call. The poller does not
//! care where it comes from: the device over HTTP, or a captured document
//! on disk.

mod file;
mod http;

pub use file::FileSource;
pub use http::{HttpSource, HttpSourceBuilder, DEFAULT_STATUS_PATH};

use std::fmt::Debug;

use async_trait::async_trait;

use crate::document::StatusDocument;
use crate::error::PollError;

/// Trait for fetching status documents.
///
/// # Example
///
/// ```no_run
/// use foxwatch::{HttpSource, StatusSource};
///
/// # tokio_test::block_on(async {
/// let source = HttpSource::builder().endpoint("http://192.168.1.50").build()?;
/// let doc = source.fetch().await?;
/// println!("{} fields", doc.len());
/// # Ok::<_, foxwatch::PollError>(())
/// # });
/// ```
#[async_trait]
pub trait StatusSource: Send + Sync + Debug {
    /// Fetch the current status document. Makes exactly one attempt.
    async fn fetch(&self) -> Result<StatusDocument, PollError>;

    /// Returns a human-readable description of the source.
    ///
    /// Used for display in the TUI header.
    fn description(&self) -> &str;
}
