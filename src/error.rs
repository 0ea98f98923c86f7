//! Error types for status polling.

use thiserror::Error;

/// Errors that can occur while fetching a status document.
///
/// The page only ever shows a single failure message for any of these.
/// The variant is kept so the cause can be logged.
#[derive(Debug, Error)]
pub enum PollError {
    /// The request never produced a response (connect, DNS, reset, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The device answered with something other than 200.
    #[error("device returned status {0}")]
    Status(u16),

    /// The body was not valid JSON.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The body was valid JSON but not an object.
    #[error("status document is not a JSON object")]
    NotAnObject,

    /// Reading a local document failed.
    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for PollError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PollError::Parse(err.to_string())
        } else {
            PollError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PollError {
    fn from(err: serde_json::Error) -> Self {
        PollError::Parse(err.to_string())
    }
}
