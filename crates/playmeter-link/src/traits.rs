//! Link sink trait

use async_trait::async_trait;
use thiserror::Error;

/// Errors from writing to the link
#[derive(Debug, Clone, Error)]
pub enum LinkError {
    #[error("Link unavailable: {0}")]
    Unavailable(String),
}

pub type LinkResult<T> = Result<T, LinkError>;

/// Destination for protocol lines - implemented by the serial device and by
/// the test mock
#[async_trait]
pub trait LineSink: Send + Sync {
    /// Write one line; the sink appends the terminator
    async fn write_line(&self, line: &str) -> LinkResult<()>;

    /// Whether the last write succeeded
    fn is_connected(&self) -> bool {
        true
    }

    /// Human-readable name for logs
    fn describe(&self) -> String;
}
