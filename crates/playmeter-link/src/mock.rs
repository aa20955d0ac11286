//! Mock link sink for testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::{LineSink, LinkError, LinkResult};

/// Records every line written; can be told to fail
#[derive(Default)]
pub struct MockSink {
    lines: Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written so far, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Relay commands written so far
    pub fn relay_lines(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.starts_with("ON:") || l.starts_with("OFF:"))
            .collect()
    }

    /// Most recent status frame
    pub fn last_frame(&self) -> Option<String> {
        self.lines()
            .into_iter()
            .rev()
            .find(|l| l.starts_with(crate::protocol::SYNC_PREFIX))
    }

    /// Make subsequent writes fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl LineSink for MockSink {
    async fn write_line(&self, line: &str) -> LinkResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LinkError::Unavailable("mock link failure".into()));
        }
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.failing.load(Ordering::SeqCst)
    }

    fn describe(&self) -> String {
        "mock".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_and_fails() {
        let sink = MockSink::new();
        sink.write_line("SYNC|").await.unwrap();
        sink.write_line("ON:1").await.unwrap();

        assert_eq!(sink.relay_lines(), vec!["ON:1".to_string()]);
        assert_eq!(sink.last_frame().as_deref(), Some("SYNC|"));

        sink.set_failing(true);
        assert!(sink.write_line("OFF:1").await.is_err());
        assert!(!sink.is_connected());
        assert_eq!(sink.lines().len(), 2);
    }
}
