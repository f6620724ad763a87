//! In-memory double for notification dispatch.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::dispatcher::{DispatchSummary, NotificationDispatcher};

/// Counts dispatch passes and answers with a fixed summary.
#[derive(Default)]
pub struct TestNotificationDispatcher {
    passes: Mutex<u32>,
    summary: DispatchSummary,
}

impl TestNotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every pass with `summary` instead of zeroes.
    pub fn with_summary(mut self, summary: DispatchSummary) -> Self {
        self.summary = summary;
        self
    }

    /// How many dispatch passes ran.
    pub fn passes(&self) -> u32 {
        *self.passes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl NotificationDispatcher for TestNotificationDispatcher {
    async fn dispatch_pending(&self) -> Result<DispatchSummary> {
        *self.passes.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(self.summary)
    }
}
