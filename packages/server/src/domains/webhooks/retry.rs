//! Redelivery of webhook events that failed their first dispatch.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

/// Outcome of one delivery pass over the queued events.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RetryQueueSummary {
    pub processed: u32,
    pub delivered: u32,
    pub failed: u32,
}

impl RetryQueueSummary {
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(Into::into)
    }
}

#[async_trait]
pub trait RetryQueue: Send + Sync {
    /// Attempt redelivery of every queued event and report the tally.
    async fn process_queue(&self) -> Result<RetryQueueSummary>;
}

/// Stands in until outbound delivery ships; every pass is empty.
pub struct NoopRetryQueue;

#[async_trait]
impl RetryQueue for NoopRetryQueue {
    async fn process_queue(&self) -> Result<RetryQueueSummary> {
        debug!("webhook retry queue has no deliverer wired, skipping");
        Ok(RetryQueueSummary::default())
    }
}
