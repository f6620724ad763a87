//! Customer notification dispatch.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DispatchSummary {
    pub notifications_sent: u32,
}

impl DispatchSummary {
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(Into::into)
    }
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Send whatever is queued and report how many messages went out.
    async fn dispatch_pending(&self) -> Result<DispatchSummary>;
}

/// Stands in until a delivery channel ships; every pass sends nothing.
pub struct NoopDispatcher;

#[async_trait]
impl NotificationDispatcher for NoopDispatcher {
    async fn dispatch_pending(&self) -> Result<DispatchSummary> {
        debug!("no notification channel wired, skipping dispatch");
        Ok(DispatchSummary::default())
    }
}
