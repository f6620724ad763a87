//! In-memory doubles for the webhook domain.

use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::WebhookEvent;
use super::retry::{RetryQueue, RetryQueueSummary};
use super::store::WebhookEventStore;

/// Holds webhook events in a vector so cleanup cutoffs can be asserted.
#[derive(Default)]
pub struct TestWebhookEventStore {
    events: Mutex<Vec<WebhookEvent>>,
}

impl TestWebhookEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event, builder-style.
    pub fn with_event(self, event: WebhookEvent) -> Self {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
        self
    }

    /// Events still held, in insertion order.
    pub fn events(&self) -> Vec<WebhookEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl WebhookEventStore for TestWebhookEventStore {
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let before = events.len();
        events.retain(|e| e.received_at >= cutoff);
        Ok((before - events.len()) as u64)
    }
}

/// Counts delivery passes and answers with a fixed summary.
#[derive(Default)]
pub struct TestRetryQueue {
    passes: Mutex<u32>,
    summary: RetryQueueSummary,
}

impl TestRetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every pass with `summary` instead of zeroes.
    pub fn with_summary(mut self, summary: RetryQueueSummary) -> Self {
        self.summary = summary;
        self
    }

    /// How many delivery passes ran.
    pub fn passes(&self) -> u32 {
        *self.passes.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RetryQueue for TestRetryQueue {
    async fn process_queue(&self) -> Result<RetryQueueSummary> {
        *self.passes.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(self.summary)
    }
}
