//! Webhook event persistence. The background engine only prunes the table;
//! ingestion and inspection live with the HTTP surface.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[async_trait]
pub trait WebhookEventStore: Send + Sync {
    /// Delete events received before `cutoff`; returns how many went away.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

// ============================================================================
// Postgres implementation
// ============================================================================

pub struct PostgresWebhookEventStore {
    pool: PgPool,
}

impl PostgresWebhookEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookEventStore for PostgresWebhookEventStore {
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM webhook_events WHERE received_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
