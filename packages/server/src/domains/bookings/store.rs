//! Booking persistence. The reconciler is the only background writer; it
//! completes a booking when its payment is confirmed by the bank.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Move a booking to `completed`.
    async fn mark_completed(&self, id: Uuid) -> Result<()>;
}

// ============================================================================
// Postgres implementation
// ============================================================================

pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn mark_completed(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'completed', updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
