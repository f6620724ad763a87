//! Persistence seams for payments and the reconciliation audit.
//!
//! The reconciliation engine performs a deliberately small set of reads and
//! transitions; general payment CRUD belongs to the checkout flow and is not
//! exposed here.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{Payment, Reconciliation, ReconciliationStats};

/// Payment reads and transitions used by the reconciliation sweep.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Open PIX payments (`pending` or `waiting`) created at or after
    /// `created_after`, oldest first.
    async fn find_pending_pix(&self, created_after: DateTime<Utc>) -> Result<Vec<Payment>>;

    /// Look up one payment by its bank-side transaction id.
    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>>;

    /// Move a payment to `confirmed`. An already confirmed payment is left
    /// untouched.
    async fn mark_confirmed(&self, id: Uuid, confirmed_at: DateTime<Utc>) -> Result<()>;

    /// Move a payment to `expired`. Confirmed payments are never downgraded.
    async fn mark_expired(&self, id: Uuid) -> Result<()>;
}

/// Audit-log operations for reconciliation passes.
#[async_trait]
pub trait ReconciliationStore: Send + Sync {
    /// Append one audit row.
    async fn append(&self, row: &Reconciliation) -> Result<()>;

    /// Flag the row whose pass settled its payment.
    async fn mark_reconciled(&self, id: Uuid, reconciled_at: DateTime<Utc>) -> Result<()>;

    /// Most recent rows by `checked_at`, newest first.
    async fn recent(&self, limit: i64) -> Result<Vec<Reconciliation>>;

    /// Counts over the whole audit history.
    async fn stats(&self) -> Result<ReconciliationStats>;

    /// Delete rows checked before `cutoff`; returns how many were removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// PostgreSQL-backed payment access.
pub struct PostgresPaymentStore {
    pool: PgPool,
}

impl PostgresPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PostgresPaymentStore {
    async fn find_pending_pix(&self, created_after: DateTime<Utc>) -> Result<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, transaction_id, booking_id, method, status, amount_cents,
                   created_at, confirmed_at, updated_at
            FROM payments
            WHERE method = 'pix'
              AND status IN ('pending', 'waiting')
              AND created_at >= $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(created_after)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, transaction_id, booking_id, method, status, amount_cents,
                   created_at, confirmed_at, updated_at
            FROM payments
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn mark_confirmed(&self, id: Uuid, confirmed_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = 'confirmed',
                confirmed_at = $1,
                updated_at = NOW()
            WHERE id = $2
              AND status <> 'confirmed'
            "#,
        )
        .bind(confirmed_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_expired(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = 'expired',
                updated_at = NOW()
            WHERE id = $1
              AND status <> 'confirmed'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// PostgreSQL-backed reconciliation audit log.
pub struct PostgresReconciliationStore {
    pool: PgPool,
}

impl PostgresReconciliationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReconciliationStore for PostgresReconciliationStore {
    async fn append(&self, row: &Reconciliation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payment_reconciliation (
                id, transaction_id, booking_id, payment_id, pix_status_from_bank,
                status_in_system, checked_at, reconciled, reconciled_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(row.id)
        .bind(&row.transaction_id)
        .bind(row.booking_id)
        .bind(row.payment_id)
        .bind(row.pix_status_from_bank)
        .bind(row.status_in_system)
        .bind(row.checked_at)
        .bind(row.reconciled)
        .bind(row.reconciled_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_reconciled(&self, id: Uuid, reconciled_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE payment_reconciliation
            SET reconciled = TRUE,
                reconciled_at = $1
            WHERE id = $2
            "#,
        )
        .bind(reconciled_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Reconciliation>> {
        let rows = sqlx::query_as::<_, Reconciliation>(
            r#"
            SELECT id, transaction_id, booking_id, payment_id, pix_status_from_bank,
                   status_in_system, checked_at, reconciled, reconciled_at
            FROM payment_reconciliation
            ORDER BY checked_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn stats(&self) -> Result<ReconciliationStats> {
        let counts = sqlx::query_as::<_, (bool, i64)>(
            "SELECT reconciled, COUNT(*) FROM payment_reconciliation GROUP BY reconciled",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ReconciliationStats::from_reconciled_counts(&counts))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM payment_reconciliation WHERE checked_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(removed)
    }
}
