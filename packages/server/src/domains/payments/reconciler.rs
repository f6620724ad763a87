//! Reconciliation sweep over open PIX payments.
//!
//! PIX settles out-of-band: the customer pays the QR code at their own bank
//! and our webhook may never arrive. The sweep is the safety net. It walks
//! every open PIX payment inside a lookback window, asks the bank for the
//! authoritative status, and settles whatever the bank has decided.
//!
//! Every check leaves an audit row in `payment_reconciliation`, including
//! the passes that change nothing.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::bank_status::PixStatusProvider;
use super::models::{Payment, PaymentStatus, PixStatus, Reconciliation, ReconciliationStats};
use super::store::{PaymentStore, ReconciliationStore};
use crate::domains::bookings::BookingStore;

// ============================================================================
// Results
// ============================================================================

/// Result of one full sweep, persisted as the job's execution result.
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub total: u32,
    pub reconciled: u32,
    pub failed: u32,
    pub checked_at: DateTime<Utc>,
}

impl SweepSummary {
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(Into::into)
    }
}

/// What one payment's check concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Bank confirmed; payment settled and the linked booking completed.
    Confirmed,
    /// Bank answered expired or rejected; payment closed as unpaid.
    Expired,
    /// Nothing to change this pass.
    Unchanged { reason: PixStatus },
    /// The check itself failed; the sweep moves on to the next payment.
    Failed { error: String },
}

// ============================================================================
// PaymentReconciler
// ============================================================================

/// Sweeps open PIX payments against the bank and settles what it can.
pub struct PaymentReconciler {
    payments: Arc<dyn PaymentStore>,
    log: Arc<dyn ReconciliationStore>,
    bookings: Arc<dyn BookingStore>,
    bank: Arc<dyn PixStatusProvider>,
    window: Duration,
}

impl PaymentReconciler {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        log: Arc<dyn ReconciliationStore>,
        bookings: Arc<dyn BookingStore>,
        bank: Arc<dyn PixStatusProvider>,
    ) -> Self {
        Self {
            payments,
            log,
            bookings,
            bank,
            window: Duration::hours(24),
        }
    }

    /// Override the sweep's lookback window.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Check every open PIX payment created inside the lookback window.
    ///
    /// Per-payment failures are contained; only the candidate query itself
    /// fails the sweep (and with it the job attempt).
    pub async fn reconcile_all(&self) -> Result<SweepSummary> {
        let checked_at = Utc::now();
        let candidates = self
            .payments
            .find_pending_pix(checked_at - self.window)
            .await
            .context("failed to load open pix payments")?;

        let mut summary = SweepSummary {
            total: candidates.len() as u32,
            reconciled: 0,
            failed: 0,
            checked_at,
        };

        for payment in &candidates {
            match self.reconcile_payment(payment).await {
                ReconcileOutcome::Confirmed | ReconcileOutcome::Expired => {
                    summary.reconciled += 1;
                }
                ReconcileOutcome::Unchanged { .. } => {}
                ReconcileOutcome::Failed { .. } => summary.failed += 1,
            }
        }

        info!(
            total = summary.total,
            reconciled = summary.reconciled,
            failed = summary.failed,
            "reconciliation sweep finished"
        );

        Ok(summary)
    }

    /// Check one payment against the bank and apply the matching transition.
    ///
    /// Never propagates an error: whatever goes wrong is logged and folded
    /// into [`ReconcileOutcome::Failed`] so the rest of the sweep proceeds.
    pub async fn reconcile_payment(&self, payment: &Payment) -> ReconcileOutcome {
        match self.check_and_settle(payment).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    transaction_id = %payment.transaction_id,
                    error = %e,
                    "payment reconciliation failed"
                );
                ReconcileOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn check_and_settle(&self, payment: &Payment) -> Result<ReconcileOutcome> {
        let bank_status = self.bank.check_status(&payment.transaction_id).await?;
        let checked_at = Utc::now();

        // Every pass leaves an audit row, settled or not.
        let row = Reconciliation::for_check(payment, bank_status, checked_at);
        self.log.append(&row).await?;

        match bank_status {
            PixStatus::Confirmed if payment.status != PaymentStatus::Confirmed => {
                self.payments.mark_confirmed(payment.id, checked_at).await?;
                if let Some(booking_id) = payment.booking_id {
                    self.bookings.mark_completed(booking_id).await?;
                }
                self.log.mark_reconciled(row.id, checked_at).await?;

                info!(
                    transaction_id = %payment.transaction_id,
                    "payment confirmed by bank"
                );
                Ok(ReconcileOutcome::Confirmed)
            }
            PixStatus::Expired | PixStatus::Rejected => {
                self.payments.mark_expired(payment.id).await?;
                self.log.mark_reconciled(row.id, checked_at).await?;

                info!(
                    transaction_id = %payment.transaction_id,
                    bank_status = ?bank_status,
                    "payment closed as unpaid"
                );
                Ok(ReconcileOutcome::Expired)
            }
            _ => {
                debug!(
                    transaction_id = %payment.transaction_id,
                    bank_status = ?bank_status,
                    "payment left untouched"
                );
                Ok(ReconcileOutcome::Unchanged {
                    reason: bank_status,
                })
            }
        }
    }

    /// Most recent audit rows, newest first.
    pub async fn history(&self, limit: i64) -> Result<Vec<Reconciliation>> {
        self.log.recent(limit).await
    }

    /// Counts over the whole audit history.
    pub async fn stats(&self) -> Result<ReconciliationStats> {
        self.log.stats().await
    }

    /// Delete audit rows checked more than `days_ago` days ago; returns how
    /// many were removed.
    pub async fn cleanup_old_records(&self, days_ago: i64) -> Result<u64> {
        let cutoff = Utc::now() - Duration::days(days_ago);
        let removed = self.log.delete_older_than(cutoff).await?;

        info!(days_ago, removed, "purged old reconciliation records");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::bookings::testing::TestBookingStore;
    use crate::domains::payments::testing::{
        FixedPixProvider, TestPaymentStore, TestReconciliationStore,
    };

    struct Fixture {
        payments: Arc<TestPaymentStore>,
        log: Arc<TestReconciliationStore>,
        bookings: Arc<TestBookingStore>,
        reconciler: PaymentReconciler,
    }

    fn fixture(payments: TestPaymentStore, bank: FixedPixProvider) -> Fixture {
        let payments = Arc::new(payments);
        let log = Arc::new(TestReconciliationStore::new());
        let bookings = Arc::new(TestBookingStore::new());
        let reconciler = PaymentReconciler::new(
            payments.clone(),
            log.clone(),
            bookings.clone(),
            Arc::new(bank),
        );
        Fixture {
            payments,
            log,
            bookings,
            reconciler,
        }
    }

    fn open_payment(transaction_id: &str) -> Payment {
        Payment::builder()
            .transaction_id(transaction_id)
            .booking_id(uuid::Uuid::new_v4())
            .amount_cents(20_000i64)
            .build()
    }

    #[tokio::test]
    async fn bank_confirmation_settles_payment_and_booking() {
        let payment = open_payment("tx-100");
        let booking_id = payment.booking_id.unwrap();
        let f = fixture(
            TestPaymentStore::new().with_payment(payment.clone()),
            FixedPixProvider::always(PixStatus::Confirmed),
        );

        let outcome = f.reconciler.reconcile_payment(&payment).await;

        assert_eq!(outcome, ReconcileOutcome::Confirmed);
        let stored = f
            .payments
            .get("tx-100")
            .expect("payment still in the store");
        assert_eq!(stored.status, PaymentStatus::Confirmed);
        assert!(stored.confirmed_at.is_some());
        assert_eq!(f.bookings.completed(), vec![booking_id]);

        let rows = f.log.rows();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].reconciled);
        assert_eq!(rows[0].pix_status_from_bank, PixStatus::Confirmed);
    }

    #[tokio::test]
    async fn bank_expiry_closes_payment_as_unpaid() {
        let payment = open_payment("tx-101");
        let f = fixture(
            TestPaymentStore::new().with_payment(payment.clone()),
            FixedPixProvider::always(PixStatus::Expired),
        );

        let outcome = f.reconciler.reconcile_payment(&payment).await;

        assert_eq!(outcome, ReconcileOutcome::Expired);
        assert_eq!(f.payments.get("tx-101").unwrap().status, PaymentStatus::Expired);
        assert!(f.bookings.completed().is_empty());

        let rows = f.log.rows();
        assert!(rows[0].reconciled);
        assert!(rows[0].is_expired());
    }

    #[tokio::test]
    async fn pending_answer_only_leaves_an_audit_row() {
        let payment = open_payment("tx-102");
        let f = fixture(
            TestPaymentStore::new().with_payment(payment.clone()),
            FixedPixProvider::always(PixStatus::Pending),
        );

        let outcome = f.reconciler.reconcile_payment(&payment).await;

        assert_eq!(
            outcome,
            ReconcileOutcome::Unchanged {
                reason: PixStatus::Pending
            }
        );
        assert_eq!(f.payments.get("tx-102").unwrap().status, PaymentStatus::Pending);

        let rows = f.log.rows();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].reconciled);
    }

    #[tokio::test]
    async fn provider_failure_is_contained() {
        let good = open_payment("tx-103");
        let bad = open_payment("tx-broken");
        let f = fixture(
            TestPaymentStore::new()
                .with_payment(bad.clone())
                .with_payment(good.clone()),
            FixedPixProvider::always(PixStatus::Confirmed).failing_for("tx-broken"),
        );

        let summary = f.reconciler.reconcile_all().await.unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.reconciled, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(f.payments.get("tx-103").unwrap().status, PaymentStatus::Confirmed);
        assert_eq!(f.payments.get("tx-broken").unwrap().status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn empty_sweep_reports_zeroes_and_writes_nothing() {
        let f = fixture(
            TestPaymentStore::new(),
            FixedPixProvider::always(PixStatus::Confirmed),
        );

        let summary = f.reconciler.reconcile_all().await.unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(summary.reconciled, 0);
        assert_eq!(summary.failed, 0);
        assert!(f.log.rows().is_empty());
    }

    #[tokio::test]
    async fn summary_serializes_with_snake_case_fields() {
        let summary = SweepSummary {
            total: 3,
            reconciled: 2,
            failed: 1,
            checked_at: Utc::now(),
        };

        let json = summary.to_json().unwrap();
        assert_eq!(json["total"], 3);
        assert_eq!(json["reconciled"], 2);
        assert_eq!(json["failed"], 1);
        assert!(json.get("checked_at").is_some());
    }
}
