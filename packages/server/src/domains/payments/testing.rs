//! In-memory doubles for payment reconciliation tests.
//!
//! `TestPaymentStore` and `TestReconciliationStore` mirror the Postgres
//! stores' guarantees (open-payment filter, confirmed-row guard, append
//! semantics) over plain vectors. `FixedPixProvider` answers bank checks
//! from a script instead of rolling dice.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::bank_status::PixStatusProvider;
use super::models::{Payment, PaymentMethod, PixStatus, Reconciliation, ReconciliationStats};
use super::store::{PaymentStore, ReconciliationStore};

// ============================================================================
// TestPaymentStore
// ============================================================================

/// In-memory [`PaymentStore`] that tracks every mutation.
#[derive(Default)]
pub struct TestPaymentStore {
    payments: Mutex<Vec<Payment>>,
    fail_updates: Mutex<bool>,
}

impl TestPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a payment, builder-style.
    pub fn with_payment(self, payment: Payment) -> Self {
        self.payments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(payment);
        self
    }

    pub fn add_payment(&self, payment: Payment) {
        self.payments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(payment);
    }

    /// Make every status update fail with a storage error.
    pub fn set_fail_updates(&self, fail: bool) {
        *self.fail_updates.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    /// Current state of a payment by transaction id.
    pub fn get(&self, transaction_id: &str) -> Option<Payment> {
        self.payments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|p| p.transaction_id == transaction_id)
            .cloned()
    }

    fn check_writable(&self) -> Result<()> {
        if *self.fail_updates.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(anyhow!("payment store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for TestPaymentStore {
    async fn find_pending_pix(&self, created_after: DateTime<Utc>) -> Result<Vec<Payment>> {
        let mut open: Vec<Payment> = self
            .payments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|p| {
                p.method == PaymentMethod::Pix
                    && p.status.is_open()
                    && p.created_at >= created_after
            })
            .cloned()
            .collect();
        open.sort_by_key(|p| p.created_at);
        Ok(open)
    }

    async fn find_by_transaction_id(&self, transaction_id: &str) -> Result<Option<Payment>> {
        Ok(self.get(transaction_id))
    }

    async fn mark_confirmed(&self, id: Uuid, confirmed_at: DateTime<Utc>) -> Result<()> {
        self.check_writable()?;
        let mut payments = self.payments.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(payment) = payments.iter_mut().find(|p| p.id == id) {
            // Same semantics as the SQL guard: confirming twice is a no-op.
            let _ = payment.confirm(confirmed_at);
        }
        Ok(())
    }

    async fn mark_expired(&self, id: Uuid) -> Result<()> {
        self.check_writable()?;
        let mut payments = self.payments.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(payment) = payments.iter_mut().find(|p| p.id == id) {
            let _ = payment.expire(Utc::now());
        }
        Ok(())
    }
}

// ============================================================================
// TestReconciliationStore
// ============================================================================

/// In-memory [`ReconciliationStore`] keeping the audit rows in a vector.
#[derive(Default)]
pub struct TestReconciliationStore {
    rows: Mutex<Vec<Reconciliation>>,
    fail_appends: Mutex<bool>,
}

impl TestReconciliationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every append fail with a storage error.
    pub fn set_fail_appends(&self, fail: bool) {
        *self.fail_appends.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    /// All audit rows, in insertion order.
    pub fn rows(&self) -> Vec<Reconciliation> {
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Audit rows for one transaction, in insertion order.
    pub fn rows_for(&self, transaction_id: &str) -> Vec<Reconciliation> {
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.transaction_id == transaction_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ReconciliationStore for TestReconciliationStore {
    async fn append(&self, row: &Reconciliation) -> Result<()> {
        if *self.fail_appends.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(anyhow!("reconciliation store unavailable"));
        }
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(row.clone());
        Ok(())
    }

    async fn mark_reconciled(&self, id: Uuid, reconciled_at: DateTime<Utc>) -> Result<()> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.reconciled = true;
            row.reconciled_at = Some(reconciled_at);
        }
        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Reconciliation>> {
        let mut rows = self.rows();
        rows.sort_by(|a, b| b.checked_at.cmp(&a.checked_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn stats(&self) -> Result<ReconciliationStats> {
        let rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let reconciled = rows.iter().filter(|r| r.reconciled).count() as i64;
        let pending = rows.len() as i64 - reconciled;
        Ok(ReconciliationStats::from_reconciled_counts(&[
            (true, reconciled),
            (false, pending),
        ]))
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap_or_else(|e| e.into_inner());
        let before = rows.len();
        rows.retain(|r| r.checked_at >= cutoff);
        Ok((before - rows.len()) as u64)
    }
}

// ============================================================================
// FixedPixProvider
// ============================================================================

/// Scripted [`PixStatusProvider`]: answers come from a map instead of a bank.
#[derive(Default)]
pub struct FixedPixProvider {
    answers: HashMap<String, PixStatus>,
    fallback: Option<PixStatus>,
    failing: Vec<String>,
    checks: Mutex<Vec<String>>,
}

impl FixedPixProvider {
    /// Unscripted transactions answer [`PixStatus::NotFound`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Every transaction gets the same answer.
    pub fn always(status: PixStatus) -> Self {
        Self {
            fallback: Some(status),
            ..Self::default()
        }
    }

    /// Script one transaction's answer.
    pub fn with_status(mut self, transaction_id: &str, status: PixStatus) -> Self {
        self.answers.insert(transaction_id.to_string(), status);
        self
    }

    /// Make checks for one transaction fail outright.
    pub fn failing_for(mut self, transaction_id: &str) -> Self {
        self.failing.push(transaction_id.to_string());
        self
    }

    /// Transaction ids checked so far, in call order.
    pub fn checks(&self) -> Vec<String> {
        self.checks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl PixStatusProvider for FixedPixProvider {
    async fn check_status(&self, transaction_id: &str) -> Result<PixStatus> {
        self.checks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(transaction_id.to_string());

        if self.failing.iter().any(|id| id == transaction_id) {
            return Err(anyhow!("bank gateway timed out for {transaction_id}"));
        }
        if let Some(status) = self.answers.get(transaction_id) {
            return Ok(*status);
        }
        Ok(self.fallback.unwrap_or(PixStatus::NotFound))
    }
}
