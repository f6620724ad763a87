//! Settlement-status lookups against the PIX provider.
//!
//! The reconciliation engine asks one question: what does the bank say about
//! this transaction right now. [`SimulatedBankClient`] answers it from local
//! state plus randomness; a real provider client implements the same trait
//! against the settlement API without the engine noticing the swap.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use super::models::{PaymentStatus, PixStatus};
use super::store::PaymentStore;

/// Minutes a PIX QR code stays payable after checkout issues it.
const QR_CODE_TTL_MINUTES: i64 = 10;

/// Source of truth for PIX settlement status.
#[async_trait]
pub trait PixStatusProvider: Send + Sync {
    /// The bank's current answer for `transaction_id`.
    async fn check_status(&self, transaction_id: &str) -> Result<PixStatus>;
}

/// Stand-in for the settlement API, used in every environment until the real
/// bank integration lands.
///
/// Rules, in order:
/// - unknown transaction: `NotFound`
/// - older than the QR TTL and not already confirmed: `Expired`
/// - otherwise `Confirmed` with `confirm_probability`, else `Pending`
pub struct SimulatedBankClient {
    payments: Arc<dyn PaymentStore>,
    confirm_probability: f64,
}

impl SimulatedBankClient {
    pub fn new(payments: Arc<dyn PaymentStore>) -> Self {
        Self {
            payments,
            confirm_probability: 0.3,
        }
    }

    /// Override the per-check confirmation probability (clamped to 0..=1).
    pub fn with_confirm_probability(mut self, probability: f64) -> Self {
        self.confirm_probability = probability.clamp(0.0, 1.0);
        self
    }
}

#[async_trait]
impl PixStatusProvider for SimulatedBankClient {
    async fn check_status(&self, transaction_id: &str) -> Result<PixStatus> {
        let Some(payment) = self.payments.find_by_transaction_id(transaction_id).await? else {
            return Ok(PixStatus::NotFound);
        };

        let age = Utc::now() - payment.created_at;
        if age > chrono::Duration::minutes(QR_CODE_TTL_MINUTES)
            && payment.status != PaymentStatus::Confirmed
        {
            return Ok(PixStatus::Expired);
        }

        if fastrand::f64() < self.confirm_probability {
            Ok(PixStatus::Confirmed)
        } else {
            Ok(PixStatus::Pending)
        }
    }
}
