//! Append-only audit rows for reconciliation passes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use super::payment::{Payment, PaymentStatus};

// ============================================================================
// Enums
// ============================================================================

/// The bank's answer for a transaction, as stored on the audit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "pix_status", rename_all = "snake_case")]
pub enum PixStatus {
    Pending,
    Confirmed,
    Expired,
    Rejected,
    /// The bank has no record of the transaction.
    NotFound,
    /// The bank answered, but with an unusable response.
    Error,
}

impl PixStatus {
    /// Whether this answer closes the payment as unpaid.
    pub fn indicates_expiry(&self) -> bool {
        matches!(self, PixStatus::Expired | PixStatus::Rejected)
    }
}

// ============================================================================
// Reconciliation Model
// ============================================================================

/// One row per payment per sweep pass. The row belonging to the pass that
/// settled the payment is the one updated with `reconciled = true`; earlier
/// rows for the same transaction stay as plain audit history.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Reconciliation {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    pub transaction_id: String,

    #[builder(default, setter(strip_option))]
    pub booking_id: Option<Uuid>,

    pub payment_id: Uuid,

    pub pix_status_from_bank: PixStatus,

    /// Local payment status at the moment of the check.
    pub status_in_system: PaymentStatus,

    #[builder(default = Utc::now())]
    pub checked_at: DateTime<Utc>,

    #[builder(default = false)]
    pub reconciled: bool,

    #[builder(default, setter(strip_option))]
    pub reconciled_at: Option<DateTime<Utc>>,
}

impl Reconciliation {
    /// Audit row for the pass that just checked `payment`.
    pub fn for_check(payment: &Payment, bank_status: PixStatus, checked_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id: payment.transaction_id.clone(),
            booking_id: payment.booking_id,
            payment_id: payment.id,
            pix_status_from_bank: bank_status,
            status_in_system: payment.status,
            checked_at,
            reconciled: false,
            reconciled_at: None,
        }
    }

    /// A settled row whose stored bank answer closed the payment as unpaid.
    pub fn is_expired(&self) -> bool {
        self.pix_status_from_bank.indicates_expiry()
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Counts over the full audit history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationStats {
    pub total: i64,
    pub reconciled: i64,
    pub pending: i64,
}

impl ReconciliationStats {
    /// Fold `(reconciled, count)` pairs, as produced by a GROUP BY over the
    /// audit table, into the aggregate.
    pub fn from_reconciled_counts(counts: &[(bool, i64)]) -> Self {
        let mut stats = Self::default();
        for (reconciled, count) in counts {
            stats.total += count;
            if *reconciled {
                stats.reconciled += count;
            } else {
                stats.pending += count;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_check_copies_payment_identity() {
        let payment = Payment::builder()
            .transaction_id("tx-abc123")
            .booking_id(Uuid::new_v4())
            .amount_cents(9_000i64)
            .build();

        let row = Reconciliation::for_check(&payment, PixStatus::Pending, Utc::now());

        assert_eq!(row.transaction_id, "tx-abc123");
        assert_eq!(row.payment_id, payment.id);
        assert_eq!(row.booking_id, payment.booking_id);
        assert_eq!(row.status_in_system, PaymentStatus::Pending);
        assert!(!row.reconciled);
        assert!(row.reconciled_at.is_none());
    }

    #[test]
    fn expired_and_rejected_answers_indicate_expiry() {
        assert!(PixStatus::Expired.indicates_expiry());
        assert!(PixStatus::Rejected.indicates_expiry());
        assert!(!PixStatus::Confirmed.indicates_expiry());
        assert!(!PixStatus::Pending.indicates_expiry());
        assert!(!PixStatus::NotFound.indicates_expiry());
    }

    #[test]
    fn stats_fold_counts_by_reconciled_flag() {
        let stats = ReconciliationStats::from_reconciled_counts(&[(true, 4), (false, 6)]);
        assert_eq!(stats.total, 10);
        assert_eq!(stats.reconciled, 4);
        assert_eq!(stats.pending, 6);
    }
}
