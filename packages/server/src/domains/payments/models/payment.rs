//! Payment model. Rows are created by the checkout flow; the background
//! engine only moves open PIX payments to their terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use typed_builder::TypedBuilder;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    CreditCard,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Waiting,
    Confirmed,
    Expired,
    Rejected,
}

impl PaymentStatus {
    /// Whether reconciliation can still change this status.
    pub fn is_open(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Waiting)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// `confirmed` is terminal; no transition may leave it.
#[derive(Error, Debug)]
pub enum PaymentTransitionError {
    #[error("payment {transaction_id} is already confirmed")]
    AlreadyConfirmed { transaction_id: String },
}

// ============================================================================
// Payment Model
// ============================================================================

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Payment {
    #[builder(default = Uuid::new_v4())]
    pub id: Uuid,

    /// Bank-side identifier, unique per payment. Reconciliation joins on it.
    pub transaction_id: String,

    #[builder(default, setter(strip_option))]
    pub booking_id: Option<Uuid>,

    #[builder(default = PaymentMethod::Pix)]
    pub method: PaymentMethod,

    #[builder(default)]
    pub status: PaymentStatus,

    /// Amount in integer cents (BRL).
    pub amount_cents: i64,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,

    #[builder(default, setter(strip_option))]
    pub confirmed_at: Option<DateTime<Utc>>,

    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Apply the confirmed transition.
    pub fn confirm(&mut self, at: DateTime<Utc>) -> Result<(), PaymentTransitionError> {
        if self.status == PaymentStatus::Confirmed {
            return Err(PaymentTransitionError::AlreadyConfirmed {
                transaction_id: self.transaction_id.clone(),
            });
        }

        self.status = PaymentStatus::Confirmed;
        self.confirmed_at = Some(at);
        self.updated_at = at;
        Ok(())
    }

    /// Apply the expired transition. Allowed from any status except
    /// `confirmed`, which is never downgraded.
    pub fn expire(&mut self, at: DateTime<Utc>) -> Result<(), PaymentTransitionError> {
        if self.status == PaymentStatus::Confirmed {
            return Err(PaymentTransitionError::AlreadyConfirmed {
                transaction_id: self.transaction_id.clone(),
            });
        }

        self.status = PaymentStatus::Expired;
        self.updated_at = at;
        Ok(())
    }
}
