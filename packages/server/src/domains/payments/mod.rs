//! Payments domain - PIX payments and their reconciliation against the bank.

pub mod bank_status;
pub mod models;
pub mod reconciler;
pub mod store;
pub mod testing;

// Re-export models
pub use models::payment::{Payment, PaymentMethod, PaymentStatus, PaymentTransitionError};
pub use models::reconciliation::{PixStatus, Reconciliation, ReconciliationStats};

// Re-export the reconciliation engine
pub use bank_status::{PixStatusProvider, SimulatedBankClient};
pub use reconciler::{PaymentReconciler, ReconcileOutcome, SweepSummary};
pub use store::{
    PaymentStore, PostgresPaymentStore, PostgresReconciliationStore, ReconciliationStore,
};
