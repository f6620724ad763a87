//! Worker dependencies (using traits for testability)
//!
//! This module provides the central dependency container handed to job
//! handlers. Persistence and the bank gateway sit behind traits so the whole
//! engine runs against in-memory doubles in tests.

use std::sync::Arc;

use chrono::Duration;
use sqlx::PgPool;

use crate::config::Config;
use crate::domains::bookings::{BookingStore, PostgresBookingStore};
use crate::domains::notifications::{NoopDispatcher, NotificationDispatcher};
use crate::domains::payments::{
    PaymentReconciler, PaymentStore, PixStatusProvider, PostgresPaymentStore,
    PostgresReconciliationStore, ReconciliationStore, SimulatedBankClient,
};
use crate::domains::webhooks::{
    NoopRetryQueue, PostgresWebhookEventStore, RetryQueue, WebhookEventStore,
};
use crate::kernel::jobs::{ExecutionStore, PostgresExecutionStore};

// =============================================================================
// WorkerDeps
// =============================================================================

/// Dependencies accessible to job handlers (using traits for testability)
#[derive(Clone)]
pub struct WorkerDeps {
    pub payments: Arc<dyn PaymentStore>,
    pub reconciliations: Arc<dyn ReconciliationStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub executions: Arc<dyn ExecutionStore>,
    pub webhook_events: Arc<dyn WebhookEventStore>,
    /// Authoritative PIX status source. Production wires the simulated bank
    /// until the real gateway integration lands.
    pub bank: Arc<dyn PixStatusProvider>,
    pub retry_queue: Arc<dyn RetryQueue>,
    pub notifications: Arc<dyn NotificationDispatcher>,
}

impl WorkerDeps {
    /// Wire every dependency against Postgres plus the simulated bank.
    pub fn postgres(pool: PgPool, config: &Config) -> Self {
        let payments: Arc<dyn PaymentStore> = Arc::new(PostgresPaymentStore::new(pool.clone()));
        let bank = SimulatedBankClient::new(payments.clone())
            .with_confirm_probability(config.pix_confirm_probability);

        Self {
            payments,
            reconciliations: Arc::new(PostgresReconciliationStore::new(pool.clone())),
            bookings: Arc::new(PostgresBookingStore::new(pool.clone())),
            executions: Arc::new(PostgresExecutionStore::new(pool.clone())),
            webhook_events: Arc::new(PostgresWebhookEventStore::new(pool)),
            bank: Arc::new(bank),
            retry_queue: Arc::new(NoopRetryQueue),
            notifications: Arc::new(NoopDispatcher),
        }
    }

    /// Build a reconciler over this dependency set.
    pub fn reconciler(&self, window: Duration) -> PaymentReconciler {
        PaymentReconciler::new(
            self.payments.clone(),
            self.reconciliations.clone(),
            self.bookings.clone(),
            self.bank.clone(),
        )
        .with_window(window)
    }
}
