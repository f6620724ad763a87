//! Worker wiring: connects domain handlers to the job scheduler.
//!
//! Each job is registered under a stable type name with a cron string that
//! documents its intended cadence. The actual cadence comes from the
//! scheduler's reschedule offsets; the cron strings only annotate
//! `jobs_status()` output.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::kernel::jobs::JobScheduler;
use crate::kernel::WorkerDeps;

// ============================================================================
// Job types
// ============================================================================

pub const RECONCILE_PAYMENTS: &str = "reconcile_payments";
pub const PROCESS_WEBHOOK_QUEUE: &str = "process_webhook_queue";
pub const CLEANUP_OLD_EVENTS: &str = "cleanup_old_events";
pub const SEND_PENDING_NOTIFICATIONS: &str = "send_pending_notifications";

/// Result of the nightly cleanup job.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CleanupSummary {
    pub webhook_events_removed: u64,
    pub reconciliation_removed: u64,
}

impl CleanupSummary {
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(Into::into)
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Register the recurring jobs on the scheduler.
pub async fn register_jobs(scheduler: &Arc<JobScheduler>, deps: &WorkerDeps, config: &Config) {
    let reconciler = Arc::new(
        deps.reconciler(Duration::hours(config.reconciliation_window_hours)),
    );

    {
        let reconciler = reconciler.clone();
        scheduler
            .register_job(RECONCILE_PAYMENTS, Some("*/2 * * * *"), move || {
                let reconciler = reconciler.clone();
                async move {
                    let summary = reconciler.reconcile_all().await?;
                    summary.to_json()
                }
            })
            .await;
    }

    {
        let retry_queue = deps.retry_queue.clone();
        scheduler
            .register_job(PROCESS_WEBHOOK_QUEUE, Some("*/5 * * * *"), move || {
                let retry_queue = retry_queue.clone();
                async move {
                    let summary = retry_queue.process_queue().await?;
                    summary.to_json()
                }
            })
            .await;
    }

    {
        let webhook_events = deps.webhook_events.clone();
        let reconciler = reconciler.clone();
        let retention_days = config.retention_days;
        scheduler
            .register_job(CLEANUP_OLD_EVENTS, Some("0 3 * * *"), move || {
                let webhook_events = webhook_events.clone();
                let reconciler = reconciler.clone();
                async move {
                    let cutoff = Utc::now() - Duration::days(retention_days);
                    let summary = CleanupSummary {
                        webhook_events_removed: webhook_events.delete_older_than(cutoff).await?,
                        reconciliation_removed: reconciler.cleanup_old_records(retention_days).await?,
                    };
                    summary.to_json()
                }
            })
            .await;
    }

    {
        let notifications = deps.notifications.clone();
        scheduler
            .register_job(SEND_PENDING_NOTIFICATIONS, Some("*/10 * * * *"), move || {
                let notifications = notifications.clone();
                async move {
                    let summary = notifications.dispatch_pending().await?;
                    summary.to_json()
                }
            })
            .await;
    }

    let registered = scheduler.registered_types().await;
    info!(count = registered.len(), "background jobs registered");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::bookings::testing::TestBookingStore;
    use crate::domains::payments::testing::{
        FixedPixProvider, TestPaymentStore, TestReconciliationStore,
    };
    use crate::domains::payments::store::ReconciliationStore;
    use crate::domains::payments::{Payment, PaymentStatus, PixStatus, Reconciliation};
    use crate::domains::webhooks::testing::{TestRetryQueue, TestWebhookEventStore};
    use crate::domains::webhooks::WebhookEvent;
    use crate::domains::notifications::testing::TestNotificationDispatcher;
    use crate::kernel::jobs::testing::TestExecutionStore;
    use crate::kernel::jobs::ExecutionStatus;

    struct Fixture {
        scheduler: Arc<JobScheduler>,
        payments: Arc<TestPaymentStore>,
        log: Arc<TestReconciliationStore>,
        executions: Arc<TestExecutionStore>,
        webhook_events: Arc<TestWebhookEventStore>,
        retry_queue: Arc<TestRetryQueue>,
        notifications: Arc<TestNotificationDispatcher>,
    }

    async fn fixture(
        payments: TestPaymentStore,
        webhook_events: TestWebhookEventStore,
        bank: FixedPixProvider,
    ) -> Fixture {
        let payments = Arc::new(payments);
        let log = Arc::new(TestReconciliationStore::new());
        let executions = Arc::new(TestExecutionStore::new());
        let webhook_events = Arc::new(webhook_events);
        let retry_queue = Arc::new(TestRetryQueue::new());
        let notifications = Arc::new(TestNotificationDispatcher::new());

        let deps = WorkerDeps {
            payments: payments.clone(),
            reconciliations: log.clone(),
            bookings: Arc::new(TestBookingStore::new()),
            executions: executions.clone(),
            webhook_events: webhook_events.clone(),
            bank: Arc::new(bank),
            retry_queue: retry_queue.clone(),
            notifications: notifications.clone(),
        };

        let config = Config {
            database_url: "postgres://unused".to_string(),
            reconciliation_window_hours: 24,
            retention_days: 30,
            pix_confirm_probability: 0.3,
        };

        let scheduler = Arc::new(JobScheduler::new(executions.clone()));
        register_jobs(&scheduler, &deps, &config).await;

        Fixture {
            scheduler,
            payments,
            log,
            executions,
            webhook_events,
            retry_queue,
            notifications,
        }
    }

    #[tokio::test]
    async fn registers_the_recurring_jobs() {
        let f = fixture(
            TestPaymentStore::new(),
            TestWebhookEventStore::new(),
            FixedPixProvider::new(),
        )
        .await;

        assert_eq!(
            f.scheduler.registered_types().await,
            vec![
                CLEANUP_OLD_EVENTS.to_string(),
                PROCESS_WEBHOOK_QUEUE.to_string(),
                RECONCILE_PAYMENTS.to_string(),
                SEND_PENDING_NOTIFICATIONS.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn reconcile_job_settles_open_payments_end_to_end() {
        let payment = Payment::builder()
            .transaction_id("tx-worker-1")
            .amount_cents(12_500i64)
            .build();
        let f = fixture(
            TestPaymentStore::new().with_payment(payment),
            TestWebhookEventStore::new(),
            FixedPixProvider::always(PixStatus::Confirmed),
        )
        .await;

        f.scheduler.poll_once().await;

        assert_eq!(
            f.payments.get("tx-worker-1").unwrap().status,
            PaymentStatus::Confirmed
        );

        let runs = f.executions.executions_for(RECONCILE_PAYMENTS);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, ExecutionStatus::Completed);
        let result = runs[0].result.clone().unwrap();
        assert_eq!(result["total"], 1);
        assert_eq!(result["reconciled"], 1);
    }

    #[tokio::test]
    async fn webhook_and_notification_jobs_each_run_one_pass() {
        let f = fixture(
            TestPaymentStore::new(),
            TestWebhookEventStore::new(),
            FixedPixProvider::new(),
        )
        .await;

        f.scheduler.poll_once().await;

        assert_eq!(f.retry_queue.passes(), 1);
        assert_eq!(f.notifications.passes(), 1);
        assert_eq!(f.executions.executions().len(), 4);
    }

    #[tokio::test]
    async fn cleanup_job_removes_only_stale_rows() {
        let stale_event = WebhookEvent::builder()
            .event_type("payment.updated")
            .received_at(Utc::now() - Duration::days(31))
            .build();
        let fresh_event = WebhookEvent::builder()
            .event_type("payment.updated")
            .build();
        let f = fixture(
            TestPaymentStore::new(),
            TestWebhookEventStore::new()
                .with_event(stale_event)
                .with_event(fresh_event),
            FixedPixProvider::new(),
        )
        .await;

        let payment = Payment::builder()
            .transaction_id("tx-history")
            .amount_cents(9_900i64)
            .build();
        let stale_row = Reconciliation::builder()
            .transaction_id("tx-history")
            .payment_id(payment.id)
            .pix_status_from_bank(PixStatus::Pending)
            .status_in_system(PaymentStatus::Pending)
            .checked_at(Utc::now() - Duration::days(31))
            .build();
        f.log.append(&stale_row).await.unwrap();

        f.scheduler.poll_once().await;

        assert_eq!(f.webhook_events.events().len(), 1);
        assert!(f.log.rows().is_empty());

        let runs = f.executions.executions_for(CLEANUP_OLD_EVENTS);
        let result = runs[0].result.clone().unwrap();
        assert_eq!(result["webhook_events_removed"], 1);
        assert_eq!(result["reconciliation_removed"], 1);
    }
}
