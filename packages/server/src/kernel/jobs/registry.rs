//! In-memory registry of self-scheduling jobs.
//!
//! The registry maps job type strings (e.g. "reconcile_payments") to:
//! - Handlers that execute the job logic
//! - Scheduling state (last run, next run, descriptive cron metadata)
//!
//! Definitions live in process memory only and are re-registered at worker
//! startup. Durable state is the per-attempt history in `background_jobs`,
//! never the registry itself.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Type alias for the async handler function.
///
/// Handlers take no arguments (collaborators are captured in the closure at
/// registration time) and return a JSON summary that is persisted as the
/// attempt's result.
pub type JobHandler = Arc<
    dyn Fn() -> Pin<Box<dyn Future<Output = Result<serde_json::Value>> + Send>> + Send + Sync,
>;

/// Registration entry: handler plus scheduling state.
#[derive(Clone)]
pub struct RegisteredJob {
    pub job_type: String,
    /// Cron expression kept as descriptive metadata. The actual cadence
    /// comes from the fixed reschedule offsets; the expression is stored,
    /// surfaced in status output, and never parsed.
    pub schedule: Option<String>,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: DateTime<Utc>,
    pub(crate) handler: JobHandler,
}

impl RegisteredJob {
    /// Invoke the handler.
    pub async fn run(&self) -> Result<serde_json::Value> {
        (self.handler)().await
    }
}

/// Read-only view of a job's scheduling state.
#[derive(Debug, Clone, Serialize)]
pub struct JobScheduleInfo {
    pub job_type: String,
    pub schedule: Option<String>,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: DateTime<Utc>,
}

/// Registry that maps job type strings to registered jobs.
///
/// Keyed by a `BTreeMap` so a poll pass visits due jobs in a stable order.
#[derive(Default)]
pub struct JobRegistry {
    registrations: BTreeMap<String, RegisteredJob>,
}

impl JobRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            registrations: BTreeMap::new(),
        }
    }

    /// Register a job type with its handler.
    ///
    /// A newly registered job is due immediately (`next_run` = now).
    /// Registering a job type that already exists replaces the earlier
    /// registration, scheduling state included.
    pub fn register<F, Fut>(&mut self, job_type: &str, schedule: Option<&str>, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        let boxed: JobHandler = Arc::new(move || Box::pin(handler()));

        self.registrations.insert(
            job_type.to_string(),
            RegisteredJob {
                job_type: job_type.to_string(),
                schedule: schedule.map(|s| s.to_string()),
                last_run: None,
                next_run: Utc::now(),
                handler: boxed,
            },
        );
    }

    /// Jobs with `next_run <= now`, in key order.
    pub fn due_jobs(&self, now: DateTime<Utc>) -> Vec<RegisteredJob> {
        self.registrations
            .values()
            .filter(|job| job.next_run <= now)
            .cloned()
            .collect()
    }

    /// Reschedule after a successful run: `last_run` advances and the next
    /// run is `finished_at + offset`.
    pub fn record_success(&mut self, job_type: &str, finished_at: DateTime<Utc>, offset: Duration) {
        if let Some(job) = self.registrations.get_mut(job_type) {
            job.last_run = Some(finished_at);
            job.next_run = finished_at + offset;
        }
    }

    /// Reschedule after a failed run. `last_run` only advances on success.
    pub fn record_failure(&mut self, job_type: &str, finished_at: DateTime<Utc>, offset: Duration) {
        if let Some(job) = self.registrations.get_mut(job_type) {
            job.next_run = finished_at + offset;
        }
    }

    /// Check if a job type is registered.
    pub fn is_registered(&self, job_type: &str) -> bool {
        self.registrations.contains_key(job_type)
    }

    /// Get all registered job types, in key order.
    pub fn registered_types(&self) -> Vec<String> {
        self.registrations.keys().cloned().collect()
    }

    /// Scheduling state of every registered job, in key order.
    pub fn snapshot(&self) -> Vec<JobScheduleInfo> {
        self.registrations
            .values()
            .map(|job| JobScheduleInfo {
                job_type: job.job_type.clone(),
                schedule: job.schedule.clone(),
                last_run: job.last_run,
                next_run: job.next_run,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn noop_job() -> Result<serde_json::Value> {
        Ok(serde_json::json!({}))
    }

    #[test]
    fn register_and_check() {
        let mut registry = JobRegistry::new();
        registry.register("reconcile_payments", Some("*/2 * * * *"), noop_job);

        assert!(registry.is_registered("reconcile_payments"));
        assert!(!registry.is_registered("unknown_job"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn new_registration_is_due_immediately() {
        let mut registry = JobRegistry::new();
        registry.register("cleanup_old_events", None, noop_job);

        let due = registry.due_jobs(Utc::now());
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].job_type, "cleanup_old_events");
        assert!(due[0].last_run.is_none());
    }

    #[test]
    fn reregistering_replaces_the_earlier_entry() {
        let mut registry = JobRegistry::new();
        registry.register("reconcile_payments", Some("*/2 * * * *"), noop_job);
        registry.record_success("reconcile_payments", Utc::now(), Duration::seconds(30));

        registry.register("reconcile_payments", Some("*/5 * * * *"), noop_job);

        assert_eq!(registry.len(), 1);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].schedule.as_deref(), Some("*/5 * * * *"));
        assert!(snapshot[0].last_run.is_none());
    }

    #[test]
    fn future_jobs_are_not_due() {
        let mut registry = JobRegistry::new();
        registry.register("send_pending_notifications", None, noop_job);
        let now = Utc::now();
        registry.record_success("send_pending_notifications", now, Duration::seconds(30));

        assert!(registry.due_jobs(now).is_empty());
        assert_eq!(registry.due_jobs(now + Duration::seconds(31)).len(), 1);
    }

    #[test]
    fn success_advances_last_run_and_next_run() {
        let mut registry = JobRegistry::new();
        registry.register("reconcile_payments", None, noop_job);

        let finished = Utc::now();
        registry.record_success("reconcile_payments", finished, Duration::seconds(30));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].last_run, Some(finished));
        assert_eq!(snapshot[0].next_run, finished + Duration::seconds(30));
    }

    #[test]
    fn failure_reschedules_without_touching_last_run() {
        let mut registry = JobRegistry::new();
        registry.register("reconcile_payments", None, noop_job);

        let finished = Utc::now();
        registry.record_failure("reconcile_payments", finished, Duration::seconds(60));

        let snapshot = registry.snapshot();
        assert!(snapshot[0].last_run.is_none());
        assert_eq!(snapshot[0].next_run, finished + Duration::seconds(60));
    }

    #[test]
    fn due_jobs_come_back_in_key_order() {
        let mut registry = JobRegistry::new();
        registry.register("send_pending_notifications", None, noop_job);
        registry.register("cleanup_old_events", None, noop_job);
        registry.register("reconcile_payments", None, noop_job);

        let order: Vec<String> = registry
            .due_jobs(Utc::now())
            .into_iter()
            .map(|job| job.job_type)
            .collect();
        assert_eq!(
            order,
            vec![
                "cleanup_old_events",
                "reconcile_payments",
                "send_pending_notifications"
            ]
        );
    }

    #[tokio::test]
    async fn handlers_produce_their_summary() {
        let mut registry = JobRegistry::new();
        registry.register("reconcile_payments", None, || async {
            Ok(serde_json::json!({ "total": 3 }))
        });

        let due = registry.due_jobs(Utc::now());
        let result = due[0].run().await.unwrap();
        assert_eq!(result["total"], 3);
    }
}
