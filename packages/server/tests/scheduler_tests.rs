//! Integration tests for the self-scheduling job loop.
//!
//! Drives the scheduler through its public surface against the in-memory
//! execution store:
//! - the background loop fires due jobs after start()
//! - per-attempt history, failure records, and reschedule backoff
//! - status snapshots and stats

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use serde_json::json;
use server_core::kernel::jobs::testing::TestExecutionStore;
use server_core::kernel::jobs::{ExecutionStatus, JobScheduler};

fn scheduler() -> (Arc<JobScheduler>, Arc<TestExecutionStore>) {
    let store = Arc::new(TestExecutionStore::new());
    (Arc::new(JobScheduler::new(store.clone())), store)
}

// =============================================================================
// Background loop
// =============================================================================

#[tokio::test(start_paused = true)]
async fn background_loop_fires_due_jobs_after_start() {
    let (scheduler, store) = scheduler();
    let runs = Arc::new(AtomicU32::new(0));
    {
        let runs = runs.clone();
        scheduler
            .register_job("heartbeat", None, move || {
                let runs = runs.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({}))
                }
            })
            .await;
    }

    scheduler.start();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(scheduler.is_running());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(store.executions().len(), 1);

    // After stop() the loop winds down and nothing else fires.
    scheduler.stop();
    tokio::time::sleep(std::time::Duration::from_secs(30)).await;

    assert!(!scheduler.is_running());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn handler_results_land_in_the_execution_history() {
    let (scheduler, store) = scheduler();
    scheduler
        .register_job("nightly_report", Some("0 3 * * *"), || async {
            Ok(json!({ "rows": 3 }))
        })
        .await;

    scheduler.poll_once().await;

    let executions = store.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].job_type, "nightly_report");
    assert_eq!(executions[0].status, ExecutionStatus::Completed);
    assert!(executions[0].is_finished());
    assert_eq!(executions[0].result.clone().unwrap()["rows"], 3);
}

#[tokio::test]
async fn failing_job_appends_a_failed_attempt_and_backs_off() {
    let (scheduler, store) = scheduler();
    scheduler
        .register_job("flaky_delivery", None, || async {
            Err(anyhow!("webhook endpoint returned 500"))
        })
        .await;

    scheduler.poll_once().await;

    // One dangling running attempt plus the failed record.
    let executions = store.executions_for("flaky_delivery");
    assert_eq!(executions.len(), 2);
    assert_eq!(executions[0].status, ExecutionStatus::Running);
    assert_eq!(executions[1].status, ExecutionStatus::Failed);
    assert_eq!(
        executions[1].error_message.as_deref(),
        Some("webhook endpoint returned 500")
    );

    // The retry sits a minute out, so an immediate poll finds nothing due.
    scheduler.poll_once().await;
    assert_eq!(store.executions_for("flaky_delivery").len(), 2);
}

// =============================================================================
// Snapshots
// =============================================================================

#[tokio::test]
async fn jobs_status_reports_registrations_and_recent_history() {
    let (scheduler, _store) = scheduler();
    scheduler
        .register_job("reconcile_payments", Some("*/2 * * * *"), || async {
            Ok(json!({}))
        })
        .await;
    scheduler
        .register_job("cleanup_old_events", Some("0 3 * * *"), || async {
            Ok(json!({}))
        })
        .await;

    scheduler.poll_once().await;
    let status = scheduler.jobs_status().await.unwrap();

    let types: Vec<&str> = status.jobs.iter().map(|j| j.job_type.as_str()).collect();
    assert_eq!(types, vec!["cleanup_old_events", "reconcile_payments"]);
    assert_eq!(status.jobs[0].schedule.as_deref(), Some("0 3 * * *"));
    assert!(status.jobs.iter().all(|j| j.last_run.is_some()));
    assert_eq!(status.recent_executions.len(), 2);

    // The snapshot serializes for the admin endpoint.
    let json = serde_json::to_value(&status).unwrap();
    assert!(json["jobs"].is_array());
    assert!(json["recent_executions"].is_array());
}

#[tokio::test]
async fn stats_count_attempts_by_status() {
    let (scheduler, _store) = scheduler();
    scheduler
        .register_job("steady", None, || async { Ok(json!({})) })
        .await;
    scheduler
        .register_job("broken", None, || async {
            Err(anyhow!("no database connection"))
        })
        .await;

    scheduler.poll_once().await;
    let stats = scheduler.jobs_stats().await.unwrap();

    // The failed job leaves its running attempt behind, so three records.
    assert_eq!(stats.total_runs, 3);
    assert_eq!(stats.successful, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.running, 1);
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn re_registering_a_job_type_replaces_the_handler() {
    let (scheduler, _store) = scheduler();
    let old_runs = Arc::new(AtomicU32::new(0));
    let new_runs = Arc::new(AtomicU32::new(0));

    {
        let old_runs = old_runs.clone();
        scheduler
            .register_job("sync", None, move || {
                let old_runs = old_runs.clone();
                async move {
                    old_runs.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({}))
                }
            })
            .await;
    }
    {
        let new_runs = new_runs.clone();
        scheduler
            .register_job("sync", None, move || {
                let new_runs = new_runs.clone();
                async move {
                    new_runs.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({}))
                }
            })
            .await;
    }

    scheduler.poll_once().await;

    assert_eq!(scheduler.registered_types().await, vec!["sync".to_string()]);
    assert_eq!(old_runs.load(Ordering::SeqCst), 0);
    assert_eq!(new_runs.load(Ordering::SeqCst), 1);
}
