//! Self-scheduling poll loop over the job registry.
//!
//! The `JobScheduler` is the single active thread of control in the worker:
//! - Polls the in-memory registry for due jobs every few seconds
//! - Runs due handlers sequentially, recording every attempt
//! - Reschedules each job a fixed offset after its run finishes
//!
//! # Architecture
//!
//! ```text
//! JobScheduler
//!     │
//!     ├─► Collect due jobs (registry, key order)
//!     ├─► Insert running attempt (ExecutionStore)
//!     ├─► Await handler
//!     └─► Success: update attempt to completed, next_run = finish + 30s
//!         Failure: insert separate failed attempt, next_run = finish + 60s
//! ```
//!
//! # Example
//!
//! ```ignore
//! let scheduler = Arc::new(JobScheduler::new(executions));
//! scheduler
//!     .register_job("reconcile_payments", Some("*/2 * * * *"), move || {
//!         let reconciler = reconciler.clone();
//!         async move { reconciler.reconcile_all().await?.to_json() }
//!     })
//!     .await;
//! scheduler.start();
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::execution::{ExecutionStats, JobExecution};
use super::registry::{JobRegistry, JobScheduleInfo, RegisteredJob};
use super::store::ExecutionStore;

/// Configuration for the scheduler loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How long to wait between poll passes
    pub poll_interval: Duration,
    /// Delay until a job runs again after a successful run
    pub success_offset: chrono::Duration,
    /// Delay until a job runs again after a failed run
    pub failure_offset: chrono::Duration,
    /// How many recent attempts `jobs_status` includes
    pub history_limit: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            success_offset: chrono::Duration::seconds(30),
            failure_offset: chrono::Duration::seconds(60),
            history_limit: 100,
        }
    }
}

/// Combined view for operational visibility: every registered job's
/// scheduling state plus the tail of the execution history.
#[derive(Debug, Clone, Serialize)]
pub struct JobsStatus {
    pub jobs: Vec<JobScheduleInfo>,
    pub recent_executions: Vec<JobExecution>,
}

/// Poll-based scheduler owning the job registry and the execution history.
///
/// One instance per worker process, explicitly constructed and shared as an
/// `Arc`. Handlers run sequentially within a pass; a slow handler delays the
/// jobs behind it rather than overlapping them.
pub struct JobScheduler {
    executions: Arc<dyn ExecutionStore>,
    registry: RwLock<JobRegistry>,
    running: AtomicBool,
    /// Incremented on every start so a loop surviving a stop/start cycle
    /// exits instead of doubling up.
    epoch: AtomicU64,
    config: SchedulerConfig,
}

impl JobScheduler {
    /// Create a scheduler with default configuration.
    pub fn new(executions: Arc<dyn ExecutionStore>) -> Self {
        Self::with_config(executions, SchedulerConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(executions: Arc<dyn ExecutionStore>, config: SchedulerConfig) -> Self {
        Self {
            executions,
            registry: RwLock::new(JobRegistry::new()),
            running: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            config,
        }
    }

    /// Register a job type with its handler.
    ///
    /// The job becomes due immediately; the schedule string is descriptive
    /// metadata only (see [`JobRegistry::register`]).
    pub async fn register_job<F, Fut>(&self, job_type: &str, schedule: Option<&str>, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        let mut registry = self.registry.write().await;
        registry.register(job_type, schedule, handler);
        info!(job_type = %job_type, schedule = ?schedule, "registered job");
    }

    /// All registered job types, in key order.
    pub async fn registered_types(&self) -> Vec<String> {
        self.registry.read().await.registered_types()
    }

    /// Whether the poll loop is live.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the poll loop on the tokio runtime.
    ///
    /// Idempotent: calling this while the loop is live logs and returns
    /// without spawning a second loop.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("scheduler already running, ignoring start");
            return;
        }

        let my_epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "scheduler starting"
        );

        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            scheduler.run_loop(my_epoch).await;
        });
    }

    /// Ask the loop to stop after the current pass.
    ///
    /// Cooperative: an in-flight handler is never interrupted, the flag is
    /// observed between iterations.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!("scheduler stop requested");
    }

    async fn run_loop(&self, my_epoch: u64) {
        loop {
            if !self.is_running() || self.epoch.load(Ordering::SeqCst) != my_epoch {
                break;
            }

            self.poll_once().await;

            tokio::time::sleep(self.config.poll_interval).await;
        }

        info!("scheduler stopped");
    }

    /// Run one poll pass: execute every due job sequentially, in registry
    /// key order.
    ///
    /// Public so embedders and tests can drive the scheduler without the
    /// timing loop.
    pub async fn poll_once(&self) {
        let now = Utc::now();
        let due = {
            let registry = self.registry.read().await;
            registry.due_jobs(now)
        };

        if due.is_empty() {
            return;
        }

        debug!(count = due.len(), "due jobs");

        for job in due {
            self.execute_job(&job).await;
        }
    }

    /// Execute one attempt and record it.
    ///
    /// A storage failure anywhere in the attempt takes the same path as a
    /// handler failure; a storage failure while recording that failure is
    /// logged and swallowed so one bad attempt cannot kill the loop.
    async fn execute_job(&self, job: &RegisteredJob) {
        let job_type = job.job_type.clone();

        debug!(job_type = %job_type, "executing job");

        let outcome = self.run_attempt(job).await;
        let finished_at = Utc::now();

        match outcome {
            Ok(()) => {
                info!(job_type = %job_type, "job succeeded");
                let mut registry = self.registry.write().await;
                registry.record_success(&job_type, finished_at, self.config.success_offset);
            }
            Err(e) => {
                warn!(job_type = %job_type, error = %e, "job failed");

                let failure = JobExecution::failed(&job_type, job.next_run, &e.to_string());
                if let Err(record_err) = self.executions.insert(&failure).await {
                    error!(
                        job_type = %job_type,
                        error = %record_err,
                        "failed to record job failure"
                    );
                }

                let mut registry = self.registry.write().await;
                registry.record_failure(&job_type, finished_at, self.config.failure_offset);
            }
        }
    }

    /// Insert the running record, await the handler, mark the record
    /// completed. The running record intentionally stays `running` when any
    /// of these steps fails; the failure is recorded separately.
    async fn run_attempt(&self, job: &RegisteredJob) -> Result<()> {
        let execution = JobExecution::started(&job.job_type, job.next_run);
        let job_id = execution.job_id;

        self.executions.insert(&execution).await?;

        let result = job.run().await?;

        self.executions
            .mark_completed(job_id, &result, Utc::now())
            .await?;

        Ok(())
    }

    /// Scheduling state of every job plus the recent execution history.
    pub async fn jobs_status(&self) -> Result<JobsStatus> {
        let jobs = {
            let registry = self.registry.read().await;
            registry.snapshot()
        };
        let recent_executions = self.executions.recent(self.config.history_limit).await?;

        Ok(JobsStatus {
            jobs,
            recent_executions,
        })
    }

    /// Counts over the whole execution history.
    pub async fn jobs_stats(&self) -> Result<ExecutionStats> {
        self.executions.stats().await
    }
}
