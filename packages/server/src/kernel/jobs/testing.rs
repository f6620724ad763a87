//! Job testing utilities.
//!
//! In-memory [`ExecutionStore`] double so scheduler behavior can be tested
//! without a database.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::execution::{ExecutionStats, ExecutionStatus, JobExecution};
use super::store::ExecutionStore;

/// In-memory execution history.
///
/// Attempts are kept in insertion order. `set_fail_writes(true)` makes every
/// write return an error, for exercising the scheduler's containment paths.
#[derive(Default)]
pub struct TestExecutionStore {
    executions: Mutex<Vec<JobExecution>>,
    fail_writes: Mutex<bool>,
}

impl TestExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    /// All recorded attempts, in insertion order.
    pub fn executions(&self) -> Vec<JobExecution> {
        self.executions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Attempts for one job type, in insertion order.
    pub fn executions_for(&self, job_type: &str) -> Vec<JobExecution> {
        self.executions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|execution| execution.job_type == job_type)
            .cloned()
            .collect()
    }

    /// Drop all recorded attempts.
    pub fn clear(&self) {
        self.executions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn check_writable(&self) -> Result<()> {
        if *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(anyhow!("execution store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for TestExecutionStore {
    async fn insert(&self, execution: &JobExecution) -> Result<()> {
        self.check_writable()?;
        self.executions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(execution.clone());
        Ok(())
    }

    async fn mark_completed(
        &self,
        job_id: Uuid,
        result: &serde_json::Value,
        completed_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_writable()?;
        let mut executions = self.executions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(execution) = executions.iter_mut().find(|e| e.job_id == job_id) {
            execution.status = ExecutionStatus::Completed;
            execution.result = Some(result.clone());
            execution.completed_at = Some(completed_at);
        }
        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<JobExecution>> {
        let mut executions = self
            .executions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        executions.truncate(limit as usize);
        Ok(executions)
    }

    async fn stats(&self) -> Result<ExecutionStats> {
        let executions = self.executions.lock().unwrap_or_else(|e| e.into_inner());
        let mut stats = ExecutionStats::default();
        for execution in executions.iter() {
            stats.total_runs += 1;
            match execution.status {
                ExecutionStatus::Completed => stats.successful += 1,
                ExecutionStatus::Failed => stats.failed += 1,
                ExecutionStatus::Running => stats.running += 1,
            }
        }
        Ok(stats)
    }
}
