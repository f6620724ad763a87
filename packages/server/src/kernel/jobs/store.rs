//! Persistence seam for the execution history.
//!
//! The scheduler talks to `background_jobs` only through [`ExecutionStore`],
//! so tests run against an in-memory double and the worker binary wires the
//! PostgreSQL implementation.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::execution::{ExecutionStats, ExecutionStatus, JobExecution};

/// Storage operations the scheduler performs against the execution history.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persist a freshly started attempt (status `running`).
    async fn insert(&self, execution: &JobExecution) -> Result<()>;

    /// Flip an attempt to `completed` and attach the handler's result.
    async fn mark_completed(
        &self,
        job_id: Uuid,
        result: &serde_json::Value,
        completed_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Most recent attempts, newest first.
    async fn recent(&self, limit: i64) -> Result<Vec<JobExecution>>;

    /// Counts over the whole history.
    async fn stats(&self) -> Result<ExecutionStats>;
}

/// PostgreSQL-backed execution history.
pub struct PostgresExecutionStore {
    pool: PgPool,
}

impl PostgresExecutionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExecutionStore for PostgresExecutionStore {
    async fn insert(&self, execution: &JobExecution) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO background_jobs (
                job_id, job_type, status, result, error_message,
                scheduled_at, started_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(execution.job_id)
        .bind(&execution.job_type)
        .bind(execution.status)
        .bind(&execution.result)
        .bind(&execution.error_message)
        .bind(execution.scheduled_at)
        .bind(execution.started_at)
        .bind(execution.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_completed(
        &self,
        job_id: Uuid,
        result: &serde_json::Value,
        completed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE background_jobs
            SET status = 'completed',
                result = $1,
                completed_at = $2
            WHERE job_id = $3
            "#,
        )
        .bind(result)
        .bind(completed_at)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<JobExecution>> {
        let executions = sqlx::query_as::<_, JobExecution>(
            r#"
            SELECT job_id, job_type, status, result, error_message,
                   scheduled_at, started_at, completed_at
            FROM background_jobs
            ORDER BY started_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(executions)
    }

    async fn stats(&self) -> Result<ExecutionStats> {
        let counts = sqlx::query_as::<_, (ExecutionStatus, i64)>(
            "SELECT status, COUNT(*) FROM background_jobs GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ExecutionStats::from_status_counts(&counts))
    }
}
