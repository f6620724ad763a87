//! Execution-attempt model backing the `background_jobs` history table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "execution_status", rename_all = "snake_case")]
pub enum ExecutionStatus {
    #[default]
    Running,
    Completed,
    Failed,
}

// ============================================================================
// JobExecution Model
// ============================================================================

/// One row per execution attempt. Attempts are append-heavy: a successful
/// run updates its own row to `Completed`, while a failed run leaves its
/// `Running` row in place and records a separate `Failed` row.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct JobExecution {
    #[builder(default = Uuid::new_v4())]
    pub job_id: Uuid,

    pub job_type: String,

    #[builder(default)]
    pub status: ExecutionStatus,

    /// Handler summary payload, persisted on success.
    #[builder(default, setter(strip_option))]
    pub result: Option<serde_json::Value>,

    #[builder(default, setter(strip_option))]
    pub error_message: Option<String>,

    /// The instant the attempt was due, which can trail `started_at` when a
    /// poll pass runs late.
    #[builder(default = Utc::now())]
    pub scheduled_at: DateTime<Utc>,

    #[builder(default = Utc::now())]
    pub started_at: DateTime<Utc>,

    #[builder(default, setter(strip_option))]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobExecution {
    /// Record for an attempt that is about to run.
    pub fn started(job_type: &str, scheduled_at: DateTime<Utc>) -> Self {
        Self::builder()
            .job_type(job_type.to_string())
            .scheduled_at(scheduled_at)
            .build()
    }

    /// Standalone failure record for an attempt whose handler returned an
    /// error. Gets its own fresh `job_id`.
    pub fn failed(job_type: &str, scheduled_at: DateTime<Utc>, error: &str) -> Self {
        Self::builder()
            .job_type(job_type.to_string())
            .status(ExecutionStatus::Failed)
            .error_message(error.to_string())
            .scheduled_at(scheduled_at)
            .completed_at(Utc::now())
            .build()
    }

    /// Whether this attempt reached a terminal status.
    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            ExecutionStatus::Completed | ExecutionStatus::Failed
        )
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Counts over the full execution history, grouped by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub total_runs: i64,
    pub successful: i64,
    pub failed: i64,
    pub running: i64,
}

impl ExecutionStats {
    /// Fold `(status, count)` pairs, as produced by a GROUP BY over the
    /// history table, into the aggregate.
    pub fn from_status_counts(counts: &[(ExecutionStatus, i64)]) -> Self {
        let mut stats = Self::default();
        for (status, count) in counts {
            stats.total_runs += count;
            match status {
                ExecutionStatus::Completed => stats.successful += count,
                ExecutionStatus::Failed => stats.failed += count,
                ExecutionStatus::Running => stats.running += count,
            }
        }
        stats
    }
}
