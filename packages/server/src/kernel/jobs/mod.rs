//! Job infrastructure for self-scheduling background work.
//!
//! This module provides the kernel-level pieces of the engine:
//! - [`JobRegistry`] - Named jobs with their handlers and next-run times
//! - [`JobScheduler`] - Long-running poll loop that fires due jobs
//! - [`JobExecution`] - One execution attempt, persisted per run
//! - [`PostgresExecutionStore`] - Database-backed execution history
//!
//! # Architecture
//!
//! ```text
//! Worker registers handlers at boot
//!     │
//!     └─► JobRegistry (job_type → handler, next_run)
//!
//! JobScheduler
//!     │
//!     ├─► Poll registry every few seconds
//!     ├─► Insert a `running` JobExecution per due job
//!     ├─► Await the handler (one job at a time)
//!     └─► Record completed/failed and push next_run forward
//! ```
//!
//! # Domain-Specific Handlers
//!
//! Handlers live in their respective domains and are wired up by the worker
//! binary. This module only provides the infrastructure - business logic
//! stays in domains.

mod execution;
pub mod registry;
pub mod scheduler;
mod store;
pub mod testing;

pub use execution::{ExecutionStats, ExecutionStatus, JobExecution};
pub use registry::{JobHandler, JobRegistry, JobScheduleInfo, RegisteredJob};
pub use scheduler::{JobScheduler, JobsStatus, SchedulerConfig};
pub use store::{ExecutionStore, PostgresExecutionStore};
