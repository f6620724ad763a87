//! Kernel module - worker infrastructure and dependencies.

pub mod deps;
pub mod jobs;

pub use deps::WorkerDeps;
