//! Job repository module
//!
//! Records job and step executions so runs can be reported on and restarted.
//!
//! # Overview
//!
//! The state module provides:
//! - `JobExecution` / `StepExecution` - Execution records with status and counts
//! - `ExecutionContext` - Partition assignments and reader checkpoints
//! - `JobRepository` - In-memory or file-based execution ledger

mod manager;
mod types;

pub use manager::JobRepository;
pub use types::{BatchStatus, ExecutionContext, ExitStatus, JobExecution, Ledger, StepExecution};
