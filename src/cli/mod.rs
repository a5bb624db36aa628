//! CLI module
//!
//! Command-line interface for running batch jobs.
//!
//! # Commands
//!
//! - `run` - Launch or restart a job
//! - `executions` - List recorded job executions
//! - `show` - Show one job execution and its steps
//! - `abandon` - Abandon a failed or stopped execution
//! - `validate` - Validate a job definition
//! - `list` - List built-in jobs

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
