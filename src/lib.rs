// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Solidafy Batch
//!
//! A minimal, Rust-native framework for chunk-oriented batch jobs.
//! Spring Batch style read-process-write steps, partitioned fan-out and
//! restartable executions on an embedded DuckDB store.
//!
//! ## Features
//!
//! - **Chunk Steps**: Read N items, process each, write the chunk in one transaction
//! - **Partitioned Steps**: One partition per input file, run on a bounded task pool
//! - **Restart**: Completed steps and partitions are skipped, others resume from
//!   their saved execution context
//! - **YAML Jobs**: Declarative job definitions with `{{ job.x }}` templates
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_batch::{build_job, load_job, CreditStore, JobLauncher, JobParameters, JobRepository, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = CreditStore::open("credits.duckdb")?;
//!     let def = load_job("credit-increase")?;
//!
//!     let params = JobParameters::builder().add_double("credit", 10000.0).build();
//!     let job = build_job(&def, &store, &params)?;
//!
//!     let execution = JobLauncher::new(JobRepository::in_memory())
//!         .run(&job, params)
//!         .await?;
//!     println!("{}: read {}", execution.status, execution.read_count());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          JobLauncher                            │
//! │  validate params → create/restart JobExecution → steps in order │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//!              ┌─────────────────┴─────────────────┐
//!              │                                   │
//!      ┌───────┴───────┐                 ┌─────────┴─────────┐
//!      │   ChunkStep   │◄── worker ──────│   PartitionStep   │
//!      │ read→process→ │                 │ partitioner +     │
//!      │ write / chunk │                 │ bounded task pool │
//!      └───────┬───────┘                 └───────────────────┘
//!              │
//! ┌────────────┼──────────────┬───────────────┬──────────────────┐
//! │ Pagination │    Decode    │     Item      │      Output      │
//! ├────────────┼──────────────┼───────────────┼──────────────────┤
//! │ Keyset     │ Flat file    │ Credit        │ Repository       │
//! │ repository │ tokenizer +  │ increase      │ upsert (DuckDB)  │
//! │ reader     │ mapper       │ Pass-through  │ In-memory list   │
//! └────────────┴──────────────┴───────────────┴──────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and the customer credit record
pub mod types;

/// Item reader, processor and writer traits
pub mod item;

/// Keyset-paginated repository reader
pub mod pagination;

/// Flat file tokenizing and mapping
pub mod decode;

/// Chunk writers
pub mod output;

/// Job repository and execution records
pub mod state;

/// Chunk step engine
pub mod engine;

/// Partitioned step execution
pub mod partition;

/// Jobs, parameters and the launcher
pub mod job;

/// YAML loader for job definitions
pub mod loader;

/// Template interpolation
pub mod template;

/// Command-line interface
pub mod cli;

/// Built-in job definitions
pub mod jobs;

/// Customer credit store on DuckDB
pub mod database;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use database::CreditStore;
pub use engine::{ChunkStep, Step};
pub use job::{Job, JobLauncher, JobParameters};
pub use loader::{build_job, load_job, load_job_from_str, JobDefinition};
pub use partition::PartitionStep;
pub use state::{BatchStatus, JobExecution, JobRepository, StepExecution};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
