//! Engine types
//!
//! Step abstraction, chunk configuration and the per-run execution scope.

use crate::error::Result;
use crate::item::ItemReader;
use crate::state::{ExecutionContext, JobExecution, JobRepository, StepExecution};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Default number of items per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Builds a fresh reader for one step execution from its context
///
/// Partitioned steps call the factory once per partition with that
/// partition's context (for example its `fileName`).
pub type ReaderFactory<I> =
    Arc<dyn Fn(&ExecutionContext) -> Result<Box<dyn ItemReader<I>>> + Send + Sync>;

/// A unit of work inside a job
#[async_trait]
pub trait Step: Send + Sync {
    /// Step name, unique within its job
    fn name(&self) -> &str;

    /// Run the step, recording progress and outcome on `execution`
    ///
    /// Step failures are recorded on the execution (status FAILED) rather
    /// than returned; an `Err` means the job repository itself failed.
    async fn execute(&self, execution: &mut StepExecution, scope: &ExecutionScope) -> Result<()>;
}

/// Chunk processing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Items read and written per transaction
    pub chunk_size: usize,
    /// Extra attempts for a chunk write failing with a retryable error
    pub write_retry_limit: u32,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            write_retry_limit: 0,
        }
    }
}

impl ChunkConfig {
    /// Create a config with a chunk size
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            ..Default::default()
        }
    }

    /// Set the write retry limit
    #[must_use]
    pub fn with_write_retry_limit(mut self, limit: u32) -> Self {
        self.write_retry_limit = limit;
        self
    }
}

/// Everything a step needs from the surrounding job run
#[derive(Debug, Clone)]
pub struct ExecutionScope {
    /// Ledger the step persists its progress to
    pub repository: JobRepository,
    /// Owning job execution
    pub job_execution: JobExecution,
    /// Cooperative stop signal, checked at chunk boundaries
    pub cancel: CancellationToken,
}

impl ExecutionScope {
    /// Create a scope with a fresh stop signal
    pub fn new(repository: JobRepository, job_execution: JobExecution) -> Self {
        Self {
            repository,
            job_execution,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an existing stop signal
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Check whether a stop was requested
    pub fn is_stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Counts of one chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkOutcome {
    /// Items read
    pub read: u64,
    /// Items written
    pub written: u64,
    /// Items the processor skipped
    pub skipped: u64,
    /// Reader reached end of input
    pub exhausted: bool,
}
