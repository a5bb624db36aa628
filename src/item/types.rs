//! Item reader, processor and writer traits
//!
//! Defines the core abstractions a chunk step is assembled from.

use crate::error::Result;
use crate::state::ExecutionContext;
use async_trait::async_trait;

/// Result of processing one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome<O> {
    /// Pass the (possibly transformed) item on to the writer
    Emit(O),
    /// Drop the item; it is counted as skipped, not written
    Skip,
}

impl<O> ProcessOutcome<O> {
    /// Check if this outcome is a skip
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }

    /// Get the emitted item
    pub fn into_item(self) -> Option<O> {
        match self {
            Self::Emit(item) => Some(item),
            Self::Skip => None,
        }
    }
}

/// Lazy, ordered source of items
///
/// `read` returns `Ok(None)` at end of input. Readers are stateful and
/// owned by exactly one step execution.
#[async_trait]
pub trait ItemReader<T>: Send {
    /// Acquire resources and restore position from a saved context
    async fn open(&mut self, _context: &ExecutionContext) -> Result<()> {
        Ok(())
    }

    /// Read the next item
    async fn read(&mut self) -> Result<Option<T>>;

    /// Save the current position after a chunk commit
    fn update(&self, _context: &mut ExecutionContext) {}

    /// Release resources
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Maps one item to zero or one output items
///
/// Implementations must not have side effects outside the returned value so
/// that a retried chunk processes identically.
pub trait ItemProcessor<I, O>: Send + Sync {
    /// Process one item
    fn process(&self, item: &I) -> Result<ProcessOutcome<O>>;
}

impl<I, O, F> ItemProcessor<I, O> for F
where
    F: Fn(&I) -> Result<ProcessOutcome<O>> + Send + Sync,
{
    fn process(&self, item: &I) -> Result<ProcessOutcome<O>> {
        self(item)
    }
}

/// Persists a chunk of items atomically
#[async_trait]
pub trait ItemWriter<T>: Send + Sync {
    /// Write all items or none of them
    async fn write(&self, items: &[T]) -> Result<()>;
}
