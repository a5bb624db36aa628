//! Partition types and traits
//!
//! Defines the core partition abstractions.

use crate::error::Result;
use crate::state::ExecutionContext;
use std::collections::BTreeMap;

/// Grid size hint used when none is configured
pub const DEFAULT_GRID_SIZE: usize = 2;

/// Upper bound on the default worker count
pub const MAX_DEFAULT_WORKERS: usize = 4;

/// Context key holding a partition's input resource
pub const FILE_NAME_KEY: &str = "fileName";

/// Name of the partition at `index` (`partition0`, `partition1`, ...)
pub fn partition_name(index: usize) -> String {
    format!("partition{index}")
}

/// Trait for partitioners
pub trait Partitioner: Send + Sync {
    /// Produce partition contexts keyed by partition name
    ///
    /// `grid_size` is a hint; implementations may ignore it.
    fn partition(&self, grid_size: usize) -> Result<BTreeMap<String, ExecutionContext>>;
}
