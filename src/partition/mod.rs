//! Partition module
//!
//! Supports: one partition per input resource, fixed grid partitions
//!
//! # Overview
//!
//! A partitioned step fans one worker step out over N execution contexts:
//! - `Partitioner` - Produces the named partition contexts
//! - `MultiResourcePartitioner` - One partition per discovered file, ignoring
//!   the grid size so the partition count is data-driven
//! - `TaskExecutorPartitionHandler` - Runs partitions on tokio tasks, at most
//!   `max_workers` at a time
//! - `PartitionStep` - Creates and restarts partition executions and
//!   aggregates their outcome

mod handler;
mod partitioners;
mod step;
mod types;

pub use handler::TaskExecutorPartitionHandler;
pub use partitioners::{
    discover_matching, discover_resources, resources_to_partitions, MultiResourcePartitioner,
    SimplePartitioner,
};
pub use step::PartitionStep;
pub use types::{
    partition_name, Partitioner, DEFAULT_GRID_SIZE, FILE_NAME_KEY, MAX_DEFAULT_WORKERS,
};
