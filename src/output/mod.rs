//! Output module
//!
//! Chunk writers.
//!
//! # Overview
//!
//! - `RepositoryItemWriter` - Upserts customers into the credit store, one
//!   transaction per chunk
//! - `ListItemWriter` - Collects items in memory (dry runs and tests)

mod writer;

pub use writer::{ListItemWriter, RepositoryItemWriter};

#[cfg(test)]
mod tests;
