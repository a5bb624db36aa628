//! Item processing module
//!
//! Readers produce items, processors transform them, writers persist chunks.
//!
//! # Overview
//!
//! - `ItemReader` - Lazy, ordered source with checkpoint support
//! - `ItemProcessor` - Pure per-item transform that may skip
//! - `ItemWriter` - Atomic chunk sink
//!
//! Concrete readers live in `pagination` (repository) and `decode` (flat files);
//! writers live in `output`.

mod processors;
mod types;

pub use processors::{CreditIncreaseProcessor, PassThroughProcessor, FIXED_AMOUNT};
pub use types::{ItemProcessor, ItemReader, ItemWriter, ProcessOutcome};

#[cfg(test)]
mod tests;
