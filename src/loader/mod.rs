//! YAML Loader module
//!
//! Parse job definitions from YAML files and build runnable jobs from them.
//!
//! # Overview
//!
//! The loader module provides:
//! - `JobDefinition` - Declarative job description
//! - `StepDefinition` - Reader, processor, writer and optional partitioning
//! - YAML parsing with validation
//! - `build_job` - Assemble a `Job` against a store and launch parameters

mod factory;
mod parser;
mod types;

pub use factory::{build_job, run_init_scripts, validator_for};
pub use parser::{load_job, load_job_from_str, validate_job};
pub use types::{
    JobDefinition, ParameterDefinition, PartitionDefinition, ProcessorDefinition,
    ReaderDefinition, StepDefinition, WriterDefinition,
};

#[cfg(test)]
mod tests;
