//! Job module
//!
//! A job is an ordered list of steps run by the `JobLauncher`.
//!
//! # Overview
//!
//! - `Job` / `JobBuilder` - Named step sequence plus parameter validation
//! - `JobLauncher` - Validates parameters, creates or restarts the job
//!   instance, runs steps in order and records the outcome
//! - `JobParameters` - Typed launch parameters that identify a job instance

mod launcher;
mod parameters;
mod types;

pub use launcher::JobLauncher;
pub use parameters::{
    JobParameter, JobParameters, JobParametersBuilder, JobParametersValidator, ParameterType,
};
pub use types::{Job, JobBuilder};
