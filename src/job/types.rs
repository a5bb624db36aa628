//! Job definition

use super::parameters::JobParametersValidator;
use crate::engine::Step;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// An ordered sequence of steps
#[derive(Clone)]
pub struct Job {
    name: String,
    steps: Vec<Arc<dyn Step>>,
    validator: JobParametersValidator,
    restartable: bool,
}

impl Job {
    /// Start building a job
    pub fn builder(name: impl Into<String>) -> JobBuilder {
        JobBuilder::new(name)
    }

    /// Job name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Steps in execution order
    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }

    /// Step names in execution order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Parameter validator
    pub fn validator(&self) -> &JobParametersValidator {
        &self.validator
    }

    /// Whether a failed or stopped instance may be launched again
    pub fn is_restartable(&self) -> bool {
        self.restartable
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("steps", &self.step_names())
            .field("restartable", &self.restartable)
            .finish()
    }
}

/// Builder for [`Job`]
pub struct JobBuilder {
    name: String,
    steps: Vec<Arc<dyn Step>>,
    validator: JobParametersValidator,
    restartable: bool,
}

impl JobBuilder {
    /// Create a builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            validator: JobParametersValidator::new(),
            restartable: true,
        }
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Append a shared step
    #[must_use]
    pub fn shared_step(mut self, step: Arc<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    /// Set the parameter validator
    #[must_use]
    pub fn validator(mut self, validator: JobParametersValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Allow or forbid restarts
    #[must_use]
    pub fn restartable(mut self, restartable: bool) -> Self {
        self.restartable = restartable;
        self
    }

    /// Build the job
    pub fn build(self) -> Result<Job> {
        if self.steps.is_empty() {
            return Err(Error::EmptyJob { job: self.name });
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name()) {
                return Err(Error::config(format!(
                    "Job '{}' has duplicate step '{}'",
                    self.name,
                    step.name()
                )));
            }
        }

        Ok(Job {
            name: self.name,
            steps: self.steps,
            validator: self.validator,
            restartable: self.restartable,
        })
    }
}
