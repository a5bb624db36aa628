//! Job launcher
//!
//! Runs a job's steps in order against a job repository. A relaunch with the
//! same identifying parameters restarts the instance: steps that completed
//! in an earlier run are skipped and the others resume from their saved
//! execution context.

use super::parameters::JobParameters;
use super::types::Job;
use crate::engine::ExecutionScope;
use crate::error::{Error, Result};
use crate::state::{BatchStatus, ExitStatus, JobExecution, JobRepository, StepExecution};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Launches jobs and records their executions
#[derive(Debug, Clone)]
pub struct JobLauncher {
    repository: JobRepository,
    cancel: CancellationToken,
}

impl JobLauncher {
    /// Create a launcher over a job repository
    pub fn new(repository: JobRepository) -> Self {
        Self {
            repository,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an external stop signal (e.g. Ctrl-C)
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Job repository
    pub fn repository(&self) -> &JobRepository {
        &self.repository
    }

    /// Request a graceful stop; running steps stop at the next chunk boundary
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Run a job to completion, failure or stop
    ///
    /// Errors are returned when the job cannot be launched at all (invalid
    /// parameters, an instance that already completed or is still running)
    /// or the repository cannot record progress. Step failures are reported
    /// through the returned execution's status.
    pub async fn run(&self, job: &Job, parameters: JobParameters) -> Result<JobExecution> {
        job.validator().validate(&parameters)?;

        let previous = self
            .repository
            .last_job_execution(job.name(), &parameters)
            .await;
        if let Some(previous) = &previous {
            if !job.is_restartable() && previous.status.is_restartable() {
                return Err(Error::repository(format!(
                    "Job '{}' is not restartable",
                    job.name()
                )));
            }
        }

        let mut execution = self
            .repository
            .create_job_execution(job.name(), &parameters)
            .await?;
        execution.mark_started();
        self.repository.update_job_execution(&execution).await?;

        info!(
            job = %job.name(),
            execution_id = execution.id,
            parameters = %parameters,
            restart = previous.is_some(),
            "Job launched"
        );

        let started = Instant::now();
        let scope = ExecutionScope::new(self.repository.clone(), execution.clone())
            .with_cancel(self.cancel.clone());

        let (status, exit_status) = match self.run_steps(job, &scope).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(job = %job.name(), error = %e, "Job aborted by repository failure");
                execution.finish(
                    BatchStatus::Failed,
                    ExitStatus::failed().with_description(e.to_string()),
                );
                if let Err(update) = self.repository.update_job_execution(&execution).await {
                    warn!(
                        job = %job.name(),
                        execution_id = execution.id,
                        error = %update,
                        "Could not record failed job execution"
                    );
                }
                return Err(e);
            }
        };

        execution.finish(status, exit_status);
        self.repository.update_job_execution(&execution).await?;

        info!(
            job = %job.name(),
            execution_id = execution.id,
            status = %status,
            duration_ms = started.elapsed().as_millis() as u64,
            "Job finished"
        );

        self.repository
            .get_job_execution(execution.id)
            .await
            .ok_or_else(|| Error::repository(format!("Unknown job execution {}", execution.id)))
    }

    /// Run steps in order, stopping at the first one that does not complete
    async fn run_steps(
        &self,
        job: &Job,
        scope: &ExecutionScope,
    ) -> Result<(BatchStatus, ExitStatus)> {
        let job_execution = &scope.job_execution;

        for step in job.steps() {
            if scope.is_stop_requested() {
                info!(job = %job.name(), step = %step.name(), "Stop requested before step");
                return Ok((BatchStatus::Stopped, ExitStatus::stopped()));
            }

            let mut step_execution = StepExecution::new(step.name(), job_execution.id);
            match self
                .repository
                .last_step_execution(job_execution, step.name())
                .await
            {
                Some(last) if last.status == BatchStatus::Completed => {
                    info!(step = %step.name(), "Step already complete, skipping");
                    continue;
                }
                Some(last) => {
                    debug!(
                        step = %step.name(),
                        previous_status = %last.status,
                        "Restarting step from saved context"
                    );
                    step_execution.execution_context = last.execution_context;
                }
                None => {}
            }

            self.repository
                .add_step_execution(&mut step_execution)
                .await?;
            info!(step = %step.name(), "Executing step");

            step.execute(&mut step_execution, scope).await?;

            match step_execution.status {
                BatchStatus::Completed => {}
                BatchStatus::Stopped => {
                    return Ok((BatchStatus::Stopped, step_execution.exit_status));
                }
                _ => {
                    return Ok((BatchStatus::Failed, step_execution.exit_status));
                }
            }
        }

        Ok((BatchStatus::Completed, ExitStatus::completed()))
    }
}
