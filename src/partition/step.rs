//! Partitioned step

use super::handler::TaskExecutorPartitionHandler;
use super::types::{Partitioner, DEFAULT_GRID_SIZE};
use crate::engine::{ExecutionScope, Step};
use crate::error::Result;
use crate::state::{BatchStatus, ExecutionContext, StepExecution};
use std::collections::BTreeMap;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Fans a worker step out over the partitions of a [`Partitioner`]
///
/// Partition executions are named `<worker>:<partition>`. The manager
/// execution is COMPLETED only if every partition execution is COMPLETED.
/// Partition counts are summed onto the manager execution.
pub struct PartitionStep {
    name: String,
    worker: Arc<dyn Step>,
    partitioner: Arc<dyn Partitioner>,
    grid_size: usize,
    handler: TaskExecutorPartitionHandler,
}

impl PartitionStep {
    /// Create a partitioned step
    pub fn new(
        name: impl Into<String>,
        partitioner: impl Partitioner + 'static,
        worker: impl Step + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            worker: Arc::new(worker),
            partitioner: Arc::new(partitioner),
            grid_size: DEFAULT_GRID_SIZE,
            handler: TaskExecutorPartitionHandler::new(),
        }
    }

    /// Set the grid size hint passed to the partitioner
    #[must_use]
    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// Use a configured handler
    #[must_use]
    pub fn with_handler(mut self, handler: TaskExecutorPartitionHandler) -> Self {
        self.handler = handler;
        self
    }

    /// Cap concurrent partitions
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.handler = self.handler.with_max_workers(max_workers);
        self
    }

    /// Grid size hint
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Name of the step run inside each partition
    pub fn worker_name(&self) -> &str {
        self.worker.name()
    }

    /// Create this run's partition executions
    ///
    /// Partitions that completed in an earlier run of the same job instance
    /// are returned separately and not run again; others resume from their
    /// saved context.
    async fn prepare_partitions(
        &self,
        partitions: BTreeMap<String, ExecutionContext>,
        scope: &ExecutionScope,
    ) -> Result<(Vec<StepExecution>, Vec<StepExecution>)> {
        let mut to_run = Vec::with_capacity(partitions.len());
        let mut completed = Vec::new();

        for (partition, context) in partitions {
            let step_name = format!("{}:{partition}", self.worker.name());
            let previous = scope
                .repository
                .last_step_execution(&scope.job_execution, &step_name)
                .await;

            let context = match previous {
                Some(prev) if prev.status == BatchStatus::Completed => {
                    tracing::info!(partition = %step_name, "Skipping completed partition");
                    completed.push(prev);
                    continue;
                }
                Some(prev) => {
                    tracing::info!(partition = %step_name, "Restarting partition from saved context");
                    prev.execution_context
                }
                None => context,
            };

            let mut execution = StepExecution::for_partition(
                self.worker.name(),
                partition,
                scope.job_execution.id,
                context,
            );
            scope.repository.add_step_execution(&mut execution).await?;
            to_run.push(execution);
        }

        Ok((to_run, completed))
    }
}

#[async_trait]
impl Step for PartitionStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, execution: &mut StepExecution, scope: &ExecutionScope) -> Result<()> {
        let start = Instant::now();
        execution.mark_started();
        scope.repository.update_step_execution(execution).await?;

        let partitions = match self.partitioner.partition(self.grid_size) {
            Ok(partitions) => partitions,
            Err(e) => {
                tracing::error!(step = %self.name, error = %e, "Partitioning failed");
                execution.add_failure(e.to_string());
                execution.finish(BatchStatus::Failed);
                return scope.repository.update_step_execution(execution).await;
            }
        };
        let (to_run, completed) = self.prepare_partitions(partitions, scope).await?;

        let results = self
            .handler
            .handle(Arc::clone(&self.worker), to_run, scope)
            .await?;

        let mut status = BatchStatus::Completed;
        for result in &results {
            execution.read_count += result.read_count;
            execution.write_count += result.write_count;
            execution.skip_count += result.skip_count;
            execution.commit_count += result.commit_count;
            execution.rollback_count += result.rollback_count;
            status = status.max(result.status);

            if result.status != BatchStatus::Completed {
                let cause = result.first_failure().unwrap_or("no failure recorded");
                execution.add_failure(format!("{}: {cause}", result.step_name));
            }
        }

        let status = match status {
            BatchStatus::Completed => BatchStatus::Completed,
            BatchStatus::Stopped => BatchStatus::Stopped,
            _ => BatchStatus::Failed,
        };
        execution.finish(status);
        scope.repository.update_step_execution(execution).await?;

        tracing::info!(
            partitions = results.len() + completed.len(),
            reused = completed.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "{}",
            execution.summary()
        );
        Ok(())
    }
}
