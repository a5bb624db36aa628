//! Bounded partition handler

use super::types::MAX_DEFAULT_WORKERS;
use crate::engine::{ExecutionScope, Step};
use crate::error::{Error, Result};
use crate::state::{BatchStatus, StepExecution};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Runs each partition's worker step on its own tokio task
///
/// At most `max_workers` partitions run at once; the rest wait for a permit.
/// A failing partition never cancels its siblings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskExecutorPartitionHandler {
    max_workers: Option<usize>,
}

impl TaskExecutorPartitionHandler {
    /// Create a handler sized from the partition count
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap concurrent partitions
    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers.max(1));
        self
    }

    /// Worker count for a number of partitions
    ///
    /// Defaults to the partition count capped at [`MAX_DEFAULT_WORKERS`].
    pub fn effective_workers(&self, partitions: usize) -> usize {
        self.max_workers
            .unwrap_or_else(|| partitions.min(MAX_DEFAULT_WORKERS))
            .max(1)
    }

    /// Run every partition execution to a terminal status
    ///
    /// Returns the executions in partition name order. Executions must already
    /// be registered with the scope's repository.
    pub async fn handle(
        &self,
        worker: Arc<dyn Step>,
        executions: Vec<StepExecution>,
        scope: &ExecutionScope,
    ) -> Result<Vec<StepExecution>> {
        let workers = self.effective_workers(executions.len());
        let semaphore = Arc::new(Semaphore::new(workers));

        tracing::info!(
            step = worker.name(),
            partitions = executions.len(),
            workers,
            "Dispatching partitions"
        );

        let mut pending: BTreeMap<String, StepExecution> = BTreeMap::new();
        let mut join_set = JoinSet::new();

        for execution in executions {
            pending.insert(execution.step_name.clone(), execution.clone());

            let worker = Arc::clone(&worker);
            let semaphore = Arc::clone(&semaphore);
            let scope = scope.clone();
            let mut execution = execution;

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::partition(&execution.step_name, e.to_string()))?;
                worker.execute(&mut execution, &scope).await?;
                Ok::<_, Error>(execution)
            });
        }

        let mut finished: BTreeMap<String, StepExecution> = BTreeMap::new();
        let mut first_error = None;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(execution)) => {
                    tracing::debug!(
                        partition = %execution.step_name,
                        status = %execution.status,
                        "Partition finished"
                    );
                    finished.insert(execution.step_name.clone(), execution);
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Partition could not record its outcome");
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Partition task aborted");
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        // Partitions that never reported back are failed
        let mut results = Vec::with_capacity(pending.len());
        for (name, mut execution) in pending {
            match finished.remove(&name) {
                Some(done) => results.push(done),
                None => {
                    execution.add_failure(format!("Partition task for '{name}' aborted"));
                    execution.finish(BatchStatus::Failed);
                    scope.repository.update_step_execution(&execution).await?;
                    results.push(execution);
                }
            }
        }

        Ok(results)
    }
}
