//! Execution engine module
//!
//! Chunk-oriented step execution.
//!
//! # Overview
//!
//! The engine module provides:
//! - `Step` - A unit of work run by a job
//! - `ChunkStep` - Read, process and write items in fixed-size chunks, each
//!   chunk committed atomically
//! - `ChunkConfig` - Chunk size and write retry settings
//! - `ExecutionScope` - Repository, job execution and stop signal for a run

mod types;

pub use types::{
    ChunkConfig, ChunkOutcome, ExecutionScope, ReaderFactory, Step, DEFAULT_CHUNK_SIZE,
};

use crate::error::{Error, Result};
use crate::item::{ItemProcessor, ItemReader, ItemWriter, ProcessOutcome};
use crate::state::{BatchStatus, ExecutionContext, StepExecution};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// A step that drives reader -> processor -> writer in chunks
pub struct ChunkStep<I, O> {
    name: String,
    config: ChunkConfig,
    reader_factory: ReaderFactory<I>,
    processor: Arc<dyn ItemProcessor<I, O>>,
    writer: Arc<dyn ItemWriter<O>>,
}

impl<I, O> Clone for ChunkStep<I, O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            config: self.config,
            reader_factory: Arc::clone(&self.reader_factory),
            processor: Arc::clone(&self.processor),
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<I, O> std::fmt::Debug for ChunkStep<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStep")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<I, O> ChunkStep<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    /// Start building a chunk step
    pub fn builder(name: impl Into<String>) -> ChunkStepBuilder<I, O> {
        ChunkStepBuilder::new(name)
    }

    /// Chunk configuration
    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    /// Read, process and write one chunk
    ///
    /// Nothing is recorded on `execution` except rollbacks of failed write
    /// attempts; the caller applies the counts after a successful return.
    async fn run_chunk(
        &self,
        reader: &mut dyn ItemReader<I>,
        execution: &mut StepExecution,
    ) -> Result<ChunkOutcome> {
        let mut outcome = ChunkOutcome::default();
        let mut items = Vec::with_capacity(self.config.chunk_size);

        while items.len() < self.config.chunk_size {
            match reader.read().await? {
                Some(item) => items.push(item),
                None => {
                    outcome.exhausted = true;
                    break;
                }
            }
        }
        outcome.read = items.len() as u64;

        let mut output = Vec::with_capacity(items.len());
        for item in &items {
            match self.processor.process(item)? {
                ProcessOutcome::Emit(out) => output.push(out),
                ProcessOutcome::Skip => outcome.skipped += 1,
            }
        }

        if !output.is_empty() {
            self.write_with_retry(&output, execution).await?;
        }
        outcome.written = output.len() as u64;

        Ok(outcome)
    }

    async fn write_with_retry(&self, items: &[O], execution: &mut StepExecution) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.writer.write(items).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.config.write_retry_limit => {
                    attempt += 1;
                    execution.record_rollback();
                    tracing::warn!(
                        step = %execution.step_name,
                        attempt,
                        limit = self.config.write_retry_limit,
                        error = %e,
                        "Chunk write failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fail_before_first_chunk(
        &self,
        execution: &mut StepExecution,
        scope: &ExecutionScope,
        error: &Error,
    ) -> Result<()> {
        tracing::error!(
            step = %execution.step_name,
            fatal = error.is_fatal_at_open(),
            error = %error,
            "Step failed before the first chunk"
        );
        execution.add_failure(error.to_string());
        execution.finish(BatchStatus::Failed);
        scope.repository.update_step_execution(execution).await
    }
}

#[async_trait]
impl<I, O> Step for ChunkStep<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, execution: &mut StepExecution, scope: &ExecutionScope) -> Result<()> {
        let start = Instant::now();
        execution.mark_started();
        scope.repository.update_step_execution(execution).await?;

        tracing::info!(
            step = %execution.step_name,
            chunk_size = self.config.chunk_size,
            "Executing step"
        );

        let mut reader = match (self.reader_factory)(&execution.execution_context) {
            Ok(reader) => reader,
            Err(e) => return self.fail_before_first_chunk(execution, scope, &e).await,
        };
        if let Err(e) = reader.open(&execution.execution_context).await {
            return self.fail_before_first_chunk(execution, scope, &e).await;
        }

        let status = loop {
            if scope.is_stop_requested() {
                tracing::info!(step = %execution.step_name, "Stop requested, stopping at chunk boundary");
                break BatchStatus::Stopped;
            }

            match self.run_chunk(reader.as_mut(), execution).await {
                Ok(chunk) => {
                    if chunk.read > 0 {
                        execution.apply_chunk(chunk.read, chunk.written, chunk.skipped);
                        reader.update(&mut execution.execution_context);
                        scope.repository.update_step_execution(execution).await?;

                        tracing::debug!(
                            step = %execution.step_name,
                            read = chunk.read,
                            written = chunk.written,
                            skipped = chunk.skipped,
                            "Committed chunk"
                        );
                    }
                    if chunk.exhausted {
                        break BatchStatus::Completed;
                    }
                }
                Err(e) => {
                    execution.record_rollback();
                    execution.add_failure(e.to_string());
                    tracing::error!(
                        step = %execution.step_name,
                        error = %e,
                        "Chunk failed, rolled back"
                    );
                    break BatchStatus::Failed;
                }
            }
        };

        if let Err(e) = reader.close().await {
            tracing::warn!(step = %execution.step_name, error = %e, "Failed to close reader");
        }

        execution.finish(status);
        scope.repository.update_step_execution(execution).await?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "{}",
            execution.summary()
        );
        Ok(())
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ChunkStep`]
pub struct ChunkStepBuilder<I, O> {
    name: String,
    config: ChunkConfig,
    reader_factory: Option<ReaderFactory<I>>,
    processor: Option<Arc<dyn ItemProcessor<I, O>>>,
    writer: Option<Arc<dyn ItemWriter<O>>>,
}

impl<I, O> ChunkStepBuilder<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    /// Create a builder with default chunk configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: ChunkConfig::default(),
            reader_factory: None,
            processor: None,
            writer: None,
        }
    }

    /// Set the chunk size
    #[must_use]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the write retry limit
    #[must_use]
    pub fn write_retry_limit(mut self, limit: u32) -> Self {
        self.config.write_retry_limit = limit;
        self
    }

    /// Set the full chunk configuration
    #[must_use]
    pub fn config(mut self, config: ChunkConfig) -> Self {
        self.config = config;
        self
    }

    /// Build readers with a closure over the execution context
    #[must_use]
    pub fn reader<F, R>(mut self, factory: F) -> Self
    where
        F: Fn(&ExecutionContext) -> Result<R> + Send + Sync + 'static,
        R: ItemReader<I> + 'static,
    {
        self.reader_factory = Some(Arc::new(move |ctx: &ExecutionContext| {
            factory(ctx).map(|reader| Box::new(reader) as Box<dyn ItemReader<I>>)
        }));
        self
    }

    /// Use a prepared reader factory
    #[must_use]
    pub fn reader_factory(mut self, factory: ReaderFactory<I>) -> Self {
        self.reader_factory = Some(factory);
        self
    }

    /// Set the processor
    #[must_use]
    pub fn processor(mut self, processor: impl ItemProcessor<I, O> + 'static) -> Self {
        self.processor = Some(Arc::new(processor));
        self
    }

    /// Set the processor from a shared handle
    #[must_use]
    pub fn shared_processor(mut self, processor: Arc<dyn ItemProcessor<I, O>>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Set the writer
    #[must_use]
    pub fn writer(mut self, writer: impl ItemWriter<O> + 'static) -> Self {
        self.writer = Some(Arc::new(writer));
        self
    }

    /// Set the writer from a shared handle
    #[must_use]
    pub fn shared_writer(mut self, writer: Arc<dyn ItemWriter<O>>) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Build the step
    pub fn build(self) -> Result<ChunkStep<I, O>> {
        if self.config.chunk_size == 0 {
            return Err(Error::InvalidConfigValue {
                field: "chunk_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(ChunkStep {
            reader_factory: self
                .reader_factory
                .ok_or_else(|| Error::missing_field(format!("{}.reader", self.name)))?,
            processor: self
                .processor
                .ok_or_else(|| Error::missing_field(format!("{}.processor", self.name)))?,
            writer: self
                .writer
                .ok_or_else(|| Error::missing_field(format!("{}.writer", self.name)))?,
            name: self.name,
            config: self.config,
        })
    }
}
