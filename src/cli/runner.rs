//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::database::CreditStore;
use crate::error::{Error, Result, ResultExt};
use crate::job::{JobLauncher, JobParameters};
use crate::jobs::list_builtin_info;
use crate::loader::{build_job, load_job, run_init_scripts, JobDefinition, ReaderDefinition};
use crate::state::{BatchStatus, JobExecution, JobRepository, StepExecution};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run {
                job,
                params,
                init_script,
                max_workers,
            } => self.run_job(job, params, init_script, *max_workers).await,
            Commands::Executions { job, limit } => {
                self.executions(job.as_deref(), *limit).await
            }
            Commands::Show { id } => self.show(*id).await,
            Commands::Abandon { id } => self.abandon(*id).await,
            Commands::Validate { job } => self.validate(job),
            Commands::List => self.list_jobs(),
        }
    }

    /// Open the job repository (ledger file or in-memory)
    fn repository(&self) -> Result<JobRepository> {
        match &self.cli.repository {
            Some(path) => JobRepository::from_file(path)
                .with_context(|| format!("Opening job repository '{}'", path.display())),
            None => Ok(JobRepository::in_memory()),
        }
    }

    /// Launch a job and report its execution
    async fn run_job(
        &self,
        job: &str,
        params: &[String],
        init_scripts: &[PathBuf],
        max_workers: Option<usize>,
    ) -> Result<()> {
        let start = Instant::now();
        let mut def = load_job(job)?;
        if let Some(max_workers) = max_workers {
            for step in &mut def.steps {
                if let Some(partition) = &mut step.partition {
                    partition.max_workers = Some(max_workers);
                }
            }
        }

        let parameters = JobParameters::parse_args(params)?;
        let store = CreditStore::from_location(&self.cli.db)
            .with_context(|| format!("Opening database '{}'", self.cli.db))?;

        run_init_scripts(&def, &store, definition_dir(job)).await?;
        for script in init_scripts {
            store.run_script_file(script).await?;
        }

        let built = build_job(&def, &store, &parameters)?;

        // Ctrl-C requests a graceful stop at the next chunk boundary
        let cancel = CancellationToken::new();
        let signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Stop requested, finishing current chunk");
                signal.cancel();
            }
        });

        let launcher = JobLauncher::new(self.repository()?).with_cancel(cancel);
        let execution = launcher.run(&built, parameters).await?;

        self.output_message(&json!({
            "type": "JOB_EXECUTION",
            "execution": execution_to_json(&execution, self.cli.verbose),
            "duration_ms": start.elapsed().as_millis() as u64
        }));

        match execution.status {
            BatchStatus::Completed => Ok(()),
            status => Err(Error::Other(format!(
                "Job '{}' finished with status {status}: {}",
                execution.job_name, execution.exit_status
            ))),
        }
    }

    /// List recorded executions
    async fn executions(&self, job: Option<&str>, limit: Option<usize>) -> Result<()> {
        let repository = self.repository()?;
        let executions: Vec<Value> = repository
            .find_job_executions(job)
            .await
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|e| execution_to_json(e, false))
            .collect();

        self.output_message(&json!({
            "type": "EXECUTIONS",
            "executions": executions
        }));

        Ok(())
    }

    /// Show one execution with every step and partition
    async fn show(&self, id: u64) -> Result<()> {
        let repository = self.repository()?;
        let execution = repository
            .get_job_execution(id)
            .await
            .ok_or_else(|| Error::repository(format!("Unknown job execution {id}")))?;

        self.output_message(&json!({
            "type": "JOB_EXECUTION",
            "execution": execution_to_json(&execution, true)
        }));

        Ok(())
    }

    /// Abandon an execution
    async fn abandon(&self, id: u64) -> Result<()> {
        let repository = self.repository()?;
        let execution = repository.abandon_job_execution(id).await?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Job execution {} of '{}' abandoned",
                    execution.id, execution.job_name
                )
            }
        }));

        Ok(())
    }

    /// Validate a job definition
    fn validate(&self, job: &str) -> Result<()> {
        let def = load_job(job)?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Job '{}' is valid with {} steps",
                    def.name,
                    def.steps.len()
                )
            },
            "job": definition_to_json(&def)
        }));

        Ok(())
    }

    /// List built-in jobs
    fn list_jobs(&self) -> Result<()> {
        let jobs: Vec<Value> = list_builtin_info()
            .into_iter()
            .map(|info| {
                json!({
                    "name": info.name,
                    "description": info.description,
                    "example_parameters": info.example_parameters
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "JOBS",
            "jobs": jobs
        }));

        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Directory relative init scripts resolve against: the definition file's
/// directory, or the working directory for built-in jobs
fn definition_dir(job: &str) -> PathBuf {
    Path::new(job)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

fn execution_to_json(execution: &JobExecution, with_steps: bool) -> Value {
    let mut value = json!({
        "id": execution.id,
        "job_name": execution.job_name,
        "parameters": execution.parameters.to_json(),
        "status": execution.status.to_string(),
        "exit_status": execution.exit_status,
        "read_count": execution.read_count(),
        "write_count": execution.write_count(),
        "skip_count": execution.skip_count(),
        "start_time": execution.start_time,
        "end_time": execution.end_time
    });
    if with_steps {
        let steps: Vec<Value> = execution.step_executions.iter().map(step_to_json).collect();
        value["steps"] = Value::Array(steps);
    }
    value
}

fn step_to_json(step: &StepExecution) -> Value {
    json!({
        "id": step.id,
        "step_name": step.step_name,
        "partition": step.partition_name,
        "status": step.status.to_string(),
        "read_count": step.read_count,
        "write_count": step.write_count,
        "skip_count": step.skip_count,
        "commit_count": step.commit_count,
        "rollback_count": step.rollback_count,
        "failures": step.failures,
        "context": step.execution_context.to_json()
    })
}

fn definition_to_json(def: &JobDefinition) -> Value {
    let steps: Vec<Value> = def
        .steps
        .iter()
        .map(|step| {
            let resource = match &step.reader {
                ReaderDefinition::Repository { threshold, .. } => threshold,
                ReaderDefinition::FlatFile { resource, .. } => resource,
            };
            json!({
                "name": step.name,
                "chunk_size": step.chunk_size,
                "reader": step.reader.type_name(),
                "source": resource,
                "partitioned": step.partition.is_some(),
                "worker": step.partition.as_ref().map(|p| p.worker_name(&step.name))
            })
        })
        .collect();

    json!({
        "name": def.name,
        "description": def.description,
        "parameters": def.parameter_names(),
        "steps": steps
    })
}
