//! Job repository implementation
//!
//! Provides file-based execution ledger persistence with atomic writes.

use super::types::{BatchStatus, ExitStatus, JobExecution, Ledger, StepExecution};
use crate::error::{Error, Result};
use crate::job::JobParameters;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Job repository for persisting and loading job/step executions
#[derive(Debug)]
pub struct JobRepository {
    /// Path to the ledger file
    path: PathBuf,
    /// Current ledger (cached)
    ledger: Arc<RwLock<Ledger>>,
    /// Whether to auto-save on every update
    auto_save: bool,
    /// Serializes file writes from concurrent partitions
    save_lock: Arc<Mutex<()>>,
}

impl JobRepository {
    /// Create a new job repository with the given path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ledger: Arc::new(RwLock::new(Ledger::new())),
            auto_save: true,
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create a job repository with auto-save disabled
    pub fn without_auto_save(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ledger: Arc::new(RwLock::new(Ledger::new())),
            auto_save: false,
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create an in-memory job repository (no file persistence)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            ledger: Arc::new(RwLock::new(Ledger::new())),
            auto_save: false,
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create a job repository from a file, loading an existing ledger if present
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let ledger = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| {
                Error::repository(format!("Failed to read ledger file: {e}"))
            })?;
            serde_json::from_str(&contents).map_err(|e| {
                Error::repository(format!("Failed to parse ledger file: {e}"))
            })?
        } else {
            Ledger::new()
        };

        Ok(Self {
            path,
            ledger: Arc::new(RwLock::new(ledger)),
            auto_save: true,
            save_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Load ledger from file
    pub async fn load(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::repository(format!("Failed to read ledger file: {e}")))?;

        let loaded: Ledger = serde_json::from_str(&contents)
            .map_err(|e| Error::repository(format!("Failed to parse ledger file: {e}")))?;

        let mut ledger = self.ledger.write().await;
        *ledger = loaded;

        Ok(())
    }

    /// Save current ledger to file
    pub async fn save(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(()); // In-memory mode
        }

        let _guard = self.save_lock.lock().await;
        let contents = {
            let ledger = self.ledger.read().await;
            serde_json::to_string_pretty(&*ledger)
                .map_err(|e| Error::repository(format!("Failed to serialize ledger: {e}")))?
        };

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::repository(format!("Failed to write ledger file: {e}")))?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::repository(format!("Failed to rename ledger file: {e}")))?;

        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        if self.auto_save {
            self.save().await?;
        }
        Ok(())
    }

    /// Export the ledger as pretty-printed JSON string
    pub async fn to_json_pretty(&self) -> Result<String> {
        let ledger = self.ledger.read().await;
        serde_json::to_string_pretty(&*ledger)
            .map_err(|e| Error::repository(format!("Failed to serialize ledger: {e}")))
    }

    // ========================================================================
    // Job executions
    // ========================================================================

    /// Most recent execution of the job instance identified by name + parameters
    pub async fn last_job_execution(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Option<JobExecution> {
        let key = parameters.instance_key(job_name);
        let ledger = self.ledger.read().await;
        ledger.last_job_execution(&key).map(|e| {
            let mut execution = e.clone();
            execution.step_executions = ledger.steps_of(e.id);
            execution
        })
    }

    /// Create a new job execution, refusing to start a running or completed instance
    pub async fn create_job_execution(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> Result<JobExecution> {
        let execution = {
            let mut ledger = self.ledger.write().await;
            let key = parameters.instance_key(job_name);

            if let Some(last) = ledger.last_job_execution(&key) {
                if last.status.is_running() {
                    return Err(Error::JobExecutionAlreadyRunning {
                        job: job_name.to_string(),
                    });
                }
                if last.status == BatchStatus::Completed {
                    return Err(Error::JobInstanceAlreadyComplete {
                        job: job_name.to_string(),
                    });
                }
                if last.status == BatchStatus::Abandoned {
                    return Err(Error::repository(format!(
                        "Job '{job_name}' instance was abandoned and cannot be restarted"
                    )));
                }
            }

            ledger.next_job_execution_id += 1;
            let execution =
                JobExecution::new(ledger.next_job_execution_id, job_name, parameters.clone());
            ledger.job_executions.insert(execution.id, execution.clone());
            execution
        };

        self.persist().await?;
        Ok(execution)
    }

    /// Persist changes to a job execution
    pub async fn update_job_execution(&self, execution: &JobExecution) -> Result<()> {
        {
            let mut ledger = self.ledger.write().await;
            if !ledger.job_executions.contains_key(&execution.id) {
                return Err(Error::repository(format!(
                    "Unknown job execution {}",
                    execution.id
                )));
            }
            let mut stored = execution.clone();
            stored.step_executions.clear();
            ledger.job_executions.insert(execution.id, stored);
        }

        self.persist().await
    }

    /// Get a job execution with its step executions attached
    pub async fn get_job_execution(&self, id: u64) -> Option<JobExecution> {
        let ledger = self.ledger.read().await;
        ledger.job_executions.get(&id).map(|e| {
            let mut execution = e.clone();
            execution.step_executions = ledger.steps_of(id);
            execution
        })
    }

    /// All executions of a job, newest first (all jobs when name is None)
    pub async fn find_job_executions(&self, job_name: Option<&str>) -> Vec<JobExecution> {
        let ledger = self.ledger.read().await;
        let mut executions: Vec<JobExecution> = ledger
            .job_executions
            .values()
            .filter(|e| job_name.map_or(true, |name| e.job_name == name))
            .map(|e| {
                let mut execution = e.clone();
                execution.step_executions = ledger.steps_of(e.id);
                execution
            })
            .collect();
        executions.sort_by(|a, b| b.id.cmp(&a.id));
        executions
    }

    /// Mark a stopped or failed execution as abandoned so it is never restarted
    pub async fn abandon_job_execution(&self, id: u64) -> Result<JobExecution> {
        let execution = {
            let mut ledger = self.ledger.write().await;
            let execution = ledger
                .job_executions
                .get_mut(&id)
                .ok_or_else(|| Error::repository(format!("Unknown job execution {id}")))?;
            if execution.status == BatchStatus::Completed {
                return Err(Error::repository(format!(
                    "Job execution {id} completed and cannot be abandoned"
                )));
            }
            execution.finish(BatchStatus::Abandoned, ExitStatus::failed());
            execution.clone()
        };

        self.persist().await?;
        Ok(execution)
    }

    // ========================================================================
    // Step executions
    // ========================================================================

    /// Register a step execution and assign its id
    pub async fn add_step_execution(&self, execution: &mut StepExecution) -> Result<()> {
        {
            let mut ledger = self.ledger.write().await;
            ledger.next_step_execution_id += 1;
            execution.id = ledger.next_step_execution_id;
            ledger
                .step_executions
                .insert(execution.id, execution.clone());
        }

        self.persist().await
    }

    /// Persist changes to a step execution (counts, status, context)
    pub async fn update_step_execution(&self, execution: &StepExecution) -> Result<()> {
        {
            let mut ledger = self.ledger.write().await;
            if !ledger.step_executions.contains_key(&execution.id) {
                return Err(Error::repository(format!(
                    "Unknown step execution {} ({})",
                    execution.id, execution.step_name
                )));
            }
            ledger
                .step_executions
                .insert(execution.id, execution.clone());
        }

        self.persist().await
    }

    /// Most recent execution of a step in an earlier run of the same job instance
    pub async fn last_step_execution(
        &self,
        job_execution: &JobExecution,
        step_name: &str,
    ) -> Option<StepExecution> {
        let ledger = self.ledger.read().await;
        ledger
            .last_step_execution(&job_execution.instance_key, step_name, job_execution.id)
            .cloned()
    }

    /// Step executions of a job execution
    pub async fn step_executions(&self, job_execution_id: u64) -> Vec<StepExecution> {
        let ledger = self.ledger.read().await;
        ledger.steps_of(job_execution_id)
    }

    /// Remove all executions
    pub async fn remove_job_executions(&self) -> Result<()> {
        {
            let mut ledger = self.ledger.write().await;
            *ledger = Ledger::new();
        }

        self.persist().await
    }

    /// Get the ledger file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

impl Clone for JobRepository {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            ledger: Arc::clone(&self.ledger),
            auto_save: self.auto_save,
            save_lock: Arc::clone(&self.save_lock),
        }
    }
}
