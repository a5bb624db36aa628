//! Execution types for tracking job progress
//!
//! These types are serialized to JSON and persisted between runs.

use crate::job::JobParameters;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Batch Status
// ============================================================================

/// Lifecycle status of a job or step execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// Execution finished successfully
    Completed,
    /// Execution created but not yet running
    Starting,
    /// Execution is running
    Started,
    /// Stop requested, waiting for a chunk boundary
    Stopping,
    /// Execution stopped on request
    Stopped,
    /// Execution failed
    Failed,
    /// Execution abandoned by an operator, never restarted
    Abandoned,
    /// Status could not be determined
    Unknown,
}

impl BatchStatus {
    /// Severity rank used when combining statuses
    fn rank(self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::Starting => 1,
            Self::Started => 2,
            Self::Stopping => 3,
            Self::Stopped => 4,
            Self::Failed => 5,
            Self::Abandoned => 6,
            Self::Unknown => 7,
        }
    }

    /// Return the more severe of two statuses
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }

    /// Check if the execution is still in flight
    pub fn is_running(self) -> bool {
        matches!(self, Self::Starting | Self::Started | Self::Stopping)
    }

    /// Check if the execution ended without completing
    pub fn is_unsuccessful(self) -> bool {
        matches!(self, Self::Failed | Self::Abandoned | Self::Unknown)
    }

    /// Check if an instance with this last status may be restarted
    pub fn is_restartable(self) -> bool {
        matches!(self, Self::Failed | Self::Stopped)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Completed => "COMPLETED",
            Self::Starting => "STARTING",
            Self::Started => "STARTED",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Failed => "FAILED",
            Self::Abandoned => "ABANDONED",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "COMPLETED" => Ok(Self::Completed),
            "STARTING" => Ok(Self::Starting),
            "STARTED" => Ok(Self::Started),
            "STOPPING" => Ok(Self::Stopping),
            "STOPPED" => Ok(Self::Stopped),
            "FAILED" => Ok(Self::Failed),
            "ABANDONED" => Ok(Self::Abandoned),
            "UNKNOWN" => Ok(Self::Unknown),
            _ => Err(format!("Invalid batch status: {s}")),
        }
    }
}

// ============================================================================
// Exit Status
// ============================================================================

/// Exit code plus a free-form description of the outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    /// Exit code (COMPLETED, FAILED, STOPPED, NOOP, EXECUTING, UNKNOWN)
    pub code: String,
    /// Description, usually the failure message
    #[serde(default)]
    pub description: String,
}

impl ExitStatus {
    fn with_code(code: &str) -> Self {
        Self {
            code: code.to_string(),
            description: String::new(),
        }
    }

    /// Successful completion
    pub fn completed() -> Self {
        Self::with_code("COMPLETED")
    }

    /// Failed execution
    pub fn failed() -> Self {
        Self::with_code("FAILED")
    }

    /// Stopped on request
    pub fn stopped() -> Self {
        Self::with_code("STOPPED")
    }

    /// Finished without doing anything
    pub fn noop() -> Self {
        Self::with_code("NOOP")
    }

    /// Still running
    pub fn executing() -> Self {
        Self::with_code("EXECUTING")
    }

    /// Unknown outcome
    pub fn unknown() -> Self {
        Self::with_code("UNKNOWN")
    }

    /// Exit status matching a terminal batch status
    pub fn from_status(status: BatchStatus) -> Self {
        match status {
            BatchStatus::Completed => Self::completed(),
            BatchStatus::Failed | BatchStatus::Abandoned => Self::failed(),
            BatchStatus::Stopped | BatchStatus::Stopping => Self::stopped(),
            BatchStatus::Starting | BatchStatus::Started => Self::executing(),
            BatchStatus::Unknown => Self::unknown(),
        }
    }

    /// Attach a description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    fn severity(&self) -> u8 {
        match self.code.as_str() {
            "EXECUTING" => 1,
            "COMPLETED" => 2,
            "NOOP" => 3,
            "STOPPED" => 4,
            "FAILED" => 5,
            _ => 6,
        }
    }

    /// Combine two exit statuses, keeping the more severe code
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        Self::executing()
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            f.write_str(&self.code)
        } else {
            write!(f, "{} ({})", self.code, self.description)
        }
    }
}

// ============================================================================
// Execution Context
// ============================================================================

/// Key/value state carried by a step execution
///
/// Holds partition assignments (e.g. `fileName`) and reader checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContext {
    entries: BTreeMap<String, Value>,
}

impl ExecutionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Put any JSON-convertible value
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style put
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put(key, value);
        self
    }

    /// Get a raw value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Get a string value
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    /// Get an integer value
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.entries.get(key).and_then(Value::as_i64)
    }

    /// Get an unsigned integer value
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.entries.get(key).and_then(Value::as_u64)
    }

    /// Check for a key
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a key
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Copy all entries from another context, overwriting duplicates
    pub fn merge(&mut self, other: &ExecutionContext) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Convert to a JSON object (for template rendering)
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

// ============================================================================
// Step Execution
// ============================================================================

/// Record of one step run, or of one partition's run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    /// Assigned by the job repository
    #[serde(default)]
    pub id: u64,
    /// Owning job execution
    pub job_execution_id: u64,
    /// Step name (`step1`, or `step1:partition0` for partitions)
    pub step_name: String,
    /// Partition name when this execution runs one partition
    #[serde(default)]
    pub partition_name: Option<String>,
    pub status: BatchStatus,
    pub exit_status: ExitStatus,
    #[serde(default)]
    pub read_count: u64,
    #[serde(default)]
    pub write_count: u64,
    #[serde(default)]
    pub skip_count: u64,
    #[serde(default)]
    pub commit_count: u64,
    #[serde(default)]
    pub rollback_count: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    /// Partition assignment and reader checkpoints
    #[serde(default)]
    pub execution_context: ExecutionContext,
    /// Failure messages in the order they happened
    #[serde(default)]
    pub failures: Vec<String>,
}

impl StepExecution {
    /// Create a new step execution in STARTING status
    pub fn new(step_name: impl Into<String>, job_execution_id: u64) -> Self {
        Self {
            id: 0,
            job_execution_id,
            step_name: step_name.into(),
            partition_name: None,
            status: BatchStatus::Starting,
            exit_status: ExitStatus::executing(),
            read_count: 0,
            write_count: 0,
            skip_count: 0,
            commit_count: 0,
            rollback_count: 0,
            start_time: None,
            end_time: None,
            last_updated: Utc::now(),
            execution_context: ExecutionContext::new(),
            failures: Vec::new(),
        }
    }

    /// Create a step execution for one partition of a partitioned step
    pub fn for_partition(
        step_name: &str,
        partition_name: impl Into<String>,
        job_execution_id: u64,
        context: ExecutionContext,
    ) -> Self {
        let partition_name = partition_name.into();
        let mut execution = Self::new(format!("{step_name}:{partition_name}"), job_execution_id);
        execution.partition_name = Some(partition_name);
        execution.execution_context = context;
        execution
    }

    /// Mark as running
    pub fn mark_started(&mut self) {
        let now = Utc::now();
        self.status = BatchStatus::Started;
        self.exit_status = ExitStatus::executing();
        self.start_time = Some(now);
        self.last_updated = now;
    }

    /// Add the counts of one committed chunk
    pub fn apply_chunk(&mut self, read: u64, written: u64, skipped: u64) {
        self.read_count += read;
        self.write_count += written;
        self.skip_count += skipped;
        self.commit_count += 1;
        self.last_updated = Utc::now();
    }

    /// Record a rolled back chunk
    pub fn record_rollback(&mut self) {
        self.rollback_count += 1;
        self.last_updated = Utc::now();
    }

    /// Record a failure message
    pub fn add_failure(&mut self, message: impl Into<String>) {
        self.failures.push(message.into());
    }

    /// Move to a terminal status
    pub fn finish(&mut self, status: BatchStatus) {
        let now = Utc::now();
        self.status = status;
        let exit = ExitStatus::from_status(status);
        self.exit_status = match self.failures.first() {
            Some(cause) if status.is_unsuccessful() => exit.with_description(cause.clone()),
            _ => exit,
        };
        self.end_time = Some(now);
        self.last_updated = now;
    }

    /// First failure, if any
    pub fn first_failure(&self) -> Option<&str> {
        self.failures.first().map(String::as_str)
    }

    /// Check the read = written + skipped invariant
    pub fn counts_balanced(&self) -> bool {
        self.read_count == self.write_count + self.skip_count
    }

    /// One-line summary for logs and the CLI
    pub fn summary(&self) -> String {
        format!(
            "{}: status={}, read={}, written={}, skipped={}, commits={}, rollbacks={}",
            self.step_name,
            self.status,
            self.read_count,
            self.write_count,
            self.skip_count,
            self.commit_count,
            self.rollback_count
        )
    }
}

// ============================================================================
// Job Execution
// ============================================================================

/// Record of one job invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecution {
    /// Assigned by the job repository
    pub id: u64,
    pub job_name: String,
    /// Job name plus identifying parameters; restarts share it
    pub instance_key: String,
    pub parameters: JobParameters,
    pub status: BatchStatus,
    pub exit_status: ExitStatus,
    pub create_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    /// Step executions, attached when read back from the repository
    #[serde(skip)]
    pub step_executions: Vec<StepExecution>,
}

impl JobExecution {
    /// Create a new job execution in STARTING status
    pub fn new(id: u64, job_name: impl Into<String>, parameters: JobParameters) -> Self {
        let job_name = job_name.into();
        let now = Utc::now();
        Self {
            id,
            instance_key: parameters.instance_key(&job_name),
            job_name,
            parameters,
            status: BatchStatus::Starting,
            exit_status: ExitStatus::unknown(),
            create_time: now,
            start_time: None,
            end_time: None,
            last_updated: now,
            step_executions: Vec::new(),
        }
    }

    /// Mark as running
    pub fn mark_started(&mut self) {
        let now = Utc::now();
        self.status = BatchStatus::Started;
        self.exit_status = ExitStatus::executing();
        self.start_time = Some(now);
        self.last_updated = now;
    }

    /// Move to a terminal status
    pub fn finish(&mut self, status: BatchStatus, exit_status: ExitStatus) {
        let now = Utc::now();
        self.status = status;
        self.exit_status = exit_status;
        self.end_time = Some(now);
        self.last_updated = now;
    }

    /// Top-level step executions (partition executions excluded)
    pub fn top_level_steps(&self) -> impl Iterator<Item = &StepExecution> {
        self.step_executions
            .iter()
            .filter(|s| s.partition_name.is_none())
    }

    /// Find a step execution by step name
    pub fn step(&self, step_name: &str) -> Option<&StepExecution> {
        self.step_executions
            .iter()
            .find(|s| s.step_name == step_name)
    }

    /// Total records read across top-level steps
    pub fn read_count(&self) -> u64 {
        self.top_level_steps().map(|s| s.read_count).sum()
    }

    /// Total records written across top-level steps
    pub fn write_count(&self) -> u64 {
        self.top_level_steps().map(|s| s.write_count).sum()
    }

    /// Total records skipped across top-level steps
    pub fn skip_count(&self) -> u64 {
        self.top_level_steps().map(|s| s.skip_count).sum()
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// Everything the job repository persists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub next_job_execution_id: u64,
    #[serde(default)]
    pub next_step_execution_id: u64,
    #[serde(default)]
    pub job_executions: BTreeMap<u64, JobExecution>,
    #[serde(default)]
    pub step_executions: BTreeMap<u64, StepExecution>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent execution of a job instance
    pub fn last_job_execution(&self, instance_key: &str) -> Option<&JobExecution> {
        self.job_executions
            .values()
            .filter(|e| e.instance_key == instance_key)
            .max_by_key(|e| e.id)
    }

    /// Step executions belonging to a job execution, in creation order
    pub fn steps_of(&self, job_execution_id: u64) -> Vec<StepExecution> {
        self.step_executions
            .values()
            .filter(|s| s.job_execution_id == job_execution_id)
            .cloned()
            .collect()
    }

    /// Most recent execution of a step within a job instance, from job
    /// executions created before `before_job_execution_id`
    pub fn last_step_execution(
        &self,
        instance_key: &str,
        step_name: &str,
        before_job_execution_id: u64,
    ) -> Option<&StepExecution> {
        let job_ids: Vec<u64> = self
            .job_executions
            .values()
            .filter(|e| e.instance_key == instance_key && e.id < before_job_execution_id)
            .map(|e| e.id)
            .collect();

        self.step_executions
            .values()
            .filter(|s| s.step_name == step_name && job_ids.contains(&s.job_execution_id))
            .max_by_key(|s| s.id)
    }
}
