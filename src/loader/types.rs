//! Loader types
//!
//! Declarative job definition types for YAML parsing.

use crate::job::ParameterType;
use serde::{Deserialize, Serialize};

// ============================================================================
// Job Definition
// ============================================================================

/// Top-level job definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JobDefinition {
    /// Job name
    pub name: String,
    /// Human readable summary
    #[serde(default)]
    pub description: String,
    /// Whether a failed or stopped instance may be relaunched
    #[serde(default = "default_true")]
    pub restartable: bool,
    /// Declared job parameters
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
    /// SQL scripts run against the store before launch (schema, seed data)
    #[serde(default)]
    pub init_scripts: Vec<String>,
    /// Steps in execution order
    pub steps: Vec<StepDefinition>,
}

impl JobDefinition {
    /// Names of the declared parameters
    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }
}

/// A declared job parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(rename = "type", default = "default_parameter_type")]
    pub parameter_type: ParameterType,
    #[serde(default = "default_true")]
    pub required: bool,
}

fn default_true() -> bool {
    true
}

fn default_parameter_type() -> ParameterType {
    ParameterType::String
}

// ============================================================================
// Step Definition
// ============================================================================

/// One chunk step, optionally partitioned
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StepDefinition {
    /// Step name (the manager step name when partitioned)
    pub name: String,
    /// Items per transaction
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Retries for a chunk whose write failed transiently
    #[serde(default)]
    pub write_retry_limit: u32,
    pub reader: ReaderDefinition,
    #[serde(default)]
    pub processor: ProcessorDefinition,
    #[serde(default)]
    pub writer: WriterDefinition,
    /// Fan the step out over partitions
    #[serde(default)]
    pub partition: Option<PartitionDefinition>,
}

fn default_chunk_size() -> usize {
    crate::engine::DEFAULT_CHUNK_SIZE
}

// ============================================================================
// Reader Definition
// ============================================================================

/// Item reader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReaderDefinition {
    /// Customers with credit above a threshold, paged from the store
    Repository {
        /// Threshold, usually `{{ job.credit }}`
        threshold: String,
        #[serde(default = "default_page_size")]
        page_size: usize,
        /// Checkpoint key prefix
        #[serde(default)]
        name: Option<String>,
    },
    /// `id,name,credit` lines from a flat file
    FlatFile {
        /// File path, usually `{{ partition.fileName }}`
        resource: String,
        #[serde(default = "default_delimiter")]
        delimiter: char,
        #[serde(default)]
        lines_to_skip: usize,
        /// Reject lines with the wrong number of fields
        #[serde(default = "default_true")]
        strict: bool,
        #[serde(default)]
        name: Option<String>,
    },
}

impl ReaderDefinition {
    /// Reader type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Repository { .. } => "repository",
            Self::FlatFile { .. } => "flat_file",
        }
    }
}

fn default_page_size() -> usize {
    crate::pagination::DEFAULT_PAGE_SIZE
}

fn default_delimiter() -> char {
    ','
}

// ============================================================================
// Processor / Writer Definitions
// ============================================================================

/// Item processor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessorDefinition {
    /// Add a fixed amount to each customer's credit
    CreditIncrease {
        /// Amount as a decimal string (default 5)
        #[serde(default)]
        amount: Option<String>,
    },
    /// Hand items to the writer unchanged
    #[default]
    PassThrough,
}

/// Item writer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WriterDefinition {
    /// Upsert into the credit store
    #[default]
    Repository,
    /// Keep written items in memory (dry run)
    Memory,
}

// ============================================================================
// Partition Definition
// ============================================================================

/// Partitioned execution of a step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PartitionDefinition {
    /// Worker step name; partition executions are named `<worker>:partition<i>`
    #[serde(default)]
    pub worker: Option<String>,
    /// File paths or `dir/*.csv` patterns, one partition per matching file
    #[serde(default)]
    pub resources: Vec<String>,
    /// Context key each resource is stored under
    #[serde(default = "default_partition_key")]
    pub key: String,
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,
    /// Concurrent partitions (default: partition count capped at 4)
    #[serde(default)]
    pub max_workers: Option<usize>,
}

impl PartitionDefinition {
    /// Worker step name, defaulting to `<step>Worker`
    pub fn worker_name(&self, step_name: &str) -> String {
        self.worker
            .clone()
            .unwrap_or_else(|| format!("{step_name}Worker"))
    }
}

fn default_partition_key() -> String {
    crate::partition::FILE_NAME_KEY.to_string()
}

fn default_grid_size() -> usize {
    crate::partition::DEFAULT_GRID_SIZE
}
