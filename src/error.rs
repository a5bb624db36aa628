//! Error types for Solidafy Batch
//!
//! This module defines the error hierarchy for the entire framework.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for Solidafy Batch
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Item Errors
    // ============================================================================
    #[error("Resource not found: {resource}")]
    ResourceNotFound { resource: String },

    #[error("Parsing error in '{resource}' at line {line}: {message}")]
    Parse {
        resource: String,
        line: usize,
        message: String,
    },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Item processing failed: {message}")]
    Process { message: String },

    #[error("Chunk write failed: {message}")]
    Write { message: String },

    #[error("Reader '{reader}' is not open")]
    ReaderNotOpen { reader: String },

    // ============================================================================
    // Database Errors
    // ============================================================================
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Invalid decimal value '{value}'")]
    InvalidDecimal { value: String },

    // ============================================================================
    // Execution Errors
    // ============================================================================
    #[error("Invalid job parameters: {message}")]
    JobParameters { message: String },

    #[error("Job '{job}' already completed for these parameters")]
    JobInstanceAlreadyComplete { job: String },

    #[error("Job '{job}' is already running for these parameters")]
    JobExecutionAlreadyRunning { job: String },

    #[error("Job '{job}' has no steps")]
    EmptyJob { job: String },

    #[error("Partition '{partition}' failed: {message}")]
    Partition { partition: String, message: String },

    #[error("Job repository error: {message}")]
    Repository { message: String },

    // ============================================================================
    // Template Errors
    // ============================================================================
    #[error("Template error: {message}")]
    Template { message: String },

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create a resource-not-found error
    pub fn resource_not_found(resource: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource: resource.into(),
        }
    }

    /// Create a line parsing error
    pub fn parse(resource: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            resource: resource.into(),
            line,
            message: message.into(),
        }
    }

    /// Create an invalid field error
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a processing error
    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }

    /// Create a transient write error
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    /// Create a job parameters error
    pub fn job_parameters(message: impl Into<String>) -> Self {
        Self::JobParameters {
            message: message.into(),
        }
    }

    /// Create a partition error
    pub fn partition(partition: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Partition {
            partition: partition.into(),
            message: message.into(),
        }
    }

    /// Create a job repository error
    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
        }
    }

    /// Create a template error
    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Only chunk writes are retried; reader and processor errors are fatal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Write { .. } => true,
            Error::Database(e) => is_retryable_database_error(e),
            _ => false,
        }
    }

    /// Check if this error aborts a step before any chunk is processed
    pub fn is_fatal_at_open(&self) -> bool {
        matches!(
            self,
            Error::ResourceNotFound { .. } | Error::Config { .. } | Error::UndefinedVariable { .. }
        )
    }
}

/// Transaction conflicts are the only database errors worth retrying
fn is_retryable_database_error(error: &duckdb::Error) -> bool {
    let message = error.to_string().to_lowercase();
    message.contains("conflict") || message.contains("lock")
}

/// Result type alias for Solidafy Batch
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
