//! YAML parser for job definitions
//!
//! Parses and validates job YAML files.
//! Supports both built-in jobs (by name) and custom YAML files (by path).

use crate::error::{Error, Result};
use crate::jobs;
use crate::loader::types::{JobDefinition, ReaderDefinition, StepDefinition};
use crate::template::{check_variables, extract_variables};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Load a job definition from a name or file path
///
/// This function first checks if the input is a built-in job name (e.g., "credit-increase"),
/// then falls back to loading from a file path.
///
/// # Examples
///
/// ```ignore
/// // Load built-in job by name
/// let job = load_job("credit-increase")?;
///
/// // Load custom job from file
/// let job = load_job("./my-job.yaml")?;
/// ```
pub fn load_job(path: impl AsRef<Path>) -> Result<JobDefinition> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    if !path_str.contains('/')
        && !path_str.contains('\\')
        && !path_str.ends_with(".yaml")
        && !path_str.ends_with(".yml")
    {
        if let Some(yaml) = jobs::get_builtin(&path_str) {
            return load_job_from_str(yaml);
        }
    }

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            let builtin_list = jobs::list_builtin().join(", ");
            Error::config(format!(
                "Job '{}' not found. Built-in jobs: {}. Or provide a path to a YAML file.",
                path.display(),
                builtin_list
            ))
        } else {
            Error::config(format!(
                "Failed to read job file '{}': {}",
                path.display(),
                e
            ))
        }
    })?;
    load_job_from_str(&content)
}

/// Load a job definition from a YAML string
pub fn load_job_from_str(yaml: &str) -> Result<JobDefinition> {
    let def: JobDefinition = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse job YAML: {e}")))?;

    validate_job(&def)?;
    Ok(def)
}

/// Validate a job definition
pub fn validate_job(def: &JobDefinition) -> Result<()> {
    if def.name.trim().is_empty() {
        return Err(Error::config("Job name cannot be empty"));
    }

    if def.steps.is_empty() {
        return Err(Error::EmptyJob {
            job: def.name.clone(),
        });
    }

    let mut parameter_names = HashSet::new();
    for parameter in &def.parameters {
        if parameter.name.trim().is_empty() {
            return Err(Error::config("Parameter name cannot be empty"));
        }
        if !parameter_names.insert(parameter.name.as_str()) {
            return Err(Error::config(format!(
                "Duplicate parameter '{}'",
                parameter.name
            )));
        }
    }

    // Manager and worker names share one namespace within the job instance
    let mut step_names = HashSet::new();
    for step in &def.steps {
        if !step_names.insert(step.name.clone()) {
            return Err(Error::config(format!("Duplicate step name '{}'", step.name)));
        }
        if let Some(partition) = &step.partition {
            let worker = partition.worker_name(&step.name);
            if !step_names.insert(worker.clone()) {
                return Err(Error::config(format!("Duplicate step name '{worker}'")));
            }
        }
    }

    let declared = def.parameter_names();
    for step in &def.steps {
        validate_step(step, &declared)?;
    }

    Ok(())
}

/// Validate a step definition
fn validate_step(step: &StepDefinition, declared: &[&str]) -> Result<()> {
    if step.name.trim().is_empty() {
        return Err(Error::config("Step name cannot be empty"));
    }

    if step.chunk_size == 0 {
        return Err(Error::InvalidConfigValue {
            field: format!("{}.chunk_size", step.name),
            message: "must be at least 1".to_string(),
        });
    }

    match &step.reader {
        ReaderDefinition::Repository {
            threshold,
            page_size,
            ..
        } => {
            if threshold.trim().is_empty() {
                return Err(Error::missing_field(format!("{}.reader.threshold", step.name)));
            }
            if *page_size == 0 {
                return Err(Error::InvalidConfigValue {
                    field: format!("{}.reader.page_size", step.name),
                    message: "must be at least 1".to_string(),
                });
            }
            check_variables(threshold, declared)?;
        }
        ReaderDefinition::FlatFile { resource, .. } => {
            if resource.trim().is_empty() {
                return Err(Error::missing_field(format!("{}.reader.resource", step.name)));
            }
            check_variables(resource, declared)?;
        }
    }

    if let Some(partition) = &step.partition {
        if partition.grid_size == 0 {
            return Err(Error::InvalidConfigValue {
                field: format!("{}.partition.grid_size", step.name),
                message: "must be at least 1".to_string(),
            });
        }
        if partition.max_workers == Some(0) {
            return Err(Error::InvalidConfigValue {
                field: format!("{}.partition.max_workers", step.name),
                message: "must be at least 1".to_string(),
            });
        }
        if partition.key.trim().is_empty() {
            return Err(Error::missing_field(format!("{}.partition.key", step.name)));
        }
        for resource in &partition.resources {
            check_variables(resource, declared)?;
            if references_partition(resource) {
                return Err(Error::template(format!(
                    "Partition resources cannot reference the partition context: '{resource}'"
                )));
            }
        }
    } else if let ReaderDefinition::FlatFile { resource, .. } = &step.reader {
        if references_partition(resource) {
            return Err(Error::template(format!(
                "Step '{}' is not partitioned but its resource references the partition context",
                step.name
            )));
        }
    }

    Ok(())
}

fn references_partition(template: &str) -> bool {
    extract_variables(template)
        .iter()
        .any(|v| v.split('.').next() == Some("partition"))
}
