//! Built-in job definitions embedded in the binary
//!
//! This module embeds the bundled job YAML files directly into the binary,
//! allowing users to run `solidafy-batch run credit-increase` instead of
//! specifying a file path.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Built-in job YAML definitions
pub static BUILTIN_JOBS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    m.insert(
        "credit-increase",
        include_str!("../jobs/credit-increase.yaml"),
    );
    m.insert(
        "partitioned-credit-import",
        include_str!("../jobs/partitioned-credit-import.yaml"),
    );

    m
});

/// Get a built-in job definition by name
pub fn get_builtin(name: &str) -> Option<&'static str> {
    BUILTIN_JOBS.get(name).copied()
}

/// Check if a job name is a built-in job
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_JOBS.contains_key(name)
}

/// List all built-in job names, sorted
pub fn list_builtin() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = BUILTIN_JOBS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Built-in job summary for `list`
#[derive(Debug, Clone, Copy)]
pub struct JobInfo {
    pub name: &'static str,
    pub description: &'static str,
    /// Example launch parameters
    pub example_parameters: &'static [&'static str],
}

/// Summaries of the built-in jobs
pub fn list_builtin_info() -> Vec<JobInfo> {
    vec![
        JobInfo {
            name: "credit-increase",
            description: "Add a fixed amount to the credit of every customer above a threshold",
            example_parameters: &["credit(double)=10000"],
        },
        JobInfo {
            name: "partitioned-credit-import",
            description: "Import customer credit files in parallel, one partition per file",
            example_parameters: &["input=data/delimited*.csv"],
        },
    ]
}
