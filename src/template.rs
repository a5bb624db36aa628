//! Template interpolation for job definitions
//!
//! Handles `{{ variable }}` interpolation in YAML job definitions.
//! `{{ job.credit }}` is bound to a job parameter when the job is built;
//! `{{ partition.fileName }}` is bound late, when a partition's reader opens.

use crate::error::{Error, Result};
use crate::job::JobParameters;
use crate::state::ExecutionContext;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}").unwrap()
});

/// Template roots a definition may reference
pub const TEMPLATE_ROOTS: [&str; 3] = ["job", "partition", "vars"];

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Job parameter values
    pub job: Value,
    /// Current partition's execution context
    pub partition: Value,
    /// Additional variables
    pub vars: Value,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context exposing job parameters under `job`
    pub fn for_job(parameters: &JobParameters) -> Self {
        Self {
            job: parameters.to_json(),
            ..Default::default()
        }
    }

    /// Expose a partition's execution context under `partition`
    #[must_use]
    pub fn with_partition(mut self, context: &ExecutionContext) -> Self {
        self.partition = context.to_json();
        self
    }

    /// Set additional variables
    pub fn set_vars(&mut self, vars: Value) -> &mut Self {
        self.vars = vars;
        self
    }

    /// Get a value by path (e.g., "job.credit")
    pub fn get(&self, path: &str) -> Option<&Value> {
        let parts: Vec<&str> = path.split('.').collect();

        let root = match parts[0] {
            "job" => &self.job,
            "partition" => &self.partition,
            "vars" => &self.vars,
            _ => return None,
        };

        if parts.len() == 1 {
            Some(root)
        } else {
            get_nested_value(root, &parts[1..])
        }
    }
}

/// Get a nested value from a JSON value by path
fn get_nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for part in path {
        match current {
            Value::Object(map) => {
                current = map.get(*part)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Render a template string with the given context
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut result = template.to_string();
    let mut errors = Vec::new();

    for cap in TEMPLATE_REGEX.captures_iter(template) {
        let full_match = cap.get(0).unwrap().as_str();
        let var_path = cap.get(1).unwrap().as_str();

        match ctx.get(var_path) {
            Some(value) => {
                let replacement = value_to_string(value);
                result = result.replace(full_match, &replacement);
            }
            None => {
                errors.push(var_path.to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(result)
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .map(|cap| cap.get(1).unwrap().as_str().to_string())
        .collect()
}

/// Check that every variable in a template uses a known root and, for
/// `job.*`, a declared parameter
pub fn check_variables(template: &str, declared_parameters: &[&str]) -> Result<()> {
    for variable in extract_variables(template) {
        let mut parts = variable.split('.');
        let root = parts.next().unwrap_or_default();
        if !TEMPLATE_ROOTS.contains(&root) {
            return Err(Error::template(format!(
                "Unknown template root '{root}' in '{template}'"
            )));
        }
        if root == "job" {
            let name = parts.next().unwrap_or_default();
            if !declared_parameters.contains(&name) {
                return Err(Error::template(format!(
                    "Template '{template}' references undeclared parameter '{name}'"
                )));
            }
        }
    }
    Ok(())
}

/// Convert a JSON value to a string for template substitution
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        // For complex types, use JSON serialization
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
