//! Typed job parameters
//!
//! Parameters identify a job instance: two launches with the same job name and
//! identifying parameters are the same instance (and the second one is a restart).

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A single typed parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum JobParameter {
    String(String),
    Long(i64),
    Double(f64),
    Date(DateTime<Utc>),
}

/// Declared type of a parameter (used by validation and CLI parsing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Long,
    Double,
    Date,
}

impl ParameterType {
    fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Long => "long",
            Self::Double => "double",
            Self::Date => "date",
        }
    }
}

impl std::str::FromStr for ParameterType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "string" => Ok(Self::String),
            "long" | "int" => Ok(Self::Long),
            "double" | "float" => Ok(Self::Double),
            "date" => Ok(Self::Date),
            other => Err(Error::job_parameters(format!(
                "Unknown parameter type '{other}'"
            ))),
        }
    }
}

impl JobParameter {
    /// Declared type of this value
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            Self::String(_) => ParameterType::String,
            Self::Long(_) => ParameterType::Long,
            Self::Double(_) => ParameterType::Double,
            Self::Date(_) => ParameterType::Date,
        }
    }

    /// Parse a raw string as the given type
    pub fn parse(raw: &str, parameter_type: ParameterType) -> Result<Self> {
        let invalid = |e: &dyn fmt::Display| {
            Error::job_parameters(format!(
                "'{raw}' is not a valid {}: {e}",
                parameter_type.name()
            ))
        };
        match parameter_type {
            ParameterType::String => Ok(Self::String(raw.to_string())),
            ParameterType::Long => raw.parse().map(Self::Long).map_err(|e| invalid(&e)),
            ParameterType::Double => raw.parse().map(Self::Double).map_err(|e| invalid(&e)),
            ParameterType::Date => parse_date(raw).map(Self::Date).map_err(|e| invalid(&e)),
        }
    }

    /// Convert to JSON for template rendering
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Long(n) => Value::Number((*n).into()),
            Self::Double(f) => {
                serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number)
            }
            Self::Date(d) => Value::String(d.to_rfc3339()),
        }
    }
}

impl fmt::Display for JobParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Long(n) => write!(f, "{n}"),
            Self::Double(d) => write!(f, "{d:?}"),
            Self::Date(d) => write!(f, "{}", d.to_rfc3339()),
        }
    }
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates
fn parse_date(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
            .map_err(|_| rfc_err),
    }
}

// ============================================================================
// Job Parameters
// ============================================================================

/// Ordered set of named, typed job parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobParameters {
    params: BTreeMap<String, JobParameter>,
}

impl JobParameters {
    /// Create empty parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a builder
    pub fn builder() -> JobParametersBuilder {
        JobParametersBuilder::default()
    }

    /// Parse `name(type)=value` or `name=value` (string) entries
    ///
    /// ```
    /// use solidafy_batch::job::JobParameters;
    ///
    /// let params = JobParameters::parse_args(&["credit(double)=10000.0"]).unwrap();
    /// assert_eq!(params.get_double("credit"), Some(10000.0));
    /// ```
    pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut params = Self::new();
        for arg in args {
            let arg = arg.as_ref();
            let (key, raw) = arg.split_once('=').ok_or_else(|| {
                Error::job_parameters(format!("Expected name=value, got '{arg}'"))
            })?;
            let key = key.trim();
            let (name, parameter_type) = match key.split_once('(') {
                Some((name, rest)) => {
                    let type_name = rest.strip_suffix(')').ok_or_else(|| {
                        Error::job_parameters(format!("Unclosed type in '{key}'"))
                    })?;
                    (name.trim(), type_name.parse::<ParameterType>()?)
                }
                None => (key, ParameterType::String),
            };
            if name.is_empty() {
                return Err(Error::job_parameters(format!("Empty name in '{arg}'")));
            }
            params.insert(name, JobParameter::parse(raw.trim(), parameter_type)?);
        }
        Ok(params)
    }

    /// Insert or replace a parameter
    pub fn insert(&mut self, name: impl Into<String>, value: JobParameter) {
        self.params.insert(name.into(), value);
    }

    /// Get a raw parameter
    pub fn get(&self, name: &str) -> Option<&JobParameter> {
        self.params.get(name)
    }

    /// Get a string parameter
    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.params.get(name)? {
            JobParameter::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get a long parameter
    pub fn get_long(&self, name: &str) -> Option<i64> {
        match self.params.get(name)? {
            JobParameter::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Get a double parameter (longs are widened)
    pub fn get_double(&self, name: &str) -> Option<f64> {
        match self.params.get(name)? {
            JobParameter::Double(d) => Some(*d),
            JobParameter::Long(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Get a date parameter
    pub fn get_date(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.params.get(name)? {
            JobParameter::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &JobParameter)> {
        self.params.iter()
    }

    /// Convert to a JSON object (for `{{ job.name }}` templates)
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.params
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Key identifying the job instance these parameters belong to
    pub fn instance_key(&self, job_name: &str) -> String {
        let rendered: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{k}({})={v}", v.parameter_type().name()))
            .collect();
        format!("{job_name}[{}]", rendered.join(","))
    }
}

impl fmt::Display for JobParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}

/// Builder for [`JobParameters`]
#[derive(Debug, Default)]
pub struct JobParametersBuilder {
    params: JobParameters,
}

impl JobParametersBuilder {
    /// Add a string parameter
    #[must_use]
    pub fn add_string(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .insert(name, JobParameter::String(value.into()));
        self
    }

    /// Add a long parameter
    #[must_use]
    pub fn add_long(mut self, name: impl Into<String>, value: i64) -> Self {
        self.params.insert(name, JobParameter::Long(value));
        self
    }

    /// Add a double parameter
    #[must_use]
    pub fn add_double(mut self, name: impl Into<String>, value: f64) -> Self {
        self.params.insert(name, JobParameter::Double(value));
        self
    }

    /// Add a date parameter
    #[must_use]
    pub fn add_date(mut self, name: impl Into<String>, value: DateTime<Utc>) -> Self {
        self.params.insert(name, JobParameter::Date(value));
        self
    }

    /// Finish building
    pub fn build(self) -> JobParameters {
        self.params
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Checks required and optional parameter names and types before launch
#[derive(Debug, Clone, Default)]
pub struct JobParametersValidator {
    required: Vec<(String, ParameterType)>,
    optional: Vec<(String, ParameterType)>,
}

impl JobParametersValidator {
    /// Create a validator that accepts anything
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a parameter of the given type
    #[must_use]
    pub fn require(mut self, name: impl Into<String>, parameter_type: ParameterType) -> Self {
        self.required.push((name.into(), parameter_type));
        self
    }

    /// Allow an optional parameter of the given type
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, parameter_type: ParameterType) -> Self {
        self.optional.push((name.into(), parameter_type));
        self
    }

    /// Validate parameters
    pub fn validate(&self, params: &JobParameters) -> Result<()> {
        for (name, expected) in &self.required {
            let value = params
                .get(name)
                .ok_or_else(|| Error::job_parameters(format!("Missing required parameter '{name}'")))?;
            check_type(name, value, *expected)?;
        }

        for (name, expected) in &self.optional {
            if let Some(value) = params.get(name) {
                check_type(name, value, *expected)?;
            }
        }

        Ok(())
    }
}

fn check_type(name: &str, value: &JobParameter, expected: ParameterType) -> Result<()> {
    let actual = value.parameter_type();
    // A long is acceptable where a double is expected
    let compatible =
        actual == expected || (expected == ParameterType::Double && actual == ParameterType::Long);
    if compatible {
        Ok(())
    } else {
        Err(Error::job_parameters(format!(
            "Parameter '{name}' must be a {}, got {}",
            expected.name(),
            actual.name()
        )))
    }
}
