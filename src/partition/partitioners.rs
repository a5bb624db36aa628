//! Partitioner implementations

use super::types::{partition_name, Partitioner, FILE_NAME_KEY};
use crate::error::{Error, Result};
use crate::state::ExecutionContext;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ============================================================================
// Resource Discovery
// ============================================================================

/// Map resources to partitions, one each, storing the resource under `key`
pub fn resources_to_partitions<P: AsRef<Path>>(
    resources: &[P],
    key: &str,
) -> BTreeMap<String, ExecutionContext> {
    resources
        .iter()
        .enumerate()
        .map(|(i, resource)| {
            let context = ExecutionContext::new()
                .with(key, resource.as_ref().display().to_string());
            (partition_name(i), context)
        })
        .collect()
}

/// Files in `dir` whose names match a `*`/`?` glob, sorted by path
pub fn discover_resources(dir: impl AsRef<Path>, pattern: &str) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let matcher = glob_to_regex(pattern)?;

    let entries = std::fs::read_dir(dir).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::resource_not_found(dir.display().to_string())
        } else {
            Error::Io(e)
        }
    })?;

    let mut resources = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if matcher.is_match(name) {
                resources.push(entry.path());
            }
        }
    }
    resources.sort();

    tracing::debug!(
        dir = %dir.display(),
        pattern,
        count = resources.len(),
        "Discovered resources"
    );
    Ok(resources)
}

/// Resolve a path pattern such as `data/delimited*.csv`
///
/// Only the file name part may contain wildcards. A pattern without
/// wildcards resolves to itself, whether or not the file exists, so a missing
/// file surfaces when its partition opens it.
pub fn discover_matching(pattern: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(pattern);
    let file_pattern = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::config(format!("Invalid resource pattern '{pattern}'")))?;

    if !file_pattern.contains(['*', '?']) {
        return Ok(vec![path.to_path_buf()]);
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    discover_resources(dir, file_pattern)
}

fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| Error::config(format!("Invalid resource pattern '{pattern}': {e}")))
}

// ============================================================================
// Multi Resource Partitioner
// ============================================================================

/// One partition per resource
///
/// The grid size is ignored: N resources always give N partitions. Patterns
/// are expanded each time partitions are requested, so the file set is the
/// one present when the step runs.
#[derive(Debug, Clone)]
pub struct MultiResourcePartitioner {
    resources: Vec<PathBuf>,
    patterns: Vec<String>,
    key_name: String,
}

impl MultiResourcePartitioner {
    /// Create a partitioner over known resources
    pub fn new<P: AsRef<Path>>(resources: &[P]) -> Self {
        Self {
            resources: resources.iter().map(|r| r.as_ref().to_path_buf()).collect(),
            patterns: Vec::new(),
            key_name: FILE_NAME_KEY.to_string(),
        }
    }

    /// Create a partitioner over files matching a path pattern
    pub fn from_pattern(pattern: impl Into<String>) -> Self {
        Self::new::<PathBuf>(&[]).with_pattern(pattern)
    }

    /// Also partition over files matching `pattern`
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Store the resource under a different context key
    #[must_use]
    pub fn with_key_name(mut self, key: impl Into<String>) -> Self {
        self.key_name = key.into();
        self
    }

    /// Known resources followed by the current matches of every pattern
    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        let mut resources = self.resources.clone();
        for pattern in &self.patterns {
            resources.extend(discover_matching(pattern)?);
        }
        Ok(resources)
    }
}

impl Partitioner for MultiResourcePartitioner {
    fn partition(&self, _grid_size: usize) -> Result<BTreeMap<String, ExecutionContext>> {
        Ok(resources_to_partitions(&self.resolve()?, &self.key_name))
    }
}

// ============================================================================
// Simple Partitioner
// ============================================================================

/// `grid_size` partitions with empty contexts
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplePartitioner;

impl Partitioner for SimplePartitioner {
    fn partition(&self, grid_size: usize) -> Result<BTreeMap<String, ExecutionContext>> {
        Ok((0..grid_size)
            .map(|i| (partition_name(i), ExecutionContext::new()))
            .collect())
    }
}
