//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Solidafy Batch CLI
#[derive(Parser, Debug)]
#[command(name = "solidafy-batch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Customer credit database (DuckDB file path or `:memory:`)
    #[arg(short, long, global = true, default_value = ":memory:")]
    pub db: String,

    /// Job repository ledger file (JSON); executions are kept in memory when omitted
    #[arg(short, long, global = true)]
    pub repository: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch (or restart) a job
    Run {
        /// Built-in job name or job definition file (YAML)
        job: String,

        /// Job parameter as `name=value` or `name(type)=value`, repeatable
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// SQL script to run against the database before launch, repeatable
        #[arg(long)]
        init_script: Vec<PathBuf>,

        /// Maximum concurrent partitions for partitioned steps
        #[arg(long)]
        max_workers: Option<usize>,
    },

    /// List recorded job executions, newest first
    Executions {
        /// Only executions of this job
        #[arg(long)]
        job: Option<String>,

        /// Maximum executions to show
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one job execution with its step executions
    Show {
        /// Job execution id
        id: u64,
    },

    /// Mark a failed or stopped execution as abandoned so it is never restarted
    Abandon {
        /// Job execution id
        id: u64,
    },

    /// Validate a job definition
    Validate {
        /// Built-in job name or job definition file (YAML)
        job: String,
    },

    /// List built-in jobs
    List,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
