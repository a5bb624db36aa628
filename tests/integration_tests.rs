//! Integration tests for complete job runs
//!
//! Tests the full end-to-end flow: YAML job → reader → processor → DuckDB store
//! → job repository, for both the paged credit job and the partitioned file import.

use bigdecimal::BigDecimal;
use pretty_assertions::assert_eq;
use solidafy_batch::database::CreditStore;
use solidafy_batch::engine::ChunkStep;
use solidafy_batch::item::CreditIncreaseProcessor;
use solidafy_batch::job::{Job, JobLauncher, JobParameters};
use solidafy_batch::loader::{build_job, load_job, load_job_from_str};
use solidafy_batch::output::RepositoryItemWriter;
use solidafy_batch::pagination::{CreditAboveThreshold, RepositoryItemReader};
use solidafy_batch::state::{BatchStatus, ExecutionContext, JobExecution, JobRepository};
use solidafy_batch::types::CustomerCredit;
use std::path::Path;
use std::str::FromStr;
use test_case::test_case;

// ============================================================================
// Helpers
// ============================================================================

fn customer(id: i64, credit: &str) -> CustomerCredit {
    CustomerCredit::new(
        id,
        format!("customer{id}"),
        BigDecimal::from_str(credit).unwrap(),
    )
}

fn credit_params(credit: f64) -> JobParameters {
    JobParameters::builder().add_double("credit", credit).build()
}

fn input_params(pattern: &Path) -> JobParameters {
    JobParameters::builder()
        .add_string("input", pattern.display().to_string())
        .build()
}

/// Write `rows` customers per file, ids numbered consecutively from 1
fn write_credit_files(dir: &Path, files: usize, rows: usize) {
    for f in 0..files {
        let lines: Vec<String> = (0..rows)
            .map(|r| {
                let id = f * rows + r + 1;
                format!("{id},customer{id},{}", id * 10)
            })
            .collect();
        std::fs::write(
            dir.join(format!("delimited{}.csv", f + 1)),
            lines.join("\n") + "\n",
        )
        .unwrap();
    }
}

fn assert_counts_balanced(execution: &JobExecution) {
    for step in &execution.step_executions {
        assert!(step.counts_balanced(), "unbalanced: {}", step.summary());
    }
}

async fn run_credit_increase(store: &CreditStore, credit: f64) -> JobExecution {
    let def = load_job("credit-increase").unwrap();
    let params = credit_params(credit);
    let job = build_job(&def, store, &params).unwrap();
    JobLauncher::new(JobRepository::in_memory())
        .run(&job, params)
        .await
        .unwrap()
}

// ============================================================================
// Paged Credit Increase
// ============================================================================

#[tokio::test]
async fn test_credit_increase_above_threshold() {
    let store = CreditStore::open_in_memory().unwrap();
    store
        .save_all(&[customer(1, "20000"), customer(2, "5000")])
        .await
        .unwrap();

    let execution = run_credit_increase(&store, 10000.0).await;

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(execution.exit_status.code, "COMPLETED");
    let step = execution.step("step1").unwrap();
    assert_eq!(step.read_count, 1);
    assert_eq!(step.write_count, 1);
    assert_eq!(step.skip_count, 0);
    assert_eq!(
        store.find_all().await.unwrap(),
        vec![customer(1, "20005"), customer(2, "5000")]
    );
}

#[tokio::test]
async fn test_credit_increase_threshold_is_exclusive() {
    let store = CreditStore::open_in_memory().unwrap();
    store
        .save_all(&[customer(1, "10000"), customer(2, "10000.01")])
        .await
        .unwrap();

    let execution = run_credit_increase(&store, 10000.0).await;

    assert_eq!(execution.read_count(), 1);
    assert_eq!(
        store.find_all().await.unwrap(),
        vec![customer(1, "10000"), customer(2, "10005.01")]
    );
}

#[tokio::test]
async fn test_credit_increase_no_matches() {
    let store = CreditStore::open_in_memory().unwrap();
    store.save_all(&[customer(1, "100")]).await.unwrap();

    let execution = run_credit_increase(&store, 10000.0).await;

    assert_eq!(execution.status, BatchStatus::Completed);
    let step = execution.step("step1").unwrap();
    assert_eq!(step.read_count, 0);
    assert_eq!(step.commit_count, 0);
    assert_eq!(store.find_all().await.unwrap(), vec![customer(1, "100")]);
}

#[test_case(1 ; "chunk of one")]
#[test_case(2 ; "chunk of two")]
#[test_case(3 ; "chunk of three")]
#[test_case(50 ; "chunk larger than input")]
#[tokio::test]
async fn test_every_match_increased_exactly_once(chunk_size: usize) {
    let store = CreditStore::open_in_memory().unwrap();
    let customers: Vec<CustomerCredit> = (1..=25)
        .map(|id| customer(id, if id % 5 == 0 { "100" } else { "20000" }))
        .collect();
    store.save_all(&customers).await.unwrap();

    let threshold = BigDecimal::from(10000);
    let reader_store = store.clone();
    let step = ChunkStep::builder("step1")
        .chunk_size(chunk_size)
        .reader(move |_: &ExecutionContext| {
            Ok(RepositoryItemReader::new(
                "customerCreditReader",
                CreditAboveThreshold::new(reader_store.clone(), threshold.clone()),
            ))
        })
        .processor(CreditIncreaseProcessor::new())
        .writer(RepositoryItemWriter::new(store.clone()))
        .build()
        .unwrap();
    let job = Job::builder("ioSampleJob").step(step).build().unwrap();

    let execution = JobLauncher::new(JobRepository::in_memory())
        .run(&job, credit_params(10000.0))
        .await
        .unwrap();

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(execution.read_count(), 20);
    assert_eq!(execution.write_count(), 20);
    assert_counts_balanced(&execution);

    for c in store.find_all().await.unwrap() {
        let expected = if c.id % 5 == 0 { "100" } else { "20005" };
        assert_eq!(c.credit, BigDecimal::from_str(expected).unwrap(), "id {}", c.id);
    }
}

// ============================================================================
// Partitioned File Import
// ============================================================================

#[test_case(0 ; "no files")]
#[test_case(1 ; "one file")]
#[test_case(2 ; "two files")]
#[test_case(5 ; "many files")]
#[tokio::test]
async fn test_partitioned_import_writes_union(files: usize) {
    let dir = tempfile::tempdir().unwrap();
    write_credit_files(dir.path(), files, 3);

    let store = CreditStore::open_in_memory().unwrap();
    let def = load_job("partitioned-credit-import").unwrap();
    let params = input_params(&dir.path().join("delimited*.csv"));
    let job = build_job(&def, &store, &params).unwrap();

    let execution = JobLauncher::new(JobRepository::in_memory())
        .run(&job, params)
        .await
        .unwrap();

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(execution.write_count(), (files * 3) as u64);
    assert_counts_balanced(&execution);

    let partitions: Vec<_> = execution
        .step_executions
        .iter()
        .filter(|s| s.partition_name.is_some())
        .collect();
    assert_eq!(partitions.len(), files);
    for (i, partition) in partitions.iter().enumerate() {
        assert!(partition.step_name.starts_with("step1:partition"));
        let file = partition.execution_context.get_string("fileName").unwrap();
        assert!(file.ends_with(&format!("delimited{}.csv", i + 1)), "{file}");
    }

    let stored = store.find_all().await.unwrap();
    assert_eq!(stored.len(), files * 3);
    for c in stored {
        assert_eq!(c.credit, BigDecimal::from(c.id * 10 + 5));
    }
}

#[tokio::test]
async fn test_missing_file_fails_job_without_writes() {
    let dir = tempfile::tempdir().unwrap();
    let store = CreditStore::open_in_memory().unwrap();
    let def = load_job("partitioned-credit-import").unwrap();
    let params = input_params(&dir.path().join("missing.csv"));
    let job = build_job(&def, &store, &params).unwrap();

    let execution = JobLauncher::new(JobRepository::in_memory())
        .run(&job, params)
        .await
        .unwrap();

    assert_eq!(execution.status, BatchStatus::Failed);
    assert_eq!(execution.exit_status.code, "FAILED");
    assert_eq!(execution.write_count(), 0);
    assert!(execution.exit_status.description.contains("missing.csv"));
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_input_directory_fails_job_without_writes() {
    let dir = tempfile::tempdir().unwrap();
    let store = CreditStore::open_in_memory().unwrap();
    let def = load_job("partitioned-credit-import").unwrap();
    let params = input_params(&dir.path().join("nope").join("*.csv"));
    let job = build_job(&def, &store, &params).unwrap();

    let repository = JobRepository::in_memory();
    let execution = JobLauncher::new(repository.clone())
        .run(&job, params)
        .await
        .unwrap();

    assert_eq!(execution.status, BatchStatus::Failed);
    assert_eq!(execution.write_count(), 0);
    assert!(execution.exit_status.description.contains("nope"));
    assert_eq!(store.count().await.unwrap(), 0);

    let recorded = repository.find_job_executions(None).await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].status, BatchStatus::Failed);
}

#[tokio::test]
async fn test_failed_partition_does_not_undo_siblings() {
    let dir = tempfile::tempdir().unwrap();
    write_credit_files(dir.path(), 1, 4);
    let good = dir.path().join("delimited1.csv");
    let missing = dir.path().join("delimited2.csv");

    let yaml = format!(
        r#"
name: import
steps:
  - name: partitionJobStep
    chunk_size: 2
    partition:
      worker: step1
      resources:
        - "{}"
        - "{}"
    reader:
      type: flat_file
      resource: "{{{{ partition.fileName }}}}"
    processor:
      type: credit_increase
"#,
        good.display(),
        missing.display()
    );
    let def = load_job_from_str(&yaml).unwrap();
    let store = CreditStore::open_in_memory().unwrap();
    let job = build_job(&def, &store, &JobParameters::new()).unwrap();

    let execution = JobLauncher::new(JobRepository::in_memory())
        .run(&job, JobParameters::new())
        .await
        .unwrap();

    assert_eq!(execution.status, BatchStatus::Failed);
    assert_eq!(
        execution.step("step1:partition0").unwrap().status,
        BatchStatus::Completed
    );
    assert_eq!(
        execution.step("step1:partition1").unwrap().status,
        BatchStatus::Failed
    );
    assert_eq!(execution.write_count(), 4);
    assert_eq!(store.count().await.unwrap(), 4);
}

#[tokio::test]
async fn test_partitioned_import_with_single_worker() {
    let dir = tempfile::tempdir().unwrap();
    write_credit_files(dir.path(), 4, 2);

    let mut def = load_job("partitioned-credit-import").unwrap();
    def.steps[0].partition.as_mut().unwrap().max_workers = Some(1);
    let store = CreditStore::open_in_memory().unwrap();
    let params = input_params(&dir.path().join("delimited*.csv"));
    let job = build_job(&def, &store, &params).unwrap();

    let execution = JobLauncher::new(JobRepository::in_memory())
        .run(&job, params)
        .await
        .unwrap();

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(store.count().await.unwrap(), 8);
}
