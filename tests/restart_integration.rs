//! Restart integration tests with a file-backed job repository
//!
//! Each launch opens the ledger file afresh, the way separate CLI invocations do.

use pretty_assertions::assert_eq;
use solidafy_batch::database::CreditStore;
use solidafy_batch::error::Error;
use solidafy_batch::job::{JobLauncher, JobParameters};
use solidafy_batch::loader::{build_job, load_job};
use solidafy_batch::state::{BatchStatus, JobExecution, JobRepository};
use std::path::Path;

fn input_params(pattern: &Path) -> JobParameters {
    JobParameters::builder()
        .add_string("input", pattern.display().to_string())
        .build()
}

async fn launch(ledger: &Path, store: &CreditStore, params: &JobParameters) -> Result<JobExecution, Error> {
    let def = load_job("partitioned-credit-import")?;
    let job = build_job(&def, store, params)?;
    JobLauncher::new(JobRepository::from_file(ledger)?)
        .run(&job, params.clone())
        .await
}

fn numbered_lines(ids: std::ops::RangeInclusive<usize>) -> String {
    ids.map(|id| format!("{id},customer{id},{}\n", id * 10))
        .collect()
}

#[tokio::test]
async fn test_restart_resumes_failed_partition_only() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ledger.json");
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();

    std::fs::write(data.join("delimited1.csv"), numbered_lines(1..=3)).unwrap();
    // Second file: one good chunk of 5, then a malformed line
    let mut broken = numbered_lines(4..=8);
    broken.push_str("not a customer\n");
    broken.push_str(&numbered_lines(9..=10));
    std::fs::write(data.join("delimited2.csv"), &broken).unwrap();

    let store = CreditStore::open(dir.path().join("credits.duckdb")).unwrap();
    let params = input_params(&data.join("delimited*.csv"));

    let failed = launch(&ledger, &store, &params).await.unwrap();
    assert_eq!(failed.status, BatchStatus::Failed);
    let partition1 = failed.step("step1:partition1").unwrap();
    assert_eq!(partition1.status, BatchStatus::Failed);
    assert_eq!(partition1.write_count, 5);
    assert_eq!(partition1.commit_count, 1);
    assert!(partition1.first_failure().unwrap().contains("line 6"));
    assert_eq!(store.count().await.unwrap(), 8);

    // Fix the bad line and relaunch the same instance
    let mut fixed = numbered_lines(4..=8);
    fixed.push_str("11,customer11,110\n");
    fixed.push_str(&numbered_lines(9..=10));
    std::fs::write(data.join("delimited2.csv"), fixed).unwrap();

    let restarted = launch(&ledger, &store, &params).await.unwrap();
    assert_eq!(restarted.status, BatchStatus::Completed);
    assert_ne!(restarted.id, failed.id);

    // The completed partition is not run again
    assert!(restarted.step("step1:partition0").is_none());
    let partition1 = restarted.step("step1:partition1").unwrap();
    assert_eq!(partition1.status, BatchStatus::Completed);
    // Resumed after the 5 committed records
    assert_eq!(partition1.read_count, 3);
    assert_eq!(partition1.write_count, 3);

    assert_eq!(store.count().await.unwrap(), 11);
}

#[tokio::test]
async fn test_completed_instance_is_not_relaunched() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ledger.json");
    std::fs::write(dir.path().join("delimited1.csv"), numbered_lines(1..=2)).unwrap();

    let store = CreditStore::open_in_memory().unwrap();
    let params = input_params(&dir.path().join("delimited*.csv"));

    let first = launch(&ledger, &store, &params).await.unwrap();
    assert_eq!(first.status, BatchStatus::Completed);

    let err = launch(&ledger, &store, &params).await.unwrap_err();
    assert!(matches!(err, Error::JobInstanceAlreadyComplete { .. }));

    // The ledger survives on disk
    let repository = JobRepository::from_file(&ledger).unwrap();
    let executions = repository
        .find_job_executions(Some("partitioned-credit-import"))
        .await;
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, BatchStatus::Completed);
}

#[tokio::test]
async fn test_abandoned_instance_is_not_restarted() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = dir.path().join("ledger.json");
    let store = CreditStore::open_in_memory().unwrap();
    let params = input_params(&dir.path().join("missing.csv"));

    let failed = launch(&ledger, &store, &params).await.unwrap();
    assert_eq!(failed.status, BatchStatus::Failed);

    let repository = JobRepository::from_file(&ledger).unwrap();
    let abandoned = repository.abandon_job_execution(failed.id).await.unwrap();
    assert_eq!(abandoned.status, BatchStatus::Abandoned);

    let err = launch(&ledger, &store, &params).await.unwrap_err();
    assert!(err.to_string().contains("abandoned"));
}
