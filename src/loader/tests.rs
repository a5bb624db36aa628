//! Tests for YAML loader module

use super::*;
use crate::database::CreditStore;
use crate::error::Error;
use crate::job::{JobLauncher, JobParameters, ParameterType};
use crate::state::{BatchStatus, JobRepository};
use crate::types::CustomerCredit;
use bigdecimal::BigDecimal;
use pretty_assertions::assert_eq;
use std::str::FromStr;
use test_case::test_case;

const CREDIT_JOB: &str = r#"
name: credit-job
parameters:
  - name: credit
    type: double
steps:
  - name: step1
    chunk_size: 2
    reader:
      type: repository
      threshold: "{{ job.credit }}"
"#;

fn partitioned_job(resources: &str) -> String {
    format!(
        r#"
name: import
parameters:
  - name: input
steps:
  - name: partitionJobStep
    chunk_size: 5
    partition:
      worker: step1
      resources:
        - "{resources}"
    reader:
      type: flat_file
      resource: "{{{{ partition.fileName }}}}"
    processor:
      type: credit_increase
"#
    )
}

fn customer(id: i64, credit: &str) -> CustomerCredit {
    CustomerCredit::new(
        id,
        format!("customer{id}"),
        BigDecimal::from_str(credit).unwrap(),
    )
}

// ============================================================================
// Basic Loading Tests
// ============================================================================

#[test]
fn test_load_minimal_job() {
    let def = load_job_from_str(CREDIT_JOB).unwrap();

    assert_eq!(def.name, "credit-job");
    assert!(def.restartable);
    assert_eq!(def.parameters.len(), 1);
    assert_eq!(def.parameters[0].parameter_type, ParameterType::Double);
    assert!(def.parameters[0].required);

    let step = &def.steps[0];
    assert_eq!(step.name, "step1");
    assert_eq!(step.chunk_size, 2);
    assert_eq!(step.write_retry_limit, 0);
    assert!(step.partition.is_none());
    assert!(matches!(
        step.reader,
        ReaderDefinition::Repository { page_size: 2, .. }
    ));
    assert!(matches!(step.processor, ProcessorDefinition::PassThrough));
    assert!(matches!(step.writer, WriterDefinition::Repository));
}

#[test]
fn test_load_partitioned_job_defaults() {
    let def = load_job_from_str(&partitioned_job("data/*.csv")).unwrap();
    let step = &def.steps[0];
    let partition = step.partition.as_ref().unwrap();

    assert_eq!(partition.worker_name(&step.name), "step1");
    assert_eq!(partition.key, "fileName");
    assert_eq!(partition.grid_size, 2);
    assert_eq!(partition.max_workers, None);
    assert_eq!(def.parameters[0].parameter_type, ParameterType::String);
    assert!(matches!(
        step.processor,
        ProcessorDefinition::CreditIncrease { amount: None }
    ));
}

#[test]
fn test_worker_name_defaults_to_step_name() {
    let partition = PartitionDefinition {
        worker: None,
        resources: vec![],
        key: "fileName".to_string(),
        grid_size: 2,
        max_workers: None,
    };
    assert_eq!(partition.worker_name("import"), "importWorker");
}

#[test]
fn test_load_builtin_by_name() {
    let def = load_job("credit-increase").unwrap();
    assert_eq!(def.name, "credit-increase");

    let err = load_job("no-such-job").unwrap_err();
    assert!(err.to_string().contains("Built-in jobs"));
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("job.yaml");
    std::fs::write(&path, CREDIT_JOB).unwrap();

    let def = load_job(&path).unwrap();
    assert_eq!(def.name, "credit-job");
}

// ============================================================================
// Validation Tests
// ============================================================================

#[test_case("name: x\nsteps: []\n", "no steps" ; "empty steps")]
#[test_case(
    "name: ''\nsteps:\n  - name: s\n    reader: {type: flat_file, resource: a.csv}\n",
    "name cannot be empty" ; "empty name"
)]
#[test_case(
    "name: x\nsteps:\n  - name: s\n    chunk_size: 0\n    reader: {type: flat_file, resource: a.csv}\n",
    "chunk_size" ; "zero chunk size"
)]
#[test_case(
    "name: x\nsteps:\n  - name: s\n    reader: {type: flat_file, resource: a.csv}\n  - name: s\n    reader: {type: flat_file, resource: b.csv}\n",
    "Duplicate step name" ; "duplicate steps"
)]
#[test_case(
    "name: x\nsteps:\n  - name: s\n    reader: {type: repository, threshold: '{{ job.credit }}'}\n",
    "undeclared parameter 'credit'" ; "undeclared parameter"
)]
#[test_case(
    "name: x\nsteps:\n  - name: s\n    reader: {type: flat_file, resource: '{{ partition.fileName }}'}\n",
    "not partitioned" ; "partition template without partition"
)]
#[test_case(
    "name: x\nsteps:\n  - name: s\n    reader: {type: repository, threshold: '1', page_size: 0}\n",
    "page_size" ; "zero page size"
)]
#[test_case(
    "name: x\nsteps:\n  - name: s\n    reader: {type: jdbc, query: q}\n",
    "Failed to parse job YAML" ; "unknown reader"
)]
fn test_invalid_definitions(yaml: &str, expected: &str) {
    let message = load_job_from_str(yaml).unwrap_err().to_string();
    assert!(message.contains(expected), "unexpected error: {message}");
}

#[test]
fn test_worker_name_clashing_with_step() {
    let yaml = r#"
name: x
steps:
  - name: step1
    reader: {type: flat_file, resource: a.csv}
  - name: manager
    partition:
      worker: step1
    reader: {type: flat_file, resource: "{{ partition.fileName }}"}
"#;
    let err = load_job_from_str(yaml).unwrap_err();
    assert!(err.to_string().contains("Duplicate step name 'step1'"));
}

#[test]
fn test_validator_for_declared_parameters() {
    let def = load_job_from_str(
        r#"
name: x
parameters:
  - name: credit
    type: double
  - name: note
    required: false
steps:
  - name: s
    reader: {type: repository, threshold: "{{ job.credit }}"}
"#,
    )
    .unwrap();
    let validator = validator_for(&def);

    let ok = JobParameters::builder().add_double("credit", 1.0).build();
    assert!(validator.validate(&ok).is_ok());

    let missing = JobParameters::new();
    assert!(validator.validate(&missing).is_err());

    let wrong_type = JobParameters::builder()
        .add_double("credit", 1.0)
        .add_long("note", 1)
        .build();
    assert!(validator.validate(&wrong_type).is_err());
}

// ============================================================================
// Factory Tests
// ============================================================================

#[test]
fn test_build_job_requires_parameters() {
    let def = load_job_from_str(CREDIT_JOB).unwrap();
    let store = CreditStore::open_in_memory().unwrap();

    let err = build_job(&def, &store, &JobParameters::new()).unwrap_err();
    assert!(matches!(err, Error::JobParameters { .. }));
}

#[test]
fn test_build_job_step_names() {
    let dir = tempfile::tempdir().unwrap();
    let pattern = dir.path().join("*.csv");
    let def = load_job_from_str(&partitioned_job(&pattern.display().to_string())).unwrap();
    let store = CreditStore::open_in_memory().unwrap();
    let params = JobParameters::builder().add_string("input", "unused").build();

    let job = build_job(&def, &store, &params).unwrap();
    assert_eq!(job.name(), "import");
    assert_eq!(job.step_names(), vec!["partitionJobStep"]);
}

#[test]
fn test_invalid_processor_amount() {
    let yaml = r#"
name: x
steps:
  - name: s
    reader: {type: repository, threshold: "1"}
    processor: {type: credit_increase, amount: "lots"}
"#;
    let def = load_job_from_str(yaml).unwrap();
    let store = CreditStore::open_in_memory().unwrap();

    let err = build_job(&def, &store, &JobParameters::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { .. }));
}

#[tokio::test]
async fn test_built_credit_job_runs() {
    let def = load_job_from_str(
        r#"
name: credit-job
parameters:
  - name: credit
    type: double
steps:
  - name: step1
    chunk_size: 2
    reader:
      type: repository
      threshold: "{{ job.credit }}"
    processor:
      type: credit_increase
      amount: "2.5"
"#,
    )
    .unwrap();
    let store = CreditStore::open_in_memory().unwrap();
    store
        .save_all(&[customer(1, "20000"), customer(2, "5000"), customer(3, "12000")])
        .await
        .unwrap();

    let params = JobParameters::builder().add_double("credit", 10000.0).build();
    let job = build_job(&def, &store, &params).unwrap();
    let execution = JobLauncher::new(JobRepository::in_memory())
        .run(&job, params)
        .await
        .unwrap();

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(execution.read_count(), 2);
    assert_eq!(execution.write_count(), 2);
    assert_eq!(
        store.find_all().await.unwrap(),
        vec![
            customer(1, "20002.5"),
            customer(2, "5000"),
            customer(3, "12002.5")
        ]
    );
}

#[tokio::test]
async fn test_built_partitioned_job_runs() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.csv"), "1,customer1,10\n2,customer2,20\n").unwrap();
    std::fs::write(dir.path().join("b.csv"), "3,customer3,30\n").unwrap();
    std::fs::write(dir.path().join("ignored.txt"), "4,customer4,40\n").unwrap();

    let def = load_job_from_str(&partitioned_job("{{ job.input }}")).unwrap();
    let store = CreditStore::open_in_memory().unwrap();
    let params = JobParameters::builder()
        .add_string("input", dir.path().join("*.csv").display().to_string())
        .build();

    let job = build_job(&def, &store, &params).unwrap();
    let execution = JobLauncher::new(JobRepository::in_memory())
        .run(&job, params)
        .await
        .unwrap();

    assert_eq!(execution.status, BatchStatus::Completed);
    assert!(execution.step("step1:partition0").is_some());
    assert!(execution.step("step1:partition1").is_some());
    assert_eq!(execution.write_count(), 3);
    assert_eq!(
        store.find_all().await.unwrap(),
        vec![customer(1, "15"), customer(2, "25"), customer(3, "35")]
    );
}

#[tokio::test]
async fn test_run_init_scripts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("seed.sql"),
        "INSERT INTO customer VALUES (1, 'customer1', '20000');",
    )
    .unwrap();

    let mut def = load_job_from_str(CREDIT_JOB).unwrap();
    def.init_scripts = vec!["seed.sql".to_string()];
    let store = CreditStore::open_in_memory().unwrap();

    run_init_scripts(&def, &store, dir.path()).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);

    def.init_scripts = vec!["missing.sql".to_string()];
    let err = run_init_scripts(&def, &store, dir.path())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound { .. }));
}
