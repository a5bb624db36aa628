//! Tests for output module

use super::*;
use crate::database::CreditStore;
use crate::error::Error;
use crate::item::ItemWriter;
use crate::types::CustomerCredit;
use bigdecimal::BigDecimal;
use std::str::FromStr;

fn customer(id: i64, credit: &str) -> CustomerCredit {
    CustomerCredit::new(id, format!("customer{id}"), BigDecimal::from_str(credit).unwrap())
}

// ============================================================================
// RepositoryItemWriter Tests
// ============================================================================

#[tokio::test]
async fn test_repository_writer_upserts() {
    let store = CreditStore::open_in_memory().unwrap();
    store.save_all(&[customer(1, "20000")]).await.unwrap();

    let writer = RepositoryItemWriter::new(store.clone());
    writer
        .write(&[customer(1, "20005"), customer(2, "7")])
        .await
        .unwrap();

    assert_eq!(
        store.find_all().await.unwrap(),
        vec![customer(1, "20005"), customer(2, "7")]
    );
}

#[tokio::test]
async fn test_repository_writer_twice_is_idempotent() {
    let store = CreditStore::open_in_memory().unwrap();
    let writer = RepositoryItemWriter::new(store.clone());
    let chunk = vec![customer(1, "15"), customer(2, "25")];

    writer.write(&chunk).await.unwrap();
    writer.write(&chunk).await.unwrap();

    assert_eq!(store.find_all().await.unwrap(), chunk);
}

#[tokio::test]
async fn test_repository_writer_exact_credit() {
    let store = CreditStore::open_in_memory().unwrap();
    let writer = RepositoryItemWriter::new(store.clone());
    let chunk = vec![
        customer(1, "0.123456789012345"),
        customer(2, "123456789012345678901234567890"),
    ];

    writer.write(&chunk).await.unwrap();
    assert_eq!(store.find_all().await.unwrap(), chunk);
}

#[tokio::test]
async fn test_repository_writer_constraint_failure_not_retryable() {
    let store = CreditStore::open_in_memory().unwrap();
    store
        .run_script(
            "DROP TABLE customer;
             CREATE TABLE customer (
                 id BIGINT PRIMARY KEY,
                 name VARCHAR NOT NULL CHECK (name <> 'rejected'),
                 credit VARCHAR NOT NULL
             );",
        )
        .await
        .unwrap();
    let writer = RepositoryItemWriter::new(store.clone());
    let rejected = CustomerCredit::new(9, "rejected", BigDecimal::from(1));

    let err = writer.write(&[customer(1, "1"), rejected]).await.unwrap_err();
    assert!(matches!(err, Error::Database(_)));
    assert!(!err.is_retryable());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_repository_writer_empty_chunk() {
    let store = CreditStore::open_in_memory().unwrap();
    let writer = RepositoryItemWriter::new(store.clone());
    writer.write(&[]).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
}

// ============================================================================
// ListItemWriter Tests
// ============================================================================

#[tokio::test]
async fn test_list_writer_collects() {
    let writer = ListItemWriter::new();
    assert!(writer.is_empty());

    writer.write(&[1, 2]).await.unwrap();
    writer.write(&[3]).await.unwrap();

    assert_eq!(writer.written(), vec![1, 2, 3]);
    assert_eq!(writer.len(), 3);
}

#[tokio::test]
async fn test_list_writer_clones_share_items() {
    let writer = ListItemWriter::new();
    let handle = writer.clone();
    writer.write(&["a".to_string()]).await.unwrap();
    assert_eq!(handle.written(), vec!["a".to_string()]);
}
