//! DuckDB-backed customer credit store
//!
//! Provides keyset-paginated predicate reads and transactional upserts.
//! The store is shared by every partition; DuckDB transactions on the single
//! connection are the only concurrency control.
//!
//! Credit balances are stored as their exact decimal text, so any precision
//! round-trips unchanged. Threshold comparisons happen on `BigDecimal`.

use crate::error::{Error, Result};
use crate::types::CustomerCredit;
use bigdecimal::BigDecimal;
use duckdb::{params, Connection};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Schema for the customer table
const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS customer (
    id BIGINT PRIMARY KEY,
    name VARCHAR NOT NULL,
    credit VARCHAR NOT NULL
);";

/// Upsert by identity so a retried chunk does not double-apply
const UPSERT_SQL: &str = "INSERT INTO customer (id, name, credit)
    VALUES (?, ?, ?)
    ON CONFLICT (id) DO UPDATE SET name = excluded.name, credit = excluded.credit";

/// Customer credit store on an embedded DuckDB database
pub struct CreditStore {
    /// DuckDB connection
    conn: Arc<Mutex<Connection>>,
    /// Database location (for logging)
    location: String,
}

impl CreditStore {
    /// Open (or create) a file-backed store
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            Error::config(format!(
                "Failed to open DuckDB database '{}': {e}",
                path.display()
            ))
        })?;
        Self::with_connection(conn, path.display().to_string())
    }

    /// Create an in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::config(format!("Failed to create DuckDB connection: {e}")))?;
        Self::with_connection(conn, ":memory:".to_string())
    }

    /// Open a store from a location string (`:memory:` or a file path)
    pub fn from_location(location: &str) -> Result<Self> {
        if location.is_empty() || location == ":memory:" {
            Self::open_in_memory()
        } else {
            Self::open(location)
        }
    }

    fn with_connection(conn: Connection, location: String) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::config(format!("Failed to create customer schema: {e}")))?;

        tracing::debug!(location = %location, "Opened credit store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location,
        })
    }

    /// Database location
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run a SQL script (schema or seed data)
    pub async fn run_script(&self, sql: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Run a SQL script from a file
    pub async fn run_script_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let sql = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::resource_not_found(path.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;
        tracing::info!(script = %path.display(), "Running SQL script");
        self.run_script(&sql).await
    }

    /// Fetch one page of customers with `credit > threshold`, ordered by id,
    /// starting strictly after `after_id` (from the lowest id when `None`)
    ///
    /// Rows are scanned in id order and compared exactly until the page is
    /// full.
    pub async fn find_by_credit_greater_than(
        &self,
        threshold: &BigDecimal,
        after_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<CustomerCredit>> {
        let conn = self.conn.lock().await;
        let mut stmt = match after_id {
            Some(_) => conn.prepare(
                "SELECT id, name, credit FROM customer WHERE id > ? ORDER BY id ASC",
            )?,
            None => conn.prepare("SELECT id, name, credit FROM customer ORDER BY id ASC")?,
        };
        let mut rows = match after_id {
            Some(id) => stmt.query(params![id])?,
            None => stmt.query([])?,
        };

        let mut customers = Vec::new();
        while customers.len() < limit {
            let Some(row) = rows.next()? else {
                break;
            };
            let credit = parse_decimal(&row.get::<_, String>(2)?)?;
            if &credit > threshold {
                customers.push(CustomerCredit::new(
                    row.get(0)?,
                    row.get::<_, String>(1)?,
                    credit,
                ));
            }
        }
        Ok(customers)
    }

    /// Upsert all customers in a single transaction
    ///
    /// Either every row is stored or, on any error, none is.
    pub async fn save_all(&self, customers: &[CustomerCredit]) -> Result<()> {
        if customers.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for customer in customers {
                stmt.execute(params![
                    customer.id,
                    customer.name,
                    customer.credit.to_string()
                ])?;
            }
        }
        tx.commit()?;

        tracing::trace!(count = customers.len(), "Saved customers");
        Ok(())
    }

    /// Find a customer by id
    pub async fn find_by_id(&self, id: i64) -> Result<Option<CustomerCredit>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT id, name, credit FROM customer WHERE id = ?")?;
        let mut rows = stmt.query(params![id])?;

        match rows.next()? {
            Some(row) => {
                let credit: String = row.get(2)?;
                Ok(Some(CustomerCredit::new(
                    row.get(0)?,
                    row.get::<_, String>(1)?,
                    parse_decimal(&credit)?,
                )))
            }
            None => Ok(None),
        }
    }

    /// All customers ordered by id
    pub async fn find_all(&self) -> Result<Vec<CustomerCredit>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT id, name, credit FROM customer ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut customers = Vec::new();
        for row in rows {
            let (id, name, credit) = row?;
            customers.push(CustomerCredit::new(id, name, parse_decimal(&credit)?));
        }
        Ok(customers)
    }

    /// Number of stored customers
    pub async fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM customer", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete every customer
    pub async fn delete_all(&self) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute_batch("DELETE FROM customer;")?;
        Ok(())
    }
}

impl Clone for CreditStore {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            location: self.location.clone(),
        }
    }
}

impl std::fmt::Debug for CreditStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreditStore")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Parse a stored credit balance
fn parse_decimal(value: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(value.trim()).map_err(|_| Error::InvalidDecimal {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Customer table that refuses the name `rejected`
    const REJECTING_SCHEMA_SQL: &str = "DROP TABLE customer;
        CREATE TABLE customer (
            id BIGINT PRIMARY KEY,
            name VARCHAR NOT NULL CHECK (name <> 'rejected'),
            credit VARCHAR NOT NULL
        );";

    fn customer(id: i64, credit: &str) -> CustomerCredit {
        CustomerCredit::new(id, format!("customer{id}"), BigDecimal::from_str(credit).unwrap())
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("20005").unwrap(), BigDecimal::from(20005));
        assert_eq!(parse_decimal("10.25").unwrap().to_string(), "10.25");
        assert_eq!(parse_decimal(" 42 ").unwrap(), BigDecimal::from(42));
        assert!(parse_decimal("abc").is_err());
    }

    #[tokio::test]
    async fn test_credit_round_trips_exactly() {
        let store = CreditStore::open_in_memory().unwrap();
        let fractional = customer(1, "0.123456789012345");
        let wide = customer(2, "123456789012345678901234567890.000000000000001");
        store
            .save_all(&[fractional.clone(), wide.clone()])
            .await
            .unwrap();

        let read_back = store.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(read_back, fractional);
        assert_eq!(read_back.credit.to_string(), "0.123456789012345");
        assert_eq!(store.find_by_id(2).await.unwrap(), Some(wide));
    }

    #[tokio::test]
    async fn test_threshold_compares_exactly() {
        let store = CreditStore::open_in_memory().unwrap();
        store
            .save_all(&[
                customer(1, "10000.000000000000001"),
                customer(2, "10000"),
                customer(3, "9999.999999999999999"),
            ])
            .await
            .unwrap();

        let page = store
            .find_by_credit_greater_than(&BigDecimal::from(10000), None, 10)
            .await
            .unwrap();
        assert_eq!(page.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn test_first_page_includes_lowest_id() {
        let store = CreditStore::open_in_memory().unwrap();
        store
            .save_all(&[customer(i64::MIN, "20000"), customer(0, "20000")])
            .await
            .unwrap();

        let page = store
            .find_by_credit_greater_than(&BigDecimal::from(10000), None, 10)
            .await
            .unwrap();
        assert_eq!(
            page.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![i64::MIN, 0]
        );
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let store = CreditStore::open_in_memory().unwrap();
        store
            .save_all(&[customer(1, "20000"), customer(2, "5000")])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(
            store.find_by_id(1).await.unwrap(),
            Some(customer(1, "20000"))
        );
        assert_eq!(store.find_by_id(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = CreditStore::open_in_memory().unwrap();
        store.save_all(&[customer(1, "10")]).await.unwrap();
        store.save_all(&[customer(1, "15")]).await.unwrap();
        store.save_all(&[customer(1, "15")]).await.unwrap();

        let all = store.find_all().await.unwrap();
        assert_eq!(all, vec![customer(1, "15")]);
    }

    #[tokio::test]
    async fn test_failed_transaction_rolls_back() {
        let store = CreditStore::open_in_memory().unwrap();
        store.run_script(REJECTING_SCHEMA_SQL).await.unwrap();

        let bad = CustomerCredit::new(3, "rejected", BigDecimal::from(1));
        let result = store.save_all(&[customer(2, "1"), bad]).await;

        assert!(matches!(result, Err(Error::Database(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_keyset_pagination() {
        let store = CreditStore::open_in_memory().unwrap();
        store
            .save_all(&[
                customer(1, "20000"),
                customer(2, "5000"),
                customer(3, "15000"),
                customer(4, "30000"),
                customer(5, "10000"),
            ])
            .await
            .unwrap();

        let threshold = BigDecimal::from(10000);
        let page1 = store
            .find_by_credit_greater_than(&threshold, None, 2)
            .await
            .unwrap();
        assert_eq!(page1.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 3]);

        let page2 = store
            .find_by_credit_greater_than(&threshold, Some(3), 2)
            .await
            .unwrap();
        assert_eq!(page2.iter().map(|c| c.id).collect::<Vec<_>>(), vec![4]);

        let page3 = store
            .find_by_credit_greater_than(&threshold, Some(4), 2)
            .await
            .unwrap();
        assert!(page3.is_empty());
    }

    #[tokio::test]
    async fn test_run_script_file_missing() {
        let store = CreditStore::open_in_memory().unwrap();
        let err = store
            .run_script_file("/definitely/not/here.sql")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credits.duckdb");

        {
            let store = CreditStore::open(&path).unwrap();
            store.save_all(&[customer(1, "1.5")]).await.unwrap();
        }

        let reopened = CreditStore::open(&path).unwrap();
        assert_eq!(reopened.find_all().await.unwrap(), vec![customer(1, "1.5")]);
    }
}
