//! Repository query implementations

use super::types::PagingRepository;
use crate::database::CreditStore;
use crate::error::Result;
use crate::types::CustomerCredit;
use async_trait::async_trait;
use bigdecimal::BigDecimal;

/// Customers with `credit > threshold`, sorted by id ascending
#[derive(Debug, Clone)]
pub struct CreditAboveThreshold {
    store: CreditStore,
    threshold: BigDecimal,
}

impl CreditAboveThreshold {
    /// Create the query
    pub fn new(store: CreditStore, threshold: BigDecimal) -> Self {
        Self { store, threshold }
    }

    /// Credit threshold (exclusive)
    pub fn threshold(&self) -> &BigDecimal {
        &self.threshold
    }
}

#[async_trait]
impl PagingRepository for CreditAboveThreshold {
    type Item = CustomerCredit;

    async fn fetch_page(&self, after: Option<i64>, page_size: usize) -> Result<Vec<CustomerCredit>> {
        self.store
            .find_by_credit_greater_than(&self.threshold, after, page_size)
            .await
    }

    fn key_of(&self, item: &CustomerCredit) -> i64 {
        item.id
    }
}
