//! Common types used throughout Solidafy Batch
//!
//! This module contains the customer credit record the built-in jobs
//! operate on.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Customer Credit
// ============================================================================

/// A customer and their credit balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerCredit {
    /// Identity, also the sort key for paginated reads
    pub id: i64,
    /// Customer name
    pub name: String,
    /// Credit balance
    pub credit: BigDecimal,
}

impl CustomerCredit {
    /// Create a new customer credit record
    pub fn new(id: i64, name: impl Into<String>, credit: BigDecimal) -> Self {
        Self {
            id,
            name: name.into(),
            credit,
        }
    }

    /// Return a copy with the credit increased by `amount`
    #[must_use]
    pub fn increase_credit_by(&self, amount: &BigDecimal) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            credit: &self.credit + amount,
        }
    }
}

impl fmt::Display for CustomerCredit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CustomerCredit [id={}, name={}, credit={}]",
            self.id, self.name, self.credit
        )
    }
}
