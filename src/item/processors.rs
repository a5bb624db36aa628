//! Processor implementations

use super::types::{ItemProcessor, ProcessOutcome};
use crate::error::Result;
use crate::types::CustomerCredit;
use bigdecimal::BigDecimal;

/// Amount added to every customer's credit by default
pub const FIXED_AMOUNT: i64 = 5;

// ============================================================================
// Credit Increase
// ============================================================================

/// Increases a customer's credit by a fixed amount
#[derive(Debug, Clone)]
pub struct CreditIncreaseProcessor {
    amount: BigDecimal,
}

impl Default for CreditIncreaseProcessor {
    fn default() -> Self {
        Self {
            amount: BigDecimal::from(FIXED_AMOUNT),
        }
    }
}

impl CreditIncreaseProcessor {
    /// Create a processor adding [`FIXED_AMOUNT`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a processor adding a custom amount
    pub fn with_amount(amount: BigDecimal) -> Self {
        Self { amount }
    }

    /// Amount added per record
    pub fn amount(&self) -> &BigDecimal {
        &self.amount
    }
}

impl ItemProcessor<CustomerCredit, CustomerCredit> for CreditIncreaseProcessor {
    fn process(&self, item: &CustomerCredit) -> Result<ProcessOutcome<CustomerCredit>> {
        tracing::debug!(id = item.id, credit = %item.credit, "Processing item");
        Ok(ProcessOutcome::Emit(item.increase_credit_by(&self.amount)))
    }
}

// ============================================================================
// Pass Through
// ============================================================================

/// Emits every item unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughProcessor;

impl<T: Clone + Send + Sync> ItemProcessor<T, T> for PassThroughProcessor {
    fn process(&self, item: &T) -> Result<ProcessOutcome<T>> {
        Ok(ProcessOutcome::Emit(item.clone()))
    }
}
