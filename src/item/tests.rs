//! Tests for item module

use super::*;
use crate::error::{Error, Result};
use crate::types::CustomerCredit;
use bigdecimal::BigDecimal;
use std::str::FromStr;

fn customer(id: i64, credit: &str) -> CustomerCredit {
    CustomerCredit::new(id, format!("customer{id}"), BigDecimal::from_str(credit).unwrap())
}

// ============================================================================
// CreditIncreaseProcessor Tests
// ============================================================================

#[test]
fn test_credit_increase_default_amount() {
    let processor = CreditIncreaseProcessor::new();
    assert_eq!(processor.amount(), &BigDecimal::from(5));

    let out = processor.process(&customer(1, "20000")).unwrap();
    assert_eq!(out, ProcessOutcome::Emit(customer(1, "20005")));
}

#[test]
fn test_credit_increase_custom_amount() {
    let processor = CreditIncreaseProcessor::with_amount(BigDecimal::from_str("0.01").unwrap());
    let out = processor.process(&customer(2, "1.99")).unwrap();
    assert_eq!(out.into_item().unwrap().credit, BigDecimal::from(2));
}

#[test]
fn test_credit_increase_is_pure() {
    let processor = CreditIncreaseProcessor::new();
    let input = customer(3, "100");

    let first = processor.process(&input).unwrap();
    let second = processor.process(&input).unwrap();

    assert_eq!(first, second);
    assert_eq!(input.credit, BigDecimal::from(100));
}

// ============================================================================
// PassThrough / Closure Tests
// ============================================================================

#[test]
fn test_pass_through() {
    let processor = PassThroughProcessor;
    let out: ProcessOutcome<CustomerCredit> = processor.process(&customer(4, "9")).unwrap();
    assert_eq!(out, ProcessOutcome::Emit(customer(4, "9")));
}

#[test]
fn test_closure_processor_can_skip() {
    let skip_even = |c: &CustomerCredit| -> Result<ProcessOutcome<CustomerCredit>> {
        if c.id % 2 == 0 {
            Ok(ProcessOutcome::Skip)
        } else {
            Ok(ProcessOutcome::Emit(c.clone()))
        }
    };

    assert!(skip_even.process(&customer(2, "1")).unwrap().is_skip());
    assert!(!skip_even.process(&customer(1, "1")).unwrap().is_skip());
}

#[test]
fn test_closure_processor_error() {
    let failing =
        |_: &CustomerCredit| -> Result<ProcessOutcome<CustomerCredit>> { Err(Error::process("nope")) };
    assert!(failing.process(&customer(1, "1")).is_err());
}

#[test]
fn test_process_outcome_into_item() {
    assert_eq!(ProcessOutcome::Emit(5).into_item(), Some(5));
    assert_eq!(ProcessOutcome::<i32>::Skip.into_item(), None);
}
