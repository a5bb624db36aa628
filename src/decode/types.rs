//! Decoder types and traits
//!
//! Defines the field set abstraction shared by tokenizers and mappers.

use crate::error::{Error, Result};
use crate::types::CustomerCredit;
use bigdecimal::BigDecimal;
use std::str::FromStr;

/// Named string fields of one tokenized line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldSet {
    names: Vec<String>,
    values: Vec<String>,
}

impl FieldSet {
    /// Create a field set; unnamed trailing values are addressable by index only
    pub fn new(names: Vec<String>, values: Vec<String>) -> Self {
        Self { names, values }
    }

    /// Field names
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Field values in line order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the field set has no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value at an index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Raw value of a named field
    pub fn read_string(&self, name: &str) -> Result<&str> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.get(i))
            .ok_or_else(|| Error::invalid_field(name, "field not present"))
    }

    /// Named field as a 64-bit integer
    pub fn read_i64(&self, name: &str) -> Result<i64> {
        let raw = self.read_string(name)?;
        raw.parse()
            .map_err(|_| Error::invalid_field(name, format!("'{raw}' is not an integer")))
    }

    /// Named field as an arbitrary precision decimal
    pub fn read_decimal(&self, name: &str) -> Result<BigDecimal> {
        let raw = self.read_string(name)?;
        BigDecimal::from_str(raw)
            .map_err(|_| Error::invalid_field(name, format!("'{raw}' is not a decimal")))
    }
}

/// Splits one line into a field set
pub trait LineTokenizer: Send + Sync {
    /// Tokenize a line (without its terminator)
    fn tokenize(&self, line: &str) -> Result<FieldSet>;
}

/// Maps a field set to a typed item
pub trait FieldSetMapper<T>: Send + Sync {
    /// Build an item from the fields
    fn map_field_set(&self, fields: &FieldSet) -> Result<T>;
}

/// Maps `id,name,credit` fields to a [`CustomerCredit`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerCreditFieldSetMapper;

impl FieldSetMapper<CustomerCredit> for CustomerCreditFieldSetMapper {
    fn map_field_set(&self, fields: &FieldSet) -> Result<CustomerCredit> {
        Ok(CustomerCredit::new(
            fields.read_i64("id")?,
            fields.read_string("name")?,
            fields.read_decimal("credit")?,
        ))
    }
}
