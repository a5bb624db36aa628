//! Delimited line tokenizer

use super::types::{FieldSet, LineTokenizer};
use crate::error::{Error, Result};

/// Default field names of a customer credit line
pub(crate) const CUSTOMER_FIELDS: [&str; 3] = ["id", "name", "credit"];

/// Splits lines on a delimiter, honouring `"` quoted fields
#[derive(Debug, Clone)]
pub struct DelimitedLineTokenizer {
    delimiter: char,
    quote: char,
    names: Vec<String>,
    strict: bool,
}

impl Default for DelimitedLineTokenizer {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            names: CUSTOMER_FIELDS.iter().map(ToString::to_string).collect(),
            strict: true,
        }
    }
}

impl DelimitedLineTokenizer {
    /// Comma tokenizer for `id,name,credit`
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokenizer with a custom delimiter
    pub fn with_delimiter(delimiter: char) -> Self {
        Self {
            delimiter,
            ..Default::default()
        }
    }

    /// Set the field names
    #[must_use]
    pub fn names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Require the token count to equal the name count
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Delimiter character
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Field names
    pub fn field_names(&self) -> &[String] {
        &self.names
    }

    /// Split a line into trimmed tokens
    fn split(&self, line: &str) -> Result<Vec<String>> {
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            if c == self.quote {
                if in_quotes {
                    // Doubled quote is a literal quote
                    if chars.peek() == Some(&self.quote) {
                        current.push(self.quote);
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            } else if c == self.delimiter && !in_quotes {
                fields.push(current.trim().to_string());
                current = String::new();
            } else {
                current.push(c);
            }
        }

        if in_quotes {
            return Err(Error::invalid_field("line", "unterminated quoted field"));
        }

        fields.push(current.trim().to_string());
        Ok(fields)
    }
}

impl LineTokenizer for DelimitedLineTokenizer {
    fn tokenize(&self, line: &str) -> Result<FieldSet> {
        let mut values = self.split(line)?;

        if self.names.is_empty() {
            return Ok(FieldSet::new(Vec::new(), values));
        }

        if values.len() != self.names.len() {
            if self.strict {
                return Err(Error::invalid_field(
                    "line",
                    format!(
                        "expected {} tokens but found {}",
                        self.names.len(),
                        values.len()
                    ),
                ));
            }
            values.resize(self.names.len(), String::new());
        }

        Ok(FieldSet::new(self.names.clone(), values))
    }
}
