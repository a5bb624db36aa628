//! Flat-file decoder module
//!
//! Supports: delimited text lines (comma by default, quoted fields)
//!
//! # Overview
//!
//! A line is split into a `FieldSet` by a `LineTokenizer`, and a
//! `FieldSetMapper` turns the field set into a typed item.
//! `FlatFileItemReader` drives both over a file resource, one line at a time.

mod reader;
mod tokenizer;
mod types;

pub use reader::FlatFileItemReader;
pub use tokenizer::DelimitedLineTokenizer;
pub use types::{CustomerCreditFieldSetMapper, FieldSet, FieldSetMapper, LineTokenizer};
