//! Customer credit storage via DuckDB
//!
//! The repository reader pages from this store and the repository writer
//! upserts into it.

mod engine;

pub use engine::CreditStore;
