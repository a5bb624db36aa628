//! Pagination module
//!
//! Supports: keyset paging over a sorted repository query
//!
//! # Overview
//!
//! A `PagingRepository` answers "the next `page_size` matching records after
//! key K". `RepositoryItemReader` turns those pages into a lazy, ordered item
//! stream and checkpoints the last emitted key so a restarted step resumes
//! without re-reading committed records.

mod reader;
mod repositories;
mod types;

pub use reader::RepositoryItemReader;
pub use repositories::CreditAboveThreshold;
pub use types::{PageState, PagingRepository, DEFAULT_PAGE_SIZE};
