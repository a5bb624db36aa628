//! Pagination types and traits
//!
//! Defines the core paging abstractions used by the repository reader.

use crate::error::Result;
use async_trait::async_trait;

/// Page size used when none is configured
pub const DEFAULT_PAGE_SIZE: usize = 2;

/// A sorted, filterable record source that can be read one page at a time
///
/// Pages are keyset-based: each call asks for the records strictly after the
/// last key already seen, so rows updated between pages are never returned
/// twice.
#[async_trait]
pub trait PagingRepository: Send + Sync {
    /// Record type returned by the query
    type Item: Send;

    /// Fetch up to `page_size` records whose sort key is greater than `after`
    async fn fetch_page(&self, after: Option<i64>, page_size: usize) -> Result<Vec<Self::Item>>;

    /// Sort key of a record
    fn key_of(&self, item: &Self::Item) -> i64;
}

/// Tracks paging state during iteration
#[derive(Debug, Clone, Default)]
pub struct PageState {
    /// Number of pages fetched so far
    pub page: u32,
    /// Key of the last fetched record
    pub last_fetched: Option<i64>,
    /// Total records fetched so far
    pub total_fetched: u64,
    /// Is paging complete?
    pub done: bool,
}

impl PageState {
    /// Create a new page state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state that resumes after a checkpointed key
    pub fn resume_after(key: i64) -> Self {
        Self {
            last_fetched: Some(key),
            ..Default::default()
        }
    }

    /// Mark paging as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Record a fetched page
    ///
    /// A short page means the query is exhausted.
    pub fn record_page(&mut self, count: usize, last_key: Option<i64>, page_size: usize) {
        self.page += 1;
        self.total_fetched += count as u64;
        if let Some(key) = last_key {
            self.last_fetched = Some(key);
        }
        if count < page_size {
            self.done = true;
        }
    }
}
