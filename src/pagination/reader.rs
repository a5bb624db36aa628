//! Paginated repository reader

use super::types::{PageState, PagingRepository, DEFAULT_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::item::ItemReader;
use crate::state::ExecutionContext;
use async_trait::async_trait;
use std::collections::VecDeque;

/// Reads a repository query page by page, emitting records in key order
pub struct RepositoryItemReader<R: PagingRepository> {
    name: String,
    repository: R,
    page_size: usize,
    buffer: VecDeque<R::Item>,
    state: PageState,
    last_emitted: Option<i64>,
    read_count: u64,
    opened: bool,
}

impl<R: PagingRepository> RepositoryItemReader<R> {
    /// Create a reader with the default page size
    pub fn new(name: impl Into<String>, repository: R) -> Self {
        Self {
            name: name.into(),
            repository,
            page_size: DEFAULT_PAGE_SIZE,
            buffer: VecDeque::new(),
            state: PageState::new(),
            last_emitted: None,
            read_count: 0,
            opened: false,
        }
    }

    /// Set the page size (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Reader name, used as the checkpoint key prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured page size
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Current paging state
    pub fn state(&self) -> &PageState {
        &self.state
    }

    fn last_key_entry(&self) -> String {
        format!("{}.last_key", self.name)
    }

    fn read_count_entry(&self) -> String {
        format!("{}.read.count", self.name)
    }

    async fn fill_buffer(&mut self) -> Result<()> {
        let page = self
            .repository
            .fetch_page(self.state.last_fetched, self.page_size)
            .await?;
        let last_key = page.last().map(|item| self.repository.key_of(item));

        tracing::debug!(
            reader = %self.name,
            page = self.state.page,
            records = page.len(),
            after = ?self.state.last_fetched,
            "Fetched page"
        );

        self.state.record_page(page.len(), last_key, self.page_size);
        self.buffer.extend(page);
        Ok(())
    }
}

#[async_trait]
impl<R: PagingRepository> ItemReader<R::Item> for RepositoryItemReader<R> {
    async fn open(&mut self, context: &ExecutionContext) -> Result<()> {
        self.buffer.clear();
        self.read_count = context.get_u64(&self.read_count_entry()).unwrap_or(0);
        self.last_emitted = context.get_i64(&self.last_key_entry());
        self.state = match self.last_emitted {
            Some(key) => {
                tracing::info!(reader = %self.name, after = key, "Resuming paged read");
                PageState::resume_after(key)
            }
            None => PageState::new(),
        };
        self.opened = true;
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<R::Item>> {
        if !self.opened {
            return Err(Error::ReaderNotOpen {
                reader: self.name.clone(),
            });
        }

        if self.buffer.is_empty() && !self.state.done {
            self.fill_buffer().await?;
        }

        match self.buffer.pop_front() {
            Some(item) => {
                self.last_emitted = Some(self.repository.key_of(&item));
                self.read_count += 1;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    fn update(&self, context: &mut ExecutionContext) {
        if let Some(key) = self.last_emitted {
            context.put(self.last_key_entry(), key);
        }
        context.put(self.read_count_entry(), self.read_count);
    }

    async fn close(&mut self) -> Result<()> {
        self.buffer.clear();
        self.opened = false;
        Ok(())
    }
}
