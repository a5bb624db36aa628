//! Flat-file item reader

use super::tokenizer::DelimitedLineTokenizer;
use super::types::{FieldSetMapper, LineTokenizer};
use crate::error::{Error, Result};
use crate::item::ItemReader;
use crate::state::ExecutionContext;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

/// Reads a delimited text resource line by line
///
/// Blank lines and lines starting with `#` are ignored. Any line that fails to
/// tokenize or map aborts the read with [`Error::Parse`] carrying the
/// resource and 1-based line number.
pub struct FlatFileItemReader<T, M> {
    name: String,
    resource: PathBuf,
    tokenizer: Box<dyn LineTokenizer>,
    mapper: M,
    lines_to_skip: usize,
    lines: Option<Lines<BufReader<File>>>,
    line_number: usize,
    read_count: u64,
    _item: PhantomData<fn() -> T>,
}

impl<T, M: FieldSetMapper<T>> FlatFileItemReader<T, M> {
    /// Create a reader with the default comma tokenizer
    pub fn new(name: impl Into<String>, resource: impl AsRef<Path>, mapper: M) -> Self {
        Self {
            name: name.into(),
            resource: resource.as_ref().to_path_buf(),
            tokenizer: Box::new(DelimitedLineTokenizer::new()),
            mapper,
            lines_to_skip: 0,
            lines: None,
            line_number: 0,
            read_count: 0,
            _item: PhantomData,
        }
    }

    /// Use a custom tokenizer
    #[must_use]
    pub fn with_tokenizer(mut self, tokenizer: impl LineTokenizer + 'static) -> Self {
        self.tokenizer = Box::new(tokenizer);
        self
    }

    /// Skip header lines at the top of the resource
    #[must_use]
    pub fn with_lines_to_skip(mut self, lines: usize) -> Self {
        self.lines_to_skip = lines;
        self
    }

    /// Resource path
    pub fn resource(&self) -> &Path {
        &self.resource
    }

    /// Reader name, used as the checkpoint key prefix
    pub fn name(&self) -> &str {
        &self.name
    }

    fn read_count_entry(&self) -> String {
        format!("{}.read.count", self.name)
    }

    fn resource_name(&self) -> String {
        self.resource.display().to_string()
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        let Some(lines) = self.lines.as_mut() else {
            return Err(Error::ReaderNotOpen {
                reader: self.name.clone(),
            });
        };

        let line = lines.next_line().await.map_err(|e| {
            Error::parse(self.resource.display().to_string(), self.line_number + 1, e.to_string())
        })?;
        if line.is_some() {
            self.line_number += 1;
        }
        Ok(line)
    }

    async fn next_record(&mut self) -> Result<Option<T>> {
        while let Some(line) = self.next_line().await? {
            let content = line.trim_end_matches('\r');
            if content.trim().is_empty() || content.trim_start().starts_with('#') {
                continue;
            }

            let item = self
                .tokenizer
                .tokenize(content)
                .and_then(|fields| self.mapper.map_field_set(&fields))
                .map_err(|e| Error::parse(self.resource_name(), self.line_number, e.to_string()))?;
            return Ok(Some(item));
        }
        Ok(None)
    }
}

#[async_trait]
impl<T, M> ItemReader<T> for FlatFileItemReader<T, M>
where
    T: Send,
    M: FieldSetMapper<T>,
{
    async fn open(&mut self, context: &ExecutionContext) -> Result<()> {
        let file = File::open(&self.resource).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::resource_not_found(self.resource_name())
            } else {
                Error::Io(e)
            }
        })?;

        self.lines = Some(BufReader::new(file).lines());
        self.line_number = 0;
        self.read_count = 0;

        for _ in 0..self.lines_to_skip {
            if self.next_line().await?.is_none() {
                break;
            }
        }

        let committed = context.get_u64(&self.read_count_entry()).unwrap_or(0);
        if committed > 0 {
            tracing::info!(
                reader = %self.name,
                resource = %self.resource.display(),
                skip = committed,
                "Resuming flat file read"
            );
            while self.read_count < committed {
                if self.next_record().await?.is_none() {
                    break;
                }
                self.read_count += 1;
            }
        }

        tracing::debug!(reader = %self.name, resource = %self.resource.display(), "Opened resource");
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<T>> {
        let item = self.next_record().await?;
        if item.is_some() {
            self.read_count += 1;
        }
        Ok(item)
    }

    fn update(&self, context: &mut ExecutionContext) {
        context.put(self.read_count_entry(), self.read_count);
    }

    async fn close(&mut self) -> Result<()> {
        self.lines = None;
        Ok(())
    }
}
