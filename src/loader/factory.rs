//! Job factory
//!
//! Turns a validated `JobDefinition` into a runnable `Job`. Job parameter
//! templates are rendered here; partition templates are rendered inside the
//! reader factory, once per partition, against that partition's context.
//! Partition resources are discovered when the partitioned step runs.

use crate::database::CreditStore;
use crate::decode::{CustomerCreditFieldSetMapper, DelimitedLineTokenizer, FlatFileItemReader};
use crate::engine::{ChunkStep, Step};
use crate::error::{Error, Result};
use crate::item::{CreditIncreaseProcessor, ItemProcessor, ItemWriter, PassThroughProcessor};
use crate::job::{Job, JobParameters, JobParametersValidator};
use crate::loader::types::{
    JobDefinition, PartitionDefinition, ProcessorDefinition, ReaderDefinition, StepDefinition,
    WriterDefinition,
};
use crate::output::{ListItemWriter, RepositoryItemWriter};
use crate::pagination::{CreditAboveThreshold, RepositoryItemReader};
use crate::partition::{
    MultiResourcePartitioner, PartitionStep, Partitioner, SimplePartitioner,
};
use crate::state::ExecutionContext;
use crate::template::{render, TemplateContext};
use crate::types::CustomerCredit;
use bigdecimal::BigDecimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Parameter validator for a definition's declared parameters
pub fn validator_for(def: &JobDefinition) -> JobParametersValidator {
    def.parameters
        .iter()
        .fold(JobParametersValidator::new(), |validator, p| {
            if p.required {
                validator.require(&p.name, p.parameter_type)
            } else {
                validator.optional(&p.name, p.parameter_type)
            }
        })
}

/// Build a runnable job from a definition, a store and launch parameters
pub fn build_job(
    def: &JobDefinition,
    store: &CreditStore,
    parameters: &JobParameters,
) -> Result<Job> {
    let validator = validator_for(def);
    validator.validate(parameters)?;

    let ctx = TemplateContext::for_job(parameters);
    let mut builder = Job::builder(&def.name)
        .validator(validator)
        .restartable(def.restartable);

    for step in &def.steps {
        builder = builder.shared_step(build_step(step, store, &ctx)?);
    }

    builder.build()
}

/// Run a definition's init scripts against the store
///
/// Relative script paths resolve against `base_dir`.
pub async fn run_init_scripts(
    def: &JobDefinition,
    store: &CreditStore,
    base_dir: impl AsRef<Path>,
) -> Result<()> {
    for script in &def.init_scripts {
        let path = base_dir.as_ref().join(script);
        store.run_script_file(&path).await?;
    }
    Ok(())
}

fn build_step(
    def: &StepDefinition,
    store: &CreditStore,
    ctx: &TemplateContext,
) -> Result<Arc<dyn Step>> {
    let Some(partition) = &def.partition else {
        return Ok(Arc::new(build_chunk_step(&def.name, def, store, ctx)?));
    };

    let worker = build_chunk_step(&partition.worker_name(&def.name), def, store, ctx)?;

    if partition.resources.is_empty() {
        return Ok(Arc::new(partition_step(
            def,
            partition,
            SimplePartitioner,
            worker,
        )));
    }

    let mut partitioner =
        MultiResourcePartitioner::new::<&str>(&[]).with_key_name(partition.key.clone());
    for pattern in &partition.resources {
        partitioner = partitioner.with_pattern(render(pattern, ctx)?);
    }

    Ok(Arc::new(partition_step(def, partition, partitioner, worker)))
}

fn partition_step<P: Partitioner + 'static>(
    def: &StepDefinition,
    partition: &PartitionDefinition,
    partitioner: P,
    worker: ChunkStep<CustomerCredit, CustomerCredit>,
) -> PartitionStep {
    let step = PartitionStep::new(&def.name, partitioner, worker).with_grid_size(partition.grid_size);
    match partition.max_workers {
        Some(max_workers) => step.with_max_workers(max_workers),
        None => step,
    }
}

fn build_chunk_step(
    name: &str,
    def: &StepDefinition,
    store: &CreditStore,
    ctx: &TemplateContext,
) -> Result<ChunkStep<CustomerCredit, CustomerCredit>> {
    let builder = ChunkStep::builder(name)
        .chunk_size(def.chunk_size)
        .write_retry_limit(def.write_retry_limit)
        .shared_processor(build_processor(&def.processor)?)
        .shared_writer(build_writer(&def.writer, store));

    let builder = match &def.reader {
        ReaderDefinition::Repository {
            threshold,
            page_size,
            name,
        } => {
            let threshold = parse_decimal_field(
                &format!("{}.reader.threshold", def.name),
                &render(threshold, ctx)?,
            )?;
            let reader_name = name
                .clone()
                .unwrap_or_else(|| "repositoryItemReader".to_string());
            let page_size = *page_size;
            let store = store.clone();

            builder.reader(move |_: &ExecutionContext| {
                let repository = CreditAboveThreshold::new(store.clone(), threshold.clone());
                Ok(RepositoryItemReader::new(reader_name.clone(), repository)
                    .with_page_size(page_size))
            })
        }
        ReaderDefinition::FlatFile {
            resource,
            delimiter,
            lines_to_skip,
            strict,
            name,
        } => {
            let template = resource.clone();
            let reader_name = name
                .clone()
                .unwrap_or_else(|| "flatFileItemReader".to_string());
            let (delimiter, lines_to_skip, strict) = (*delimiter, *lines_to_skip, *strict);
            let ctx = ctx.clone();

            builder.reader(move |context: &ExecutionContext| {
                let resource = render(&template, &ctx.clone().with_partition(context))?;
                let tokenizer = DelimitedLineTokenizer::with_delimiter(delimiter).strict(strict);
                let reader: FlatFileItemReader<CustomerCredit, _> =
                    FlatFileItemReader::new(reader_name.clone(), resource, CustomerCreditFieldSetMapper);
                Ok(reader
                    .with_tokenizer(tokenizer)
                    .with_lines_to_skip(lines_to_skip))
            })
        }
    };

    builder.build()
}

fn build_processor(
    def: &ProcessorDefinition,
) -> Result<Arc<dyn ItemProcessor<CustomerCredit, CustomerCredit>>> {
    Ok(match def {
        ProcessorDefinition::CreditIncrease { amount: None } => {
            Arc::new(CreditIncreaseProcessor::new())
        }
        ProcessorDefinition::CreditIncrease {
            amount: Some(amount),
        } => Arc::new(CreditIncreaseProcessor::with_amount(parse_decimal_field(
            "processor.amount",
            amount,
        )?)),
        ProcessorDefinition::PassThrough => Arc::new(PassThroughProcessor),
    })
}

fn build_writer(def: &WriterDefinition, store: &CreditStore) -> Arc<dyn ItemWriter<CustomerCredit>> {
    match def {
        WriterDefinition::Repository => Arc::new(RepositoryItemWriter::new(store.clone())),
        WriterDefinition::Memory => Arc::new(ListItemWriter::<CustomerCredit>::new()),
    }
}

fn parse_decimal_field(field: &str, value: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(value.trim()).map_err(|_| Error::InvalidConfigValue {
        field: field.to_string(),
        message: format!("'{value}' is not a decimal number"),
    })
}
