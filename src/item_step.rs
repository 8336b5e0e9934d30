//! Chunk-oriented step: read, process and write items chunk by chunk.

use crate::chunk::split_in_chunks;
use crate::config::ItemStepConfig;
use crate::error::BatchError;
use crate::exit_status::ExitStatus;
use crate::item::{ItemProcessor, ItemReader, ItemWriter, Processed};
use crate::step::{StepContext, Tasklet};
use async_trait::async_trait;
use std::fmt;
use tracing::debug;

/// A [`Tasklet`] that streams items from a reader through a processor into
/// a writer, holding at most one chunk in memory.
///
/// The cancellation token is checked before every chunk. Items the
/// processor skips are recorded as warnings and reported with
/// `INVALID_ITEM`; a fatal processor result or a writer error aborts the
/// step. When the reader yields nothing the step reports `NOOP`.
///
/// # Examples
///
/// ```
/// use hataori::prelude::*;
/// use async_trait::async_trait;
///
/// struct PrintWriter;
///
/// #[async_trait]
/// impl ItemWriter<u32> for PrintWriter {
///     async fn write(&self, items: &[u32]) -> Result<(), BatchError> {
///         println!("{items:?}");
///         Ok(())
///     }
/// }
///
/// let step = ItemStep::new(|| 1..=250u32, PassThroughProcessor, PrintWriter)
///     .with_config(ItemStepConfig::with_batch_size(50));
/// ```
pub struct ItemStep<I, O> {
    reader: Box<dyn ItemReader<I>>,
    processor: Box<dyn ItemProcessor<I, O>>,
    writer: Box<dyn ItemWriter<O>>,
    config: ItemStepConfig,
}

impl<I, O> fmt::Debug for ItemStep<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemStep")
            .field("config", &self.config)
            .finish()
    }
}

impl<I, O> ItemStep<I, O> {
    /// Creates an item step with the default configuration.
    pub fn new<R, P, W>(reader: R, processor: P, writer: W) -> Self
    where
        R: ItemReader<I> + 'static,
        P: ItemProcessor<I, O> + 'static,
        W: ItemWriter<O> + 'static,
    {
        Self {
            reader: Box::new(reader),
            processor: Box::new(processor),
            writer: Box::new(writer),
            config: ItemStepConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: ItemStepConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ItemStepConfig {
        &self.config
    }
}

#[async_trait]
impl<I, O> Tasklet for ItemStep<I, O>
where
    I: Send + 'static,
    O: Send + Sync + 'static,
{
    async fn execute(&self, ctx: &mut StepContext<'_>) -> Result<(), BatchError> {
        self.config.validate()?;
        let items = self.reader.open()?;
        let chunks = split_in_chunks(items, self.config.batch_size)
            .map_err(|e| BatchError::Configuration(e.to_string()))?;

        for chunk in chunks {
            if ctx.is_cancelled() {
                return Err(BatchError::interrupted(format!(
                    "stop requested before chunk {}",
                    chunk.number
                )));
            }

            let number = chunk.number;
            let mut processed = Vec::with_capacity(chunk.len());
            for item in chunk.items {
                ctx.execution_mut().increment_read_count();
                match self.processor.process(item).await {
                    Processed::Transformed(output) => processed.push(output),
                    Processed::Skipped(invalid) => ctx.skip_item(invalid),
                    Processed::Fatal(error) => return Err(error),
                }
            }

            if !processed.is_empty() {
                self.writer
                    .write(&processed)
                    .await
                    .map_err(|source| BatchError::Write {
                        chunk: number,
                        items: processed.len(),
                        source: Box::new(source),
                    })?;
                ctx.execution_mut().increment_write_count(processed.len());
            }
            debug!(
                "Step '{}' wrote chunk {} ({} items)",
                ctx.step_name(),
                number,
                processed.len()
            );
        }

        let exit_status = if ctx.execution().read_count() == 0 {
            ExitStatus::noop().with_description("no items to process")
        } else {
            ExitStatus::completed()
        };
        ctx.execution_mut().set_exit_status(exit_status);
        Ok(())
    }
}
