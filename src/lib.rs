//! # Hataori (機織り)
//!
//! A lightweight batch job engine for Rust.
//!
//! "Hataori" means weaving on a loom: a job passes its data through a fixed
//! sequence of steps, one row of items at a time.
//!
//! ## Features
//!
//! - **Step lifecycle**: every step runs through the same protocol of
//!   lifecycle events, repository checkpoints and failure classification
//! - **Status lattice**: [`BatchStatus`] values merge by severity, so a job's
//!   status is the aggregate of its steps'
//! - **Exit status**: [`ExitStatus`] combines outcomes with an explicit
//!   precedence table and keeps every description
//! - **Chunked items**: [`ItemStep`] reads, processes and writes items in
//!   fixed-size chunks with [`split_in_chunks`], holding one chunk in memory
//! - **Cooperative cancellation**: a [`CancellationToken`] is honoured after
//!   each step and between chunks
//!
//! ## Quick Start
//!
//! ```rust
//! use hataori::prelude::*;
//! use async_trait::async_trait;
//!
//! struct Greet;
//!
//! #[async_trait]
//! impl Tasklet for Greet {
//!     async fn execute(&self, ctx: &mut StepContext<'_>) -> Result<(), BatchError> {
//!         println!("hello from {}", ctx.step_name());
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let job = Job::builder("greetings")
//!     .add_step("greet", Greet)
//!     .build()
//!     .expect("valid job");
//!
//! let execution = job
//!     .launch(&CancellationToken::new())
//!     .await
//!     .expect("repository available");
//!
//! assert_eq!(execution.status(), BatchStatus::Completed);
//! # }
//! ```
//!
//! ## Chunk-Oriented Steps
//!
//! ```rust
//! use hataori::prelude::*;
//! use async_trait::async_trait;
//!
//! struct ParseQuantity;
//!
//! #[async_trait]
//! impl ItemProcessor<String, u32> for ParseQuantity {
//!     async fn process(&self, line: String) -> Processed<u32> {
//!         match line.trim().parse() {
//!             Ok(quantity) => Processed::Transformed(quantity),
//!             Err(_) => Processed::skipped("not a quantity", line.into()),
//!         }
//!     }
//! }
//!
//! struct Discard;
//!
//! #[async_trait]
//! impl ItemWriter<u32> for Discard {
//!     async fn write(&self, _items: &[u32]) -> Result<(), BatchError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let lines = || vec!["3".to_string(), "x".to_string(), "7".to_string()];
//! let job = Job::builder("import")
//!     .add_step(
//!         "quantities",
//!         ItemStep::new(lines, ParseQuantity, Discard)
//!             .with_config(ItemStepConfig::with_batch_size(2)),
//!     )
//!     .build()
//!     .expect("valid job");
//!
//! let execution = job.launch(&CancellationToken::new()).await.expect("repository available");
//! let step = execution.step_execution("quantities").expect("step ran");
//! assert_eq!(step.write_count(), 2);
//! assert_eq!(step.filter_count(), 1);
//! # }
//! ```
//!
//! ## Inspecting Failures
//!
//! Steps never fail the call itself: the outcome lives on the execution.
//!
//! ```rust
//! use hataori::prelude::*;
//!
//! fn report(execution: &JobExecution) {
//!     if execution.status().is_unsuccessful() {
//!         for failure in execution.all_failures() {
//!             eprintln!("{}", failure.message);
//!         }
//!     }
//! }
//! ```

mod cancel;
mod chunk;
mod config;
mod error;
mod event;
mod execution;
mod exit_status;
mod item;
mod item_step;
mod job;
mod repository;
mod status;
mod step;

pub mod prelude;

pub use cancel::CancellationToken;
pub use chunk::{
    split_in_chunks, split_in_chunks_by, split_in_chunks_by_column, Chunk, ChunkSizeError, Chunks,
    ColumnRow, ColumnValues,
};
pub use config::{ItemStepConfig, StepConfig};
pub use error::{BatchError, RepositoryError};
pub use event::{
    BatchEvent, EventDispatcher, EventListener, TracingListener, BEFORE_STEP_EXECUTION,
    INVALID_ITEM, STEP_EXECUTION_COMPLETED, STEP_EXECUTION_ERRORED, STEP_EXECUTION_INTERRUPTED,
    STEP_EXECUTION_SUCCEEDED,
};
pub use execution::{FailureRecord, JobExecution, StepExecution, Warning};
pub use exit_status::{ExitCode, ExitStatus};
pub use item::{InvalidItem, ItemProcessor, ItemReader, ItemWriter, PassThroughProcessor, Processed};
pub use item_step::ItemStep;
pub use job::{Job, JobBuilder};
pub use repository::{InMemoryJobRepository, JobRepository};
pub use status::BatchStatus;
pub use step::{Step, StepContext, StepEngine, StepName, Tasklet};
