//! Commonly used types and traits

pub use crate::cancel::CancellationToken;
pub use crate::config::{ItemStepConfig, StepConfig};
pub use crate::error::{BatchError, RepositoryError};
pub use crate::event::{BatchEvent, EventListener};
pub use crate::execution::{JobExecution, StepExecution};
pub use crate::exit_status::{ExitCode, ExitStatus};
pub use crate::item::{ItemProcessor, ItemReader, ItemWriter, PassThroughProcessor, Processed};
pub use crate::item_step::ItemStep;
pub use crate::job::Job;
pub use crate::status::BatchStatus;
pub use crate::step::{StepContext, StepName, Tasklet};
