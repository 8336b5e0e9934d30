//! Batch error types.

use crate::step::StepName;
use std::error::Error as StdError;
use thiserror::Error;

/// Errors raised by step logic and the item pipeline.
///
/// The engine never returns these to the caller: it classifies them and
/// records the outcome on the step execution. [`BatchError::is_interruption`]
/// decides between the stopped and the failed path.
///
/// # Non-Exhaustive
///
/// Always include a wildcard arm when matching:
///
/// ```
/// use hataori::BatchError;
///
/// fn describe(error: &BatchError) -> String {
///     match error {
///         BatchError::Interrupted(reason) => format!("stopped: {reason}"),
///         BatchError::StepError { step_name, details } => {
///             format!("{step_name} failed: {details}")
///         }
///         other => other.to_string(),
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BatchError {
    /// Step logic failed.
    #[error("Step failed: {step_name}, details: {details}")]
    StepError {
        /// The name of the step that failed
        step_name: StepName,
        /// Details about the failure
        details: String,
    },

    /// Execution was stopped on request.
    #[error("Job execution interrupted: {0}")]
    Interrupted(String),

    /// Step logic exceeded its configured timeout.
    #[error("Timeout occurred in step: {step_name}")]
    Timeout {
        /// The name of the step that timed out
        step_name: StepName,
    },

    /// The item reader could not produce its items.
    #[error("Failed to read items: {0}")]
    Read(String),

    /// An item processor aborted the step.
    #[error("Failed to process item: {0}")]
    Process(String),

    /// A writer rejected a chunk.
    #[error("Failed to write chunk {chunk} ({items} items)")]
    Write {
        /// Number of the chunk being written, starting at 1
        chunk: usize,
        /// Number of items in the rejected batch
        items: usize,
        /// The writer's error
        #[source]
        source: Box<BatchError>,
    },

    /// Another error with extra context.
    #[error("{context}")]
    Wrapped {
        /// What was being done when the error happened
        context: String,
        /// The underlying error
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The job or step configuration is invalid.
    #[error("Invalid batch configuration: {0}")]
    Configuration(String),

    /// A status code or label does not exist.
    #[error("Invalid batch status: {0}")]
    InvalidStatus(String),
}

impl BatchError {
    /// Creates an interruption error.
    pub fn interrupted(reason: impl Into<String>) -> Self {
        BatchError::Interrupted(reason.into())
    }

    /// Wraps any error with a context message.
    pub fn wrap(
        context: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        BatchError::Wrapped {
            context: context.into(),
            source: source.into(),
        }
    }

    /// `true` if this error is, or wraps, an interruption.
    pub fn is_interruption(&self) -> bool {
        let mut current: Option<&(dyn StdError + 'static)> = Some(self);
        while let Some(error) = current {
            if let Some(BatchError::Interrupted(_)) = error.downcast_ref::<BatchError>() {
                return true;
            }
            current = error.source();
        }
        false
    }
}

/// A checkpoint could not be stored.
///
/// The engine does not recover from this: it is returned to whoever
/// launched the step or job.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RepositoryError {
    /// The backing store rejected the update.
    #[error("Failed to store {entity} '{name}': {details}")]
    Storage {
        /// `"step execution"` or `"job execution"`
        entity: &'static str,
        /// Step or job name
        name: String,
        /// Details about the failure
        details: String,
    },

    /// The backing store is not reachable.
    #[error("Job repository unavailable: {0}")]
    Unavailable(String),
}

/// Renders an error followed by its `source()` chain, separated by `": "`.
pub(crate) fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        rendered.push_str(": ");
        rendered.push_str(&source.to_string());
        current = source.source();
    }
    rendered
}
