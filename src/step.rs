//! Steps and the engine that runs them.

use crate::cancel::CancellationToken;
use crate::config::StepConfig;
use crate::error::{BatchError, RepositoryError};
use crate::event::{BatchEvent, EventDispatcher, EventListener};
use crate::execution::{StepExecution, Warning};
use crate::exit_status::ExitStatus;
use crate::item::InvalidItem;
use crate::repository::JobRepository;
use crate::status::BatchStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Type-safe step name wrapper.
///
/// # Examples
///
/// ```
/// use hataori::StepName;
///
/// let name = StepName::new("ImportProducts");
/// assert_eq!(name.as_str(), "ImportProducts");
///
/// let name: StepName = "ExportPrices".into();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepName(String);

impl StepName {
    /// Creates a new StepName
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the step name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for StepName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for StepName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// What step logic can see and touch while it runs.
pub struct StepContext<'a> {
    execution: &'a mut StepExecution,
    cancel: &'a CancellationToken,
    events: &'a EventDispatcher,
}

impl<'a> StepContext<'a> {
    /// Creates a context over `execution`.
    pub fn new(
        execution: &'a mut StepExecution,
        cancel: &'a CancellationToken,
        events: &'a EventDispatcher,
    ) -> Self {
        Self {
            execution,
            cancel,
            events,
        }
    }

    /// Returns the name of the running step.
    pub fn step_name(&self) -> &StepName {
        self.execution.step_name()
    }

    /// Read access to the step's execution record.
    pub fn execution(&self) -> &StepExecution {
        &*self.execution
    }

    /// Mutable access to the record, e.g. to set the step's own exit status
    /// or update counters.
    pub fn execution_mut(&mut self) -> &mut StepExecution {
        &mut *self.execution
    }

    /// `true` once a stop was requested. Long-running logic should check this
    /// at natural boundaries and return [`BatchError::Interrupted`].
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Records a skipped item on the execution and raises `INVALID_ITEM`.
    pub fn skip_item(&mut self, invalid: InvalidItem) {
        self.events.dispatch(BatchEvent::InvalidItem {
            step_name: self.execution.step_name(),
            invalid: &invalid,
        });
        self.execution.add_warning(Warning {
            reason: invalid.reason,
            reason_parameters: invalid.reason_parameters,
            item: invalid.item,
        });
    }
}

impl fmt::Debug for StepContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("step_name", self.execution.step_name())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// The business logic of a step.
///
/// # Examples
///
/// ```
/// use hataori::prelude::*;
/// use async_trait::async_trait;
///
/// struct PurgeTemporaryFiles;
///
/// #[async_trait]
/// impl Tasklet for PurgeTemporaryFiles {
///     async fn execute(&self, ctx: &mut StepContext<'_>) -> Result<(), BatchError> {
///         if ctx.is_cancelled() {
///             return Err(BatchError::interrupted("purge cancelled"));
///         }
///         ctx.execution_mut()
///             .set_exit_status(ExitStatus::noop().with_description("nothing to purge"));
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Tasklet: Send + Sync {
    /// Runs the step logic.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - The step finished; the exit status set on the execution
    ///   (if any) is combined with `COMPLETED`
    /// - `Err(error)` - The step stopped (interruption) or failed (anything else)
    async fn execute(&self, ctx: &mut StepContext<'_>) -> Result<(), BatchError>;
}

/// A named, configured step of a job.
pub struct Step {
    name: StepName,
    tasklet: Box<dyn Tasklet>,
    config: StepConfig,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish()
    }
}

impl Step {
    /// Creates a step with the default configuration.
    pub fn new<T: Tasklet + 'static>(name: impl Into<StepName>, tasklet: T) -> Self {
        Self {
            name: name.into(),
            tasklet: Box::new(tasklet),
            config: StepConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: StepConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the step name.
    pub fn name(&self) -> &StepName {
        &self.name
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StepConfig {
        &self.config
    }
}

/// Runs steps through their lifecycle.
///
/// For every execution the engine raises `BEFORE_STEP_EXECUTION`, then one
/// of `STEP_EXECUTION_SUCCEEDED`, `STEP_EXECUTION_ERRORED` or
/// `STEP_EXECUTION_INTERRUPTED`, then `STEP_EXECUTION_COMPLETED`, and
/// stores the record three times: when it starts, after the step logic
/// returns, and when it ends.
#[derive(Clone)]
pub struct StepEngine {
    repository: Arc<dyn JobRepository>,
    events: EventDispatcher,
}

impl fmt::Debug for StepEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepEngine")
            .field("events", &self.events)
            .finish()
    }
}

impl StepEngine {
    /// Creates an engine with no listeners.
    pub fn new(repository: Arc<dyn JobRepository>) -> Self {
        Self {
            repository,
            events: EventDispatcher::new(),
        }
    }

    /// Creates an engine that raises events through `events`.
    pub fn with_events(repository: Arc<dyn JobRepository>, events: EventDispatcher) -> Self {
        Self { repository, events }
    }

    /// Registers a listener; listeners are called in registration order.
    pub fn add_listener(&mut self, listener: Arc<dyn EventListener>) {
        self.events.add_listener(listener);
    }

    /// Returns the checkpoint repository.
    pub fn repository(&self) -> &Arc<dyn JobRepository> {
        &self.repository
    }

    /// Executes one step and records the result on `execution`.
    ///
    /// A failing or interrupted step is not an error here: inspect the
    /// execution's status and exit status. `Err` is only returned when the
    /// repository cannot store a checkpoint, in which case the record is left
    /// as it was at that point.
    pub async fn execute(
        &self,
        step: &Step,
        execution: &mut StepExecution,
        cancel: &CancellationToken,
    ) -> Result<(), RepositoryError> {
        self.events
            .dispatch(BatchEvent::BeforeStepExecution(execution));

        execution.mark_started();
        execution.set_status(BatchStatus::Started);
        self.repository.update_step_execution(execution).await?;
        debug!("Step '{}' started", step.name());

        // trumped by every other outcome
        let mut exit_status = ExitStatus::executing();

        let failure = match self.run_tasklet(step, execution, cancel).await {
            Ok(()) => {
                exit_status = ExitStatus::completed();
                exit_status.logical_and(execution.exit_status().clone());
                self.repository.update_step_execution(execution).await?;

                if cancel.is_cancelled() || execution.is_terminate_only() {
                    Some(BatchError::interrupted("stop requested before step completion"))
                } else {
                    // upgrade rather than set: the step may already be stopping
                    execution.upgrade_status(BatchStatus::Completed);
                    info!("Step '{}' completed successfully", step.name());
                    self.events
                        .dispatch(BatchEvent::StepExecutionSucceeded(execution));
                    None
                }
            }
            Err(error) => Some(error),
        };

        if let Some(error) = failure {
            let interrupted = error.is_interruption();
            let mut failure_status = if interrupted {
                execution.set_terminate_only();
                execution.upgrade_status(BatchStatus::Stopped);
                ExitStatus::stopped()
            } else {
                execution.upgrade_status(BatchStatus::Failed);
                ExitStatus::failed()
            };
            failure_status.add_error_description(&error);
            exit_status.logical_and(failure_status);

            execution.add_failure(&error, interrupted);
            self.repository.update_step_execution(execution).await?;

            if execution.status() == BatchStatus::Stopped {
                warn!("Step '{}' interrupted: {}", step.name(), error);
                self.events
                    .dispatch(BatchEvent::StepExecutionInterrupted(execution));
            } else {
                warn!("Step '{}' failed: {}", step.name(), error);
                self.events
                    .dispatch(BatchEvent::StepExecutionErrored(execution));
            }
        }

        self.events
            .dispatch(BatchEvent::StepExecutionCompleted(execution));

        execution.mark_ended();
        execution.set_exit_status(exit_status);
        self.repository.update_step_execution(execution).await?;
        Ok(())
    }

    async fn run_tasklet(
        &self,
        step: &Step,
        execution: &mut StepExecution,
        cancel: &CancellationToken,
    ) -> Result<(), BatchError> {
        let mut ctx = StepContext::new(execution, cancel, &self.events);
        match step.config.timeout {
            Some(limit) => match timeout(limit, step.tasklet.execute(&mut ctx)).await {
                Ok(result) => result,
                Err(_) => Err(BatchError::Timeout {
                    step_name: step.name.clone(),
                }),
            },
            None => step.tasklet.execute(&mut ctx).await,
        }
    }
}
