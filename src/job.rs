//! Jobs: an ordered sequence of steps run one after another.

use crate::cancel::CancellationToken;
use crate::config::StepConfig;
use crate::error::{BatchError, RepositoryError};
use crate::event::{EventDispatcher, EventListener};
use crate::execution::{JobExecution, StepExecution};
use crate::exit_status::ExitStatus;
use crate::repository::{InMemoryJobRepository, JobRepository};
use crate::status::BatchStatus;
use crate::step::{Step, StepEngine, StepName, Tasklet};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// A batch job.
///
/// Steps run strictly in the order they were added. The job stops at the
/// first step that ends `STOPPED` or unsuccessful; its status is the merge
/// of its steps' statuses.
pub struct Job {
    name: String,
    steps: Vec<Step>,
    engine: StepEngine,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field(
                "steps",
                &self.steps.iter().map(Step::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Job {
    /// Creates a new job builder.
    pub fn builder(name: impl Into<String>) -> JobBuilder {
        JobBuilder::new(name)
    }

    /// Returns the job name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the step names in execution order.
    pub fn step_names(&self) -> impl Iterator<Item = &StepName> {
        self.steps.iter().map(Step::name)
    }

    /// Returns the number of registered steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Creates a new execution record and runs the job on it.
    pub async fn launch(&self, cancel: &CancellationToken) -> Result<JobExecution, RepositoryError> {
        let mut execution = JobExecution::new(self.name.clone());
        self.execute(&mut execution, cancel).await?;
        Ok(execution)
    }

    /// Runs every step in order and records the outcome on `execution`.
    ///
    /// Step failures are reported through the execution's status, exit
    /// status and failure lists. `Err` only means a checkpoint could not be
    /// stored.
    pub async fn execute(
        &self,
        execution: &mut JobExecution,
        cancel: &CancellationToken,
    ) -> Result<(), RepositoryError> {
        let repository = self.engine.repository();

        execution.mark_started();
        execution.set_status(BatchStatus::Started);
        repository.update_job_execution(execution).await?;
        info!("Job '{}' started ({} steps)", self.name, self.steps.len());

        let mut exit_status = ExitStatus::executing();
        let mut interrupted = false;

        for step in &self.steps {
            if cancel.is_cancelled() {
                let error = BatchError::interrupted(format!(
                    "stop requested before step '{}'",
                    step.name()
                ));
                warn!("Job '{}' stopped: {}", self.name, error);
                exit_status.logical_and(ExitStatus::stopped().with_description(error.to_string()));
                execution.add_failure(&error, true);
                interrupted = true;
                break;
            }

            let mut step_execution = StepExecution::new(step.name().clone());
            let result = self.engine.execute(step, &mut step_execution, cancel).await;

            let status = step_execution.status();
            exit_status.logical_and(step_execution.exit_status().clone());
            execution.add_step_execution(step_execution);
            result?;

            if status == BatchStatus::Stopped || status.is_unsuccessful() {
                warn!(
                    "Job '{}' halted after step '{}' ended {}",
                    self.name,
                    step.name(),
                    status
                );
                break;
            }
        }

        let status = match execution.aggregate_step_status() {
            Some(aggregate) if interrupted => BatchStatus::max(aggregate, BatchStatus::Stopped),
            Some(aggregate) => aggregate,
            None if interrupted => BatchStatus::Stopped,
            None => BatchStatus::Completed,
        };
        execution.upgrade_status(status);

        let mut final_exit = ExitStatus::completed();
        final_exit.logical_and(exit_status);
        execution.set_exit_status(final_exit);
        execution.mark_ended();
        repository.update_job_execution(execution).await?;

        info!(
            "Job '{}' finished with status {} ({})",
            self.name,
            execution.status(),
            execution.exit_status()
        );
        Ok(())
    }
}

/// Builder for constructing [`Job`] instances.
pub struct JobBuilder {
    name: String,
    steps: Vec<Step>,
    repository: Option<Arc<dyn JobRepository>>,
    events: EventDispatcher,
}

impl fmt::Debug for JobBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobBuilder")
            .field("name", &self.name)
            .field("steps", &self.steps)
            .field("events", &self.events)
            .finish()
    }
}

impl JobBuilder {
    /// Creates a new empty job builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            repository: None,
            events: EventDispatcher::new(),
        }
    }

    /// Appends a step with the default configuration.
    pub fn add_step<T: Tasklet + 'static>(mut self, name: impl Into<StepName>, tasklet: T) -> Self {
        self.steps.push(Step::new(name, tasklet));
        self
    }

    /// Appends a step with its own configuration.
    pub fn add_configured<T: Tasklet + 'static>(
        mut self,
        name: impl Into<StepName>,
        tasklet: T,
        config: StepConfig,
    ) -> Self {
        self.steps.push(Step::new(name, tasklet).with_config(config));
        self
    }

    /// Uses `repository` for checkpoints. Defaults to an
    /// [`InMemoryJobRepository`].
    pub fn repository(mut self, repository: Arc<dyn JobRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Registers a listener; listeners are called in registration order.
    pub fn listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.events.add_listener(listener);
        self
    }

    /// Builds the job.
    pub fn build(self) -> Result<Job, BatchError> {
        if self.name.is_empty() {
            return Err(BatchError::Configuration(
                "Job name must not be empty".to_string(),
            ));
        }
        if self.steps.is_empty() {
            return Err(BatchError::Configuration(format!(
                "Job '{}' has no steps",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name()) {
                return Err(BatchError::Configuration(format!(
                    "Duplicate step name '{}' in job '{}'",
                    step.name(),
                    self.name
                )));
            }
        }

        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryJobRepository::new()));

        Ok(Job {
            name: self.name,
            steps: self.steps,
            engine: StepEngine::with_events(repository, self.events),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_status::ExitCode;
    use crate::step::StepContext;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Count(Arc<AtomicUsize>);

    #[async_trait]
    impl Tasklet for Count {
        async fn execute(&self, _ctx: &mut StepContext<'_>) -> Result<(), BatchError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fail;

    #[async_trait]
    impl Tasklet for Fail {
        async fn execute(&self, _ctx: &mut StepContext<'_>) -> Result<(), BatchError> {
            Err(BatchError::Read("source file missing".to_string()))
        }
    }

    #[tokio::test]
    async fn test_job_success() {
        let runs = Arc::new(AtomicUsize::new(0));
        let repository = Arc::new(InMemoryJobRepository::new());
        let job = Job::builder("nightly")
            .add_step("extract", Count(runs.clone()))
            .add_step("load", Count(runs.clone()))
            .repository(repository.clone())
            .build()
            .unwrap();

        let execution = job.launch(&CancellationToken::new()).await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(execution.status(), BatchStatus::Completed);
        assert_eq!(execution.exit_status().code(), &ExitCode::Completed);
        assert_eq!(execution.step_executions().len(), 2);
        assert_eq!(repository.job_snapshots().len(), 2);
        assert_eq!(repository.step_snapshots().len(), 6);
    }

    #[tokio::test]
    async fn test_job_stops_at_failed_step() {
        let runs = Arc::new(AtomicUsize::new(0));
        let job = Job::builder("nightly")
            .add_step("extract", Fail)
            .add_step("load", Count(runs.clone()))
            .build()
            .unwrap();

        let execution = job.launch(&CancellationToken::new()).await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(execution.status(), BatchStatus::Failed);
        assert_eq!(execution.exit_status().code(), &ExitCode::Failed);
        assert_eq!(execution.step_executions().len(), 1);
        assert_eq!(execution.all_failures().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_job_runs_no_steps() {
        let runs = Arc::new(AtomicUsize::new(0));
        let job = Job::builder("nightly")
            .add_step("extract", Count(runs.clone()))
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let execution = job.launch(&cancel).await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(execution.status(), BatchStatus::Stopped);
        assert_eq!(execution.exit_status().code(), &ExitCode::Stopped);
        assert!(execution.failures()[0].interrupted);
    }

    #[test]
    fn test_builder_validation() {
        let result = Job::builder("empty").build();
        assert!(matches!(result, Err(BatchError::Configuration(_))));

        let result = Job::builder("dup")
            .add_step("a", Fail)
            .add_step("a", Fail)
            .build();
        match result {
            Err(BatchError::Configuration(msg)) => {
                assert_eq!(msg, "Duplicate step name 'a' in job 'dup'");
            }
            _ => panic!("Unexpected result"),
        }

        let job = Job::builder("ok")
            .add_configured("a", Fail, StepConfig::default())
            .add_step("b", Fail)
            .build()
            .unwrap();
        assert_eq!(job.step_count(), 2);
        assert_eq!(
            job.step_names().map(StepName::as_str).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }
}
