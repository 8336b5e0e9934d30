//! Checkpoint storage for execution records.

use crate::error::RepositoryError;
use crate::execution::{JobExecution, StepExecution};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

/// Stores execution records at checkpoints.
///
/// An update must be durable when the returned future completes. Errors are
/// not retried by the engine: they end the run and are returned to the
/// caller.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn update_step_execution(&self, execution: &StepExecution)
        -> Result<(), RepositoryError>;

    async fn update_job_execution(&self, execution: &JobExecution) -> Result<(), RepositoryError>;
}

/// Keeps a snapshot of every checkpoint in memory, in order.
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    step_snapshots: Mutex<Vec<StepExecution>>,
    job_snapshots: Mutex<Vec<JobExecution>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // snapshots are pushed whole, so a poisoned lock still holds valid data
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryJobRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every step checkpoint so far.
    pub fn step_snapshots(&self) -> Vec<StepExecution> {
        lock(&self.step_snapshots).clone()
    }

    /// Checkpoints recorded for one step, oldest first.
    pub fn step_history(&self, step_name: &str) -> Vec<StepExecution> {
        lock(&self.step_snapshots)
            .iter()
            .filter(|execution| execution.step_name().as_str() == step_name)
            .cloned()
            .collect()
    }

    /// Every stored job snapshot, oldest first.
    pub fn job_snapshots(&self) -> Vec<JobExecution> {
        lock(&self.job_snapshots).clone()
    }

    /// The most recent state of a job execution.
    pub fn last_job_execution(&self) -> Option<JobExecution> {
        lock(&self.job_snapshots).last().cloned()
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn update_step_execution(
        &self,
        execution: &StepExecution,
    ) -> Result<(), RepositoryError> {
        lock(&self.step_snapshots).push(execution.clone());
        Ok(())
    }

    async fn update_job_execution(&self, execution: &JobExecution) -> Result<(), RepositoryError> {
        lock(&self.job_snapshots).push(execution.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::BatchStatus;

    #[test]
    fn test_snapshots_are_kept_in_order() {
        let repository = InMemoryJobRepository::new();
        let mut execution = StepExecution::new("import");

        tokio_test::block_on(async {
            repository.update_step_execution(&execution).await.unwrap();
            execution.set_status(BatchStatus::Completed);
            repository.update_step_execution(&execution).await.unwrap();
        });

        let history = repository.step_history("import");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status(), BatchStatus::Starting);
        assert_eq!(history[1].status(), BatchStatus::Completed);
        assert!(repository.step_history("other").is_empty());
    }

    #[test]
    fn test_job_snapshots() {
        let repository = InMemoryJobRepository::new();
        assert!(repository.last_job_execution().is_none());

        let job = JobExecution::new("nightly");
        tokio_test::block_on(repository.update_job_execution(&job)).unwrap();

        assert_eq!(repository.job_snapshots().len(), 1);
        assert_eq!(
            repository.last_job_execution().map(|j| j.id()),
            Some(job.id())
        );
    }
}
