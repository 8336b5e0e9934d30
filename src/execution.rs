//! Step and job execution records.

use crate::error::error_chain;
use crate::exit_status::ExitStatus;
use crate::status::BatchStatus;
use crate::step::StepName;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use uuid::Uuid;

/// A failure captured during an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// The error rendered with its source chain
    pub message: String,
    /// `true` if the failure was a requested stop
    pub interrupted: bool,
    pub occurred_at: DateTime<Utc>,
}

/// An item skipped by a processor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub reason: String,
    pub reason_parameters: BTreeMap<String, String>,
    pub item: serde_json::Value,
}

/// One execution attempt of one step.
///
/// Owned by the engine while the step runs; read-only history afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct StepExecution {
    id: Uuid,
    step_name: StepName,
    status: BatchStatus,
    exit_status: ExitStatus,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    terminate_only: bool,
    read_count: usize,
    write_count: usize,
    filter_count: usize,
    warnings: Vec<Warning>,
    failures: Vec<FailureRecord>,
}

impl StepExecution {
    /// Creates a record for a step that is about to start.
    pub fn new(step_name: impl Into<StepName>) -> Self {
        Self {
            id: Uuid::new_v4(),
            step_name: step_name.into(),
            status: BatchStatus::Starting,
            exit_status: ExitStatus::executing(),
            start_time: None,
            end_time: None,
            terminate_only: false,
            read_count: 0,
            write_count: 0,
            filter_count: 0,
            warnings: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Returns the unique id of this execution.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the name of the step being executed.
    pub fn step_name(&self) -> &StepName {
        &self.step_name
    }

    /// Returns the current batch status.
    pub fn status(&self) -> BatchStatus {
        self.status
    }

    /// Overwrites the batch status.
    pub fn set_status(&mut self, status: BatchStatus) {
        self.status = status;
    }

    /// Merges `status` into the current status (see [`BatchStatus::upgrade_to`]).
    pub fn upgrade_status(&mut self, status: BatchStatus) -> BatchStatus {
        self.status.upgrade_to(status)
    }

    /// Returns the exit status.
    pub fn exit_status(&self) -> &ExitStatus {
        &self.exit_status
    }

    /// Records the step's own outcome. The engine combines it with its
    /// default when the step logic returns.
    pub fn set_exit_status(&mut self, exit_status: ExitStatus) {
        self.exit_status = exit_status;
    }

    /// When the step started, if it has.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub(crate) fn mark_started(&mut self) {
        self.start_time = Some(Utc::now());
    }

    /// When the step ended, if it has.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub(crate) fn mark_ended(&mut self) {
        self.end_time = Some(Utc::now());
    }

    /// `true` once a stop was observed for this execution.
    pub fn is_terminate_only(&self) -> bool {
        self.terminate_only
    }

    /// Flags a stop request. The engine treats the step as interrupted
    /// when its logic returns.
    pub fn set_terminate_only(&mut self) {
        self.terminate_only = true;
    }

    /// Number of items read.
    pub fn read_count(&self) -> usize {
        self.read_count
    }

    /// Counts one more item read.
    pub fn increment_read_count(&mut self) {
        self.read_count += 1;
    }

    /// Number of items handed to the writer.
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    /// Adds `written` items to the write count.
    pub fn increment_write_count(&mut self, written: usize) {
        self.write_count += written;
    }

    /// Number of items skipped as invalid.
    pub fn filter_count(&self) -> usize {
        self.filter_count
    }

    /// Returns the skipped-item warnings in the order they were raised.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Records a skipped item and counts it as filtered.
    pub fn add_warning(&mut self, warning: Warning) {
        self.filter_count += 1;
        self.warnings.push(warning);
    }

    /// Returns the failures recorded on this step.
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Records `error` with its source chain.
    pub fn add_failure(&mut self, error: &(dyn StdError + 'static), interrupted: bool) {
        self.failures.push(FailureRecord {
            message: error_chain(error),
            interrupted,
            occurred_at: Utc::now(),
        });
    }
}

/// One execution of a job: the ordered step executions plus the job-wide
/// status and outcome.
#[derive(Debug, Clone, Serialize)]
pub struct JobExecution {
    id: Uuid,
    job_name: String,
    status: BatchStatus,
    exit_status: ExitStatus,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    step_executions: Vec<StepExecution>,
    failures: Vec<FailureRecord>,
}

impl JobExecution {
    /// Creates a new job execution with `STARTING` status.
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_name: job_name.into(),
            status: BatchStatus::Starting,
            exit_status: ExitStatus::unknown(),
            start_time: None,
            end_time: None,
            step_executions: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Returns the unique id of this execution.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the job name.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Returns the current batch status.
    pub fn status(&self) -> BatchStatus {
        self.status
    }

    /// Overwrites the batch status.
    pub fn set_status(&mut self, status: BatchStatus) {
        self.status = status;
    }

    /// Merges `status` into the current status.
    pub fn upgrade_status(&mut self, status: BatchStatus) -> BatchStatus {
        self.status.upgrade_to(status)
    }

    /// Merges the statuses of all step executions.
    ///
    /// Returns `None` when no step has run yet.
    pub fn aggregate_step_status(&self) -> Option<BatchStatus> {
        let mut steps = self.step_executions.iter().map(StepExecution::status);
        let mut aggregate = steps.next()?;
        for status in steps {
            aggregate.upgrade_to(status);
        }
        Some(aggregate)
    }

    /// Returns the exit status.
    pub fn exit_status(&self) -> &ExitStatus {
        &self.exit_status
    }

    /// Replaces the exit status.
    pub fn set_exit_status(&mut self, exit_status: ExitStatus) {
        self.exit_status = exit_status;
    }

    /// When the job started, if it has.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub(crate) fn mark_started(&mut self) {
        self.start_time = Some(Utc::now());
    }

    /// When the job ended, if it has.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub(crate) fn mark_ended(&mut self) {
        self.end_time = Some(Utc::now());
    }

    /// Returns the step executions in the order the steps ran.
    pub fn step_executions(&self) -> &[StepExecution] {
        &self.step_executions
    }

    /// Looks up the execution of the step called `name`.
    pub fn step_execution(&self, name: &str) -> Option<&StepExecution> {
        self.step_executions
            .iter()
            .find(|execution| execution.step_name().as_str() == name)
    }

    pub(crate) fn add_step_execution(&mut self, execution: StepExecution) {
        self.step_executions.push(execution);
    }

    /// Returns the failures of the job itself.
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Records a job-level failure with its source chain.
    pub fn add_failure(&mut self, error: &(dyn StdError + 'static), interrupted: bool) {
        self.failures.push(FailureRecord {
            message: error_chain(error),
            interrupted,
            occurred_at: Utc::now(),
        });
    }

    /// Failures of the job itself followed by those of every step.
    pub fn all_failures(&self) -> Vec<&FailureRecord> {
        self.failures
            .iter()
            .chain(self.step_executions.iter().flat_map(|s| s.failures.iter()))
            .collect()
    }
}
