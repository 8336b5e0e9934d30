//! Batch status lattice.

use crate::error::BatchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Run-time status of a step or job execution.
///
/// The discriminants are significant: they order the statuses by severity
/// so a set of statuses can be aggregated by taking the maximum. Since
/// `Completed` is the lowest value, an aggregate is `Completed` only when
/// every member is. Values above `Started` signal a stop or a failure.
/// `Abandoned` marks steps that finished unsuccessfully and should be
/// skipped on a restart.
///
/// # Examples
///
/// ```
/// use hataori::BatchStatus;
///
/// let mut status = BatchStatus::Started;
/// status.upgrade_to(BatchStatus::Completed);
/// assert_eq!(status, BatchStatus::Completed);
///
/// status.upgrade_to(BatchStatus::Failed);
/// assert!(status.is_unsuccessful());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum BatchStatus {
    Completed = 1,
    Starting = 2,
    Started = 3,
    Stopping = 4,
    Stopped = 5,
    Failed = 6,
    Abandoned = 7,
    #[default]
    Unknown = 8,
}

const STATUS_LABELS: [(BatchStatus, &str); 8] = [
    (BatchStatus::Completed, "COMPLETED"),
    (BatchStatus::Starting, "STARTING"),
    (BatchStatus::Started, "STARTED"),
    (BatchStatus::Stopping, "STOPPING"),
    (BatchStatus::Stopped, "STOPPED"),
    (BatchStatus::Failed, "FAILED"),
    (BatchStatus::Abandoned, "ABANDONED"),
    (BatchStatus::Unknown, "UNKNOWN"),
];

impl BatchStatus {
    /// Returns every status with its label, in severity order.
    pub fn all_labels() -> &'static [(BatchStatus, &'static str)] {
        &STATUS_LABELS
    }

    /// Returns the numeric severity code.
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Overwrites the status without applying the merge rule.
    pub fn set_value(&mut self, value: BatchStatus) -> &mut Self {
        *self = value;
        self
    }

    /// Returns the upper-case label, e.g. `"STOPPED"`.
    pub fn label(self) -> &'static str {
        STATUS_LABELS[(self.value() - 1) as usize].1
    }

    /// `true` if the status is `Starting`.
    pub fn is_starting(self) -> bool {
        self == BatchStatus::Starting
    }

    /// `true` if work is in progress (`Starting` or `Started`).
    pub fn is_running(self) -> bool {
        matches!(self, BatchStatus::Starting | BatchStatus::Started)
    }

    /// `true` if the status is `Failed` or more severe.
    pub fn is_unsuccessful(self) -> bool {
        self >= BatchStatus::Failed
    }

    /// Returns the more severe of two statuses.
    pub fn max(a: BatchStatus, b: BatchStatus) -> BatchStatus {
        std::cmp::max(a, b)
    }

    /// Merges `other` into this status and returns the result.
    ///
    /// While both sides are `Started` or lower, `Completed` wins so a
    /// finished execution is not dragged back to `Starting`/`Started`.
    /// Once either side is above `Started`, the more severe value wins.
    /// The result only depends on the pair of values, never on which side
    /// the call is made from.
    pub fn upgrade_to(&mut self, other: BatchStatus) -> BatchStatus {
        let current = *self;
        *self = if current > BatchStatus::Started || other > BatchStatus::Started {
            Self::max(current, other)
        } else if current == BatchStatus::Completed || other == BatchStatus::Completed {
            BatchStatus::Completed
        } else {
            Self::max(current, other)
        };
        *self
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<u8> for BatchStatus {
    type Error = BatchError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        STATUS_LABELS
            .iter()
            .map(|(status, _)| *status)
            .find(|status| status.value() == value)
            .ok_or_else(|| BatchError::InvalidStatus(value.to_string()))
    }
}

impl FromStr for BatchStatus {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STATUS_LABELS
            .iter()
            .find(|(_, label)| label.eq_ignore_ascii_case(s))
            .map(|(status, _)| *status)
            .ok_or_else(|| BatchError::InvalidStatus(s.to_string()))
    }
}
