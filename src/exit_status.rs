//! Exit status: why an execution ended.

use crate::error::error_chain;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error as StdError;
use std::fmt;

/// Symbolic exit code.
///
/// Codes are ranked by severity, lowest first:
///
/// | code | severity |
/// |---|---|
/// | `Unknown` | 0 |
/// | `Executing` | 1 |
/// | `Completed` | 2 |
/// | `Noop` | 3 |
/// | `Custom(_)` | 4 |
/// | `Stopped` | 5 |
/// | `Failed` | 6 |
///
/// A custom code can narrow a `Completed` default but never hides a stop
/// or a failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitCode {
    Unknown,
    Executing,
    Completed,
    Noop,
    Custom(String),
    Stopped,
    Failed,
}

impl ExitCode {
    /// Severity rank used by [`ExitStatus::logical_and`].
    pub fn severity(&self) -> u8 {
        match self {
            ExitCode::Unknown => 0,
            ExitCode::Executing => 1,
            ExitCode::Completed => 2,
            ExitCode::Noop => 3,
            ExitCode::Custom(_) => 4,
            ExitCode::Stopped => 5,
            ExitCode::Failed => 6,
        }
    }

    /// Returns the code as written in logs and stores, e.g. `"NOOP"`.
    pub fn label(&self) -> &str {
        match self {
            ExitCode::Unknown => "UNKNOWN",
            ExitCode::Executing => "EXECUTING",
            ExitCode::Completed => "COMPLETED",
            ExitCode::Noop => "NOOP",
            ExitCode::Custom(code) => code,
            ExitCode::Stopped => "STOPPED",
            ExitCode::Failed => "FAILED",
        }
    }

    /// Parses a label, mapping the built-in labels (case-insensitively) to
    /// their variants. Anything else becomes a [`ExitCode::Custom`] code.
    pub fn from_label(label: impl Into<String>) -> Self {
        let label = label.into();
        [
            ExitCode::Unknown,
            ExitCode::Executing,
            ExitCode::Completed,
            ExitCode::Noop,
            ExitCode::Stopped,
            ExitCode::Failed,
        ]
        .into_iter()
        .find(|code| code.label().eq_ignore_ascii_case(&label))
        .unwrap_or(ExitCode::Custom(label))
    }

    fn precedence(&self, other: &ExitCode) -> Ordering {
        self.severity()
            .cmp(&other.severity())
            .then_with(|| self.label().cmp(other.label()))
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Exit code plus the human-readable descriptions collected on the way.
///
/// # Examples
///
/// ```
/// use hataori::{ExitCode, ExitStatus};
///
/// let mut status = ExitStatus::completed();
/// status.logical_and(ExitStatus::noop().with_description("nothing to import"));
/// assert_eq!(status.code(), &ExitCode::Noop);
///
/// status.logical_and(ExitStatus::executing());
/// assert_eq!(status.code(), &ExitCode::Noop);
/// assert_eq!(status.description(), "nothing to import");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    code: ExitCode,
    descriptions: Vec<String>,
}

impl Default for ExitStatus {
    fn default() -> Self {
        Self::new(ExitCode::Unknown)
    }
}

impl ExitStatus {
    /// Creates an exit status with no description.
    pub fn new(code: ExitCode) -> Self {
        Self {
            code,
            descriptions: Vec::new(),
        }
    }

    /// `UNKNOWN`: nothing is known about the outcome.
    pub fn unknown() -> Self {
        Self::new(ExitCode::Unknown)
    }

    /// `EXECUTING`: the placeholder of a running step.
    pub fn executing() -> Self {
        Self::new(ExitCode::Executing)
    }

    /// `COMPLETED`: finished normally.
    pub fn completed() -> Self {
        Self::new(ExitCode::Completed)
    }

    /// `NOOP`: finished without doing any work.
    pub fn noop() -> Self {
        Self::new(ExitCode::Noop)
    }

    /// `STOPPED`: ended by a stop request.
    pub fn stopped() -> Self {
        Self::new(ExitCode::Stopped)
    }

    /// `FAILED`: ended by an error.
    pub fn failed() -> Self {
        Self::new(ExitCode::Failed)
    }

    /// An application-defined code, e.g. `"COMPLETED_WITH_SKIPS"`.
    ///
    /// Built-in labels such as `"FAILED"` resolve to their own variants, see
    /// [`ExitCode::from_label`].
    pub fn custom(code: impl Into<String>) -> Self {
        Self::new(ExitCode::from_label(code))
    }

    /// Returns the exit code.
    pub fn code(&self) -> &ExitCode {
        &self.code
    }

    /// Returns the descriptions in the order they were added.
    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    /// All descriptions joined with `"; "`.
    pub fn description(&self) -> String {
        self.descriptions.join("; ")
    }

    /// Appends a description. Empty text is ignored.
    pub fn add_exit_description(&mut self, description: impl Into<String>) -> &mut Self {
        let description = description.into();
        if !description.is_empty() {
            self.descriptions.push(description);
        }
        self
    }

    /// Appends the rendering of an error and its source chain.
    pub fn add_error_description(&mut self, error: &(dyn StdError + 'static)) -> &mut Self {
        self.add_exit_description(error_chain(error))
    }

    /// Builder-style [`add_exit_description`](Self::add_exit_description).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.add_exit_description(description);
        self
    }

    /// Combines `other` into this status.
    ///
    /// The more severe code wins (ties go to the greater label). The
    /// descriptions of `other` are appended after this status' own.
    pub fn logical_and(&mut self, other: ExitStatus) -> &mut Self {
        let ExitStatus { code, descriptions } = other;
        if self.code.precedence(&code) == Ordering::Less {
            self.code = code;
        }
        for description in descriptions {
            self.add_exit_description(description);
        }
        self
    }

    /// `true` while the outcome is still the placeholder of a running step.
    pub fn is_running(&self) -> bool {
        self.code == ExitCode::Executing || self.code == ExitCode::Unknown
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descriptions.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} ({})", self.code, self.description())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes() -> Vec<ExitCode> {
        vec![
            ExitCode::Unknown,
            ExitCode::Executing,
            ExitCode::Completed,
            ExitCode::Noop,
            ExitCode::Custom("PARTIAL".to_string()),
            ExitCode::Stopped,
            ExitCode::Failed,
        ]
    }

    #[test]
    fn test_precedence_table_is_strictly_increasing() {
        let severities: Vec<u8> = codes().iter().map(ExitCode::severity).collect();
        assert_eq!(severities, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_more_severe_code_wins_both_ways() {
        for (i, low) in codes().into_iter().enumerate() {
            for high in codes().into_iter().skip(i) {
                let mut left = ExitStatus::new(low.clone());
                left.logical_and(ExitStatus::new(high.clone()));
                assert_eq!(left.code(), &high);

                let mut right = ExitStatus::new(high.clone());
                right.logical_and(ExitStatus::new(low.clone()));
                assert_eq!(right.code(), &high);
            }
        }
    }

    #[test]
    fn test_failed_is_not_overwritten_by_executing() {
        let mut status = ExitStatus::executing();
        status.logical_and(ExitStatus::failed().with_description("boom"));
        status.logical_and(ExitStatus::executing());
        assert_eq!(status.code(), &ExitCode::Failed);
        assert_eq!(status.description(), "boom");
    }

    #[test]
    fn test_step_outcome_narrows_completed() {
        let mut status = ExitStatus::completed();
        status.logical_and(ExitStatus::custom("COMPLETED_WITH_SKIPS"));
        assert_eq!(
            status.code(),
            &ExitCode::Custom("COMPLETED_WITH_SKIPS".to_string())
        );

        status.logical_and(ExitStatus::stopped());
        assert_eq!(status.code(), &ExitCode::Stopped);
    }

    #[test]
    fn test_equal_custom_codes_resolve_by_label() {
        let mut a = ExitStatus::custom("ALPHA");
        a.logical_and(ExitStatus::custom("BETA"));
        let mut b = ExitStatus::custom("BETA");
        b.logical_and(ExitStatus::custom("ALPHA"));
        assert_eq!(a.code(), b.code());
        assert_eq!(a.code().label(), "BETA");
    }

    #[test]
    fn test_descriptions_accumulate_in_order() {
        let mut status = ExitStatus::completed().with_description("first");
        status.logical_and(
            ExitStatus::failed()
                .with_description("second")
                .with_description("third"),
        );
        assert_eq!(status.descriptions(), ["first", "second", "third"]);
        assert_eq!(status.to_string(), "FAILED (first; second; third)");
    }

    #[test]
    fn test_empty_descriptions_are_ignored() {
        let mut status = ExitStatus::stopped();
        status.add_exit_description("");
        status.add_exit_description("interrupted");
        assert_eq!(status.descriptions(), ["interrupted"]);
    }

    #[test]
    fn test_repeated_descriptions_are_kept() {
        let mut job = ExitStatus::completed();
        job.logical_and(ExitStatus::failed().with_description("connection refused"));
        job.logical_and(ExitStatus::failed().with_description("connection refused"));
        assert_eq!(
            job.descriptions(),
            ["connection refused", "connection refused"]
        );
    }

    #[test]
    fn test_custom_with_builtin_label_uses_builtin_code() {
        assert_eq!(ExitStatus::custom("FAILED").code(), &ExitCode::Failed);
        assert_eq!(ExitStatus::custom("completed").code(), &ExitCode::Completed);
        assert_eq!(
            ExitStatus::custom("CLEANED").code(),
            &ExitCode::Custom("CLEANED".to_string())
        );

        let mut status = ExitStatus::stopped();
        status.logical_and(ExitStatus::custom("FAILED"));
        assert_eq!(status.code(), &ExitCode::Failed);
    }

    #[test]
    fn test_error_description_includes_sources() {
        let error = crate::BatchError::wrap("loading prices", "connection reset");
        let mut status = ExitStatus::failed();
        status.add_error_description(&error);
        assert_eq!(status.description(), "loading prices: connection reset");
    }
}
