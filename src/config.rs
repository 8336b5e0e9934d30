//! Step configuration.
//!
//! Both structs deserialize with `serde`, so a hosting process can load them
//! from whatever format it already uses. Missing fields take their defaults.

use crate::error::BatchError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by every step.
///
/// # Examples
///
/// ```
/// use hataori::StepConfig;
/// use std::time::Duration;
///
/// let config = StepConfig {
///     timeout: Some(Duration::from_secs(600)),
/// };
/// assert_eq!(StepConfig::default().timeout, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    /// Maximum time the step logic may run. `None` means no limit.
    /// Default: no limit.
    pub timeout: Option<Duration>,
}

/// Configuration of a chunk-oriented step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemStepConfig {
    /// Number of items read and processed before each write. Default: 100.
    pub batch_size: usize,
}

impl Default for ItemStepConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

impl ItemStepConfig {
    /// Creates a configuration with the given chunk size.
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self { batch_size }
    }

    /// Rejects a batch size of zero.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.batch_size == 0 {
            return Err(BatchError::Configuration(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(StepConfig::default().timeout, None);
        assert_eq!(ItemStepConfig::default().batch_size, 100);
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let config: ItemStepConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ItemStepConfig::default());

        let config: ItemStepConfig = serde_json::from_str(r#"{"batch_size": 25}"#).unwrap();
        assert_eq!(config.batch_size, 25);

        let config: StepConfig =
            serde_json::from_str(r#"{"timeout": {"secs": 5, "nanos": 0}}"#).unwrap();
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_validate() {
        assert!(ItemStepConfig::with_batch_size(1).validate().is_ok());
        let error = ItemStepConfig::with_batch_size(0).validate().unwrap_err();
        assert_eq!(
            error.to_string(),
            "Invalid batch configuration: batch_size must be greater than 0"
        );
    }
}
