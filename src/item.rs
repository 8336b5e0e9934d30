//! Item-oriented processing contracts.

use crate::error::BatchError;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Why an item was skipped, with the item itself for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidItem {
    pub reason: String,
    pub reason_parameters: BTreeMap<String, String>,
    pub item: serde_json::Value,
}

impl InvalidItem {
    /// Creates an invalid item with no reason parameters.
    pub fn new(reason: impl Into<String>, item: serde_json::Value) -> Self {
        Self {
            reason: reason.into(),
            reason_parameters: BTreeMap::new(),
            item,
        }
    }

    /// Adds a parameter referenced by the reason, e.g. `("%field%", "sku")`.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.reason_parameters.insert(key.into(), value.into());
        self
    }
}

/// Result of processing one item.
#[derive(Debug)]
pub enum Processed<O> {
    /// The item goes on to the writer.
    Transformed(O),
    /// The item is dropped; the step continues with the next one.
    Skipped(InvalidItem),
    /// The whole step is aborted.
    Fatal(BatchError),
}

impl<O> Processed<O> {
    /// Shorthand for a [`Processed::Skipped`] item.
    pub fn skipped(reason: impl Into<String>, item: serde_json::Value) -> Self {
        Processed::Skipped(InvalidItem::new(reason, item))
    }

    /// Returns `true` for [`Processed::Transformed`].
    pub fn is_transformed(&self) -> bool {
        matches!(self, Processed::Transformed(_))
    }
}

impl<O> From<Result<O, BatchError>> for Processed<O> {
    fn from(result: Result<O, BatchError>) -> Self {
        match result {
            Ok(item) => Processed::Transformed(item),
            Err(error) => Processed::Fatal(error),
        }
    }
}

/// Source of the items for one run of a chunk-oriented step.
pub trait ItemReader<I>: Send + Sync {
    /// Opens the source. The returned sequence is consumed once, in order.
    fn open(&self) -> Result<Box<dyn Iterator<Item = I> + Send + '_>, BatchError>;
}

impl<I, F, It> ItemReader<I> for F
where
    F: Fn() -> It + Send + Sync,
    It: IntoIterator<Item = I>,
    It::IntoIter: Send + 'static,
{
    fn open(&self) -> Result<Box<dyn Iterator<Item = I> + Send + '_>, BatchError> {
        Ok(Box::new(self().into_iter()))
    }
}

/// Transforms one item.
///
/// There is no "nothing" result: an item that must not reach the writer is
/// reported as [`Processed::Skipped`].
///
/// # Examples
///
/// ```
/// use hataori::{ItemProcessor, Processed};
/// use async_trait::async_trait;
///
/// struct ParsePrice;
///
/// #[async_trait]
/// impl ItemProcessor<String, u32> for ParsePrice {
///     async fn process(&self, item: String) -> Processed<u32> {
///         match item.parse() {
///             Ok(price) => Processed::Transformed(price),
///             Err(_) => Processed::skipped("price is not a number", item.into()),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait ItemProcessor<I, O>: Send + Sync {
    async fn process(&self, item: I) -> Processed<O>;
}

/// Forwards every item unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughProcessor;

#[async_trait]
impl<I: Send + 'static> ItemProcessor<I, I> for PassThroughProcessor {
    async fn process(&self, item: I) -> Processed<I> {
        Processed::Transformed(item)
    }
}

/// Writes one chunk of processed items.
///
/// The batch never contains skipped items. A failed write must leave no
/// partial effect behind; the engine treats it as fatal for the step.
#[async_trait]
pub trait ItemWriter<O>: Send + Sync {
    async fn write(&self, items: &[O]) -> Result<(), BatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pass_through() {
        let processed = PassThroughProcessor.process(7).await;
        assert!(matches!(processed, Processed::Transformed(7)));
    }

    #[test]
    fn test_processed_from_result() {
        let ok: Processed<u8> = Ok(1).into();
        assert!(ok.is_transformed());

        let err: Processed<u8> = Err(BatchError::Process("bad".to_string())).into();
        assert!(matches!(err, Processed::Fatal(BatchError::Process(_))));
    }

    #[test]
    fn test_invalid_item_parameters() {
        let invalid = InvalidItem::new("missing %field%", serde_json::json!({"id": 3}))
            .with_parameter("%field%", "sku");
        assert_eq!(invalid.reason_parameters["%field%"], "sku");
        assert_eq!(invalid.item["id"], 3);
    }

    #[test]
    fn test_closure_reader() {
        let reader = || vec![1, 2, 3];
        let items: Vec<i32> = reader.open().unwrap().collect();
        assert_eq!(items, vec![1, 2, 3]);
    }
}
