//! Lifecycle events and their listeners.

use crate::execution::StepExecution;
use crate::item::InvalidItem;
use crate::step::StepName;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Raised before a step's logic runs.
pub const BEFORE_STEP_EXECUTION: &str = "BEFORE_STEP_EXECUTION";
/// Raised when a step's logic returns normally.
pub const STEP_EXECUTION_SUCCEEDED: &str = "STEP_EXECUTION_SUCCEEDED";
/// Raised when a step fails.
pub const STEP_EXECUTION_ERRORED: &str = "STEP_EXECUTION_ERRORED";
/// Raised when a step is stopped.
pub const STEP_EXECUTION_INTERRUPTED: &str = "STEP_EXECUTION_INTERRUPTED";
/// Raised last for every step, whatever the outcome.
pub const STEP_EXECUTION_COMPLETED: &str = "STEP_EXECUTION_COMPLETED";
/// Raised for each skipped item.
pub const INVALID_ITEM: &str = "INVALID_ITEM";

/// An event raised while a step runs.
///
/// Step events borrow the execution record: listeners can read it but never
/// change it.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub enum BatchEvent<'a> {
    BeforeStepExecution(&'a StepExecution),
    StepExecutionSucceeded(&'a StepExecution),
    StepExecutionErrored(&'a StepExecution),
    StepExecutionInterrupted(&'a StepExecution),
    StepExecutionCompleted(&'a StepExecution),
    InvalidItem {
        step_name: &'a StepName,
        invalid: &'a InvalidItem,
    },
}

impl BatchEvent<'_> {
    /// The event name, e.g. `"STEP_EXECUTION_ERRORED"`.
    pub fn name(&self) -> &'static str {
        match self {
            BatchEvent::BeforeStepExecution(_) => BEFORE_STEP_EXECUTION,
            BatchEvent::StepExecutionSucceeded(_) => STEP_EXECUTION_SUCCEEDED,
            BatchEvent::StepExecutionErrored(_) => STEP_EXECUTION_ERRORED,
            BatchEvent::StepExecutionInterrupted(_) => STEP_EXECUTION_INTERRUPTED,
            BatchEvent::StepExecutionCompleted(_) => STEP_EXECUTION_COMPLETED,
            BatchEvent::InvalidItem { .. } => INVALID_ITEM,
        }
    }

    /// The name of the step that raised the event.
    pub fn step_name(&self) -> &StepName {
        match self {
            BatchEvent::BeforeStepExecution(execution)
            | BatchEvent::StepExecutionSucceeded(execution)
            | BatchEvent::StepExecutionErrored(execution)
            | BatchEvent::StepExecutionInterrupted(execution)
            | BatchEvent::StepExecutionCompleted(execution) => execution.step_name(),
            BatchEvent::InvalidItem { step_name, .. } => *step_name,
        }
    }
}

impl fmt::Display for BatchEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.step_name())
    }
}

/// Receives lifecycle events.
///
/// Listeners run synchronously on the engine's flow of control; the engine
/// waits for each one to return before going on.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &BatchEvent<'_>);
}

impl<F> EventListener for F
where
    F: Fn(&BatchEvent<'_>) + Send + Sync,
{
    fn on_event(&self, event: &BatchEvent<'_>) {
        self(event)
    }
}

/// Ordered list of listeners.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventDispatcher {
    /// Creates a dispatcher with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener. Listeners are called in registration order.
    pub fn add_listener(&mut self, listener: Arc<dyn EventListener>) {
        self.listeners.push(listener);
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Calls every listener with `event`.
    pub fn dispatch(&self, event: BatchEvent<'_>) {
        debug!("Dispatching {}", event);
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl EventListener for TracingListener {
    fn on_event(&self, event: &BatchEvent<'_>) {
        match event {
            BatchEvent::BeforeStepExecution(execution) => {
                info!("Step '{}' starting", execution.step_name());
            }
            BatchEvent::StepExecutionSucceeded(execution) => {
                info!(
                    "Step '{}' succeeded: read={} written={} skipped={}",
                    execution.step_name(),
                    execution.read_count(),
                    execution.write_count(),
                    execution.filter_count()
                );
            }
            BatchEvent::StepExecutionErrored(execution) => {
                warn!(
                    "Step '{}' failed: {}",
                    execution.step_name(),
                    execution.exit_status()
                );
            }
            BatchEvent::StepExecutionInterrupted(execution) => {
                warn!("Step '{}' was interrupted", execution.step_name());
            }
            BatchEvent::StepExecutionCompleted(execution) => {
                info!(
                    "Step '{}' finished with status {}",
                    execution.step_name(),
                    execution.status()
                );
            }
            BatchEvent::InvalidItem { step_name, invalid } => {
                warn!(
                    "Step '{}' skipped an invalid item: {}",
                    step_name, invalid.reason
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_event_names() {
        let execution = StepExecution::new("import");
        assert_eq!(
            BatchEvent::BeforeStepExecution(&execution).name(),
            "BEFORE_STEP_EXECUTION"
        );
        assert_eq!(
            BatchEvent::StepExecutionInterrupted(&execution).to_string(),
            "STEP_EXECUTION_INTERRUPTED (import)"
        );

        let invalid = InvalidItem::new("bad row", serde_json::Value::Null);
        let step_name = StepName::new("import");
        let event = BatchEvent::InvalidItem {
            step_name: &step_name,
            invalid: &invalid,
        };
        assert_eq!(event.name(), INVALID_ITEM);
        assert_eq!(event.step_name().as_str(), "import");
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();

        for tag in ["first", "second"] {
            let calls = Arc::clone(&calls);
            dispatcher.add_listener(Arc::new(move |event: &BatchEvent<'_>| {
                calls.lock().unwrap().push(format!("{tag}:{}", event.name()));
            }));
        }
        dispatcher.add_listener(Arc::new(TracingListener));
        assert_eq!(dispatcher.len(), 3);

        let execution = StepExecution::new("import");
        dispatcher.dispatch(BatchEvent::StepExecutionCompleted(&execution));

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "first:STEP_EXECUTION_COMPLETED",
                "second:STEP_EXECUTION_COMPLETED"
            ]
        );
    }

    #[test]
    fn test_empty_dispatcher() {
        let dispatcher = EventDispatcher::new();
        assert!(dispatcher.is_empty());
        let execution = StepExecution::new("noop");
        dispatcher.dispatch(BatchEvent::BeforeStepExecution(&execution));
    }
}
