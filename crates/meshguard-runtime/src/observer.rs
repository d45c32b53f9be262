//! Denial observers
//!
//! External collaborators (dashboards, alerting) subscribe to denials.
//! A failing or panicking observer is logged and skipped; it never affects
//! the admission decision or the other observers.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use meshguard_core::GuardResult;
use parking_lot::RwLock;

use crate::DenialEvent;

/// Callback invoked for every refused message
pub trait DenialObserver: Send + Sync {
    fn on_denial(&self, event: &DenialEvent) -> GuardResult<()>;
}

impl<F> DenialObserver for F
where
    F: Fn(&DenialEvent) -> GuardResult<()> + Send + Sync,
{
    fn on_denial(&self, event: &DenialEvent) -> GuardResult<()> {
        self(event)
    }
}

/// Registered observers
#[derive(Default)]
pub struct ObserverSet {
    observers: RwLock<Vec<Arc<dyn DenialObserver>>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn DenialObserver>) {
        self.observers.write().push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Deliver `event` to every observer; returns the number that failed
    pub fn notify(&self, event: &DenialEvent) -> usize {
        // Snapshot so observers may register others from inside a callback
        let observers: Vec<_> = self.observers.read().iter().cloned().collect();

        let mut failures = 0;
        for observer in observers {
            match panic::catch_unwind(AssertUnwindSafe(|| observer.on_denial(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures += 1;
                    tracing::warn!(sender = %event.sender, error = %err, "denial observer failed");
                }
                Err(_) => {
                    failures += 1;
                    tracing::warn!(sender = %event.sender, "denial observer panicked");
                }
            }
        }
        failures
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("observers", &self.len())
            .finish()
    }
}
