//! In-process publish/subscribe of gateway events.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::events::{Event, EventKind};

/// Callback invoked for every published event of the kind it subscribed to.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync + 'static>;

/// Identifies one subscription, returned by [`Dispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Registry mapping an event kind to its handlers in registration order.
///
/// `publish` takes a snapshot of the handler list before calling anything, so
/// handlers may subscribe or unsubscribe (themselves included) while being
/// invoked; the change applies from the next publish on.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Mutex<HashMap<EventKind, Vec<(HandlerId, Handler)>>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a subscription. Returns whether it was registered.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut removed = false;
        handlers.retain(|_, list| {
            let before = list.len();
            list.retain(|(handler_id, _)| *handler_id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    /// Deliver `event` to every handler registered for its kind, in order.
    ///
    /// A panicking handler is logged and skipped. Returns the number of
    /// handlers that completed.
    pub fn publish(&self, event: &Event) -> usize {
        let kind = event.kind();
        let snapshot: Vec<(HandlerId, Handler)> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        let mut delivered = 0;
        for (id, handler) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        event = %kind,
                        handler = id.0,
                        panic = panic_message(panic.as_ref()),
                        "event handler panicked"
                    );
                    #[cfg(not(feature = "tracing"))]
                    let _ = (&id, &panic);
                }
            }
        }
        delivered
    }

    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&EventKind, usize> =
            handlers.iter().map(|(kind, list)| (kind, list.len())).collect();
        f.debug_struct("Dispatcher").field("handlers", &counts).finish()
    }
}

#[cfg(feature = "tracing")]
fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
