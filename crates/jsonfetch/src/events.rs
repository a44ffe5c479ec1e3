//! Success/error notifications for completed requests.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::ClientError;

/// Outcome of one request.
#[derive(Debug, Clone, Copy)]
pub enum ClientEvent<'a> {
    /// Decoded response body, from the network or the cache.
    Success(&'a Value),
    /// The error returned to the caller.
    Error(&'a ClientError),
}

impl ClientEvent<'_> {
    /// Returns true for [`ClientEvent::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true for [`ClientEvent::Error`].
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Registered callback. Removal compares handles, so keep a clone of the `Arc`.
pub type EventHandler = Arc<dyn Fn(&ClientEvent<'_>) + Send + Sync>;

/// Wrap a closure as an [`EventHandler`].
pub fn handler<F>(f: F) -> EventHandler
where
    F: Fn(&ClientEvent<'_>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Ordered list of event handlers.
#[derive(Default)]
pub struct EventNotifier {
    handlers: RwLock<Vec<EventHandler>>,
}

impl EventNotifier {
    /// Create a notifier with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler.
    pub fn add(&self, handler: EventHandler) {
        self.handlers.write().push(handler);
    }

    /// Remove the first registration of `handler`. Returns false if it was not registered.
    pub fn remove(&self, handler: &EventHandler) -> bool {
        let mut handlers = self.handlers.write();
        match handlers.iter().position(|h| Arc::ptr_eq(h, handler)) {
            Some(index) => {
                handlers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns true if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Call every handler in registration order.
    ///
    /// Handlers run on a snapshot of the list, so a handler may register or
    /// remove handlers without deadlocking. A panicking handler propagates.
    pub fn emit(&self, event: &ClientEvent<'_>) {
        let handlers = self.handlers.read().clone();
        for handler in &handlers {
            handler(event);
        }
    }
}

impl std::fmt::Debug for EventNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventNotifier").field("handlers", &self.len()).finish()
    }
}
