// Named event subscriptions

use crate::container::Container;
use crate::handler::Handler;
use crate::logging::debug;
use crate::{Error, Service};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Subscribe handlers to named events and emit them
///
/// Handlers may be bound to services; they are materialised through the
/// container on each emit, so subscribing never builds the owning service.
#[derive(Debug, Default)]
pub struct EventService {
    subscriptions: RwLock<HashMap<String, Vec<Handler>>>,
}

impl Service for EventService {
    const KEY: &'static str = "lintel::EventService";
}

impl EventService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event: &str, handler: Handler) {
        debug!(event, handler = ?handler, "Event subscribed");
        self.subscriptions
            .write()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    /// Remove the first subscription equal to `handler`
    pub fn unsubscribe(&self, event: &str, handler: &Handler) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let Some(handlers) = subscriptions.get_mut(event) else {
            return false;
        };
        let Some(position) = handlers.iter().position(|h| h == handler) else {
            return false;
        };
        handlers.remove(position);
        if handlers.is_empty() {
            subscriptions.remove(event);
        }
        true
    }

    pub fn has_subscribers(&self, event: &str) -> bool {
        self.subscriptions.read().contains_key(event)
    }

    /// Call every subscriber of `event` in subscription order
    pub fn emit(&self, container: &Container, event: &str, args: &[String]) -> Result<(), Error> {
        let handlers = match self.subscriptions.read().get(event) {
            Some(handlers) => handlers.clone(),
            None => return Ok(()),
        };
        debug!(event, subscribers = handlers.len(), "Emitting event");
        for handler in &handlers {
            let callable = container.callable(handler)?;
            callable(args)?;
        }
        Ok(())
    }
}
