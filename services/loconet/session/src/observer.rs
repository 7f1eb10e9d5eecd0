//! Observer registry for decoded messages.

use loconet_wire::Message;
use std::collections::BTreeMap;
use tracing::debug;

/// Receives every decoded message
pub trait LocoNetObserver: Send {
    /// Called once for every message read from the bus.
    fn on_message(&mut self, message: &Message);

    /// Called when an outbound message ran out of retries.
    fn send_abandoned(&mut self, _message: &Message) {}
}

impl<F> LocoNetObserver for F
where
    F: FnMut(&Message) + Send,
{
    fn on_message(&mut self, message: &Message) {
        self(message)
    }
}

/// Handle returned by [`ObserverRegistry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverToken(u64);

/// Observers keyed by token
#[derive(Default)]
pub struct ObserverRegistry {
    next_token: u64,
    observers: BTreeMap<ObserverToken, Box<dyn LocoNetObserver>>,
}

impl ObserverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer
    pub fn subscribe(&mut self, observer: Box<dyn LocoNetObserver>) -> ObserverToken {
        let token = ObserverToken(self.next_token);
        self.next_token += 1;
        self.observers.insert(token, observer);
        debug!("Observer subscribed: token={}", token.0);
        token
    }

    /// Remove an observer. Returns `false` if the token was unknown.
    pub fn unsubscribe(&mut self, token: ObserverToken) -> bool {
        let removed = self.observers.remove(&token).is_some();
        if removed {
            debug!("Observer unsubscribed: token={}", token.0);
        }
        removed
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether no observer is registered
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn deliver(&mut self, message: &Message) {
        for observer in self.observers.values_mut() {
            observer.on_message(message);
        }
    }

    pub(crate) fn abandoned(&mut self, message: &Message) {
        for observer in self.observers.values_mut() {
            observer.send_abandoned(message);
        }
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();

        let sink = seen.clone();
        let token = registry.subscribe(Box::new(move |message: &Message| {
            sink.lock().unwrap().push(message.message_type());
        }));
        assert_eq!(registry.len(), 1);

        registry.deliver(&Message::power_on());
        assert!(registry.unsubscribe(token));
        assert!(!registry.unsubscribe(token));
        registry.deliver(&Message::power_off());

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_tokens_are_not_reused() {
        let mut registry = ObserverRegistry::new();
        let first = registry.subscribe(Box::new(|_: &Message| {}));
        registry.unsubscribe(first);
        let second = registry.subscribe(Box::new(|_: &Message| {}));
        assert_ne!(first, second);
    }
}
