//! Event notification over a channel.

use crate::observer::LocoNetObserver;
use loconet_wire::Message;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Events forwarded by [`EventNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceEvent {
    /// A message was read from the bus
    MessageReceived {
        /// Position in the event stream
        sequence: u64,
        /// The decoded message
        message: Message,
    },
    /// An outbound message ran out of retries
    SendAbandoned {
        /// Position in the event stream
        sequence: u64,
        /// The message that was dropped
        message: Message,
    },
}

impl InterfaceEvent {
    /// Position in the event stream
    pub fn sequence(&self) -> u64 {
        match self {
            InterfaceEvent::MessageReceived { sequence, .. }
            | InterfaceEvent::SendAbandoned { sequence, .. } => *sequence,
        }
    }

    /// Message the event refers to
    pub fn message(&self) -> &Message {
        match self {
            InterfaceEvent::MessageReceived { message, .. }
            | InterfaceEvent::SendAbandoned { message, .. } => message,
        }
    }
}

/// Observer that forwards interface events to a channel
#[derive(Debug, Clone)]
pub struct EventNotifier {
    /// Channel to send events on
    event_tx: mpsc::UnboundedSender<InterfaceEvent>,
    /// Sequence number for events
    sequence_counter: Arc<AtomicU64>,
}

impl EventNotifier {
    /// Create a notifier sending on `event_tx`
    pub fn new(event_tx: mpsc::UnboundedSender<InterfaceEvent>) -> Self {
        Self {
            event_tx,
            sequence_counter: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Create a notifier together with its receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<InterfaceEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (Self::new(event_tx), event_rx)
    }

    fn next_sequence(&self) -> u64 {
        self.sequence_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn send_event(&self, event: InterfaceEvent) {
        let sequence = event.sequence();
        if let Err(e) = self.event_tx.send(event) {
            error!("Failed to send interface event (seq: {}): {}", sequence, e);
        } else {
            debug!("Sent interface event (seq: {})", sequence);
        }
    }
}

impl LocoNetObserver for EventNotifier {
    fn on_message(&mut self, message: &Message) {
        let event = InterfaceEvent::MessageReceived {
            sequence: self.next_sequence(),
            message: message.clone(),
        };
        self.send_event(event);
    }

    fn send_abandoned(&mut self, message: &Message) {
        warn!(
            "Notifying send abandoned: type={:?} bytes={}",
            message.message_type(),
            message.hex()
        );
        let event = InterfaceEvent::SendAbandoned {
            sequence: self.next_sequence(),
            message: message.clone(),
        };
        self.send_event(event);
    }
}
