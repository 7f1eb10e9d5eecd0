//! Send queue, retry and acknowledgment state machine.
//!
//! LocoNet is half duplex: every node hears its own transmissions. A send
//! counts as delivered once the bus echoes it back byte for byte. Two kinds
//! of command need a further acknowledgment from the command station before
//! the next queued message may go out:
//!
//! ```text
//!   Idle --send--> Sending --echo--> AwaitingImmAck    --ImmPacketOk-->          Idle
//!                     |                   |            --ImmPacketBufferFull--> Sending
//!                     |                   |
//!                     |           AwaitingSwitchAck    --SetSwWithAckAccepted--> Idle
//!                     |                                --SetSwWithAckRejected--> Sending
//!                     +--echo (other types)--> Idle
//! ```
//!
//! Every waiting state has one armed deadline. On expiry the frame is sent
//! again until the retry budget runs out, then the message is abandoned.
//! The machine never sleeps: the owner reads [`LocoNetInterface::deadline`]
//! and calls [`LocoNetInterface::on_deadline`] when it passes.

use crate::config::InterfaceConfig;
use crate::error::SessionError;
use crate::observer::{LocoNetObserver, ObserverRegistry, ObserverToken};
use crate::transmit::Transmit;
use loconet_wire::{DecoderStats, Message, MessageDecoder, MessageType};
use std::collections::VecDeque;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Position of the interface in the send cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    /// Nothing in flight
    Idle,
    /// Waiting for the echo of the in-flight frame
    Sending,
    /// Echo seen, waiting for the command station to accept an IMM packet
    AwaitingImmAck,
    /// Echo seen, waiting for the command station to accept a switch request
    AwaitingSwitchAck,
}

/// Interface counters
#[derive(Clone, Debug, Default)]
pub struct InterfaceStats {
    /// Messages decoded from the bus
    pub messages_received: u64,
    /// Frames handed to the transmit collaborator
    pub frames_transmitted: u64,
    /// Frames sent again after a timeout or a busy acknowledgment
    pub retransmissions: u64,
    /// Sends confirmed by echo or acknowledgment
    pub messages_completed: u64,
    /// Sends dropped after the retry budget ran out
    pub messages_abandoned: u64,
    /// Frames the transmit collaborator refused
    pub transmit_errors: u64,
}

#[derive(Debug)]
struct InFlight {
    message: Message,
    retries_left: i32,
}

/// Host side of a LocoNet connection
pub struct LocoNetInterface {
    config: InterfaceConfig,
    transmit: Option<Box<dyn Transmit>>,
    queue: VecDeque<Message>,
    in_flight: Option<InFlight>,
    state: SendState,
    deadline: Option<Instant>,
    decoder: MessageDecoder,
    observers: ObserverRegistry,
    stats: InterfaceStats,
}

impl LocoNetInterface {
    /// Create a detached interface
    pub fn new(config: InterfaceConfig) -> Self {
        Self {
            config,
            transmit: None,
            queue: VecDeque::new(),
            in_flight: None,
            state: SendState::Idle,
            deadline: None,
            decoder: MessageDecoder::new(),
            observers: ObserverRegistry::new(),
            stats: InterfaceStats::default(),
        }
    }

    /// Install the transmit collaborator
    pub fn attach(&mut self, transmit: impl Transmit + 'static) {
        self.transmit = Some(Box::new(transmit));
        info!("Interface attached");
        self.send_next();
    }

    /// Remove the transmit collaborator, dropping queued and in-flight sends.
    pub fn detach(&mut self) {
        let dropped = self.queue.len() + usize::from(self.in_flight.is_some());
        self.transmit = None;
        self.queue.clear();
        self.in_flight = None;
        self.deadline = None;
        self.state = SendState::Idle;
        info!("Interface detached: dropped={}", dropped);
    }

    /// Whether a transmit collaborator is installed
    pub fn is_attached(&self) -> bool {
        self.transmit.is_some()
    }

    /// Queue a message for sending.
    ///
    /// Fails with [`SessionError::Detached`] when no transmit collaborator is
    /// installed; the message is dropped.
    pub fn enqueue(&mut self, message: Message) -> Result<(), SessionError> {
        if self.transmit.is_none() {
            debug!("Dropping message while detached: bytes={}", message.hex());
            return Err(SessionError::Detached);
        }
        self.queue.push_back(message);
        self.send_next();
        Ok(())
    }

    /// Feed bytes read from the bus. Chunking is arbitrary.
    pub fn receive(&mut self, bytes: &[u8]) {
        self.decoder.push(bytes);
        while let Some(message) = self.decoder.decode() {
            self.handle_message(message);
        }
    }

    /// Act on expiry of the armed deadline. Returns `false` when no deadline
    /// was armed.
    pub fn on_deadline(&mut self) -> bool {
        if self.deadline.take().is_none() {
            return false;
        }

        let Some(retries_left) = self.in_flight.as_ref().map(|f| f.retries_left) else {
            self.state = SendState::Idle;
            self.send_next();
            return true;
        };

        if retries_left < 0 {
            self.abandon();
        } else {
            if let Some(in_flight) = self.in_flight.as_mut() {
                in_flight.retries_left -= 1;
            }
            debug!("Send timed out: retries_left={}", retries_left - 1);
            self.state = SendState::Sending;
            self.arm_for_in_flight();
            self.stats.retransmissions += 1;
            self.transmit_in_flight();
        }
        true
    }

    /// Register an observer for decoded messages
    pub fn subscribe(&mut self, observer: impl LocoNetObserver + 'static) -> ObserverToken {
        self.observers.subscribe(Box::new(observer))
    }

    /// Remove an observer
    pub fn unsubscribe(&mut self, token: ObserverToken) -> bool {
        self.observers.unsubscribe(token)
    }

    /// Current send state
    pub fn state(&self) -> SendState {
        self.state
    }

    /// When the armed deadline expires, if one is armed
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Message awaiting its echo or acknowledgment
    pub fn in_flight(&self) -> Option<&Message> {
        self.in_flight.as_ref().map(|f| &f.message)
    }

    /// Messages waiting behind the in-flight one
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Interface counters
    pub fn stats(&self) -> &InterfaceStats {
        &self.stats
    }

    /// Reassembly counters
    pub fn decoder_stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    /// Active configuration
    pub fn config(&self) -> &InterfaceConfig {
        &self.config
    }

    fn handle_message(&mut self, message: Message) {
        self.stats.messages_received += 1;
        self.match_acknowledgment(&message);
        self.observers.deliver(&message);
    }

    fn match_acknowledgment(&mut self, message: &Message) {
        let Some(in_flight) = &self.in_flight else {
            return;
        };
        let echoed = in_flight.message == *message;
        let sent_type = in_flight.message.message_type();

        if echoed {
            self.deadline = None;
            match sent_type {
                MessageType::ImmPacket => self.await_acknowledgment(SendState::AwaitingImmAck),
                MessageType::SetSwWithAck => {
                    self.await_acknowledgment(SendState::AwaitingSwitchAck)
                }
                _ => self.complete(),
            }
            return;
        }

        match (self.state, message.message_type()) {
            (SendState::AwaitingImmAck, MessageType::ImmPacketOk)
            | (SendState::AwaitingSwitchAck, MessageType::SetSwWithAckAccepted) => {
                self.complete()
            }
            (SendState::AwaitingImmAck, MessageType::ImmPacketBufferFull)
            | (SendState::AwaitingSwitchAck, MessageType::SetSwWithAckRejected) => {
                debug!("Command station busy, resending: type={:?}", sent_type);
                self.deadline = None;
                if let Some(in_flight) = self.in_flight.as_mut() {
                    in_flight.retries_left = self.config.retry_budget;
                }
                self.state = SendState::Sending;
                self.arm_for_in_flight();
                self.stats.retransmissions += 1;
                self.transmit_in_flight();
            }
            _ => {}
        }
    }

    fn await_acknowledgment(&mut self, state: SendState) {
        self.state = state;
        self.arm(self.config.ack_wait_bytes);
    }

    fn complete(&mut self) {
        self.deadline = None;
        self.state = SendState::Idle;
        if let Some(done) = self.in_flight.take() {
            self.stats.messages_completed += 1;
            debug!("Send complete: type={:?}", done.message.message_type());
        }
        self.send_next();
    }

    fn abandon(&mut self) {
        self.deadline = None;
        self.state = SendState::Idle;
        if let Some(dropped) = self.in_flight.take() {
            self.stats.messages_abandoned += 1;
            warn!(
                "Send abandoned after {} retries: bytes={}",
                self.config.retry_budget + 1,
                dropped.message.hex()
            );
            self.observers.abandoned(&dropped.message);
        }
        self.send_next();
    }

    fn send_next(&mut self) {
        if self.transmit.is_none() {
            self.state = SendState::Idle;
            self.queue.clear();
            return;
        }
        if self.in_flight.is_some() {
            return;
        }
        let Some(message) = self.queue.pop_front() else {
            return;
        };

        info!(
            "Sending message: type={:?} bytes={}",
            message.message_type(),
            message.hex()
        );
        self.in_flight = Some(InFlight {
            message,
            retries_left: self.config.retry_budget,
        });
        self.state = SendState::Sending;
        self.arm_for_in_flight();
        self.transmit_in_flight();
    }

    fn arm_for_in_flight(&mut self) {
        let bytes = self.in_flight.as_ref().map_or(0, |f| f.message.len());
        self.arm(bytes);
    }

    fn arm(&mut self, bytes: usize) {
        self.deadline = Some(Instant::now() + self.config.timeout_for(bytes));
    }

    fn transmit_in_flight(&mut self) {
        let Some(frame) = self.in_flight.as_ref().map(|f| f.message.frame()) else {
            return;
        };
        let Some(transmit) = self.transmit.as_mut() else {
            return;
        };
        match transmit.transmit(frame) {
            Ok(()) => self.stats.frames_transmitted += 1,
            Err(e) => {
                warn!("Failed to transmit frame: {}", e);
                self.stats.transmit_errors += 1;
            }
        }
    }
}

impl Default for LocoNetInterface {
    fn default() -> Self {
        Self::new(InterfaceConfig::default())
    }
}

impl std::fmt::Debug for LocoNetInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocoNetInterface")
            .field("state", &self.state)
            .field("attached", &self.transmit.is_some())
            .field("queue", &self.queue.len())
            .field("in_flight", &self.in_flight)
            .field("deadline", &self.deadline)
            .field("observers", &self.observers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::{EventNotifier, InterfaceEvent};
    use crate::transmit::RecordingTransmit;
    use loconet_wire::{ImmRepeat, Opcode, SwitchState};

    fn attached() -> (LocoNetInterface, RecordingTransmit) {
        let recorder = RecordingTransmit::new();
        let mut interface = LocoNetInterface::default();
        interface.attach(recorder.clone());
        (interface, recorder)
    }

    #[test]
    fn test_enqueue_transmits_with_checksum() {
        let (mut interface, recorder) = attached();
        interface.enqueue(Message::power_on()).unwrap();

        assert_eq!(interface.state(), SendState::Sending);
        assert!(interface.deadline().is_some());
        assert_eq!(recorder.frames()[0].as_ref(), &[0x83, 0x7c]);
    }

    #[test]
    fn test_queue_is_fifo_behind_echo() {
        let (mut interface, recorder) = attached();
        interface.enqueue(Message::power_on()).unwrap();
        interface.enqueue(Message::power_off()).unwrap();
        assert_eq!(recorder.len(), 1);
        assert_eq!(interface.queue_len(), 1);

        interface.receive(&[0x83, 0x7c]);
        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.frames()[1].as_ref(), &[0x82, 0x7d]);

        interface.receive(&[0x82, 0x7d]);
        assert_eq!(interface.state(), SendState::Idle);
        assert!(interface.deadline().is_none());
        assert_eq!(interface.stats().messages_completed, 2);
    }

    #[test]
    fn test_retry_budget_then_abandon() {
        let (mut interface, recorder) = attached();
        let (notifier, mut events) = EventNotifier::channel();
        interface.subscribe(notifier);
        interface.enqueue(Message::power_on()).unwrap();
        interface.enqueue(Message::power_off()).unwrap();

        for _ in 0..11 {
            assert!(interface.on_deadline());
            assert_eq!(interface.state(), SendState::Sending);
        }
        // first transmission plus eleven retransmissions
        assert_eq!(recorder.len(), 12);
        assert!(recorder.frames().iter().all(|f| f.as_ref() == [0x83, 0x7c]));

        assert!(interface.on_deadline());
        assert_eq!(interface.stats().messages_abandoned, 1);
        // the next queued message goes out
        assert_eq!(recorder.len(), 13);
        assert_eq!(recorder.frames()[12].as_ref(), &[0x82, 0x7d]);

        match events.try_recv().unwrap() {
            InterfaceEvent::SendAbandoned { message, .. } => {
                assert_eq!(message, Message::power_on())
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_stale_deadline_is_ignored() {
        let (mut interface, recorder) = attached();
        assert!(!interface.on_deadline());

        interface.enqueue(Message::power_on()).unwrap();
        interface.receive(&[0x83, 0x7c]);
        assert!(!interface.on_deadline());
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_imm_packet_buffer_full_then_ok() {
        let (mut interface, recorder) = attached();
        let imm = Message::imm_packet(&[0x03, 0x3f, 0x10], ImmRepeat::NoRepeat).unwrap();
        assert_eq!(imm.message_type(), MessageType::ImmPacket);
        interface.enqueue(imm.clone()).unwrap();

        interface.receive(&imm.frame());
        assert_eq!(interface.state(), SendState::AwaitingImmAck);
        assert!(interface.deadline().is_some());

        // a few timeouts, then a busy reply resets the budget
        interface.on_deadline();
        interface.on_deadline();
        interface.receive(&imm.frame());
        interface.receive(&Message::ack(Opcode::ImmPacket, 0x00).frame());
        assert_eq!(interface.state(), SendState::Sending);
        assert_eq!(recorder.len(), 4);
        assert_eq!(recorder.frames()[3], imm.frame());

        interface.receive(&imm.frame());
        interface.receive(&Message::ack(Opcode::ImmPacket, 0x7f).frame());
        assert_eq!(interface.state(), SendState::Idle);
        assert!(interface.in_flight().is_none());
        assert_eq!(interface.stats().messages_completed, 1);
    }

    #[test]
    fn test_switch_with_ack() {
        let (mut interface, recorder) = attached();
        let request = Message::set_sw_with_ack(12, SwitchState::Thrown).unwrap();
        interface.enqueue(request.clone()).unwrap();
        interface.enqueue(Message::power_on()).unwrap();

        interface.receive(&request.frame());
        assert_eq!(interface.state(), SendState::AwaitingSwitchAck);

        // unrelated traffic leaves the machine alone
        interface.receive(&[0x82, 0x7d]);
        assert_eq!(interface.state(), SendState::AwaitingSwitchAck);

        interface.receive(&Message::set_sw_with_ack_rejected().frame());
        assert_eq!(interface.state(), SendState::Sending);
        assert_eq!(recorder.len(), 2);

        interface.receive(&request.frame());
        interface.receive(&Message::set_sw_with_ack_accepted().frame());
        assert_eq!(recorder.len(), 3);
        assert_eq!(recorder.frames()[2].as_ref(), &[0x83, 0x7c]);
    }

    #[test]
    fn test_observers_see_every_message() {
        let (mut interface, _recorder) = attached();
        let (notifier, mut events) = EventNotifier::channel();
        let token = interface.subscribe(notifier);

        interface.enqueue(Message::power_on()).unwrap();
        interface.receive(&[0x83, 0x7c, 0x82, 0x7d]);
        assert_eq!(events.try_recv().unwrap().message(), &Message::power_on());
        assert_eq!(events.try_recv().unwrap().message(), &Message::power_off());
        assert_eq!(interface.stats().messages_received, 2);

        assert!(interface.unsubscribe(token));
        interface.receive(&[0x83, 0x7c]);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_detach_clears_everything() {
        let (mut interface, recorder) = attached();
        interface.enqueue(Message::power_on()).unwrap();
        interface.enqueue(Message::power_off()).unwrap();

        interface.detach();
        assert!(!interface.is_attached());
        assert_eq!(interface.state(), SendState::Idle);
        assert_eq!(interface.queue_len(), 0);
        assert!(interface.in_flight().is_none());
        assert!(interface.deadline().is_none());
        assert!(matches!(
            interface.enqueue(Message::power_on()),
            Err(SessionError::Detached)
        ));

        interface.attach(recorder.clone());
        assert_eq!(recorder.len(), 1);
        interface.enqueue(Message::power_off()).unwrap();
        assert_eq!(recorder.len(), 2);
    }
}
