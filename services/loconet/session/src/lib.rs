//! LocoNet send queue, retry and acknowledgment handling, observers and async driver.
//!
//! This crate turns the frame-level types of `loconet-wire` into a working
//! bus connection: outbound messages are queued and sent one at a time,
//! confirmed by their echo (and, for IMM packets and acknowledged switch
//! requests, by the command station's reply), and every decoded message is
//! fanned out to registered observers.
//!
//! ## Features
//!
//! - **Send State Machine**: FIFO queue with echo matching and bounded retries
//! - **Acknowledgments**: Busy replies restart the retry budget
//! - **Observers**: Token-keyed registry plus a channel-backed event notifier
//! - **Async Driver**: One task multiplexes bus reads, commands and deadlines
//!
//! ## Example
//!
//! ```rust,no_run
//! use loconet_session::{spawn, EventNotifier, InterfaceEvent, LocoNetInterface};
//! use loconet_wire::Message;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut interface = LocoNetInterface::default();
//! let (notifier, mut events) = EventNotifier::channel();
//! interface.subscribe(notifier);
//!
//! let (handle, task) = spawn(interface, tokio::io::stdin(), tokio::io::stdout());
//! handle.send(Message::power_on())?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         InterfaceEvent::MessageReceived { message, .. } => {
//!             println!("{}", message);
//!         }
//!         InterfaceEvent::SendAbandoned { message, .. } => {
//!             println!("gave up on {}", message);
//!         }
//!     }
//! }
//! task.await??;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod driver;
pub mod error;
pub mod interface;
pub mod notifier;
pub mod observer;
pub mod transmit;

// Re-export main types
pub use config::InterfaceConfig;
pub use driver::{spawn, InterfaceDriver, InterfaceHandle};
pub use error::SessionError;
pub use interface::{InterfaceStats, LocoNetInterface, SendState};
pub use notifier::{EventNotifier, InterfaceEvent};
pub use observer::{LocoNetObserver, ObserverRegistry, ObserverToken};
pub use transmit::{RecordingTransmit, Transmit};
