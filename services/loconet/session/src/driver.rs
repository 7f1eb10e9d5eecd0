//! Async driver owning a [`LocoNetInterface`].
//!
//! One task serializes everything the interface reacts to: bytes read from
//! the bus, commands from [`InterfaceHandle`]s and expiry of the armed
//! deadline. Frames the interface transmits are written to the bus from the
//! same task.

use crate::error::SessionError;
use crate::interface::{InterfaceStats, LocoNetInterface};
use anyhow::Context;
use bytes::{Bytes, BytesMut};
use loconet_wire::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Commands accepted by the driver task
#[derive(Debug)]
enum InterfaceCommand {
    Send(Message),
    Attach,
    Detach,
    Shutdown,
}

/// Cloneable handle to a running driver
#[derive(Debug, Clone)]
pub struct InterfaceHandle {
    command_tx: mpsc::UnboundedSender<InterfaceCommand>,
}

impl InterfaceHandle {
    /// Queue a message for sending
    pub fn send(&self, message: Message) -> Result<(), SessionError> {
        self.command(InterfaceCommand::Send(message))
    }

    /// Reconnect the interface to the bus writer
    pub fn attach(&self) -> Result<(), SessionError> {
        self.command(InterfaceCommand::Attach)
    }

    /// Disconnect the interface from the bus writer, dropping pending sends
    pub fn detach(&self) -> Result<(), SessionError> {
        self.command(InterfaceCommand::Detach)
    }

    /// Stop the driver task
    pub fn shutdown(&self) -> Result<(), SessionError> {
        self.command(InterfaceCommand::Shutdown)
    }

    fn command(&self, command: InterfaceCommand) -> Result<(), SessionError> {
        self.command_tx
            .send(command)
            .map_err(|_| SessionError::Closed)
    }
}

/// Driver loop state
#[derive(Debug)]
pub struct InterfaceDriver {
    interface: LocoNetInterface,
    command_rx: mpsc::UnboundedReceiver<InterfaceCommand>,
    outbound_tx: mpsc::UnboundedSender<Bytes>,
    outbound_rx: mpsc::UnboundedReceiver<Bytes>,
}

impl InterfaceDriver {
    /// Wrap `interface`, attaching it to the driver's outbound channel.
    pub fn new(mut interface: LocoNetInterface) -> (Self, InterfaceHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        interface.attach(outbound_tx.clone());

        let driver = Self {
            interface,
            command_rx,
            outbound_tx,
            outbound_rx,
        };
        (driver, InterfaceHandle { command_tx })
    }

    /// The wrapped interface, for registering observers before running
    pub fn interface_mut(&mut self) -> &mut LocoNetInterface {
        &mut self.interface
    }

    /// Run until shutdown, the last handle is dropped or the reader closes.
    pub async fn run<R, W>(mut self, mut reader: R, mut writer: W) -> anyhow::Result<InterfaceStats>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Interface driver started");
        let mut read_buffer = BytesMut::with_capacity(1024);

        loop {
            let deadline = self.interface.deadline();

            tokio::select! {
                biased;

                // Frames the interface wants on the bus
                Some(frame) = self.outbound_rx.recv() => {
                    writer.write_all(&frame).await.context("writing frame to bus")?;
                    writer.flush().await.context("flushing bus writer")?;
                    debug!("Wrote frame: len={}", frame.len());
                }

                command = self.command_rx.recv() => {
                    match command {
                        Some(InterfaceCommand::Send(message)) => {
                            if let Err(e) = self.interface.enqueue(message) {
                                warn!("Failed to queue message: {}", e);
                            }
                        }
                        Some(InterfaceCommand::Attach) => {
                            self.interface.attach(self.outbound_tx.clone());
                        }
                        Some(InterfaceCommand::Detach) => {
                            self.interface.detach();
                        }
                        Some(InterfaceCommand::Shutdown) => {
                            info!("Interface driver stopping: reason=shutdown");
                            break;
                        }
                        None => {
                            info!("Interface driver stopping: reason=handles dropped");
                            break;
                        }
                    }
                }

                read = reader.read_buf(&mut read_buffer) => {
                    let n = read.context("reading from bus")?;
                    if n == 0 {
                        info!("Interface driver stopping: reason=bus closed");
                        break;
                    }
                    self.interface.receive(&read_buffer[..n]);
                    read_buffer.clear();
                }

                _ = expiry(deadline) => {
                    self.interface.on_deadline();
                }
            }
        }

        Ok(self.interface.stats().clone())
    }
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Spawn a driver for `interface` on the current runtime.
pub fn spawn<R, W>(
    interface: LocoNetInterface,
    reader: R,
    writer: W,
) -> (InterfaceHandle, JoinHandle<anyhow::Result<InterfaceStats>>)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (driver, handle) = InterfaceDriver::new(interface);
    let task = tokio::spawn(driver.run(reader, writer));
    (handle, task)
}
