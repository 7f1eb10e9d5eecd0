//! Outbound byte collaborator.

use crate::error::SessionError;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Sink for complete checksummed frames
pub trait Transmit: Send {
    /// Hand one frame to the bus.
    fn transmit(&mut self, frame: Bytes) -> Result<(), SessionError>;
}

impl Transmit for mpsc::UnboundedSender<Bytes> {
    fn transmit(&mut self, frame: Bytes) -> Result<(), SessionError> {
        self.send(frame)
            .map_err(|e| SessionError::Transmit(e.to_string()))
    }
}

impl Transmit for mpsc::Sender<Bytes> {
    fn transmit(&mut self, frame: Bytes) -> Result<(), SessionError> {
        self.try_send(frame)
            .map_err(|e| SessionError::Transmit(e.to_string()))
    }
}

/// Transmit collaborator that keeps every frame it is given.
///
/// Clones share the same record, so one clone can be attached while another
/// is inspected.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransmit {
    frames: Arc<Mutex<Vec<Bytes>>>,
}

impl RecordingTransmit {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames transmitted so far
    pub fn frames(&self) -> Vec<Bytes> {
        self.frames
            .lock()
            .map(|frames| frames.clone())
            .unwrap_or_default()
    }

    /// Number of frames transmitted so far
    pub fn len(&self) -> usize {
        self.frames.lock().map(|frames| frames.len()).unwrap_or(0)
    }

    /// Whether nothing has been transmitted
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transmit for RecordingTransmit {
    fn transmit(&mut self, frame: Bytes) -> Result<(), SessionError> {
        self.frames
            .lock()
            .map_err(|e| SessionError::Transmit(e.to_string()))?
            .push(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_shares_frames() {
        let recorder = RecordingTransmit::new();
        let mut attached = recorder.clone();
        attached.transmit(Bytes::from_static(&[0x83, 0x7c])).unwrap();
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.frames()[0].as_ref(), &[0x83, 0x7c]);
    }

    #[test]
    fn test_closed_channel_is_an_error() {
        let (mut tx, rx) = mpsc::unbounded_channel::<Bytes>();
        drop(rx);
        assert!(matches!(
            tx.transmit(Bytes::from_static(&[0x82, 0x7d])),
            Err(SessionError::Transmit(_))
        ));
    }
}
