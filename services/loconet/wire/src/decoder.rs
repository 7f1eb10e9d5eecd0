//! Byte stream reassembly.
//!
//! LocoNet carries no framing beyond the opcode's top bit, so the decoder
//! hunts for an opcode, derives the frame length from it and verifies the
//! checksum. A byte with its top bit set inside a candidate frame means the
//! candidate was a false start; decoding restarts at that byte.

use crate::checksum::is_checksum_ok;
use crate::message::Message;
use crate::opcode::{frame_length, is_opcode};
use bytes::{Buf, BytesMut};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Reassembly counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames decoded with a valid checksum
    pub frames_decoded: u64,
    /// Complete frames dropped for a checksum mismatch
    pub checksum_failures: u64,
    /// False frame starts abandoned
    pub resyncs: u64,
    /// Bytes dropped outside valid frames
    pub discarded_bytes: u64,
}

/// Incremental LocoNet frame decoder
#[derive(Debug)]
pub struct MessageDecoder {
    buffer: BytesMut,
    last_timestamp: Option<SystemTime>,
    stats: DecoderStats,
}

impl MessageDecoder {
    /// Create a decoder with an empty buffer
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(256),
            last_timestamp: None,
            stats: DecoderStats::default(),
        }
    }

    /// Append received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes waiting for the rest of their frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Counters since creation
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Decode the next complete frame, or `None` when more bytes are needed.
    pub fn decode(&mut self) -> Option<Message> {
        loop {
            self.skip_to_opcode();
            if self.buffer.is_empty() {
                return None;
            }

            let length = frame_length(self.buffer[0], self.buffer.get(1).copied())?;

            // a top-bit byte after the opcode is the start of another frame
            let available = length.min(self.buffer.len());
            if let Some(restart) = (1..available).find(|&index| is_opcode(self.buffer[index])) {
                debug!(
                    "Resynchronising: opcode={:#04x} dropped={}",
                    self.buffer[0], restart
                );
                self.buffer.advance(restart);
                self.stats.resyncs += 1;
                self.stats.discarded_bytes += restart as u64;
                continue;
            }

            if self.buffer.len() < length {
                return None;
            }

            let frame = self.buffer.split_to(length);
            if !is_checksum_ok(&frame) {
                debug!(
                    "Dropped frame with bad checksum: opcode={:#04x} len={}",
                    frame[0], length
                );
                self.stats.checksum_failures += 1;
                self.stats.discarded_bytes += length as u64;
                continue;
            }

            let Ok(message) = Message::from_frame(&frame) else {
                continue;
            };
            self.stats.frames_decoded += 1;
            return Some(self.stamp(message));
        }
    }

    /// Decode every complete frame currently buffered
    pub fn decode_all(&mut self) -> Vec<Message> {
        std::iter::from_fn(|| self.decode()).collect()
    }

    fn skip_to_opcode(&mut self) {
        let skip = self
            .buffer
            .iter()
            .position(|byte| is_opcode(*byte))
            .unwrap_or(self.buffer.len());
        if skip > 0 {
            self.buffer.advance(skip);
            self.stats.discarded_bytes += skip as u64;
        }
    }

    fn stamp(&mut self, message: Message) -> Message {
        let now = SystemTime::now();
        let since_last = self
            .last_timestamp
            .and_then(|last| now.duration_since(last).ok())
            .unwrap_or(Duration::ZERO);
        self.last_timestamp = Some(now);
        message.with_timing(now, since_last)
    }
}

impl Default for MessageDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message_type::MessageType;

    fn stream() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&[0x83, 0x7c]);
        bytes.extend_from_slice(&[0xbb, 0x7f, 0x00, 0x3b]);
        bytes.extend_from_slice(&Message::set_duplex_group_data("Layout", 3, 9).unwrap().frame());
        bytes.extend_from_slice(&[0x82, 0x7d]);
        bytes
    }

    #[test]
    fn test_decode_single_frames() {
        let mut decoder = MessageDecoder::new();
        decoder.push(&[0x83, 0x7c]);
        let message = decoder.decode().unwrap();
        assert_eq!(message.bytes(), &[0x83]);
        assert_eq!(message.message_type(), MessageType::PwrOn);
        assert!(message.timestamp().is_some());
        assert!(decoder.decode().is_none());
    }

    #[test]
    fn test_waits_for_complete_frame() {
        let mut decoder = MessageDecoder::new();
        decoder.push(&[0xbb, 0x7f]);
        assert!(decoder.decode().is_none());
        assert_eq!(decoder.buffered(), 2);
        decoder.push(&[0x00, 0x3b]);
        assert_eq!(
            decoder.decode().unwrap().message_type(),
            MessageType::GetOpSwDataAP1
        );
    }

    #[test]
    fn test_waits_for_length_byte() {
        let mut decoder = MessageDecoder::new();
        decoder.push(&[0xe5]);
        assert!(decoder.decode().is_none());
        assert_eq!(decoder.buffered(), 1);
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let bytes = stream();

        let mut whole = MessageDecoder::new();
        whole.push(&bytes);
        let expected: Vec<Vec<u8>> = whole.decode_all().iter().map(|m| m.bytes().to_vec()).collect();
        assert_eq!(expected.len(), 4);

        for chunk_size in 1..=7 {
            let mut chunked = MessageDecoder::new();
            let mut decoded = Vec::new();
            for chunk in bytes.chunks(chunk_size) {
                chunked.push(chunk);
                decoded.extend(chunked.decode_all().iter().map(|m| m.bytes().to_vec()));
            }
            assert_eq!(decoded, expected, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_resync_after_false_start() {
        let mut decoder = MessageDecoder::new();
        decoder.push(&[0xe7, 0x0e, 0x05, 0x83, 0x7c]);
        let message = decoder.decode().unwrap();
        assert_eq!(message.message_type(), MessageType::PwrOn);
        let stats = decoder.stats();
        assert_eq!(stats.resyncs, 1);
        assert_eq!(stats.discarded_bytes, 3);
        assert_eq!(stats.frames_decoded, 1);
    }

    #[test]
    fn test_truncated_frame_then_valid_frame() {
        let mut decoder = MessageDecoder::new();
        decoder.push(&[0xbb, 0x7f]);
        assert!(decoder.decode().is_none());
        decoder.push(&[0x82, 0x7d]);
        assert_eq!(decoder.decode().unwrap().message_type(), MessageType::PwrOff);
        assert_eq!(decoder.stats().resyncs, 1);
    }

    #[test]
    fn test_leading_garbage_is_discarded() {
        let mut decoder = MessageDecoder::new();
        decoder.push(&[0x00, 0x12, 0x83, 0x7c]);
        assert_eq!(decoder.decode().unwrap().message_type(), MessageType::PwrOn);
        assert_eq!(decoder.stats().discarded_bytes, 2);
    }

    #[test]
    fn test_bad_checksum_is_dropped() {
        let mut decoder = MessageDecoder::new();
        decoder.push(&[0x83, 0x7d, 0x82, 0x7d]);
        let messages = decoder.decode_all();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_type(), MessageType::PwrOff);
        assert_eq!(decoder.stats().checksum_failures, 1);
    }

    #[test]
    fn test_inter_message_delta() {
        let mut decoder = MessageDecoder::new();
        decoder.push(&[0x83, 0x7c, 0x82, 0x7d]);
        let first = decoder.decode().unwrap();
        let second = decoder.decode().unwrap();
        assert_eq!(first.time_since_last(), Duration::ZERO);
        assert!(second.timestamp().unwrap() >= first.timestamp().unwrap());
    }
}
