//! Byte-at-a-time frame decoder.
//!
//! Implements the receive-side state machine. One byte moves the decoder at
//! most one step:
//! ```text
//! AwaitStart0 → AwaitStart1 → AwaitLength → HwIdLsb → HwIdMsb → MsgIdLsb
//!   → MsgIdMsb → DestId → Opcode → Payload → Complete
//! ```
//!
//! Malformed input never surfaces as an error. A byte other than the first
//! start marker is skipped while hunting; a wrong second marker or a length
//! below 6 discards all progress. Once `Complete`, the decoder stops consuming
//! bytes until the frame is taken with [`FrameDecoder::take_frame`].
//!
//! # Example
//!
//! ```
//! use taolst::protocol::FrameDecoder;
//!
//! let mut decoder = FrameDecoder::new();
//! let bytes = [0x00, 0x22, 0x69, 0x06, 0x41, 0x54, 0x00, 0x00, 0x02, 0x10];
//!
//! let frames = decoder.push_slice(&bytes);
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0].hw_id(), 0x5441);
//! ```

use bytes::{BufMut, BytesMut};

use super::wire_format::{
    is_valid_length, Header, FIXED_LENGTH, HEADER_SIZE, MAX_FRAME_SIZE, START_BYTE_0,
    START_BYTE_1,
};
use super::Frame;

/// Position of the decoder within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Hunting for the first start marker.
    AwaitStart0,
    /// First marker seen, need the second.
    AwaitStart1,
    /// Need the length byte.
    AwaitLength,
    HwIdLsb,
    HwIdMsb,
    MsgIdLsb,
    MsgIdMsb,
    /// Need the addressing byte.
    DestId,
    Opcode,
    /// Collecting payload bytes.
    Payload,
    /// A frame is ready; no further bytes are consumed.
    Complete,
}

/// Reassembles frames from an unstructured byte stream.
///
/// The working buffer never aliases a frame that has been handed out:
/// [`take_frame`](FrameDecoder::take_frame) moves the bytes into the
/// returned [`Frame`] and resets the decoder.
#[derive(Debug)]
pub struct FrameDecoder {
    /// Bytes of the frame in progress, starting at the first marker.
    buffer: BytesMut,
    /// Current parsing state.
    state: DecoderState,
    /// Payload bytes still expected.
    payload_remaining: usize,
}

impl FrameDecoder {
    /// Create a new decoder hunting for a start marker.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(MAX_FRAME_SIZE),
            state: DecoderState::AwaitStart0,
            payload_remaining: 0,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Whether a complete frame is waiting to be taken.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.state == DecoderState::Complete
    }

    /// Number of bytes buffered for the frame in progress.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Offer one byte to the state machine.
    ///
    /// Returns `false` only when the decoder is `Complete` and the byte was
    /// not consumed; take the frame and offer the byte again.
    pub fn append_byte(&mut self, byte: u8) -> bool {
        match self.state {
            DecoderState::AwaitStart0 => {
                if byte == START_BYTE_0 {
                    self.buffer.put_u8(byte);
                    self.state = DecoderState::AwaitStart1;
                }
            }
            DecoderState::AwaitStart1 => {
                if byte == START_BYTE_1 {
                    self.buffer.put_u8(byte);
                    self.state = DecoderState::AwaitLength;
                } else {
                    tracing::trace!("bad second start marker 0x{:02x}, resync", byte);
                    self.clear();
                }
            }
            DecoderState::AwaitLength => {
                if is_valid_length(byte) {
                    self.buffer.put_u8(byte);
                    self.payload_remaining = (byte - FIXED_LENGTH) as usize;
                    self.state = DecoderState::HwIdLsb;
                } else {
                    tracing::trace!("length byte {} out of range, resync", byte);
                    self.clear();
                }
            }
            DecoderState::HwIdLsb => self.store(byte, DecoderState::HwIdMsb),
            DecoderState::HwIdMsb => self.store(byte, DecoderState::MsgIdLsb),
            DecoderState::MsgIdLsb => self.store(byte, DecoderState::MsgIdMsb),
            DecoderState::MsgIdMsb => self.store(byte, DecoderState::DestId),
            DecoderState::DestId => self.store(byte, DecoderState::Opcode),
            DecoderState::Opcode => {
                let next = if self.payload_remaining > 0 {
                    DecoderState::Payload
                } else {
                    DecoderState::Complete
                };
                self.store(byte, next);
            }
            DecoderState::Payload => {
                self.buffer.put_u8(byte);
                self.payload_remaining -= 1;
                if self.payload_remaining == 0 {
                    self.state = DecoderState::Complete;
                }
            }
            DecoderState::Complete => return false,
        }
        true
    }

    #[inline]
    fn store(&mut self, byte: u8, next: DecoderState) {
        self.buffer.put_u8(byte);
        self.state = next;
    }

    /// Move the completed frame out and reset for the next one.
    ///
    /// Returns `None` (and leaves the decoder untouched) if no frame is complete.
    pub fn take_frame(&mut self) -> Option<Frame> {
        if !self.is_complete() {
            return None;
        }

        let bytes = self.buffer.split().freeze();
        self.clear();

        let header = Header::decode(&bytes)?;
        let payload = bytes.slice(HEADER_SIZE..);
        Some(Frame::new(header, payload))
    }

    /// Offer one byte and hand off a frame if one is ready.
    ///
    /// A frame left waiting by [`append_byte`](FrameDecoder::append_byte) is
    /// returned first and the byte then starts the next frame.
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        if let Some(waiting) = self.take_frame() {
            self.append_byte(byte);
            return Some(waiting);
        }
        self.append_byte(byte);
        self.take_frame()
    }

    /// Push a chunk of bytes and extract all frames it completes.
    pub fn push_slice(&mut self, data: &[u8]) -> Vec<Frame> {
        data.iter().filter_map(|&b| self.push(b)).collect()
    }

    /// Discard buffered bytes and return to `AwaitStart0`.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = DecoderState::AwaitStart0;
        self.payload_remaining = 0;
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
