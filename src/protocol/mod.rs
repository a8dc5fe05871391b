//! Protocol module - wire format, framing, and frame types.
//!
//! This module implements the TAOLST frame layer:
//! - 9-byte header encoding/decoding and opcode tables
//! - Byte-at-a-time frame decoder that resynchronizes on noise
//! - Frame struct with typed accessors

mod frame;
mod frame_decoder;
mod wire_format;

pub use frame::Frame;
pub use frame_decoder::{DecoderState, FrameDecoder};
pub use wire_format::{
    bounce_addressing, endpoint, is_valid_length, offsets, opcode, pack_addressing,
    payload_size, unpack_addressing, AckReason, Header, Opcode, FIXED_LENGTH, HEADER_SIZE,
    MAX_FRAME_SIZE, MAX_LENGTH, MAX_PAYLOAD_SIZE, MIN_LENGTH, PREAMBLE_SIZE, START_BYTE_0,
    START_BYTE_1,
};
