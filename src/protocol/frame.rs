//! Frame struct with typed accessors.
//!
//! Represents one complete TAOLST message, request or reply. A `Frame` is
//! immutable: the decoder hands out owned frames and the command builder
//! produces them with [`Command::to_frame`](crate::codec::Command::to_frame).
//! The payload is held in `bytes::Bytes`, so cloning a frame is cheap.
//!
//! # Example
//!
//! ```
//! use taolst::protocol::{Frame, Header, Opcode};
//! use bytes::Bytes;
//!
//! let header = Header::new(Opcode::BootloaderAck, 0x5441, 1, 0x2, 0x0, 1);
//! let frame = Frame::new(header, Bytes::from_static(&[0x00]));
//!
//! assert_eq!(frame.opcode(), Opcode::BootloaderAck);
//! assert_eq!(frame.to_bytes().len(), 10);
//! ```

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{
    endpoint, payload_size, AckReason, Header, Opcode, FIXED_LENGTH, HEADER_SIZE,
    MAX_PAYLOAD_SIZE,
};

/// A complete protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded header.
    pub header: Header,
    /// Payload bytes, `header.payload_len()` of them.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from header and payload.
    ///
    /// The payload is truncated to [`MAX_PAYLOAD_SIZE`] and the header's
    /// length field is rewritten to match it.
    pub fn new(mut header: Header, mut payload: Bytes) -> Self {
        payload.truncate(MAX_PAYLOAD_SIZE);
        header.length = FIXED_LENGTH + payload.len() as u8;
        Self { header, payload }
    }

    /// Build the reply to `request` carrying `opcode` and `payload`.
    ///
    /// Hardware id and message id are copied, the addressing nibbles are
    /// swapped and the length field is derived from the payload.
    pub fn reply_to(request: &Frame, opcode: Opcode, payload: &[u8]) -> Self {
        let payload = &payload[..payload.len().min(MAX_PAYLOAD_SIZE)];
        Self {
            header: request.header.bounce(opcode, payload.len()),
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Get the length field.
    #[inline]
    pub fn length(&self) -> u8 {
        self.header.length
    }

    /// Get the hardware id.
    #[inline]
    pub fn hw_id(&self) -> u16 {
        self.header.hw_id
    }

    /// Get the message id.
    #[inline]
    pub fn msg_id(&self) -> u16 {
        self.header.msg_id
    }

    /// Get the source endpoint id.
    #[inline]
    pub fn src_id(&self) -> u8 {
        self.header.src_id()
    }

    /// Get the destination endpoint id.
    #[inline]
    pub fn dst_id(&self) -> u8 {
        self.header.dst_id()
    }

    /// Get the typed opcode.
    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.header.opcode()
    }

    /// Number of bytes this frame occupies on the wire.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.header.wire_len()
    }

    /// Serialize the frame: `length + 3` bytes starting at the first marker.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        buf.put_slice(&self.header.encode());
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Reboot delay, when the payload carries one.
    pub fn reboot_delay(&self) -> Option<u32> {
        read_u32_le(&self.payload, 0)
    }

    /// Set-time body as `(seconds, nanoseconds)`.
    pub fn set_time(&self) -> Option<(u32, u32)> {
        if self.payload.len() < payload_size::SET_TIME {
            return None;
        }
        Some((read_u32_le(&self.payload, 0)?, read_u32_le(&self.payload, 4)?))
    }

    /// First payload byte: ack reason, erase status or page number.
    pub fn first_payload_byte(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Bootloader-ack reason, when present.
    pub fn ack_reason(&self) -> Option<AckReason> {
        self.first_payload_byte().map(AckReason::from)
    }
}

fn read_u32_le(buf: &[u8], at: usize) -> Option<u32> {
    let bytes = buf.get(at..at + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}

/// Human-readable one-line dump, e.g.
/// `bootloader_ack hw_id:0x5441 msg_id:0x0001 src_id:0x2(expt) dst_id:0x0(term) reason:0x00(pong)`.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opcode = self.opcode();
        match opcode {
            Opcode::Unknown(raw) => write!(f, "unknown(0x{:02x})", raw)?,
            known => f.write_str(known.name())?,
        }
        write!(
            f,
            " hw_id:0x{:04x} msg_id:0x{:04x} src_id:0x{:x}({}) dst_id:0x{:x}({})",
            self.hw_id(),
            self.msg_id(),
            self.src_id(),
            endpoint::name(self.src_id()),
            self.dst_id(),
            endpoint::name(self.dst_id()),
        )?;

        match opcode {
            Opcode::AppReboot => {
                if let Some(delay) = self.reboot_delay() {
                    write!(f, " delay:{}", delay)?;
                }
            }
            Opcode::AppSetTime => {
                if let Some((sec, ns)) = self.set_time() {
                    write!(f, " sec:{} ns:{}", sec, ns)?;
                }
            }
            Opcode::AppTelem => {
                f.write_str(" hex_telem:")?;
                write_hex(f, &self.payload)?;
            }
            Opcode::BootloaderAck => {
                if let Some(reason) = self.first_payload_byte() {
                    write!(f, " reason:0x{:02x}({})", reason, AckReason::from(reason).name())?;
                }
            }
            Opcode::BootloaderErase => {
                if let Some(status) = self.first_payload_byte() {
                    write!(f, " status:0x{:02x}", status)?;
                }
            }
            Opcode::BootloaderWritePage => {
                if let Some(page) = self.first_payload_byte() {
                    write!(f, " subpage_id:{}", page)?;
                }
                if self.payload.len() > 1 {
                    f.write_str(" hex_data:")?;
                    write_hex(f, &self.payload[1..])?;
                }
            }
            Opcode::CommonAscii => {
                write!(f, " \"{}\"", String::from_utf8_lossy(&self.payload))?;
            }
            Opcode::CommonData => {
                f.write_str(" hex_payload: ")?;
                for b in self.payload.iter() {
                    write!(f, "{:02x} ", b)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
