//! Wire format encoding and decoding.
//!
//! Every TAOLST frame starts with a 9-byte header followed by 0-249 payload bytes:
//! ```text
//! ┌────────┬────────┬────────┬──────────┬──────────┬────────────┬────────┬─────────────┐
//! │ Start A│ Start B│ Length │ HW ID    │ Msg ID   │ Addressing │ Opcode │ Payload     │
//! │ 0x22   │ 0x69   │ 1 byte │ uint16 LE│ uint16 LE│ src4 | dst4│ 1 byte │ Length - 6  │
//! └────────┴────────┴────────┴──────────┴──────────┴────────────┴────────┴─────────────┘
//! ```
//!
//! The length byte counts everything after itself: hwid, msgid, addressing,
//! opcode and payload. Bytes on the wire = length + 3.

/// First start marker.
pub const START_BYTE_0: u8 = 0x22;

/// Second start marker.
pub const START_BYTE_1: u8 = 0x69;

/// Header size in bytes (start markers through opcode).
pub const HEADER_SIZE: usize = 9;

/// Bytes on the wire that the length field does not count (two markers + length).
pub const PREAMBLE_SIZE: usize = 3;

/// Fixed bytes counted by the length field: hwid(2) + msgid(2) + addressing + opcode.
pub const FIXED_LENGTH: u8 = 6;

/// Smallest valid length field value.
pub const MIN_LENGTH: u8 = FIXED_LENGTH;

/// Largest valid length field value.
pub const MAX_LENGTH: u8 = u8::MAX;

/// Maximum payload size in bytes.
pub const MAX_PAYLOAD_SIZE: usize = (MAX_LENGTH - FIXED_LENGTH) as usize;

/// Maximum frame size on the wire.
pub const MAX_FRAME_SIZE: usize = MAX_LENGTH as usize + PREAMBLE_SIZE;

/// Byte offsets of the header fields.
pub mod offsets {
    pub const START_BYTE_0: usize = 0;
    pub const START_BYTE_1: usize = 1;
    pub const LENGTH: usize = 2;
    pub const HW_ID_LSB: usize = 3;
    pub const HW_ID_MSB: usize = 4;
    pub const MSG_ID_LSB: usize = 5;
    pub const MSG_ID_MSB: usize = 6;
    pub const ADDRESSING: usize = 7;
    pub const OPCODE: usize = 8;
    pub const PAYLOAD: usize = 9;
}

/// Opcode constants.
pub mod opcode {
    pub const BOOTLOADER_PING: u8 = 0x00;
    pub const BOOTLOADER_ACK: u8 = 0x01;
    pub const BOOTLOADER_WRITE_PAGE: u8 = 0x02;
    pub const BOOTLOADER_JUMP: u8 = 0x0b;
    pub const BOOTLOADER_ERASE: u8 = 0x0c;
    pub const BOOTLOADER_NACK: u8 = 0x0f;
    pub const COMMON_ACK: u8 = 0x10;
    pub const COMMON_ASCII: u8 = 0x11;
    pub const APP_REBOOT: u8 = 0x12;
    pub const APP_GET_TIME: u8 = 0x13;
    pub const APP_SET_TIME: u8 = 0x14;
    pub const COMMON_DATA: u8 = 0x16;
    pub const APP_GET_TELEM: u8 = 0x17;
    pub const APP_TELEM: u8 = 0x18;
    pub const COMMON_NACK: u8 = 0xff;
}

/// Fixed payload sizes for opcodes with structured bodies.
pub mod payload_size {
    /// Reboot delay, seconds (u32 LE).
    pub const REBOOT_DELAY: usize = 4;
    /// Set-time body: seconds (u32 LE) + nanoseconds (u32 LE).
    pub const SET_TIME: usize = 8;
    /// Telemetry report body.
    pub const TELEMETRY: usize = 78;
    /// Flash page body carried by a write-page command.
    pub const FLASH_PAGE: usize = 128;
    /// Bootloader ack reason / erase status / page number.
    pub const SINGLE_BYTE: usize = 1;
}

/// Well-known logical endpoint ids carried in the addressing nibbles.
pub mod endpoint {
    pub const TERM: u8 = 0x0;
    pub const COMM: u8 = 0x1;
    pub const EXPT: u8 = 0x2;
    pub const CTRL: u8 = 0xa;

    /// Short name of an endpoint id, `"?"` when unknown.
    pub fn name(id: u8) -> &'static str {
        match id {
            TERM => "term",
            COMM => "comm",
            EXPT => "expt",
            CTRL => "ctrl",
            _ => "?",
        }
    }
}

/// Typed view of an opcode byte.
///
/// Unrecognized bytes are kept in [`Opcode::Unknown`] so that a frame always
/// round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    BootloaderPing,
    BootloaderAck,
    BootloaderWritePage,
    BootloaderJump,
    BootloaderErase,
    BootloaderNack,
    CommonAck,
    CommonAscii,
    AppReboot,
    AppGetTime,
    AppSetTime,
    CommonData,
    AppGetTelem,
    AppTelem,
    CommonNack,
    Unknown(u8),
}

impl Opcode {
    /// Every opcode the protocol defines.
    pub const ALL: [Opcode; 15] = [
        Opcode::BootloaderPing,
        Opcode::BootloaderAck,
        Opcode::BootloaderWritePage,
        Opcode::BootloaderJump,
        Opcode::BootloaderErase,
        Opcode::BootloaderNack,
        Opcode::CommonAck,
        Opcode::CommonAscii,
        Opcode::AppReboot,
        Opcode::AppGetTime,
        Opcode::AppSetTime,
        Opcode::CommonData,
        Opcode::AppGetTelem,
        Opcode::AppTelem,
        Opcode::CommonNack,
    ];

    /// Name used in human-readable frame dumps.
    pub fn name(&self) -> &'static str {
        match self {
            Opcode::BootloaderPing => "bootloader_ping",
            Opcode::BootloaderAck => "bootloader_ack",
            Opcode::BootloaderWritePage => "bootloader_write_page",
            Opcode::BootloaderJump => "bootloader_jump",
            Opcode::BootloaderErase => "bootloader_erase",
            Opcode::BootloaderNack => "bootloader_nack",
            Opcode::CommonAck => "common_ack",
            Opcode::CommonAscii => "common_ascii",
            Opcode::AppReboot => "app_reboot",
            Opcode::AppGetTime => "app_get_time",
            Opcode::AppSetTime => "app_set_time",
            Opcode::CommonData => "common_data",
            Opcode::AppGetTelem => "app_get_telem",
            Opcode::AppTelem => "app_telem",
            Opcode::CommonNack => "common_nack",
            Opcode::Unknown(_) => "unknown",
        }
    }

    /// Payload length a freshly built command of this opcode carries.
    pub fn default_payload_len(&self) -> usize {
        match self {
            Opcode::AppSetTime => payload_size::SET_TIME,
            Opcode::AppTelem => payload_size::TELEMETRY,
            Opcode::BootloaderWritePage => payload_size::SINGLE_BYTE,
            _ => 0,
        }
    }
}

impl From<u8> for Opcode {
    fn from(value: u8) -> Self {
        match value {
            opcode::BOOTLOADER_PING => Opcode::BootloaderPing,
            opcode::BOOTLOADER_ACK => Opcode::BootloaderAck,
            opcode::BOOTLOADER_WRITE_PAGE => Opcode::BootloaderWritePage,
            opcode::BOOTLOADER_JUMP => Opcode::BootloaderJump,
            opcode::BOOTLOADER_ERASE => Opcode::BootloaderErase,
            opcode::BOOTLOADER_NACK => Opcode::BootloaderNack,
            opcode::COMMON_ACK => Opcode::CommonAck,
            opcode::COMMON_ASCII => Opcode::CommonAscii,
            opcode::APP_REBOOT => Opcode::AppReboot,
            opcode::APP_GET_TIME => Opcode::AppGetTime,
            opcode::APP_SET_TIME => Opcode::AppSetTime,
            opcode::COMMON_DATA => Opcode::CommonData,
            opcode::APP_GET_TELEM => Opcode::AppGetTelem,
            opcode::APP_TELEM => Opcode::AppTelem,
            opcode::COMMON_NACK => Opcode::CommonNack,
            other => Opcode::Unknown(other),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        match op {
            Opcode::BootloaderPing => opcode::BOOTLOADER_PING,
            Opcode::BootloaderAck => opcode::BOOTLOADER_ACK,
            Opcode::BootloaderWritePage => opcode::BOOTLOADER_WRITE_PAGE,
            Opcode::BootloaderJump => opcode::BOOTLOADER_JUMP,
            Opcode::BootloaderErase => opcode::BOOTLOADER_ERASE,
            Opcode::BootloaderNack => opcode::BOOTLOADER_NACK,
            Opcode::CommonAck => opcode::COMMON_ACK,
            Opcode::CommonAscii => opcode::COMMON_ASCII,
            Opcode::AppReboot => opcode::APP_REBOOT,
            Opcode::AppGetTime => opcode::APP_GET_TIME,
            Opcode::AppSetTime => opcode::APP_SET_TIME,
            Opcode::CommonData => opcode::COMMON_DATA,
            Opcode::AppGetTelem => opcode::APP_GET_TELEM,
            Opcode::AppTelem => opcode::APP_TELEM,
            Opcode::CommonNack => opcode::COMMON_NACK,
            Opcode::Unknown(raw) => raw,
        }
    }
}

/// Reason code carried by a bootloader-ack reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckReason {
    Pong,
    Erased,
    Jump,
    Unknown(u8),
}

impl AckReason {
    pub fn name(&self) -> &'static str {
        match self {
            AckReason::Pong => "pong",
            AckReason::Erased => "erased",
            AckReason::Jump => "jump",
            AckReason::Unknown(_) => "?",
        }
    }
}

impl From<u8> for AckReason {
    fn from(value: u8) -> Self {
        match value {
            0x00 => AckReason::Pong,
            0x01 => AckReason::Erased,
            0xff => AckReason::Jump,
            other => AckReason::Unknown(other),
        }
    }
}

impl From<AckReason> for u8 {
    fn from(reason: AckReason) -> Self {
        match reason {
            AckReason::Pong => 0x00,
            AckReason::Erased => 0x01,
            AckReason::Jump => 0xff,
            AckReason::Unknown(raw) => raw,
        }
    }
}

/// Pack a source and destination id into an addressing byte.
///
/// Only the low nibble of each id is used.
#[inline]
pub fn pack_addressing(src_id: u8, dst_id: u8) -> u8 {
    ((src_id & 0x0f) << 4) | (dst_id & 0x0f)
}

/// Split an addressing byte into `(src_id, dst_id)`.
#[inline]
pub fn unpack_addressing(addressing: u8) -> (u8, u8) {
    ((addressing >> 4) & 0x0f, addressing & 0x0f)
}

/// Swap the source and destination nibbles (request → reply).
#[inline]
pub fn bounce_addressing(addressing: u8) -> u8 {
    addressing.rotate_left(4)
}

/// Check a length field value.
#[inline]
pub fn is_valid_length(length: u8) -> bool {
    length >= MIN_LENGTH
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Length field: bytes after the length byte (6..=255).
    pub length: u8,
    /// Hardware id.
    pub hw_id: u16,
    /// Message id.
    pub msg_id: u16,
    /// Packed addressing byte (source in the high nibble).
    pub addressing: u8,
    /// Raw opcode byte.
    pub opcode: u8,
}

impl Header {
    /// Create a new header for a payload of `payload_len` bytes.
    ///
    /// `payload_len` is clamped to [`MAX_PAYLOAD_SIZE`].
    pub fn new(
        opcode: impl Into<u8>,
        hw_id: u16,
        msg_id: u16,
        src_id: u8,
        dst_id: u8,
        payload_len: usize,
    ) -> Self {
        Self {
            length: FIXED_LENGTH + payload_len.min(MAX_PAYLOAD_SIZE) as u8,
            hw_id,
            msg_id,
            addressing: pack_addressing(src_id, dst_id),
            opcode: opcode.into(),
        }
    }

    /// Encode header to bytes (start markers included).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (9 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[offsets::START_BYTE_0] = START_BYTE_0;
        buf[offsets::START_BYTE_1] = START_BYTE_1;
        buf[offsets::LENGTH] = self.length;
        buf[offsets::HW_ID_LSB..=offsets::HW_ID_MSB].copy_from_slice(&self.hw_id.to_le_bytes());
        buf[offsets::MSG_ID_LSB..=offsets::MSG_ID_MSB].copy_from_slice(&self.msg_id.to_le_bytes());
        buf[offsets::ADDRESSING] = self.addressing;
        buf[offsets::OPCODE] = self.opcode;
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if the buffer is too short, the start markers do not
    /// match, or the length field is below [`MIN_LENGTH`].
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE
            || buf[offsets::START_BYTE_0] != START_BYTE_0
            || buf[offsets::START_BYTE_1] != START_BYTE_1
            || !is_valid_length(buf[offsets::LENGTH])
        {
            return None;
        }
        Some(Self {
            length: buf[offsets::LENGTH],
            hw_id: u16::from_le_bytes([buf[offsets::HW_ID_LSB], buf[offsets::HW_ID_MSB]]),
            msg_id: u16::from_le_bytes([buf[offsets::MSG_ID_LSB], buf[offsets::MSG_ID_MSB]]),
            addressing: buf[offsets::ADDRESSING],
            opcode: buf[offsets::OPCODE],
        })
    }

    /// Payload length implied by the length field.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.length.saturating_sub(FIXED_LENGTH) as usize
    }

    /// Total bytes on the wire.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.length as usize + PREAMBLE_SIZE
    }

    /// Source endpoint id (high nibble).
    #[inline]
    pub fn src_id(&self) -> u8 {
        unpack_addressing(self.addressing).0
    }

    /// Destination endpoint id (low nibble).
    #[inline]
    pub fn dst_id(&self) -> u8 {
        unpack_addressing(self.addressing).1
    }

    /// Typed opcode.
    #[inline]
    pub fn opcode(&self) -> Opcode {
        Opcode::from(self.opcode)
    }

    /// Header of the reply to this request: same ids, addressing bounced.
    ///
    /// The caller sets the opcode and the length.
    pub fn bounce(&self, opcode: impl Into<u8>, payload_len: usize) -> Self {
        Self {
            length: FIXED_LENGTH + payload_len.min(MAX_PAYLOAD_SIZE) as u8,
            hw_id: self.hw_id,
            msg_id: self.msg_id,
            addressing: bounce_addressing(self.addressing),
            opcode: opcode.into(),
        }
    }
}
