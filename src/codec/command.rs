//! Command builder - transmit-side frame construction.
//!
//! A [`Command`] owns one fixed wire buffer. Construction fills in the header
//! and a zeroed default payload sized by the opcode; opcode-specific setters
//! then shape the payload.
//!
//! Setters never fail. A setter called on a command of a different opcode, or
//! with an input of the wrong size, leaves the command unchanged. Validate
//! sizes before calling when the difference matters.
//!
//! # Example
//!
//! ```
//! use taolst::codec::Command;
//! use taolst::protocol::{endpoint, Opcode};
//!
//! let mut cmd = Command::new(Opcode::AppSetTime, 0x5441, 0, endpoint::TERM, endpoint::EXPT);
//! cmd.app_set_time(100, 500_000_000);
//!
//! assert_eq!(cmd.byte_count(), 17);
//! assert_eq!(cmd.to_frame().set_time(), Some((100, 500_000_000)));
//! ```

use bytes::Bytes;

use crate::protocol::{
    offsets, pack_addressing, payload_size, AckReason, Frame, Header, Opcode, FIXED_LENGTH,
    MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, PREAMBLE_SIZE, START_BYTE_0, START_BYTE_1,
};

/// Largest number of values a numeric data record can carry.
pub const MAX_DATA_VALUES: usize = MAX_PAYLOAD_SIZE / 2;

/// A request frame under construction.
#[derive(Clone)]
pub struct Command {
    /// Wire image; only the first `byte_count()` bytes are meaningful.
    data: [u8; MAX_FRAME_SIZE],
}

impl Command {
    /// Build a command with its header populated and the opcode's default payload.
    ///
    /// Only the low nibble of `src_id` and `dst_id` is used.
    pub fn new(opcode: impl Into<u8>, hw_id: u16, msg_id: u16, src_id: u8, dst_id: u8) -> Self {
        let opcode = opcode.into();
        let default_len = Opcode::from(opcode).default_payload_len();

        let mut data = [0u8; MAX_FRAME_SIZE];
        data[offsets::START_BYTE_0] = START_BYTE_0;
        data[offsets::START_BYTE_1] = START_BYTE_1;
        data[offsets::LENGTH] = FIXED_LENGTH + default_len as u8;
        data[offsets::HW_ID_LSB..=offsets::HW_ID_MSB].copy_from_slice(&hw_id.to_le_bytes());
        data[offsets::MSG_ID_LSB..=offsets::MSG_ID_MSB].copy_from_slice(&msg_id.to_le_bytes());
        data[offsets::ADDRESSING] = pack_addressing(src_id, dst_id);
        data[offsets::OPCODE] = opcode;

        Self { data }
    }

    /// Typed opcode.
    #[inline]
    pub fn opcode(&self) -> Opcode {
        Opcode::from(self.data[offsets::OPCODE])
    }

    /// Current length field.
    #[inline]
    pub fn length(&self) -> u8 {
        self.data[offsets::LENGTH]
    }

    /// Current payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.length().saturating_sub(FIXED_LENGTH) as usize
    }

    /// Bytes to transmit: length field + 3.
    #[inline]
    pub fn byte_count(&self) -> usize {
        self.length() as usize + PREAMBLE_SIZE
    }

    /// The bytes to transmit, in order, starting at the first start marker.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.byte_count()]
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data[offsets::PAYLOAD..offsets::PAYLOAD + self.payload_len()]
    }

    /// Snapshot the command as an immutable [`Frame`].
    ///
    /// The frame always carries the start markers, which a cleared command's
    /// buffer no longer holds. A cleared command (length 0) yields a frame of
    /// length 6 with zeroed header fields and no payload.
    pub fn to_frame(&self) -> Frame {
        let header = Header {
            length: FIXED_LENGTH + self.payload_len() as u8,
            hw_id: u16::from_le_bytes([self.data[offsets::HW_ID_LSB], self.data[offsets::HW_ID_MSB]]),
            msg_id: u16::from_le_bytes([
                self.data[offsets::MSG_ID_LSB],
                self.data[offsets::MSG_ID_MSB],
            ]),
            addressing: self.data[offsets::ADDRESSING],
            opcode: self.data[offsets::OPCODE],
        };
        Frame::new(header, Bytes::copy_from_slice(self.payload()))
    }

    /// Zero the whole buffer.
    pub fn clear(&mut self) {
        self.data = [0u8; MAX_FRAME_SIZE];
    }

    fn set_payload_len(&mut self, len: usize) {
        self.data[offsets::LENGTH] = FIXED_LENGTH + len as u8;
    }

    fn write_payload(&mut self, at: usize, bytes: &[u8]) {
        let start = offsets::PAYLOAD + at;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Reboot: attach a delay (u32 LE), growing the payload to 4 bytes.
    pub fn app_reboot(&mut self, delay: u32) -> &mut Self {
        if self.opcode() == Opcode::AppReboot {
            self.set_payload_len(payload_size::REBOOT_DELAY);
            self.write_payload(0, &delay.to_le_bytes());
        }
        self
    }

    /// Set-time: seconds then nanoseconds, both u32 LE.
    pub fn app_set_time(&mut self, sec: u32, ns: u32) -> &mut Self {
        if self.opcode() == Opcode::AppSetTime {
            self.write_payload(0, &sec.to_le_bytes());
            self.write_payload(4, &ns.to_le_bytes());
        }
        self
    }

    /// Telemetry report: replace the body. Requires exactly 78 bytes.
    pub fn app_telem(&mut self, telem: &[u8]) -> &mut Self {
        if self.opcode() == Opcode::AppTelem && telem.len() == payload_size::TELEMETRY {
            self.write_payload(0, telem);
        }
        self
    }

    /// Bootloader ack: 1-byte reason code.
    pub fn bootloader_ack(&mut self, reason: AckReason) -> &mut Self {
        if self.opcode() == Opcode::BootloaderAck {
            self.set_payload_len(payload_size::SINGLE_BYTE);
            self.write_payload(0, &[reason.into()]);
        }
        self
    }

    /// Bootloader erase: 1-byte status.
    pub fn bootloader_erase(&mut self, status: u8) -> &mut Self {
        if self.opcode() == Opcode::BootloaderErase {
            self.set_payload_len(payload_size::SINGLE_BYTE);
            self.write_payload(0, &[status]);
        }
        self
    }

    /// Write page: set the page number and, if `page_data` is exactly
    /// 128 bytes, attach it as the page body.
    pub fn bootloader_write_page(&mut self, page_number: u8, page_data: &[u8]) -> &mut Self {
        if self.opcode() == Opcode::BootloaderWritePage {
            self.write_payload(0, &[page_number]);
            if page_data.len() == payload_size::FLASH_PAGE {
                self.set_payload_len(payload_size::SINGLE_BYTE + payload_size::FLASH_PAGE);
                self.write_payload(1, page_data);
            }
        }
        self
    }

    /// ASCII message: payload becomes the string's bytes. At most 249 bytes.
    pub fn common_ascii(&mut self, text: &str) -> &mut Self {
        if self.opcode() == Opcode::CommonAscii && text.len() <= MAX_PAYLOAD_SIZE {
            self.set_payload_len(text.len());
            self.write_payload(0, text.as_bytes());
        }
        self
    }

    /// Numeric data record: each value is written low byte first.
    ///
    /// More than [`MAX_DATA_VALUES`] values cannot be framed and are ignored.
    pub fn common_data(&mut self, values: &[u16]) -> &mut Self {
        if self.opcode() == Opcode::CommonData && values.len() <= MAX_DATA_VALUES {
            self.set_payload_len(values.len() * 2);
            for (i, value) in values.iter().enumerate() {
                let [msb, lsb] = value.to_be_bytes();
                self.write_payload(i * 2, &[lsb, msb]);
            }
        }
        self
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("opcode", &self.opcode())
            .field("bytes", &self.as_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{endpoint, FrameDecoder};

    const HWID: u16 = 0x5441;

    fn command(opcode: Opcode) -> Command {
        Command::new(opcode, HWID, 0x0102, endpoint::TERM, endpoint::EXPT)
    }

    #[test]
    fn test_header_fields() {
        let cmd = command(Opcode::CommonAck);
        assert_eq!(
            cmd.as_bytes(),
            &[0x22, 0x69, 0x06, 0x41, 0x54, 0x02, 0x01, 0x02, 0x10]
        );
        assert_eq!(cmd.byte_count(), 9);
    }

    #[test]
    fn test_default_payload_lengths() {
        for op in Opcode::ALL {
            let expected = match op {
                Opcode::AppSetTime => 8,
                Opcode::AppTelem => 78,
                Opcode::BootloaderWritePage => 1,
                _ => 0,
            };
            let cmd = command(op);
            assert_eq!(cmd.payload_len(), expected, "{:?}", op);
            assert!(cmd.payload().iter().all(|&b| b == 0));
        }
        assert_eq!(command(Opcode::Unknown(0x42)).length(), 6);
    }

    #[test]
    fn test_app_reboot_grows_payload() {
        let mut cmd = command(Opcode::AppReboot);
        cmd.app_reboot(2000);
        assert_eq!(cmd.length(), 10);
        assert_eq!(cmd.payload(), &2000u32.to_le_bytes());
    }

    #[test]
    fn test_app_set_time_little_endian() {
        let mut cmd = command(Opcode::AppSetTime);
        cmd.app_set_time(0x0403_0201, 0x0807_0605);
        assert_eq!(cmd.length(), 14);
        assert_eq!(cmd.payload(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_app_telem_requires_exact_size() {
        let mut cmd = command(Opcode::AppTelem);
        cmd.app_telem(&[0xaa; 77]);
        assert!(cmd.payload().iter().all(|&b| b == 0));

        cmd.app_telem(&[0xbb; 78]);
        assert_eq!(cmd.length(), 84);
        assert!(cmd.payload().iter().all(|&b| b == 0xbb));
    }

    #[test]
    fn test_write_page_number_only_on_bad_body() {
        let mut cmd = command(Opcode::BootloaderWritePage);
        cmd.bootloader_write_page(5, &[0xcc; 64]);
        assert_eq!(cmd.length(), 7);
        assert_eq!(cmd.payload(), &[5]);

        cmd.bootloader_write_page(6, &[0xdd; 128]);
        assert_eq!(cmd.length(), 0x87);
        assert_eq!(cmd.payload()[0], 6);
        assert!(cmd.payload()[1..].iter().all(|&b| b == 0xdd));
    }

    #[test]
    fn test_common_ascii_bounds() {
        let mut cmd = command(Opcode::CommonAscii);
        cmd.common_ascii("hello");
        assert_eq!(cmd.payload(), b"hello");

        let too_long = "x".repeat(250);
        cmd.common_ascii(&too_long);
        assert_eq!(cmd.payload(), b"hello");

        let max = "y".repeat(249);
        cmd.common_ascii(&max);
        assert_eq!(cmd.length(), 255);
        assert_eq!(cmd.byte_count(), 258);
    }

    #[test]
    fn test_common_data_byte_swapped() {
        let mut cmd = command(Opcode::CommonData);
        cmd.common_data(&[0x1234, 0xabcd, 3]);
        assert_eq!(cmd.length(), 12);
        assert_eq!(cmd.payload(), &[0x34, 0x12, 0xcd, 0xab, 0x03, 0x00]);

        cmd.common_data(&[0u16; MAX_DATA_VALUES + 1]);
        assert_eq!(cmd.payload_len(), 6);
    }

    #[test]
    fn test_bootloader_ack_and_erase() {
        let mut ack = command(Opcode::BootloaderAck);
        ack.bootloader_ack(AckReason::Jump);
        assert_eq!(ack.payload(), &[0xff]);

        let mut erase = command(Opcode::BootloaderErase);
        erase.bootloader_erase(0x01);
        assert_eq!(erase.payload(), &[0x01]);
    }

    #[test]
    fn test_setter_for_other_opcode_is_noop() {
        let mut cmd = command(Opcode::BootloaderPing);
        let before = cmd.as_bytes().to_vec();

        cmd.app_reboot(1)
            .app_set_time(1, 2)
            .app_telem(&[0; 78])
            .bootloader_ack(AckReason::Pong)
            .bootloader_erase(1)
            .bootloader_write_page(1, &[0; 128])
            .common_ascii("nope")
            .common_data(&[1, 2]);

        assert_eq!(cmd.as_bytes(), &before[..]);
    }

    #[test]
    fn test_clear_zeroes_buffer() {
        let mut cmd = command(Opcode::CommonAscii);
        cmd.common_ascii("data");
        cmd.clear();
        assert_eq!(cmd.length(), 0);
        assert_eq!(cmd.byte_count(), 3);
        assert_eq!(cmd.as_bytes(), &[0, 0, 0]);

        let frame = cmd.to_frame();
        assert_eq!(frame.length(), 6);
        assert_eq!(
            &frame.to_bytes()[..],
            &[0x22, 0x69, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_to_frame_matches_wire_bytes() {
        let mut cmd = command(Opcode::AppReboot);
        cmd.app_reboot(30);
        let frame = cmd.to_frame();

        assert_eq!(&frame.to_bytes()[..], cmd.as_bytes());
        assert_eq!(frame.reboot_delay(), Some(30));
    }

    #[test]
    fn test_decoder_roundtrip() {
        let mut cmd = command(Opcode::BootloaderWritePage);
        cmd.bootloader_write_page(9, &[0x5a; 128]);

        let mut decoder = FrameDecoder::new();
        let frames = decoder.push_slice(cmd.as_bytes());

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], cmd.to_frame());
    }
}
