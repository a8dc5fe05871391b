//! Integration tests for taolst.
//!
//! These tests drive the public API end to end: command encoding, framing
//! and reply generation.

use taolst::codec::Command;
use taolst::config::ResponderConfig;
use taolst::protocol::{endpoint, AckReason, DecoderState, FrameDecoder, Opcode};
use taolst::reply::{DeviceState, FixedClock, ReplyGenerator, UnknownOpcodePolicy};
use taolst::session::Responder;
use taolst::transport::ReaderSource;

const HW_ID: u16 = 0x5441;

fn responder(device: DeviceState) -> Responder<FixedClock> {
    let config = ResponderConfig {
        device,
        ..ResponderConfig::default()
    };
    Responder::with_clock(&config, FixedClock::new(100, 500_000_000))
}

fn request(opcode: Opcode, msg_id: u16) -> Command {
    Command::new(opcode, HW_ID, msg_id, endpoint::TERM, endpoint::EXPT)
}

/// Every valid length completes after exactly L + 3 bytes, not before.
#[test]
fn test_decoder_completes_at_every_length() {
    for length in 6u8..=255 {
        let mut bytes = vec![0x22, 0x69, length, 0x41, 0x54, 0x01, 0x00, 0x02, 0x11];
        bytes.resize(length as usize + 3, 0xa5);

        let mut decoder = FrameDecoder::new();
        let (last, head) = bytes.split_last().unwrap();
        for &b in head {
            assert!(decoder.append_byte(b));
        }
        assert!(!decoder.is_complete(), "length {}", length);

        assert!(decoder.append_byte(*last));
        assert_eq!(decoder.state(), DecoderState::Complete);
        assert!(!decoder.append_byte(0x22), "length {}", length);

        let frame = decoder.take_frame().unwrap();
        assert_eq!(frame.length(), length);
        assert_eq!(frame.wire_len(), bytes.len());
    }
}

/// Encoding a request and decoding its bytes yields the same frame.
#[test]
fn test_command_decode_round_trip() {
    let mut telem = request(Opcode::AppTelem, 1);
    telem.app_telem(&[0x5a; 78]);

    let mut page = request(Opcode::BootloaderWritePage, 2);
    page.bootloader_write_page(3, &[0xc3; 128]);

    let mut time = request(Opcode::AppSetTime, 3);
    time.app_set_time(123, 456);

    let mut ascii = request(Opcode::CommonAscii, 4);
    ascii.common_ascii("hello device");

    let mut data = request(Opcode::CommonData, 5);
    data.common_data(&[0x0102, 0xa0b0, 7]);

    for cmd in [telem, page, time, ascii, data] {
        let frames = FrameDecoder::new().push_slice(cmd.as_bytes());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], cmd.to_frame());
        assert_eq!(&frames[0].to_bytes()[..], cmd.as_bytes());
    }
}

/// Noise in front of a frame does not affect it.
#[test]
fn test_garbage_before_frame() {
    let mut cmd = request(Opcode::AppReboot, 0x0102);
    cmd.app_reboot(42);

    let clean = FrameDecoder::new().push_slice(cmd.as_bytes());

    let mut noisy = vec![0x00, 0x22, 0x22, 0x68, 0x22, 0x69, 0x05, 0x69, 0xff];
    noisy.extend_from_slice(cmd.as_bytes());
    let decoded = FrameDecoder::new().push_slice(&noisy);

    assert_eq!(decoded, clean);
    assert_eq!(decoded[0].reboot_delay(), Some(42));
}

#[test]
fn test_ping_in_boot_mode() {
    let mut responder = responder(DeviceState::new().with_boot_mode(true));
    let replies = responder.feed(request(Opcode::BootloaderPing, 1).as_bytes());

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].opcode(), Opcode::BootloaderAck);
    assert_eq!(replies[0].payload(), &[0x00]);
    assert_eq!(replies[0].ack_reason(), Some(AckReason::Pong));
}

#[test]
fn test_erase_outside_boot_mode() {
    let mut responder = responder(DeviceState::new());
    let replies = responder.feed(request(Opcode::BootloaderErase, 1).as_bytes());

    assert_eq!(replies[0].opcode(), Opcode::CommonNack);
    assert!(replies[0].payload().is_empty());
    assert_eq!(replies[0].length(), 6);
    assert_eq!(&replies[0].to_bytes()[..3], &[0x22, 0x69, 0x06]);
}

#[test]
fn test_reboot_delays() {
    let mut responder = responder(DeviceState::new());

    let mut long = request(Opcode::AppReboot, 1);
    long.app_reboot(2000);
    assert_eq!(responder.feed(long.as_bytes())[0].opcode(), Opcode::CommonNack);

    let bare = request(Opcode::AppReboot, 2);
    assert_eq!(bare.length(), 6);
    assert_eq!(responder.feed(bare.as_bytes())[0].opcode(), Opcode::CommonAck);
}

#[test]
fn test_get_time_with_injected_clock() {
    let mut responder = responder(DeviceState::new().with_time_set(true));
    let replies = responder.feed(request(Opcode::AppGetTime, 1).as_bytes());

    let mut expected = Vec::new();
    expected.extend_from_slice(&100u32.to_le_bytes());
    expected.extend_from_slice(&500_000_000u32.to_le_bytes());

    assert_eq!(replies[0].opcode(), Opcode::AppSetTime);
    assert_eq!(replies[0].payload(), expected.as_slice());
    assert_eq!(replies[0].length(), 14);
}

/// Replies carry the request ids and swap the addressing nibbles.
#[test]
fn test_reply_address_bounce() {
    let mut responder = responder(DeviceState::new());
    let cmd = Command::new(Opcode::CommonAck, 0xbeef, 0x1234, endpoint::CTRL, endpoint::COMM);
    let replies = responder.feed(cmd.as_bytes());
    let reply = &replies[0];

    assert_eq!(cmd.as_bytes()[7], 0xa1);
    assert_eq!(reply.to_bytes()[7], 0x1a);
    assert_eq!(reply.hw_id(), 0xbeef);
    assert_eq!(reply.msg_id(), 0x1234);
}

/// A conversation over one stream: replies come back in request order.
#[test]
fn test_pumped_conversation() {
    let mut responder = responder(DeviceState::new().with_boot_mode(true).with_flash_write_ok(true));

    let mut page = request(Opcode::BootloaderWritePage, 3);
    page.bootloader_write_page(9, &[0x11; 128]);

    let mut input = Vec::new();
    input.extend_from_slice(request(Opcode::BootloaderErase, 1).as_bytes());
    input.extend_from_slice(&[0xde, 0xad]);
    input.extend_from_slice(request(Opcode::AppGetTelem, 2).as_bytes());
    input.extend_from_slice(page.as_bytes());
    input.extend_from_slice(request(Opcode::BootloaderJump, 4).as_bytes());

    let mut source = ReaderSource::new(input.as_slice());
    let mut sink = Vec::new();
    assert_eq!(responder.pump(&mut source, &mut sink).unwrap(), 4);

    let replies = FrameDecoder::new().push_slice(&sink);
    let summary: Vec<_> = replies
        .iter()
        .map(|r| (r.msg_id(), r.opcode(), r.payload_len()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (1, Opcode::BootloaderAck, 1),
            (2, Opcode::AppTelem, 78),
            (3, Opcode::BootloaderAck, 1),
            (4, Opcode::BootloaderAck, 1),
        ]
    );
    assert_eq!(replies[2].payload(), &[9]);
}

/// Unknown opcodes are dropped by default and nacked on request.
#[test]
fn test_unknown_opcode_policies() {
    let unknown = request(Opcode::Unknown(0x33), 1).to_frame();
    let clock = FixedClock::default();

    let silent = ReplyGenerator::new();
    assert!(silent.generate(&unknown, DeviceState::new(), &clock).is_none());

    let config = ResponderConfig::from_json(r#"{ "unknown_opcode": "nack" }"#).unwrap();
    assert_eq!(config.unknown_opcode, UnknownOpcodePolicy::Nack);
    let reply = config
        .generator()
        .generate(&unknown, DeviceState::new(), &clock)
        .unwrap();
    assert_eq!(reply.opcode(), Opcode::CommonNack);
}

#[tokio::test]
async fn test_async_run_over_duplex() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (client, server) = tokio::io::duplex(4096);
    let (server_rd, server_wr) = tokio::io::split(server);
    let (mut client_rd, mut client_wr) = tokio::io::split(client);

    let task = tokio::spawn(async move {
        let mut responder = responder(DeviceState::new().with_time_set(true));
        responder.run(server_rd, server_wr).await
    });

    for msg_id in 0..20u16 {
        client_wr
            .write_all(request(Opcode::AppGetTime, msg_id).as_bytes())
            .await
            .unwrap();
    }
    client_wr.shutdown().await.unwrap();

    let mut output = Vec::new();
    client_rd.read_to_end(&mut output).await.unwrap();
    assert_eq!(task.await.unwrap().unwrap(), 20);

    let replies = FrameDecoder::new().push_slice(&output);
    assert_eq!(replies.len(), 20);
    for (i, reply) in replies.iter().enumerate() {
        assert_eq!(reply.msg_id(), i as u16);
        assert_eq!(reply.set_time(), Some((100, 500_000_000)));
    }
}
