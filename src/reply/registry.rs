//! Reply dispatch table.
//!
//! [`ReplyGenerator`] maps a request opcode to a pure handler that turns the
//! request and a [`ReplyContext`] into a reply frame. Every reply copies the
//! hardware id and message id from the request and swaps the addressing
//! nibbles; handlers only choose the reply opcode and payload.
//!
//! Opcodes without a handler fall through to the [`UnknownOpcodePolicy`].
//!
//! # Example
//!
//! ```
//! use taolst::codec::Command;
//! use taolst::protocol::{endpoint, Opcode};
//! use taolst::reply::{DeviceState, FixedClock, ReplyGenerator};
//!
//! let generator = ReplyGenerator::new();
//! let request = Command::new(Opcode::BootloaderPing, 0x5441, 1, endpoint::TERM, endpoint::EXPT).to_frame();
//! let state = DeviceState::new().with_boot_mode(true);
//!
//! let reply = generator.generate(&request, state, &FixedClock::default()).unwrap();
//! assert_eq!(reply.opcode(), Opcode::BootloaderAck);
//! assert_eq!(reply.payload(), &[0x00]);
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use super::context::{Clock, DeviceState, ReplyContext};
use crate::protocol::{payload_size, AckReason, Frame, Opcode};

/// Default largest reboot delay that is acknowledged.
pub const DEFAULT_MAX_REBOOT_DELAY: u32 = 1000;

/// A pure reply handler.
pub type ReplyHandler = fn(&Frame, &ReplyContext<'_>) -> Frame;

/// What to do with a request whose opcode has no handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownOpcodePolicy {
    /// Produce no reply.
    #[default]
    Silent,
    /// Reply with common-nack.
    Nack,
}

/// Opcode-indexed table of reply handlers.
pub struct ReplyGenerator {
    /// Handlers by request opcode.
    handlers: HashMap<Opcode, ReplyHandler>,
    /// Fallback for opcodes without a handler.
    unknown_opcode: UnknownOpcodePolicy,
    /// Largest reboot delay acknowledged.
    max_reboot_delay: u32,
}

impl ReplyGenerator {
    /// Generator with the standard device reply table.
    pub fn new() -> Self {
        let mut generator = Self::empty();
        generator.register(Opcode::AppGetTelem, reply_get_telem);
        generator.register(Opcode::AppGetTime, reply_get_time);
        generator.register(Opcode::AppReboot, reply_reboot);
        generator.register(Opcode::AppSetTime, common_ack);
        generator.register(Opcode::AppTelem, common_nack);
        generator.register(Opcode::BootloaderAck, common_nack);
        generator.register(Opcode::BootloaderErase, reply_erase);
        generator.register(Opcode::BootloaderPing, reply_ping);
        generator.register(Opcode::BootloaderWritePage, reply_write_page);
        generator.register(Opcode::BootloaderJump, reply_jump);
        generator.register(Opcode::BootloaderNack, common_nack);
        generator.register(Opcode::CommonAck, common_ack);
        generator.register(Opcode::CommonAscii, common_nack);
        generator.register(Opcode::CommonNack, common_nack);
        generator
    }

    /// Generator with no handlers registered.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
            unknown_opcode: UnknownOpcodePolicy::default(),
            max_reboot_delay: DEFAULT_MAX_REBOOT_DELAY,
        }
    }

    /// Set the policy for opcodes without a handler.
    pub fn with_unknown_opcode(mut self, policy: UnknownOpcodePolicy) -> Self {
        self.unknown_opcode = policy;
        self
    }

    /// Set the largest reboot delay that is acknowledged.
    pub fn with_max_reboot_delay(mut self, max_reboot_delay: u32) -> Self {
        self.max_reboot_delay = max_reboot_delay;
        self
    }

    /// Register or replace the handler for `opcode`.
    pub fn register(&mut self, opcode: Opcode, handler: ReplyHandler) {
        self.handlers.insert(opcode, handler);
    }

    /// Check if `opcode` has a handler.
    pub fn is_registered(&self, opcode: Opcode) -> bool {
        self.handlers.contains_key(&opcode)
    }

    /// Policy for opcodes without a handler.
    pub fn unknown_opcode(&self) -> UnknownOpcodePolicy {
        self.unknown_opcode
    }

    /// Largest reboot delay acknowledged.
    pub fn max_reboot_delay(&self) -> u32 {
        self.max_reboot_delay
    }

    /// Map a complete request to its reply.
    ///
    /// Returns `None` only for an opcode without a handler under
    /// [`UnknownOpcodePolicy::Silent`].
    pub fn generate(&self, request: &Frame, state: DeviceState, clock: &dyn Clock) -> Option<Frame> {
        let ctx = ReplyContext::new(state, clock, self.max_reboot_delay);

        let reply = match self.handlers.get(&request.opcode()) {
            Some(handler) => handler(request, &ctx),
            None => match self.unknown_opcode {
                UnknownOpcodePolicy::Silent => {
                    tracing::warn!(
                        "No reply handler for opcode 0x{:02x} (msg_id 0x{:04x}), dropping",
                        request.header.opcode,
                        request.msg_id()
                    );
                    return None;
                }
                UnknownOpcodePolicy::Nack => {
                    tracing::warn!(
                        "No reply handler for opcode 0x{:02x} (msg_id 0x{:04x}), sending nack",
                        request.header.opcode,
                        request.msg_id()
                    );
                    common_nack(request, &ctx)
                }
            },
        };

        tracing::debug!("{} -> {}", request, reply);
        Some(reply)
    }
}

impl Default for ReplyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn common_ack(request: &Frame, _ctx: &ReplyContext<'_>) -> Frame {
    Frame::reply_to(request, Opcode::CommonAck, &[])
}

fn common_nack(request: &Frame, _ctx: &ReplyContext<'_>) -> Frame {
    Frame::reply_to(request, Opcode::CommonNack, &[])
}

fn bootloader_ack(request: &Frame, detail: u8) -> Frame {
    Frame::reply_to(request, Opcode::BootloaderAck, &[detail])
}

fn reply_get_telem(request: &Frame, _ctx: &ReplyContext<'_>) -> Frame {
    Frame::reply_to(request, Opcode::AppTelem, &[0u8; payload_size::TELEMETRY])
}

fn reply_get_time(request: &Frame, ctx: &ReplyContext<'_>) -> Frame {
    if !ctx.state.time_set {
        return common_nack(request, ctx);
    }
    let (sec, ns) = ctx.clock.now();
    let mut body = [0u8; payload_size::SET_TIME];
    body[..4].copy_from_slice(&sec.to_le_bytes());
    body[4..].copy_from_slice(&ns.to_le_bytes());
    Frame::reply_to(request, Opcode::AppSetTime, &body)
}

fn reply_reboot(request: &Frame, ctx: &ReplyContext<'_>) -> Frame {
    if request.payload().is_empty() {
        return common_ack(request, ctx);
    }
    match request.reboot_delay() {
        Some(delay) if delay <= ctx.max_reboot_delay => common_ack(request, ctx),
        _ => common_nack(request, ctx),
    }
}

fn reply_erase(request: &Frame, ctx: &ReplyContext<'_>) -> Frame {
    if !ctx.state.boot_mode {
        return common_nack(request, ctx);
    }
    bootloader_ack(request, AckReason::Erased.into())
}

fn reply_ping(request: &Frame, ctx: &ReplyContext<'_>) -> Frame {
    if !ctx.state.boot_mode {
        return common_nack(request, ctx);
    }
    bootloader_ack(request, AckReason::Pong.into())
}

fn reply_jump(request: &Frame, ctx: &ReplyContext<'_>) -> Frame {
    if !ctx.state.boot_mode {
        return common_nack(request, ctx);
    }
    bootloader_ack(request, AckReason::Jump.into())
}

fn reply_write_page(request: &Frame, ctx: &ReplyContext<'_>) -> Frame {
    if !ctx.state.boot_mode {
        return common_nack(request, ctx);
    }
    match request.first_payload_byte() {
        Some(page) if ctx.state.flash_write_ok => bootloader_ack(request, page),
        _ => Frame::reply_to(request, Opcode::BootloaderNack, &[]),
    }
}
