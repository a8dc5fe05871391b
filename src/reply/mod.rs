//! Reply module - device-side reply generation.
//!
//! Provides:
//! - [`ReplyGenerator`] - maps request opcodes to pure reply handlers
//! - [`ReplyContext`] - device flags, clock and limits seen by a handler
//! - [`ReplySlot`] - holds one generated reply until it is taken
//!
//! # Example
//!
//! ```
//! use taolst::codec::Command;
//! use taolst::protocol::{endpoint, Opcode};
//! use taolst::reply::{DeviceState, FixedClock, ReplyGenerator, ReplySlot};
//!
//! let generator = ReplyGenerator::new();
//! let mut slot = ReplySlot::new();
//!
//! let mut cmd = Command::new(Opcode::AppReboot, 0x5441, 7, endpoint::TERM, endpoint::COMM);
//! cmd.app_reboot(2000);
//!
//! slot.generate(&generator, &cmd.to_frame(), DeviceState::new(), &FixedClock::default())
//!     .unwrap();
//! let reply = slot.take().unwrap();
//! assert_eq!(reply.opcode(), Opcode::CommonNack);
//! ```

mod context;
mod registry;
mod slot;

pub use context::{Clock, DeviceState, FixedClock, ReplyContext, SystemClock};
pub use registry::{ReplyGenerator, ReplyHandler, UnknownOpcodePolicy, DEFAULT_MAX_REBOOT_DELAY};
pub use slot::ReplySlot;
