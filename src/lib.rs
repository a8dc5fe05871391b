//! # taolst
//!
//! The TAOLST command/reply protocol spoken between a ground terminal and
//! an embedded device (application firmware or bootloader).
//!
//! ## Architecture
//!
//! - **Protocol**: 9-byte header framing with start-marker resync, decoded
//!   one byte at a time by [`protocol::FrameDecoder`]
//! - **Codec**: [`codec::Command`] builds outgoing frames with
//!   opcode-specific payload setters
//! - **Reply**: [`reply::ReplyGenerator`] maps each request to the device's
//!   reply given the current [`reply::DeviceState`]
//! - **Session**: [`session::Responder`] wires decoder, generator and
//!   reply slot to byte streams, sync or async
//!
//! ## Example
//!
//! ```
//! use taolst::{Command, Opcode, Responder, ResponderConfig};
//! use taolst::protocol::endpoint;
//!
//! let mut responder = Responder::new(&ResponderConfig::default());
//!
//! let mut reboot = Command::new(Opcode::AppReboot, 0x5441, 1, endpoint::TERM, endpoint::COMM);
//! reboot.app_reboot(500);
//!
//! let replies = responder.feed(reboot.as_bytes());
//! assert_eq!(replies[0].opcode(), Opcode::CommonAck);
//! println!("{}", replies[0]);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod reply;
pub mod session;
pub mod transport;

pub use codec::Command;
pub use config::ResponderConfig;
pub use error::{Result, TaolstError};
pub use protocol::{Frame, FrameDecoder, Opcode};
pub use reply::{DeviceState, ReplyGenerator};
pub use session::Responder;
