//! Codec module - building request frames for transmission.
//!
//! - [`Command`] - fixed-buffer frame builder with opcode-specific setters
//!
//! # Example
//!
//! ```
//! use taolst::codec::Command;
//! use taolst::protocol::{endpoint, Opcode};
//!
//! let mut cmd = Command::new(Opcode::CommonAscii, 0x5441, 7, endpoint::TERM, endpoint::EXPT);
//! cmd.common_ascii("hello");
//!
//! // Write exactly `byte_count()` bytes to the link.
//! assert_eq!(cmd.as_bytes().len(), cmd.byte_count());
//! ```

mod command;

pub use command::{Command, MAX_DATA_VALUES};
