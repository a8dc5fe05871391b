//! Transport module - byte-level collaborators of the responder.
//!
//! Provides:
//! - [`ByteSource`] / [`ByteSink`] traits for the receive and transmit paths
//! - [`ReaderSource`] adapting any [`std::io::Read`], and a blanket
//!   [`ByteSink`] for every [`std::io::Write`]
//! - [`reply_path`] for naming replay output files

mod stream;

pub use stream::{reply_path, ByteSink, ByteSource, ReaderSource, REPLY_PREFIX};
