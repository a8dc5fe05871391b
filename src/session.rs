//! Responder session and runtime loop.
//!
//! A [`Responder`] plays the device side of a link:
//! 1. Offer received bytes to the frame decoder
//! 2. Move each completed request out of the decoder
//! 3. Generate the reply into the reply slot
//! 4. Take the reply and hand its bytes to the transmit path
//!
//! # Example
//!
//! ```
//! use taolst::codec::Command;
//! use taolst::config::ResponderConfig;
//! use taolst::protocol::{endpoint, Opcode};
//! use taolst::session::Responder;
//!
//! let mut config = ResponderConfig::default();
//! config.device.boot_mode = true;
//! let mut responder = Responder::new(&config);
//!
//! let ping = Command::new(Opcode::BootloaderPing, 0x5441, 1, endpoint::TERM, endpoint::EXPT);
//! let replies = responder.feed(ping.as_bytes());
//!
//! assert_eq!(replies.len(), 1);
//! assert_eq!(replies[0].opcode(), Opcode::BootloaderAck);
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::ResponderConfig;
use crate::error::Result;
use crate::protocol::{Frame, FrameDecoder};
use crate::reply::{Clock, DeviceState, ReplyGenerator, ReplySlot, SystemClock};
use crate::transport::{ByteSink, ByteSource};

/// Read buffer size for the async loop.
pub const READ_BUFFER_SIZE: usize = 4 * 1024;

/// Device-side endpoint: decoder, reply generator and reply slot.
pub struct Responder<C = SystemClock> {
    /// Receive-side state machine.
    decoder: FrameDecoder,
    /// Reply dispatch table.
    generator: ReplyGenerator,
    /// Reply waiting to be transmitted.
    slot: ReplySlot,
    /// Current device flags.
    state: DeviceState,
    /// Time source for get-time replies.
    clock: C,
}

impl Responder<SystemClock> {
    /// Create a responder using the wall clock.
    pub fn new(config: &ResponderConfig) -> Self {
        Self::with_clock(config, SystemClock::j2000())
    }
}

impl<C: Clock> Responder<C> {
    /// Create a responder with an explicit clock.
    pub fn with_clock(config: &ResponderConfig, clock: C) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            generator: config.generator(),
            slot: ReplySlot::new(),
            state: config.device,
            clock,
        }
    }

    /// Current device flags.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Replace the device flags used for subsequent replies.
    pub fn set_state(&mut self, state: DeviceState) {
        self.state = state;
    }

    /// The receive-side decoder.
    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Generate the reply to `request` into the slot without taking it.
    ///
    /// Fails with [`TaolstError::ReplyPending`](crate::error::TaolstError::ReplyPending)
    /// while an earlier reply has not been taken.
    pub fn handle(&mut self, request: &Frame) -> Result<Option<&Frame>> {
        tracing::debug!("Request: {}", request);
        self.slot
            .generate(&self.generator, request, self.state, &self.clock)
    }

    /// Take the reply waiting in the slot.
    pub fn take_reply(&mut self) -> Option<Frame> {
        self.slot.take()
    }

    /// Feed received bytes and return the replies they trigger, in order.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        let mut replies = Vec::new();
        for &byte in bytes {
            if let Some(reply) = self.step(byte) {
                replies.push(reply);
            }
        }
        replies
    }

    fn step(&mut self, byte: u8) -> Option<Frame> {
        let request = self.decoder.push(byte)?;
        if let Err(e) = self.handle(&request) {
            tracing::warn!("Dropping request msg_id 0x{:04x}: {}", request.msg_id(), e);
            return None;
        }
        self.take_reply()
    }

    /// Drain `source`, writing each reply to `sink`. Returns the number of
    /// replies written.
    pub fn pump<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<usize>
    where
        S: ByteSource + ?Sized,
        K: ByteSink + ?Sized,
    {
        let mut sent = 0;
        while let Some(byte) = source.next_byte()? {
            if let Some(reply) = self.step(byte) {
                sink.write_bytes(&reply.to_bytes())?;
                sent += 1;
            }
        }
        Ok(sent)
    }

    /// Serve an async byte stream until EOF. Returns the number of replies
    /// written.
    pub async fn run<R, W>(&mut self, mut reader: R, mut writer: W) -> Result<usize>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut sent = 0;

        loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    tracing::error!("Read error: {}", e);
                    return Err(e.into());
                }
            };

            for reply in self.feed(&buf[..n]) {
                if let Err(e) = writer.write_all(&reply.to_bytes()).await {
                    tracing::error!("Write error: {}", e);
                    return Err(e.into());
                }
                sent += 1;
            }
            writer.flush().await?;
        }

        tracing::debug!("Input closed after {} replies", sent);
        writer.flush().await?;
        Ok(sent)
    }
}
