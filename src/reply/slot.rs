//! Single reply buffer.
//!
//! A generated reply sits in the slot until the transport takes it. Asking
//! for another reply while one is still waiting is refused and leaves the
//! waiting reply untouched.

use super::context::{Clock, DeviceState};
use super::registry::ReplyGenerator;
use crate::error::{Result, TaolstError};
use crate::protocol::Frame;

/// One-frame reply buffer with an "empty" guard.
#[derive(Debug, Default)]
pub struct ReplySlot {
    pending: Option<Frame>,
}

impl ReplySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if no reply is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    /// The waiting reply, if any.
    pub fn peek(&self) -> Option<&Frame> {
        self.pending.as_ref()
    }

    /// Generate the reply to `request` into the slot.
    ///
    /// Returns the stored reply, or `Ok(None)` when the generator stays
    /// silent. Fails with [`TaolstError::ReplyPending`] if the slot is
    /// occupied.
    pub fn generate(
        &mut self,
        generator: &ReplyGenerator,
        request: &Frame,
        state: DeviceState,
        clock: &dyn Clock,
    ) -> Result<Option<&Frame>> {
        if let Some(pending) = &self.pending {
            tracing::warn!(
                "Reply to msg_id 0x{:04x} not taken yet, refusing reply to msg_id 0x{:04x}",
                pending.msg_id(),
                request.msg_id()
            );
            return Err(TaolstError::ReplyPending);
        }
        self.pending = generator.generate(request, state, clock);
        Ok(self.pending.as_ref())
    }

    /// Take the waiting reply, emptying the slot.
    pub fn take(&mut self) -> Option<Frame> {
        self.pending.take()
    }

    /// Drop any waiting reply.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}
