//! Inputs a reply handler may consult.
//!
//! Device flags arrive as an immutable [`DeviceState`] value per call, and
//! wall-clock time comes from an injected [`Clock`], so reply generation
//! stays a pure function of its arguments.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;

/// Seconds from the Unix epoch to J2000 as used by the device
/// (2000-01-01T11:58:55.816Z).
const J2000_UNIX_SECS: u64 = 946_727_935;
const J2000_UNIX_SUBSEC_NANOS: u32 = 816_000_000;

/// Device flags that steer reply dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeviceState {
    /// Running the bootloader rather than the application.
    pub boot_mode: bool,
    /// Flash page writes are currently possible.
    pub flash_write_ok: bool,
    /// The device clock has been set.
    pub time_set: bool,
}

impl DeviceState {
    /// Application mode, nothing enabled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boot_mode(mut self, boot_mode: bool) -> Self {
        self.boot_mode = boot_mode;
        self
    }

    pub fn with_flash_write_ok(mut self, flash_write_ok: bool) -> Self {
        self.flash_write_ok = flash_write_ok;
        self
    }

    pub fn with_time_set(mut self, time_set: bool) -> Self {
        self.time_set = time_set;
        self
    }
}

/// Time source for get-time handling.
pub trait Clock {
    /// `(seconds, nanoseconds)` elapsed since the protocol epoch.
    fn now(&self) -> (u32, u32);
}

/// Wall clock measured from a configurable epoch (J2000 by default).
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: SystemTime,
}

impl SystemClock {
    /// Clock counting from the J2000 epoch.
    pub fn j2000() -> Self {
        Self::with_epoch(UNIX_EPOCH + Duration::new(J2000_UNIX_SECS, J2000_UNIX_SUBSEC_NANOS))
    }

    /// Clock counting from `epoch`.
    pub fn with_epoch(epoch: SystemTime) -> Self {
        Self { epoch }
    }

    /// The epoch this clock counts from.
    pub fn epoch(&self) -> SystemTime {
        self.epoch
    }

    /// Split an elapsed duration into whole seconds and a microsecond-resolution
    /// nanosecond part. Seconds wrap at `u32::MAX`, like the wire field.
    pub fn split(elapsed: Duration) -> (u32, u32) {
        (elapsed.as_secs() as u32, elapsed.subsec_micros() * 1000)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::j2000()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> (u32, u32) {
        match SystemTime::now().duration_since(self.epoch) {
            Ok(elapsed) => Self::split(elapsed),
            Err(_) => {
                tracing::warn!("system time is before the protocol epoch");
                (0, 0)
            }
        }
    }
}

/// Clock frozen at one instant, for tests and replays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedClock {
    pub seconds: u32,
    pub nanoseconds: u32,
}

impl FixedClock {
    pub fn new(seconds: u32, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> (u32, u32) {
        (self.seconds, self.nanoseconds)
    }
}

/// Everything a reply handler can see besides the request itself.
#[derive(Clone, Copy)]
pub struct ReplyContext<'a> {
    /// Device flags at the time of the request.
    pub state: DeviceState,
    /// Time source.
    pub clock: &'a dyn Clock,
    /// Largest reboot delay acknowledged.
    pub max_reboot_delay: u32,
}

impl<'a> ReplyContext<'a> {
    pub fn new(state: DeviceState, clock: &'a dyn Clock, max_reboot_delay: u32) -> Self {
        Self {
            state,
            clock,
            max_reboot_delay,
        }
    }
}
