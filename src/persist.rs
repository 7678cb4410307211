//! Persistence of time and alarm settings.
//!
//! # Layout
//!
//! | Offset | Content                                   |
//! |--------|-------------------------------------------|
//! | 8      | hours                                     |
//! | 9      | minutes                                   |
//! | 10     | alarm hours                               |
//! | 11     | alarm minutes                             |
//! | 12     | alarm armed flag (0/1)                    |
//! | 20     | first-boot sentinel, `0xFF` = never written |
//!
//! Offsets 8-12 are always written together as one block.

use embedded_storage::{ReadStorage, Storage};

use crate::alarm::{AlarmEngine, AlarmTime};
use crate::clock::{ClockTime, Timekeeper};
use crate::error::Error;

/// Offset of the state block.
pub const STATE_OFFSET: u32 = 8;
/// Length of the state block.
pub const STATE_LEN: usize = 5;
/// Offset of the first-boot sentinel byte.
pub const SENTINEL_OFFSET: u32 = 20;
/// Sentinel value of erased storage.
pub const UNINITIALIZED: u8 = 0xFF;
/// Sentinel value written on first boot.
pub const INITIALIZED: u8 = 1;

/// The durable part of the appliance state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PersistedState {
    pub hours: u8,
    pub minutes: u8,
    pub alarm: AlarmTime,
    pub armed: bool,
}

impl PersistedState {
    /// Snapshot of the live state. Seconds are not persisted.
    pub fn capture(clock: &Timekeeper, alarm: &AlarmEngine) -> Self {
        let time = clock.time();
        Self {
            hours: time.hours,
            minutes: time.minutes,
            alarm: alarm.time(),
            armed: alarm.is_armed(),
        }
    }

    pub fn to_bytes(&self) -> [u8; STATE_LEN] {
        [
            self.hours,
            self.minutes,
            self.alarm.hours,
            self.alarm.minutes,
            self.armed as u8,
        ]
    }

    /// Decodes a stored block, resetting out-of-range fields to zero.
    pub fn from_bytes(bytes: [u8; STATE_LEN]) -> Self {
        let clamp = |value: u8, modulus: u8| if value < modulus { value } else { 0 };
        Self {
            hours: clamp(bytes[0], 24),
            minutes: clamp(bytes[1], 60),
            alarm: AlarmTime {
                hours: clamp(bytes[2], 24),
                minutes: clamp(bytes[3], 60),
            },
            armed: bytes[4] == 1,
        }
    }

    pub fn clock_time(&self) -> ClockTime {
        ClockTime::new(self.hours, self.minutes, 0)
    }
}

/// Reads the persisted state.
///
/// On first boot (sentinel erased) the sentinel is written and defaults
/// are returned; nothing is reported to the user.
pub fn restore<S>(storage: &mut S) -> Result<PersistedState, Error>
where
    S: ReadStorage + Storage,
    Error: From<<S as ReadStorage>::Error>,
{
    let mut sentinel = [0u8; 1];
    storage.read(SENTINEL_OFFSET, &mut sentinel)?;
    if sentinel[0] == UNINITIALIZED {
        info!("first boot, resetting to defaults");
        storage.write(SENTINEL_OFFSET, &[INITIALIZED])?;
        return Ok(PersistedState::default());
    }

    let mut block = [0u8; STATE_LEN];
    storage.read(STATE_OFFSET, &mut block)?;
    let state = PersistedState::from_bytes(block);
    info!("restored {}", state);
    Ok(state)
}

/// Writes the state block if persistence was requested since the last
/// flush. Returns whether a write happened.
///
/// A failed write re-raises the request so the next cycle retries.
pub fn flush_if_requested<S>(
    clock: &Timekeeper,
    alarm: &AlarmEngine,
    storage: &mut S,
) -> Result<bool, Error>
where
    S: Storage,
    Error: From<<S as ReadStorage>::Error>,
{
    if !clock.take_persist_request() {
        return Ok(false);
    }

    let state = PersistedState::capture(clock, alarm);
    if let Err(e) = storage.write(STATE_OFFSET, &state.to_bytes()) {
        clock.request_persist();
        let e = Error::from(e);
        warn!("flush failed: {}", e);
        return Err(e);
    }
    trace!("flushed {}", state);
    Ok(true)
}
