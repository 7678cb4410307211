//! Wall-clock time keeping.
//!
//! [`Timekeeper`] is shared between the tick interrupt and the main loop.
//! Every field has exactly one writing context:
//!
//! | Field                          | Writer           | Readers          |
//! |--------------------------------|------------------|------------------|
//! | `now`, `sub_ticks`, time of day | tick             | main loop        |
//! | `blink`                         | tick             | main loop        |
//! | `pending`                       | main loop (post) | tick (take)      |
//! | `blink_enabled`                 | main loop        | tick             |
//! | `day_elapsed`, `persist`        | both, atomic RMW | both             |
//!
//! Reading hours and minutes separately may observe a torn update right at
//! a rollover. The display refreshes many times per second, so the next
//! frame corrects it.

use portable_atomic::{AtomicBool, AtomicU8, AtomicU16, AtomicU32, Ordering};

use crate::mode::Staging;

/// Marks a posted time in [`Timekeeper::pending`].
const PENDING: u16 = 0x8000;

/// A normalized time of day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    /// Ticks elapsed within the current second.
    pub sub_ticks: u16,
}

/// The largest unit that wrapped during one [`ClockTime::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rollover {
    None,
    Second,
    Minute,
    Hour,
    Day,
}

impl ClockTime {
    /// Builds a time from its parts, wrapping each field into range.
    pub const fn new(hours: u8, minutes: u8, seconds: u8) -> Self {
        Self {
            hours: hours % 24,
            minutes: minutes % 60,
            seconds: seconds % 60,
            sub_ticks: 0,
        }
    }

    /// Advances by one tick at the given tick rate.
    pub fn advance(&mut self, ticks_per_second: u16) -> Rollover {
        self.sub_ticks += 1;
        if self.sub_ticks < ticks_per_second {
            return Rollover::None;
        }
        self.sub_ticks = 0;

        self.seconds += 1;
        if self.seconds < 60 {
            return Rollover::Second;
        }
        self.seconds = 0;

        self.minutes += 1;
        if self.minutes < 60 {
            return Rollover::Minute;
        }
        self.minutes = 0;

        self.hours += 1;
        if self.hours < 24 {
            return Rollover::Hour;
        }
        self.hours = 0;
        Rollover::Day
    }
}

/// The running clock, safe to share between the tick interrupt and the
/// main loop.
///
/// Construct it in a `static` with [`Timekeeper::new`]; the tick context
/// calls [`tick`](Self::tick), everything else is read or posted from the
/// main loop.
pub struct Timekeeper {
    ticks_per_second: u16,
    now: AtomicU32,
    sub_ticks: AtomicU16,
    seconds: AtomicU8,
    minutes: AtomicU8,
    hours: AtomicU8,
    pending: AtomicU16,
    day_elapsed: AtomicBool,
    blink: AtomicBool,
    blink_enabled: AtomicBool,
    persist: AtomicBool,
}

impl Timekeeper {
    pub const fn new(ticks_per_second: u16) -> Self {
        Self {
            ticks_per_second,
            now: AtomicU32::new(0),
            sub_ticks: AtomicU16::new(0),
            seconds: AtomicU8::new(0),
            minutes: AtomicU8::new(0),
            hours: AtomicU8::new(0),
            pending: AtomicU16::new(0),
            day_elapsed: AtomicBool::new(false),
            blink: AtomicBool::new(false),
            blink_enabled: AtomicBool::new(true),
            persist: AtomicBool::new(false),
        }
    }

    /// Advances the clock by one tick.
    ///
    /// Runs in the tick interrupt. Applies a time posted by
    /// [`commit_set`](Self::commit_set) first, then advances and reacts to
    /// rollovers: the blink phase flips every second while enabled, a
    /// persistence request is raised every minute and the day-elapsed gate
    /// is set at midnight.
    pub fn tick(&self) {
        self.now
            .store(self.now.load(Ordering::Relaxed).wrapping_add(1), Ordering::Release);

        let posted = self.pending.swap(0, Ordering::AcqRel);
        let mut time = self.time();
        if posted & PENDING != 0 {
            time = ClockTime::new((posted >> 8) as u8 & 0x1F, posted as u8, 0);
            self.persist.store(true, Ordering::Release);
        }

        let rollover = time.advance(self.ticks_per_second);
        self.store(time);

        if rollover >= Rollover::Second && self.blink_enabled.load(Ordering::Relaxed) {
            self.blink
                .store(!self.blink.load(Ordering::Relaxed), Ordering::Relaxed);
        }
        if rollover >= Rollover::Minute {
            self.persist.store(true, Ordering::Release);
        }
        if rollover == Rollover::Day {
            self.day_elapsed.store(true, Ordering::Release);
        }
    }

    /// Logical time in ticks since start-up. Wraps after ~49 days at 1 kHz,
    /// all consumers compare with `wrapping_sub`.
    pub fn now(&self) -> u32 {
        self.now.load(Ordering::Acquire)
    }

    /// Current time of day. Fields are read one at a time.
    pub fn time(&self) -> ClockTime {
        ClockTime {
            hours: self.hours.load(Ordering::Relaxed),
            minutes: self.minutes.load(Ordering::Relaxed),
            seconds: self.seconds.load(Ordering::Relaxed),
            sub_ticks: self.sub_ticks.load(Ordering::Relaxed),
        }
    }

    /// Sets the time of day before the tick context starts.
    pub fn restore(&self, time: ClockTime) {
        self.store(ClockTime::new(time.hours, time.minutes, time.seconds));
    }

    /// Posts hours and minutes from a staging buffer; seconds restart at 0.
    ///
    /// The tick context applies the posted value on its next tick, so it
    /// remains the only writer of the time fields. Persistence is requested
    /// once the new time is in place.
    pub fn commit_set(&self, staging: &Staging) {
        let time = staging.normalized();
        let word = PENDING | (time.hours as u16) << 8 | time.minutes as u16;
        self.pending.store(word, Ordering::Release);
        debug!("time set to {}:{}", time.hours, time.minutes);
    }

    /// Whether midnight passed (or the alarm was armed) since the gate was
    /// last consumed.
    pub fn day_elapsed(&self) -> bool {
        self.day_elapsed.load(Ordering::Acquire)
    }

    /// Consumes the day-elapsed gate, returning whether it was set.
    pub fn take_day_elapsed(&self) -> bool {
        self.day_elapsed.swap(false, Ordering::AcqRel)
    }

    /// Sets or clears the day-elapsed gate.
    ///
    /// # Arguments
    ///
    /// * `set` - `true` lets the alarm fire once at its next match, `false`
    ///   holds it until the next midnight
    pub fn set_day_elapsed(&self, set: bool) {
        self.day_elapsed.store(set, Ordering::Release);
    }

    /// Middle-dot blink phase.
    pub fn blink(&self) -> bool {
        self.blink.load(Ordering::Relaxed)
    }

    /// Enables the per-second blink toggle. Only the hour/minute view
    /// blinks; the phase freezes otherwise.
    pub fn set_blink_enabled(&self, enabled: bool) {
        self.blink_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Marks the durable state dirty.
    pub fn request_persist(&self) {
        self.persist.store(true, Ordering::Release);
    }

    /// Clears and returns the dirty flag.
    pub fn take_persist_request(&self) -> bool {
        self.persist.swap(false, Ordering::AcqRel)
    }

    fn store(&self, time: ClockTime) {
        self.sub_ticks.store(time.sub_ticks, Ordering::Relaxed);
        self.seconds.store(time.seconds, Ordering::Relaxed);
        self.minutes.store(time.minutes, Ordering::Relaxed);
        self.hours.store(time.hours, Ordering::Relaxed);
    }
}
