//! Timing configuration.
//!
//! Every duration below is expressed in logical time units, i.e. ticks of
//! the [`Timekeeper`](crate::clock::Timekeeper). With the default tick rate
//! one unit is one millisecond.

/// Timekeeper tick rate in Hz.
pub const TICK_HZ: u16 = 1000;

/// Brightness PWM tick rate in Hz.
///
/// One PWM period is [`Timing::pwm_period`] ticks, so the display refresh
/// envelope runs at `PWM_HZ / pwm_period` = 100 Hz.
pub const PWM_HZ: u32 = 6400;

/// Timing constants shared by the input, alarm, display and persistence
/// components.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Ticks per logical second.
    pub ticks_per_second: u16,
    /// Button 1 hold time after which a long hold fires (and re-fires).
    pub long_hold: u32,
    /// Rolling timeout after which a held button may be reported again.
    pub repeat_timeout: u32,
    /// How long a raw line pattern must stay unchanged to be accepted.
    pub settle: u32,
    /// How long the alarm rings before it disarms for the day.
    pub ring_duration: u32,
    /// Buzzer toggle period while ringing.
    pub buzzer_period: u32,
    /// PWM ticks per brightness period.
    pub pwm_period: u8,
    /// Polls of a storage-ready condition before giving up.
    pub storage_spin_limit: u32,
}

impl Timing {
    pub const DEFAULT: Timing = Timing {
        ticks_per_second: TICK_HZ,
        long_hold: 2000,
        repeat_timeout: 1000,
        settle: 20,
        ring_duration: 5000,
        buzzer_period: 500,
        pwm_period: 64,
        storage_spin_limit: 100_000,
    };
}

impl Default for Timing {
    fn default() -> Self {
        Self::DEFAULT
    }
}
