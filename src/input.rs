//! Button debouncing and press classification.
//!
//! The panel has three active-low buttons. [`Debouncer::sample`] is called
//! once per main-loop iteration and yields at most one [`ButtonEvent`];
//! events are never queued, an event the caller ignores is lost.
//!
//! # Classification
//!
//! | Gesture                        | Event                     |
//! |--------------------------------|---------------------------|
//! | B1 released before long hold   | `Short(One)` on release    |
//! | B1 held past long hold         | `LongHold(One)`, repeating |
//! | B1+B2 held past long hold      | `ComboDetected`, once      |
//! | B2 or B3 pressed               | `Short(..)` on press       |
//!
//! A button is only reported again once every line has been released, or,
//! with auto-repeat enabled, once the repeat timeout has passed since the
//! last accepted press.

use crate::config::Timing;

/// Bit masks of the three lines inside [`ButtonLines`].
const B1_MASK: u8 = 0b001;
const B2_MASK: u8 = 0b010;
const B3_MASK: u8 = 0b100;
const ALL_MASK: u8 = B1_MASK | B2_MASK | B3_MASK;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonId {
    One,
    Two,
    Three,
}

impl ButtonId {
    const fn mask(self) -> u8 {
        match self {
            ButtonId::One => B1_MASK,
            ButtonId::Two => B2_MASK,
            ButtonId::Three => B3_MASK,
        }
    }
}

/// One debounced event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    #[default]
    None,
    Short(ButtonId),
    LongHold(ButtonId),
    /// B1 and B2 held together past the long-hold threshold.
    ComboDetected,
}

/// Raw state of the three lines, active-low: a cleared bit is a pressed
/// button. Bit 0 is B1, bit 1 B2, bit 2 B3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonLines(u8);

impl ButtonLines {
    pub const RELEASED: ButtonLines = ButtonLines(ALL_MASK);

    /// Wraps a raw active-low bitmask; bits above bit 2 are ignored.
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw & ALL_MASK)
    }

    /// Lines with the given buttons pressed and the others released.
    pub fn pressed(buttons: &[ButtonId]) -> Self {
        buttons
            .iter()
            .fold(Self::RELEASED, |lines, id| Self(lines.0 & !id.mask()))
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn is_pressed(self, id: ButtonId) -> bool {
        self.0 & id.mask() == 0
    }

    pub const fn all_released(self) -> bool {
        self.0 == ALL_MASK
    }

    /// The button short presses are attributed to when several are down:
    /// B3, then B1, then B2. B2 yields to B1 so that the B1+B2 combo never
    /// reads as a B2 press.
    fn dominant(self) -> Option<ButtonId> {
        [ButtonId::Three, ButtonId::One, ButtonId::Two]
            .into_iter()
            .find(|id| self.is_pressed(*id))
    }
}

/// Tracking of a B1 hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Hold {
    /// First detection, reset each time the long hold fires.
    since: u32,
    /// The threshold fired at least once during this hold.
    confirmed: bool,
}

/// B1+B2 "possible alarm set" latch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Combo {
    Idle,
    Latched,
    /// Broken or consumed; re-arms once both buttons are up.
    Suppressed,
}

/// Turns raw line samples into [`ButtonEvent`]s.
pub struct Debouncer {
    long_hold: u32,
    repeat_timeout: u32,
    settle: u32,
    raw: ButtonLines,
    raw_since: u32,
    stable: ButtonLines,
    rearmed: bool,
    accepted_at: u32,
    hold: Option<Hold>,
    combo: Combo,
    auto_repeat: bool,
}

impl Debouncer {
    pub fn new(timing: &Timing) -> Self {
        Self {
            long_hold: timing.long_hold,
            repeat_timeout: timing.repeat_timeout,
            settle: timing.settle,
            raw: ButtonLines::RELEASED,
            raw_since: 0,
            stable: ButtonLines::RELEASED,
            rearmed: true,
            accepted_at: 0,
            hold: None,
            combo: Combo::Idle,
            auto_repeat: false,
        }
    }

    /// Lets a held B2/B3 re-fire every repeat timeout. Enabled while a
    /// value is being edited.
    pub fn set_auto_repeat(&mut self, enabled: bool) {
        self.auto_repeat = enabled;
    }

    /// Whether every line is released, after settling.
    pub fn all_released(&self) -> bool {
        self.stable.all_released()
    }

    /// Samples the lines at logical time `now` and classifies.
    pub fn sample(&mut self, lines: ButtonLines, now: u32) -> ButtonEvent {
        if lines != self.raw {
            self.raw = lines;
            self.raw_since = now;
        }
        if now.wrapping_sub(self.raw_since) >= self.settle {
            self.stable = self.raw;
        }

        self.track_combo();
        let held = self.track_hold(now);
        let short = self.track_short(now);

        if held != ButtonEvent::None {
            held
        } else {
            short
        }
    }

    fn track_combo(&mut self) {
        let b1 = self.stable.is_pressed(ButtonId::One);
        let b2 = self.stable.is_pressed(ButtonId::Two);

        self.combo = match (self.combo, b1, b2) {
            (_, false, false) => Combo::Idle,
            (Combo::Idle, true, true) => Combo::Latched,
            (Combo::Latched, true, false) | (Combo::Latched, false, true) => Combo::Suppressed,
            (combo, _, _) => combo,
        };
    }

    fn track_hold(&mut self, now: u32) -> ButtonEvent {
        if !self.stable.is_pressed(ButtonId::One) {
            return match self.hold.take() {
                Some(hold) if !hold.confirmed => ButtonEvent::Short(ButtonId::One),
                _ => ButtonEvent::None,
            };
        }

        let Some(hold) = self.hold.as_mut() else {
            self.hold = Some(Hold {
                since: now,
                confirmed: false,
            });
            return ButtonEvent::None;
        };

        if now.wrapping_sub(hold.since) <= self.long_hold {
            return ButtonEvent::None;
        }
        hold.since = now;
        hold.confirmed = true;

        if self.combo == Combo::Latched {
            self.combo = Combo::Suppressed;
            ButtonEvent::ComboDetected
        } else {
            ButtonEvent::LongHold(ButtonId::One)
        }
    }

    fn track_short(&mut self, now: u32) -> ButtonEvent {
        if self.stable.all_released() {
            self.rearmed = true;
            return ButtonEvent::None;
        }

        let Some(id) = self.stable.dominant() else {
            return ButtonEvent::None;
        };
        let repeat_due =
            self.auto_repeat && now.wrapping_sub(self.accepted_at) > self.repeat_timeout;
        if !self.rearmed && !repeat_due {
            return ButtonEvent::None;
        }

        self.rearmed = false;
        self.accepted_at = now;
        match id {
            ButtonId::One => ButtonEvent::None,
            id => ButtonEvent::Short(id),
        }
    }
}
