//! Mode state machine.
//!
//! The same three buttons mean different things per mode. All of that
//! lives in one table, [`dispatch`], keyed by (mode, event) and returning
//! an [`Action`]; [`ModeStateMachine::handle`] applies the action.
//!
//! | Mode                     | Event            | Action                         |
//! |--------------------------|------------------|--------------------------------|
//! | any, alarm ringing       | `Short(Two)`     | silence                        |
//! | TimeDisplay(HourMinute)  | `Short(One)`     | enter SetTime                  |
//! | TimeDisplay(HourMinute)  | `LongHold(One)`  | toggle 12/24-hour format       |
//! | TimeDisplay(HourMinute)  | `ComboDetected`  | enter SetAlarm                 |
//! | TimeDisplay(_)           | `Short(Two)`     | toggle alarm armed             |
//! | TimeDisplay(view)        | `Short(Three)`   | next view                      |
//! | SetTime / SetAlarm       | `Short(One)`     | next field, or commit and exit |
//! | SetTime / SetAlarm       | `Short(Two)`     | increment active field         |
//! | SetTime / SetAlarm       | `Short(Three)`   | decrement active field         |
//!
//! Everything else is ignored.

use crate::alarm::{AlarmEngine, AlarmTime};
use crate::clock::{ClockTime, Timekeeper};
use crate::display::DisplayMode;
use crate::hw::HardwareIo;
use crate::input::{ButtonEvent, ButtonId};

/// Sub-views of the time display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum View {
    HourMinute,
    MinuteSecond,
    /// Only reachable while the alarm is armed.
    AlarmPreview,
}

impl View {
    /// The view after a `Short(Three)`.
    pub fn next(self, alarm_armed: bool) -> View {
        match self {
            View::HourMinute => View::MinuteSecond,
            View::MinuteSecond if alarm_armed => View::AlarmPreview,
            View::MinuteSecond | View::AlarmPreview => View::HourMinute,
        }
    }
}

/// Field being edited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    Hours,
    Minutes,
}

/// Editable copy of a time while a set mode is active.
///
/// Values are signed so a decrement can step to -1 before wrapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Staging {
    pub hours: i8,
    pub minutes: i8,
    pub field: Field,
}

impl Staging {
    /// Stages `hours:minutes` with the hours field active.
    pub fn new(hours: u8, minutes: u8) -> Self {
        Self {
            hours: (hours % 24) as i8,
            minutes: (minutes % 60) as i8,
            field: Field::Hours,
        }
    }

    /// Steps the active field, wrapping hours mod 24 and minutes mod 60.
    ///
    /// Works in `i16` so fields built outside [`Staging::new`] cannot
    /// overflow before the wrap.
    pub fn adjust(&mut self, delta: i8) {
        let step = |value: i8, modulus: i16| (value as i16 + delta as i16).rem_euclid(modulus) as i8;
        match self.field {
            Field::Hours => self.hours = step(self.hours, 24),
            Field::Minutes => self.minutes = step(self.minutes, 60),
        }
    }

    /// The staged value as a time with zero seconds.
    pub fn normalized(&self) -> ClockTime {
        ClockTime::new(
            self.hours.rem_euclid(24) as u8,
            self.minutes.rem_euclid(60) as u8,
            0,
        )
    }
}

/// Operating mode of the front panel.
///
/// The set modes carry their own [`Staging`], so leaving one without a
/// commit simply drops the edit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    TimeDisplay(View),
    SetTime(Staging),
    SetAlarm(Staging),
}

/// What a button event does in the current mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    None,
    EnterSetTime,
    EnterSetAlarm,
    ToggleFormat,
    ShowView(View),
    ToggleArm,
    Silence,
    NextField,
    Commit,
    Adjust(i8),
}

/// Alarm facts the table depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Context {
    pub alarm_ringing: bool,
    pub alarm_armed: bool,
}

/// The (mode, event) -> action table.
pub fn dispatch(mode: &Mode, event: ButtonEvent, ctx: Context) -> Action {
    use ButtonEvent::{ComboDetected, LongHold, Short};
    use ButtonId::{One, Three, Two};

    match (mode, event) {
        (_, Short(Two)) if ctx.alarm_ringing => Action::Silence,

        (Mode::TimeDisplay(View::HourMinute), Short(One)) => Action::EnterSetTime,
        (Mode::TimeDisplay(View::HourMinute), LongHold(One)) => Action::ToggleFormat,
        (Mode::TimeDisplay(View::HourMinute), ComboDetected) => Action::EnterSetAlarm,
        (Mode::TimeDisplay(_), Short(Two)) => Action::ToggleArm,
        (Mode::TimeDisplay(view), Short(Three)) => Action::ShowView(view.next(ctx.alarm_armed)),

        (Mode::SetTime(staging) | Mode::SetAlarm(staging), Short(One)) => match staging.field {
            Field::Hours => Action::NextField,
            Field::Minutes => Action::Commit,
        },
        (Mode::SetTime(_) | Mode::SetAlarm(_), Short(Two)) => Action::Adjust(1),
        (Mode::SetTime(_) | Mode::SetAlarm(_), Short(Three)) => Action::Adjust(-1),

        _ => Action::None,
    }
}

/// Applies [`dispatch`] decisions to the clock and the alarm engine.
///
/// Holds the current [`Mode`] and the 12/24-hour preference, and swallows
/// events until the panel is released after every mode change.
pub struct ModeStateMachine {
    mode: Mode,
    format_24h: bool,
    /// Set on every mode change; events are ignored until all buttons have
    /// been seen released, so the press that caused the change cannot act
    /// again in the new mode.
    returning: bool,
}

impl Default for ModeStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeStateMachine {
    pub const fn new() -> Self {
        Self {
            mode: Mode::TimeDisplay(View::HourMinute),
            format_24h: true,
            returning: false,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn format_24h(&self) -> bool {
        self.format_24h
    }

    /// Staging buffer of the active set mode.
    pub fn staging(&self) -> Option<&Staging> {
        match &self.mode {
            Mode::SetTime(staging) | Mode::SetAlarm(staging) => Some(staging),
            Mode::TimeDisplay(_) => None,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.staging().is_some()
    }

    pub fn is_setting_alarm(&self) -> bool {
        matches!(self.mode, Mode::SetAlarm(_))
    }

    pub fn display_mode(&self) -> DisplayMode {
        match self.mode {
            Mode::TimeDisplay(View::HourMinute) => DisplayMode::ShowHourMinute,
            Mode::TimeDisplay(View::MinuteSecond) => DisplayMode::ShowMinuteSecond,
            Mode::TimeDisplay(View::AlarmPreview) => DisplayMode::ShowAlarmTime,
            Mode::SetTime(_) => DisplayMode::SetTimeField,
            Mode::SetAlarm(_) => DisplayMode::SetAlarmField,
        }
    }

    /// Applies one debounced event. `released` tells whether every button
    /// is currently up. Returns the action taken.
    pub fn handle<H: HardwareIo>(
        &mut self,
        event: ButtonEvent,
        released: bool,
        clock: &Timekeeper,
        alarm: &mut AlarmEngine,
        hw: &mut H,
    ) -> Action {
        if self.returning {
            if !released {
                return Action::None;
            }
            self.returning = false;
        }

        let ctx = Context {
            alarm_ringing: alarm.is_ringing(),
            alarm_armed: alarm.is_armed(),
        };
        let action = dispatch(&self.mode, event, ctx);

        match action {
            Action::None => {}
            Action::EnterSetTime => {
                let now = clock.time();
                self.enter(Mode::SetTime(Staging::new(now.hours, now.minutes)));
            }
            Action::EnterSetAlarm => {
                let target = alarm.time();
                self.enter(Mode::SetAlarm(Staging::new(target.hours, target.minutes)));
            }
            Action::ToggleFormat => {
                self.format_24h = !self.format_24h;
                debug!("24-hour format: {}", self.format_24h);
            }
            Action::ShowView(view) => self.mode = Mode::TimeDisplay(view),
            Action::ToggleArm => alarm.toggle_armed(clock),
            Action::Silence => alarm.silence(hw),
            Action::NextField => {
                if let Mode::SetTime(staging) | Mode::SetAlarm(staging) = &mut self.mode {
                    staging.field = Field::Minutes;
                }
            }
            Action::Adjust(delta) => {
                if let Mode::SetTime(staging) | Mode::SetAlarm(staging) = &mut self.mode {
                    staging.adjust(delta);
                }
            }
            Action::Commit => {
                match self.mode {
                    Mode::SetTime(staging) => clock.commit_set(&staging),
                    Mode::SetAlarm(staging) => {
                        let time = staging.normalized();
                        alarm.commit(AlarmTime::new(time.hours, time.minutes), clock);
                    }
                    Mode::TimeDisplay(_) => {}
                }
                self.enter(Mode::TimeDisplay(View::HourMinute));
            }
        }

        action
    }

    fn enter(&mut self, mode: Mode) {
        debug!("mode {} -> {}", self.mode, mode);
        self.mode = mode;
        self.returning = true;
    }
}
