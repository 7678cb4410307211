//! Alarm time, arming and the ringing state machine.
//!
//! ```text
//! Disarmed ──arm──▶ Armed ──time matches && day gate──▶ Ringing
//!     ▲               ▲ │                                 │  │
//!     └────disarm─────┘ │                          silence│  │ring timeout
//!                       │                                 ▼  │
//!                       └──────ring timeout─────────── Silenced
//! ```
//!
//! The trigger consumes the clock's day-elapsed gate, so after the ring
//! timeout the alarm stays armed but cannot fire again until the next
//! midnight (or until it is re-armed). Setting the clock back through the
//! alarm time does not re-fire it.

use crate::clock::Timekeeper;
use crate::config::Timing;
use crate::hw::HardwareIo;

/// Target trigger time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmTime {
    pub hours: u8,
    pub minutes: u8,
}

impl AlarmTime {
    pub const fn new(hours: u8, minutes: u8) -> Self {
        Self {
            hours: hours % 24,
            minutes: minutes % 60,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlarmState {
    Disarmed,
    Armed,
    /// Buzzer toggling since `onset`; `toggled_at` is the last toggle.
    Ringing { onset: u32, toggled_at: u32 },
    /// Ringing with the buzzer held off until the ring timeout.
    Silenced { onset: u32 },
}

pub struct AlarmEngine {
    time: AlarmTime,
    state: AlarmState,
    buzzer: bool,
    ring_duration: u32,
    buzzer_period: u32,
}

impl AlarmEngine {
    pub fn new(timing: &Timing) -> Self {
        Self {
            time: AlarmTime::default(),
            state: AlarmState::Disarmed,
            buzzer: false,
            ring_duration: timing.ring_duration,
            buzzer_period: timing.buzzer_period,
        }
    }

    /// Loads persisted settings at boot. An armed alarm also arms the day
    /// gate so it can fire later today.
    pub fn restore(&mut self, time: AlarmTime, armed: bool, clock: &Timekeeper) {
        self.time = time;
        self.state = if armed {
            AlarmState::Armed
        } else {
            AlarmState::Disarmed
        };
        clock.set_day_elapsed(armed);
    }

    /// Alarm time as last committed or restored.
    pub fn time(&self) -> AlarmTime {
        self.time
    }

    /// Current ringing state, for the indicators and the settings block.
    pub fn state(&self) -> AlarmState {
        self.state
    }

    /// Armed, ringing or silenced.
    pub fn is_armed(&self) -> bool {
        self.state != AlarmState::Disarmed
    }

    /// Ringing, silenced or not.
    pub fn is_ringing(&self) -> bool {
        matches!(
            self.state,
            AlarmState::Ringing { .. } | AlarmState::Silenced { .. }
        )
    }

    /// Current buzzer drive level.
    pub fn buzzer(&self) -> bool {
        self.buzzer
    }

    /// Drives the state machine. Called once per main-loop iteration.
    ///
    /// The trigger comparison is skipped while `suspended` (the alarm time
    /// is being edited).
    pub fn service<H: HardwareIo>(
        &mut self,
        now: u32,
        clock: &Timekeeper,
        hw: &mut H,
        suspended: bool,
    ) {
        match self.state {
            AlarmState::Disarmed => {}
            AlarmState::Armed => {
                if suspended || !clock.day_elapsed() {
                    return;
                }
                let time = clock.time();
                if time.hours == self.time.hours
                    && time.minutes == self.time.minutes
                    && clock.take_day_elapsed()
                {
                    info!("alarm ringing at {}:{}", time.hours, time.minutes);
                    self.state = AlarmState::Ringing {
                        onset: now,
                        toggled_at: now,
                    };
                    self.drive(hw, true);
                }
            }
            AlarmState::Ringing { onset, toggled_at } => {
                if now.wrapping_sub(onset) > self.ring_duration {
                    self.finish(hw);
                } else if now.wrapping_sub(toggled_at) > self.buzzer_period {
                    self.state = AlarmState::Ringing {
                        onset,
                        toggled_at: now,
                    };
                    self.drive(hw, !self.buzzer);
                }
            }
            AlarmState::Silenced { onset } => {
                if now.wrapping_sub(onset) > self.ring_duration {
                    self.finish(hw);
                }
            }
        }
    }

    /// Mutes a ringing alarm until its ring timeout.
    pub fn silence<H: HardwareIo>(&mut self, hw: &mut H) {
        if let AlarmState::Ringing { onset, .. } = self.state {
            info!("alarm silenced");
            self.state = AlarmState::Silenced { onset };
            self.drive(hw, false);
        }
    }

    /// Flips between armed and disarmed. No effect while ringing.
    pub fn toggle_armed(&mut self, clock: &Timekeeper) {
        let armed = match self.state {
            AlarmState::Disarmed => true,
            AlarmState::Armed => false,
            AlarmState::Ringing { .. } | AlarmState::Silenced { .. } => return,
        };
        self.state = if armed {
            AlarmState::Armed
        } else {
            AlarmState::Disarmed
        };
        clock.set_day_elapsed(armed);
        clock.request_persist();
        info!("alarm armed: {}", armed);
    }

    /// Stores a new alarm time and arms it for today.
    pub fn commit(&mut self, time: AlarmTime, clock: &Timekeeper) {
        self.time = time;
        if !self.is_ringing() {
            self.state = AlarmState::Armed;
        }
        clock.set_day_elapsed(true);
        clock.request_persist();
        info!("alarm set to {}:{}", time.hours, time.minutes);
    }

    fn finish<H: HardwareIo>(&mut self, hw: &mut H) {
        debug!("ring timeout");
        self.state = AlarmState::Armed;
        self.drive(hw, false);
    }

    fn drive<H: HardwareIo>(&mut self, hw: &mut H, on: bool) {
        self.buzzer = on;
        hw.set_buzzer(on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ClockTime;
    use crate::input::ButtonLines;
    use crate::mode::Staging;

    #[derive(Default)]
    struct Buzzer {
        level: bool,
        toggles: u32,
    }

    impl HardwareIo for Buzzer {
        fn set_data_line(&mut self, _high: bool) {}
        fn pulse_shift_clock(&mut self) {}
        fn pulse_latch_clock(&mut self) {}
        fn read_button_lines(&mut self) -> ButtonLines {
            ButtonLines::RELEASED
        }
        fn set_buzzer(&mut self, on: bool) {
            if on != self.level {
                self.toggles += 1;
            }
            self.level = on;
        }
        fn set_alarm_indicator(&mut self, _on: bool) {}
        fn set_preview_indicator(&mut self, _on: bool) {}
    }

    fn armed_at(hours: u8, minutes: u8, clock: &Timekeeper) -> AlarmEngine {
        let mut alarm = AlarmEngine::new(&Timing::DEFAULT);
        alarm.commit(AlarmTime::new(hours, minutes), clock);
        clock.take_persist_request();
        alarm
    }

    #[test]
    fn rings_exactly_at_the_minute_boundary() {
        let clock = Timekeeper::new(1000);
        clock.restore(ClockTime::new(6, 59, 59));
        let mut alarm = armed_at(7, 0, &clock);
        let mut hw = Buzzer::default();

        for _ in 0..999 {
            clock.tick();
            alarm.service(clock.now(), &clock, &mut hw, false);
            assert_eq!(alarm.state(), AlarmState::Armed);
        }
        clock.tick();
        assert_eq!(clock.time(), ClockTime::new(7, 0, 0));
        alarm.service(clock.now(), &clock, &mut hw, false);
        assert!(matches!(alarm.state(), AlarmState::Ringing { onset: 1000, .. }));
        assert!(hw.level);
        assert!(!clock.day_elapsed());
    }

    #[test]
    fn does_not_ring_without_day_gate() {
        let clock = Timekeeper::new(1);
        clock.restore(ClockTime::new(7, 0, 0));
        let mut alarm = armed_at(7, 0, &clock);
        clock.set_day_elapsed(false);
        let mut hw = Buzzer::default();
        alarm.service(1, &clock, &mut hw, false);
        assert_eq!(alarm.state(), AlarmState::Armed);
    }

    #[test]
    fn suspended_engine_does_not_trigger() {
        let clock = Timekeeper::new(1);
        clock.restore(ClockTime::new(7, 0, 0));
        let mut alarm = armed_at(7, 0, &clock);
        let mut hw = Buzzer::default();
        alarm.service(1, &clock, &mut hw, true);
        assert_eq!(alarm.state(), AlarmState::Armed);
        assert!(clock.day_elapsed());
    }

    #[test]
    fn buzzer_toggles_every_period_then_times_out() {
        let clock = Timekeeper::new(1000);
        clock.restore(ClockTime::new(7, 0, 0));
        let mut alarm = armed_at(7, 0, &clock);
        let mut hw = Buzzer::default();

        alarm.service(100, &clock, &mut hw, false);
        assert!(alarm.is_ringing());
        for now in 101..=5100 {
            alarm.service(now, &clock, &mut hw, false);
            assert!(alarm.is_ringing());
        }
        // one switch-on plus a toggle once more than 500 units have passed
        assert_eq!(hw.toggles, 1 + 9);

        alarm.service(5101, &clock, &mut hw, false);
        assert_eq!(alarm.state(), AlarmState::Armed);
        assert!(!hw.level);
        assert!(!clock.day_elapsed());
    }

    #[test]
    fn silence_mutes_but_keeps_ringing_until_timeout() {
        let clock = Timekeeper::new(1000);
        clock.restore(ClockTime::new(7, 0, 0));
        let mut alarm = armed_at(7, 0, &clock);
        let mut hw = Buzzer::default();

        alarm.service(0, &clock, &mut hw, false);
        alarm.service(600, &clock, &mut hw, false);
        alarm.silence(&mut hw);
        assert_eq!(alarm.state(), AlarmState::Silenced { onset: 0 });
        assert!(!hw.level);

        let toggles = hw.toggles;
        for now in 601..=5000 {
            alarm.service(now, &clock, &mut hw, false);
            assert!(alarm.is_ringing());
        }
        assert_eq!(hw.toggles, toggles);

        alarm.service(5001, &clock, &mut hw, false);
        assert_eq!(alarm.state(), AlarmState::Armed);
        assert!(!alarm.is_ringing());

        // still 07:00, but the day gate is consumed
        alarm.service(5002, &clock, &mut hw, false);
        assert_eq!(alarm.state(), AlarmState::Armed);
    }

    #[test]
    fn fires_again_after_the_next_midnight() {
        let clock = Timekeeper::new(1);
        clock.restore(ClockTime::new(0, 0, 0));
        let mut alarm = armed_at(0, 1, &clock);
        let mut hw = Buzzer::default();

        let mut onsets = 0;
        for _ in 0..(86_400 + 120) {
            clock.tick();
            let was_ringing = alarm.is_ringing();
            alarm.service(clock.now() * 1000, &clock, &mut hw, false);
            if alarm.is_ringing() && !was_ringing {
                onsets += 1;
            }
        }
        assert_eq!(onsets, 2);
    }

    #[test]
    fn setting_the_clock_back_does_not_refire_the_same_day() {
        let clock = Timekeeper::new(1);
        clock.restore(ClockTime::new(7, 0, 0));
        let mut alarm = armed_at(7, 0, &clock);
        let mut hw = Buzzer::default();

        alarm.service(0, &clock, &mut hw, false);
        assert!(alarm.is_ringing());
        alarm.service(5001, &clock, &mut hw, false);
        assert_eq!(alarm.state(), AlarmState::Armed);

        clock.commit_set(&Staging::new(6, 59));
        let mut now = 5001;
        for _ in 0..120 {
            clock.tick();
            now += 1000;
            alarm.service(now, &clock, &mut hw, false);
            assert!(!alarm.is_ringing());
        }
        let time = clock.time();
        assert_eq!((time.hours, time.minutes), (7, 1));
        assert!(alarm.is_armed());
    }

    #[test]
    fn toggle_arms_disarms_and_gates() {
        let clock = Timekeeper::new(1);
        let mut alarm = AlarmEngine::new(&Timing::DEFAULT);
        assert_eq!(alarm.state(), AlarmState::Disarmed);

        alarm.toggle_armed(&clock);
        assert!(alarm.is_armed());
        assert!(clock.day_elapsed());
        assert!(clock.take_persist_request());

        alarm.toggle_armed(&clock);
        assert_eq!(alarm.state(), AlarmState::Disarmed);
        assert!(!clock.day_elapsed());
    }

    #[test]
    fn toggle_is_ignored_while_ringing() {
        let clock = Timekeeper::new(1);
        clock.restore(ClockTime::new(7, 0, 0));
        let mut alarm = armed_at(7, 0, &clock);
        let mut hw = Buzzer::default();
        alarm.service(0, &clock, &mut hw, false);
        alarm.toggle_armed(&clock);
        assert!(alarm.is_ringing());
    }

    #[test]
    fn restore_sets_state_and_gate() {
        let clock = Timekeeper::new(1);
        let mut alarm = AlarmEngine::new(&Timing::DEFAULT);
        alarm.restore(AlarmTime::new(6, 30), true, &clock);
        assert_eq!(alarm.time(), AlarmTime::new(6, 30));
        assert_eq!(alarm.state(), AlarmState::Armed);
        assert!(clock.day_elapsed());
    }
}
