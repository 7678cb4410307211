//! Main-loop glue.

use embedded_storage::{ReadStorage, Storage};

use crate::alarm::AlarmEngine;
use crate::clock::Timekeeper;
use crate::config::Timing;
use crate::display::{Brightness, DisplayMode, Frame, FrameSource, Multiplexer, render_frame};
use crate::error::Error;
use crate::hw::HardwareIo;
use crate::input::Debouncer;
use crate::mode::{Mode, ModeStateMachine, View};
use crate::persist;

/// The cooperative half of the appliance.
///
/// Owns everything only the main loop touches and borrows the two cells
/// shared with the interrupt contexts.
pub struct Appliance<'a> {
    clock: &'a Timekeeper,
    brightness: &'a Brightness,
    debouncer: Debouncer,
    modes: ModeStateMachine,
    alarm: AlarmEngine,
    mux: Multiplexer,
}

impl<'a> Appliance<'a> {
    pub fn new(clock: &'a Timekeeper, brightness: &'a Brightness, timing: &Timing) -> Self {
        Self {
            clock,
            brightness,
            debouncer: Debouncer::new(timing),
            modes: ModeStateMachine::new(),
            alarm: AlarmEngine::new(timing),
            mux: Multiplexer::new(),
        }
    }

    /// Blanks the display and loads persisted settings. Call before the
    /// tick contexts start.
    pub fn boot<H, S>(&mut self, hw: &mut H, storage: &mut S) -> Result<(), Error>
    where
        H: HardwareIo,
        S: ReadStorage + Storage,
        Error: From<<S as ReadStorage>::Error>,
    {
        self.mux.clear(hw);
        let state = persist::restore(storage)?;
        self.clock.restore(state.clock_time());
        self.alarm.restore(state.alarm, state.armed, self.clock);
        Ok(())
    }

    /// One main-loop iteration.
    ///
    /// Applies the ambient-light reading, shows one digit, runs the mode
    /// state machine on this iteration's button event, flushes pending
    /// persistence and services the alarm. A storage error is returned
    /// after the rest of the iteration has run.
    pub fn step<H, S>(&mut self, ambient: u8, hw: &mut H, storage: &mut S) -> Result<(), Error>
    where
        H: HardwareIo,
        S: Storage,
        Error: From<<S as ReadStorage>::Error>,
    {
        self.brightness.set_duty_from_adc(ambient);
        let frame = self.frame();
        self.mux.step(&frame, self.brightness, hw);

        let now = self.clock.now();
        let lines = hw.read_button_lines();
        let event = self.debouncer.sample(lines, now);
        self.modes.handle(
            event,
            self.debouncer.all_released(),
            self.clock,
            &mut self.alarm,
            hw,
        );
        self.debouncer.set_auto_repeat(self.modes.is_editing());
        self.clock
            .set_blink_enabled(self.modes.display_mode() == DisplayMode::ShowHourMinute);

        let flushed = persist::flush_if_requested(self.clock, &self.alarm, storage);

        self.alarm
            .service(now, self.clock, hw, self.modes.is_setting_alarm());
        self.update_indicators(hw);

        flushed.map(|_| ())
    }

    /// The frame for the current mode.
    pub fn frame(&self) -> Frame {
        let src = FrameSource {
            time: self.clock.time(),
            alarm: self.alarm.time(),
            staging: self.modes.staging().copied(),
            format_24h: self.modes.format_24h(),
            blink: self.clock.blink(),
        };
        render_frame(self.modes.display_mode(), &src)
    }

    pub fn modes(&self) -> &ModeStateMachine {
        &self.modes
    }

    pub fn alarm(&self) -> &AlarmEngine {
        &self.alarm
    }

    fn update_indicators<H: HardwareIo>(&self, hw: &mut H) {
        let alarm_led = if self.modes.is_setting_alarm() {
            self.clock.time().seconds % 2 == 0
        } else {
            self.alarm.is_armed() && !self.alarm.is_ringing() && self.clock.day_elapsed()
        };
        hw.set_alarm_indicator(alarm_led);
        hw.set_preview_indicator(*self.modes.mode() == Mode::TimeDisplay(View::AlarmPreview));
    }
}
