//! The hardware driver as seen by the control core.

use crate::input::ButtonLines;

/// Digital I/O of the clock board.
///
/// Implemented by the firmware's GPIO panel driver and by test doubles.
/// Brightness (an ADC read) and persistent storage are passed to the core
/// separately: the former is sampled asynchronously by the main loop, the
/// latter goes through `embedded-storage`.
pub trait HardwareIo {
    /// Drives the shift-register serial data line.
    fn set_data_line(&mut self, high: bool);

    /// Clocks one bit into the shift-register chain.
    fn pulse_shift_clock(&mut self);

    /// Transfers the shifted bits to the register outputs.
    fn pulse_latch_clock(&mut self);

    /// Samples the three active-low button lines.
    fn read_button_lines(&mut self) -> ButtonLines;

    /// Drives the buzzer output.
    fn set_buzzer(&mut self, on: bool);

    /// Alarm-armed LED.
    fn set_alarm_indicator(&mut self, on: bool);

    /// LED lit while the display previews the alarm time.
    fn set_preview_indicator(&mut self, on: bool);
}
