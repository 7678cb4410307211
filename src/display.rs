//! Segment rendering, multiplexing and brightness PWM.
//!
//! The display is four common-anode 7-segment digits behind two chained
//! 8-bit shift registers: the first byte shifted selects segments, the
//! second selects the digit. Only one digit is lit at a time;
//! [`Multiplexer::step`] shows the next one on every main-loop iteration.
//!
//! Segment patterns are active-low (`0` = segment lit), bit 7 is the
//! decimal point.

use portable_atomic::{AtomicBool, AtomicU8, Ordering};

use crate::alarm::AlarmTime;
use crate::clock::ClockTime;
use crate::hw::HardwareIo;
use crate::mode::{Field, Staging};

/// Patterns for digits 0-9.
pub const DIGITS: [u8; 10] = [0xC0, 0xF9, 0xA4, 0xB0, 0x99, 0x92, 0x82, 0xF8, 0x80, 0x90];

/// All segments off.
pub const BLANK: u8 = 0xFF;

/// Decimal point bit; cleared to light the dot.
pub const DOT: u8 = 0x80;

/// Digit-select bytes for positions 0-3.
const DIGIT_SELECT: [u8; 4] = [0xF1, 0xF2, 0xF4, 0xF8];

/// Which values the display shows. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayMode {
    ShowHourMinute,
    ShowMinuteSecond,
    ShowAlarmTime,
    SetTimeField,
    SetAlarmField,
}

/// Segment patterns for the four digit positions, left to right.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame(pub [u8; 4]);

impl Frame {
    pub const BLANK: Frame = Frame([BLANK; 4]);
}

/// Everything a frame may be rendered from.
#[derive(Clone, Copy, Debug)]
pub struct FrameSource {
    pub time: ClockTime,
    pub alarm: AlarmTime,
    pub staging: Option<Staging>,
    pub format_24h: bool,
    pub blink: bool,
}

/// Maps a 24-hour value to the 12-hour display value and PM flag.
///
/// Midnight reads 12 AM, noon 12 PM.
pub const fn twelve_hour(hours: u8) -> (u8, bool) {
    match hours {
        0 => (12, false),
        12 => (12, true),
        13..=23 => (hours - 12, true),
        _ => (hours, false),
    }
}

fn pair(value: u8) -> [u8; 2] {
    [DIGITS[(value / 10 % 10) as usize], DIGITS[(value % 10) as usize]]
}

fn frame_of(left: u8, right: u8) -> Frame {
    let [a, b] = pair(left);
    let [c, d] = pair(right);
    Frame([a, b, c, d])
}

/// Renders the frame for `mode`.
pub fn render_frame(mode: DisplayMode, src: &FrameSource) -> Frame {
    match mode {
        DisplayMode::ShowHourMinute => {
            let (hours, pm) = if src.format_24h {
                (src.time.hours, false)
            } else {
                twelve_hour(src.time.hours)
            };
            let mut frame = frame_of(hours, src.time.minutes);
            if pm {
                frame.0[3] &= !DOT;
            }
            if src.blink {
                frame.0[1] &= !DOT;
            }
            frame
        }
        DisplayMode::ShowMinuteSecond => {
            let mut frame = frame_of(src.time.minutes, src.time.seconds);
            frame.0[1] &= !DOT;
            frame
        }
        DisplayMode::ShowAlarmTime => {
            let mut frame = frame_of(src.alarm.hours, src.alarm.minutes);
            frame.0[1] &= !DOT;
            frame
        }
        DisplayMode::SetTimeField | DisplayMode::SetAlarmField => match src.staging {
            Some(staging) => render_field(&staging),
            None => Frame::BLANK,
        },
    }
}

/// Shows the active field and blanks the other half.
fn render_field(staging: &Staging) -> Frame {
    let value = staging.normalized();
    let mut frame = Frame::BLANK;
    match staging.field {
        Field::Hours => frame.0[..2].copy_from_slice(&pair(value.hours)),
        Field::Minutes => frame.0[2..].copy_from_slice(&pair(value.minutes)),
    }
    frame
}

/// Brightness duty cycle, shared between the PWM tick and the main loop.
///
/// The main loop writes the duty; the PWM tick owns the counter and the
/// on/off gate.
pub struct Brightness {
    period: u8,
    duty: AtomicU8,
    counter: AtomicU8,
    lit: AtomicBool,
}

impl Brightness {
    pub const fn new(period: u8) -> Self {
        Self {
            period,
            duty: AtomicU8::new(16),
            counter: AtomicU8::new(0),
            lit: AtomicBool::new(true),
        }
    }

    /// Sets the duty from an 8-bit ambient-light reading.
    pub fn set_duty_from_adc(&self, level: u8) {
        let duty = (level as u16 * self.period as u16 / 256) as u8;
        self.duty.store(duty, Ordering::Relaxed);
    }

    pub fn duty(&self) -> u8 {
        self.duty.load(Ordering::Relaxed)
    }

    /// Whether the display may be lit in the current part of the period.
    pub fn lit(&self) -> bool {
        self.lit.load(Ordering::Relaxed)
    }

    /// Advances the PWM counter. Runs in the PWM interrupt.
    pub fn pwm_tick(&self) {
        let count = self.counter.load(Ordering::Relaxed).wrapping_add(1);
        if count >= self.duty.load(Ordering::Relaxed) {
            self.lit.store(false, Ordering::Relaxed);
        }
        if count >= self.period {
            self.lit.store(true, Ordering::Relaxed);
            self.counter.store(0, Ordering::Relaxed);
        } else {
            self.counter.store(count, Ordering::Relaxed);
        }
    }
}

/// Cycles through the digit positions, one per step.
#[derive(Default)]
pub struct Multiplexer {
    position: usize,
}

impl Multiplexer {
    pub const fn new() -> Self {
        Self { position: 0 }
    }

    /// Index of the digit the next [`Multiplexer::step`] shifts out, `0..4`.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Shifts out the current digit of `frame` and advances, or shifts out
    /// a blank digit when the duty is zero or the PWM gate is off.
    pub fn step<H: HardwareIo>(&mut self, frame: &Frame, brightness: &Brightness, hw: &mut H) {
        if brightness.duty() == 0 || !brightness.lit() {
            self.shift_out(BLANK, hw);
            return;
        }
        self.shift_out(frame.0[self.position], hw);
        self.position = (self.position + 1) % DIGIT_SELECT.len();
    }

    /// Turns every segment off.
    pub fn clear<H: HardwareIo>(&mut self, hw: &mut H) {
        for _ in 0..16 {
            hw.set_data_line(false);
            hw.pulse_shift_clock();
        }
        hw.pulse_latch_clock();
    }

    fn shift_out<H: HardwareIo>(&self, pattern: u8, hw: &mut H) {
        shift_byte(!pattern, hw);
        shift_byte(!DIGIT_SELECT[self.position], hw);
        hw.pulse_latch_clock();
    }
}

/// MSB first.
fn shift_byte<H: HardwareIo>(byte: u8, hw: &mut H) {
    for bit in (0..8).rev() {
        hw.set_data_line(byte & (1 << bit) != 0);
        hw.pulse_shift_clock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ButtonLines;

    /// Records shifted bits and latches.
    #[derive(Default)]
    struct ShiftRecorder {
        data: bool,
        bits: Vec<bool>,
        latched: Vec<u16>,
    }

    impl ShiftRecorder {
        fn last_word(&self) -> Option<u16> {
            self.latched.last().copied()
        }
    }

    impl HardwareIo for ShiftRecorder {
        fn set_data_line(&mut self, high: bool) {
            self.data = high;
        }
        fn pulse_shift_clock(&mut self) {
            self.bits.push(self.data);
        }
        fn pulse_latch_clock(&mut self) {
            let word = self.bits.iter().fold(0u16, |acc, b| acc << 1 | *b as u16);
            self.latched.push(word);
            self.bits.clear();
        }
        fn read_button_lines(&mut self) -> ButtonLines {
            ButtonLines::RELEASED
        }
        fn set_buzzer(&mut self, _on: bool) {}
        fn set_alarm_indicator(&mut self, _on: bool) {}
        fn set_preview_indicator(&mut self, _on: bool) {}
    }

    fn source(hours: u8, minutes: u8, seconds: u8) -> FrameSource {
        FrameSource {
            time: ClockTime::new(hours, minutes, seconds),
            alarm: AlarmTime::new(6, 45),
            staging: None,
            format_24h: true,
            blink: false,
        }
    }

    #[test]
    fn twelve_hour_reference_table() {
        let expected = [
            (0, 12, false),
            (1, 1, false),
            (11, 11, false),
            (12, 12, true),
            (13, 1, true),
            (23, 11, true),
        ];
        for (hours, shown, pm) in expected {
            assert_eq!(twelve_hour(hours), (shown, pm));
        }
    }

    #[test]
    fn twelve_hour_frames() {
        let mut src = source(13, 5, 0);
        src.format_24h = false;
        let frame = render_frame(DisplayMode::ShowHourMinute, &src);
        assert_eq!(
            frame,
            Frame([DIGITS[0], DIGITS[1], DIGITS[0], DIGITS[5] & !DOT])
        );

        src.time.hours = 0;
        let frame = render_frame(DisplayMode::ShowHourMinute, &src);
        assert_eq!(frame, Frame([DIGITS[1], DIGITS[2], DIGITS[0], DIGITS[5]]));

        src.time.hours = 12;
        let frame = render_frame(DisplayMode::ShowHourMinute, &src);
        assert_eq!(frame.0[3], DIGITS[5] & !DOT);
    }

    #[test]
    fn twenty_four_hour_frame_and_blink() {
        let mut src = source(21, 47, 0);
        assert_eq!(
            render_frame(DisplayMode::ShowHourMinute, &src),
            Frame([DIGITS[2], DIGITS[1], DIGITS[4], DIGITS[7]])
        );
        src.blink = true;
        assert_eq!(
            render_frame(DisplayMode::ShowHourMinute, &src).0[1],
            DIGITS[1] & !DOT
        );
    }

    #[test]
    fn minute_second_and_alarm_views_light_the_separator() {
        let src = source(8, 9, 31);
        assert_eq!(
            render_frame(DisplayMode::ShowMinuteSecond, &src),
            Frame([DIGITS[0], DIGITS[9] & !DOT, DIGITS[3], DIGITS[1]])
        );
        assert_eq!(
            render_frame(DisplayMode::ShowAlarmTime, &src),
            Frame([DIGITS[0], DIGITS[6] & !DOT, DIGITS[4], DIGITS[5]])
        );
    }

    #[test]
    fn set_field_blanks_the_other_half() {
        let mut src = source(0, 0, 0);
        let mut staging = Staging::new(7, 42);
        src.staging = Some(staging);
        assert_eq!(
            render_frame(DisplayMode::SetTimeField, &src),
            Frame([DIGITS[0], DIGITS[7], BLANK, BLANK])
        );
        staging.field = Field::Minutes;
        src.staging = Some(staging);
        assert_eq!(
            render_frame(DisplayMode::SetAlarmField, &src),
            Frame([BLANK, BLANK, DIGITS[4], DIGITS[2]])
        );
    }

    #[test]
    fn step_shifts_segments_then_digit_select() {
        let mut hw = ShiftRecorder::default();
        let brightness = Brightness::new(64);
        let mut mux = Multiplexer::new();
        let frame = Frame([DIGITS[1], DIGITS[2], DIGITS[3], DIGITS[4]]);

        for position in 0..4 {
            mux.step(&frame, &brightness, &mut hw);
            let expected = (!frame.0[position] as u16) << 8 | !DIGIT_SELECT[position] as u16;
            assert_eq!(hw.last_word(), Some(expected));
        }
        assert_eq!(mux.position(), 0);
    }

    #[test]
    fn zero_duty_blanks_without_advancing() {
        let mut hw = ShiftRecorder::default();
        let brightness = Brightness::new(64);
        brightness.set_duty_from_adc(3);
        assert_eq!(brightness.duty(), 0);

        let mut mux = Multiplexer::new();
        mux.step(&Frame([DIGITS[8]; 4]), &brightness, &mut hw);
        assert_eq!(hw.last_word(), Some(!DIGIT_SELECT[0] as u16));
        assert_eq!(mux.position(), 0);
    }

    #[test]
    fn pwm_gate_follows_duty() {
        let brightness = Brightness::new(64);
        brightness.set_duty_from_adc(64);
        assert_eq!(brightness.duty(), 16);

        let mut lit = 0;
        for _ in 0..64 {
            brightness.pwm_tick();
            if brightness.lit() {
                lit += 1;
            }
        }
        assert!(brightness.lit());
        // ticks 1..=15 lit, tick 64 re-lights for the next period
        assert_eq!(lit, 16);
    }

    #[test]
    fn clear_latches_all_zeroes() {
        let mut hw = ShiftRecorder::default();
        Multiplexer::new().clear(&mut hw);
        assert_eq!(hw.latched, [0]);
    }
}
