//! GPIO driver for the front panel.
//!
//! Owns the shift-register chain feeding the display, the three buttons,
//! the buzzer and both indicator LEDs, and exposes them to the control core
//! as [`HardwareIo`].
//!
//! # Hardware Design
//!
//! - U1 (74HC595, on SDI): digit select through PNP drivers, low nibble only
//! - U2 (74HC595, on U1's QH'): segment drivers, DP on Q7
//!
//! Both bytes are shifted out inverted, segment byte first so that it ends
//! up in U2. The GPIO toggles are slower than the 595 setup and pulse-width
//! limits (about 20 ns at 3 V).

use alarm_clock::hw::HardwareIo;
use alarm_clock::input::ButtonLines;
use embassy_stm32::gpio::{Input, Output};

/// Bit-banged interface to the 74HC595 chain.
pub struct ShiftChain {
    /// Serial data input (SDI)
    data: Output<'static>,
    /// Shift clock (SHTCLK)
    shift_clk: Output<'static>,
    /// Storage register clock (LCHCLK)
    latch_clk: Output<'static>,
}

impl ShiftChain {
    pub fn new(data: Output<'static>, shift_clk: Output<'static>, latch_clk: Output<'static>) -> Self {
        Self {
            data,
            shift_clk,
            latch_clk,
        }
    }

    fn set_data(&mut self, high: bool) {
        if high {
            self.data.set_high();
        } else {
            self.data.set_low();
        }
    }

    /// Rising edge on SHTCLK shifts the current SDI level in.
    fn pulse_shift(&mut self) {
        self.shift_clk.set_high();
        self.shift_clk.set_low();
    }

    /// Rising edge on LCHCLK copies the shift stage to the outputs.
    fn pulse_latch(&mut self) {
        self.latch_clk.set_high();
        self.latch_clk.set_low();
    }
}

/// Drives an active-low output.
fn set_active_low(pin: &mut Output<'static>, on: bool) {
    if on {
        pin.set_low();
    } else {
        pin.set_high();
    }
}

/// Everything the control core touches on the board apart from storage and
/// the light sensor.
pub struct Panel {
    chain: ShiftChain,
    /// B1, B2, B3, active-low
    buttons: [Input<'static>; 3],
    buzzer_n: Output<'static>,
    alarm_led_n: Output<'static>,
    preview_led_n: Output<'static>,
}

impl Panel {
    pub fn new(
        chain: ShiftChain,
        buttons: [Input<'static>; 3],
        buzzer_n: Output<'static>,
        alarm_led_n: Output<'static>,
        preview_led_n: Output<'static>,
    ) -> Self {
        Self {
            chain,
            buttons,
            buzzer_n,
            alarm_led_n,
            preview_led_n,
        }
    }
}

impl HardwareIo for Panel {
    fn set_data_line(&mut self, high: bool) {
        self.chain.set_data(high);
    }

    fn pulse_shift_clock(&mut self) {
        self.chain.pulse_shift();
    }

    fn pulse_latch_clock(&mut self) {
        self.chain.pulse_latch();
    }

    fn read_button_lines(&mut self) -> ButtonLines {
        let raw = self
            .buttons
            .iter()
            .enumerate()
            .fold(0u8, |raw, (bit, pin)| raw | (pin.is_high() as u8) << bit);
        ButtonLines::from_raw(raw)
    }

    fn set_buzzer(&mut self, on: bool) {
        set_active_low(&mut self.buzzer_n, on);
    }

    fn set_alarm_indicator(&mut self, on: bool) {
        set_active_low(&mut self.alarm_led_n, on);
    }

    fn set_preview_indicator(&mut self, on: bool) {
        set_active_low(&mut self.preview_led_n, on);
    }
}
