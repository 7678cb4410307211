//! Pin mappings and peripheral initialization.
//!
//! # Pin Assignments
//!
//! ## Display (two daisy-chained 74HC595)
//! - **PA4**: SDI - Serial data into the shift chain
//! - **PA5**: SHTCLK - Shift clock, rising edge shifts one bit
//! - **PA6**: LCHCLK - Latch clock, rising edge updates the outputs
//!
//! The first byte shifted drives the segments, the second selects the
//! digit.
//!
//! ## Buttons (active-low, internal pull-ups)
//! - **PA0**: B1 - Mode / field / commit
//! - **PA1**: B2 - Increment / arm / silence
//! - **PA2**: B3 - Decrement / view
//!
//! ## Ambient Light
//! - **PA3**: ADC_IN3 - Light-dependent divider setting the brightness
//!
//! ## Outputs
//! - **PA7**: BUZZER_N - Active-low buzzer driver
//! - **PB0**: ALARM_LED_N - Active-low "alarm armed" LED
//! - **PB1**: PREVIEW_LED_N - Active-low "showing alarm time" LED
//!
//! ## Low Power & RTC
//! - **PC14**: OSC32_IN - 32.768 kHz crystal input
//! - **PC15**: OSC32_OUT - 32.768 kHz crystal output
//!
//! ## Debug (SWD)
//! - **PA13**: SWDIO
//! - **PA14**: SWCLK

use embassy_stm32::adc::Adc;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::peripherals::{ADC1, PA3};
use embassy_stm32::{Peri, adc, bind_interrupts};

use crate::panel::{Panel, ShiftChain};
use crate::storage::DataEeprom;

bind_interrupts!(struct Irqs {
    ADC1_COMP => adc::InterruptHandler<ADC1>;
});

/// Ambient-light sensor on the ADC.
pub struct LightSensor {
    adc: Adc<'static, ADC1>,
    pin: Peri<'static, PA3>,
}

impl LightSensor {
    /// Samples the light level, scaled to 8 bits.
    pub async fn read(&mut self) -> u8 {
        let raw = self.adc.read(&mut self.pin).await;
        (raw >> 4) as u8
    }
}

/// Top-level peripheral container for the clock board.
pub struct Peripherals {
    /// Shift chain, buttons, buzzer and indicator LEDs
    pub panel: Panel,
    /// Settings storage
    pub eeprom: DataEeprom,
    /// Display brightness input
    pub light: LightSensor,
}

impl Peripherals {
    /// Initializes all peripherals from the STM32 peripheral singleton.
    ///
    /// # Initial GPIO States
    ///
    /// - PA4/PA5/PA6 (shift chain): Low
    /// - PA7 (BUZZER_N): High (silent)
    /// - PB0/PB1 (indicator LEDs): High (off)
    pub fn new(p: embassy_stm32::Peripherals, spin_limit: u32) -> Self {
        Self {
            panel: Panel::new(
                ShiftChain::new(
                    Output::new(p.PA4, Level::Low, Speed::VeryHigh),
                    Output::new(p.PA5, Level::Low, Speed::VeryHigh),
                    Output::new(p.PA6, Level::Low, Speed::VeryHigh),
                ),
                [
                    Input::new(p.PA0, Pull::Up),
                    Input::new(p.PA1, Pull::Up),
                    Input::new(p.PA2, Pull::Up),
                ],
                Output::new(p.PA7, Level::High, Speed::Low),
                Output::new(p.PB0, Level::High, Speed::Low),
                Output::new(p.PB1, Level::High, Speed::Low),
            ),
            eeprom: DataEeprom::new(spin_limit),
            light: LightSensor {
                adc: Adc::new(p.ADC1, Irqs),
                pin: p.PA3,
            },
        }
    }
}
