//! Firmware for a mains-powered 4-digit LED alarm clock.
//!
//! # Overview
//!
//! This firmware drives the [`alarm_clock`] control core on the clock board:
//! - 4-digit 7-segment display multiplexed through two 74HC595
//! - Three-button panel (set, increment, decrement)
//! - Buzzer alarm with a five second ring
//! - Display brightness following the ambient light
//! - Time and alarm settings kept in the data EEPROM
//!
//! # Hardware
//!
//! - **MCU**: STM32L031G6U6 (Cortex-M0+)
//! - **Clock**: HSI16 as system clock, 32.768 kHz crystal for the RTC domain
//! - **Display**: common-anode digits, active-low segments
//!
//! # Execution Contexts
//!
//! | Context              | Executor           | Priority | Rate    |
//! |----------------------|--------------------|----------|---------|
//! | [`pwm_task`]         | SPI1 (interrupt)   | P1       | 6400 Hz |
//! | [`tick_task`]        | I2C1 (interrupt)   | P2       | 1000 Hz |
//! | main loop, brown-out | thread mode        | lowest   | free    |
//!
//! SPI1 and I2C1 are unused on this board; their vectors only host the
//! interrupt executors. The two tick tasks touch nothing but the atomic
//! cells of [`CLOCK`] and [`BRIGHTNESS`], everything else belongs to the
//! main loop.
//!
//! # Module Organization
//!
//! - [`hardware`] - Pin mappings and peripheral initialization
//! - [`panel`] - Shift chain, button, buzzer and LED driver
//! - [`storage`] - Data-EEPROM driver
//! - [`power`] - Brown-out detection

#![no_std]
#![no_main]

mod hardware;
mod panel;
mod power;
mod storage;

use alarm_clock::Appliance;
use alarm_clock::clock::Timekeeper;
use alarm_clock::config::{PWM_HZ, TICK_HZ, Timing};
use alarm_clock::display::Brightness;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_futures::yield_now;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::{
    Config, interrupt,
    rcc::{LsConfig, LseConfig, mux::ClockMux},
    time::Hertz,
};
use embassy_time::{Duration, Ticker};
use {defmt_rtt as _, panic_probe as _};

use hardware::Peripherals;
use power::{brown_out_task, setup_pvd};

/// Wall clock, advanced by [`tick_task`].
static CLOCK: Timekeeper = Timekeeper::new(Timing::DEFAULT.ticks_per_second);

/// Display brightness envelope, advanced by [`pwm_task`].
static BRIGHTNESS: Brightness = Brightness::new(Timing::DEFAULT.pwm_period);

static EXECUTOR_PWM: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_TICK: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SPI1() {
    unsafe { EXECUTOR_PWM.on_interrupt() }
}

#[interrupt]
unsafe fn I2C1() {
    unsafe { EXECUTOR_TICK.on_interrupt() }
}

/// Creates the clock configuration for STM32L031.
///
/// # Clock Settings
///
/// - **HSI16**: 16 MHz system clock (no PLL)
/// - **LSE**: 32.768 kHz external crystal for the RTC domain
/// - **Voltage scale**: Range 1 (1.8V core, required above 8 MHz)
fn create_clock_config() -> embassy_stm32::rcc::Config {
    embassy_stm32::rcc::Config {
        msi: None,
        hsi: true,
        hse: None,
        pll: None,
        sys: embassy_stm32::rcc::Sysclk::HSI,
        ahb_pre: embassy_stm32::rcc::AHBPrescaler::DIV1,
        apb1_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        apb2_pre: embassy_stm32::rcc::APBPrescaler::DIV1,
        ls: LsConfig {
            rtc: embassy_stm32::rcc::RtcClockSource::LSE,
            lsi: false,
            lse: Some(LseConfig {
                frequency: Hertz::hz(32768),
                mode: embassy_stm32::rcc::LseMode::Oscillator(embassy_stm32::rcc::LseDrive::Low),
            }),
        },
        voltage_scale: embassy_stm32::rcc::VoltageScale::RANGE1,
        mux: ClockMux::default(),
    }
}

/// Brightness PWM time base.
#[embassy_executor::task]
async fn pwm_task() {
    let mut ticker = Ticker::every(Duration::from_hz(PWM_HZ as u64));
    loop {
        ticker.next().await;
        BRIGHTNESS.pwm_tick();
    }
}

/// Wall-clock time base.
#[embassy_executor::task]
async fn tick_task() {
    let mut ticker = Ticker::every(Duration::from_hz(TICK_HZ as u64));
    loop {
        ticker.next().await;
        CLOCK.tick();
    }
}

/// Main entry point for the alarm clock firmware.
///
/// # Initialization Sequence
///
/// 1. Configure clocks (HSI16)
/// 2. Initialize STM32 peripherals
/// 3. Setup PVD for brown-out detection
/// 4. Initialize GPIO, ADC and EEPROM
/// 5. Blank the display and restore settings
/// 6. Start the PWM and tick executors
/// 7. Spawn the brown-out monitor
/// 8. Enter the cooperative main loop
///
/// # Main Loop
///
/// Each pass samples the light sensor, then runs one
/// [`Appliance::step`]: one display digit, one button sample, mode
/// handling, a pending settings flush and the alarm check. Storage errors
/// are logged; the flush is retried on the next pass.
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut config = Config::default();
    config.rcc = create_clock_config();

    let p = embassy_stm32::init(config);

    #[cfg(feature = "debug-mode")]
    defmt::info!("Alarm clock firmware starting...");

    #[cfg(feature = "debug-mode")]
    defmt::info!("Setting up PVD...");

    setup_pvd();

    #[cfg(feature = "debug-mode")]
    defmt::info!("Initializing peripherals...");

    let timing = Timing::DEFAULT;
    let mut peripherals = Peripherals::new(p, timing.storage_spin_limit);
    let mut appliance = Appliance::new(&CLOCK, &BRIGHTNESS, &timing);

    #[cfg(feature = "debug-mode")]
    defmt::info!("Restoring settings...");

    if let Err(e) = appliance.boot(&mut peripherals.panel, &mut peripherals.eeprom) {
        defmt::error!("restore failed, starting from defaults: {}", e);
    }

    #[cfg(feature = "debug-mode")]
    defmt::info!("Starting tick executors...");

    interrupt::SPI1.set_priority(Priority::P1);
    let pwm_spawner = EXECUTOR_PWM.start(interrupt::SPI1);
    pwm_spawner.spawn(pwm_task()).unwrap();

    interrupt::I2C1.set_priority(Priority::P2);
    let tick_spawner = EXECUTOR_TICK.start(interrupt::I2C1);
    tick_spawner.spawn(tick_task()).unwrap();

    #[cfg(feature = "debug-mode")]
    defmt::info!("Spawning brown-out monitor...");

    spawner.spawn(brown_out_task(&CLOCK)).unwrap();

    defmt::info!("running");

    loop {
        let ambient = peripherals.light.read().await;
        if let Err(e) = appliance.step(ambient, &mut peripherals.panel, &mut peripherals.eeprom) {
            defmt::error!("settings flush failed: {}", e);
        }
        yield_now().await;
    }
}
