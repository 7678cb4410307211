//! Brown-out detection.
//!
//! The clock runs from a mains adapter and loses its time when unplugged.
//! The STM32's Programmable Voltage Detector (PVD) notices the supply
//! collapsing while the bulk capacitor still holds VDD above the brown-out
//! reset level, which leaves enough time to write the settings block.
//!
//! # PVD Operation
//!
//! The PVD compares VDD against [`BROWN_OUT_LEVEL`] and raises EXTI line 16
//! on either crossing. The interrupt reports a [`Supply`] reading to the
//! monitor task, which marks the durable state dirty on [`Supply::Failing`];
//! the main loop flushes it on its next pass.

use alarm_clock::clock::Timekeeper;
use embassy_stm32::pac;
use embassy_stm32::pac::pwr::vals::Pls;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};
use pac::interrupt;

/// EXTI line wired to the PVD output
const PVD_EXTI_LINE: usize = 16;

/// EXTI register bank holding lines 0-31
const EXTI_BANK: usize = 0;

/// Highest PVD level on the L0; leaves the most hold-up time before the
/// 1.8V brown-out reset.
const BROWN_OUT_LEVEL: Pls = Pls::V2_9;

/// Supply state as seen by the PVD comparator.
#[derive(Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Supply {
    /// VDD above [`BROWN_OUT_LEVEL`]
    Good,
    /// VDD below [`BROWN_OUT_LEVEL`], power is going away
    Failing,
}

impl Supply {
    /// Reads the comparator output. PVDO is set while VDD is below the level.
    fn sample() -> Self {
        if pac::PWR.csr().read().pvdo() {
            Supply::Failing
        } else {
            Supply::Good
        }
    }
}

/// Last supply crossing, consumed by [`brown_out_task`].
static SUPPLY_SIGNAL: Signal<CriticalSectionRawMutex, Supply> = Signal::new();

/// PVD interrupt handler (EXTI line 16).
#[interrupt]
fn PVD() {
    // Acknowledge the crossing, PR is write-one-to-clear
    pac::EXTI
        .pr(EXTI_BANK)
        .write(|w| w.set_line(PVD_EXTI_LINE, true));

    // Report which side of the threshold VDD is on now, not the edge that
    // fired; a bounce around the level leaves only the settled reading.
    SUPPLY_SIGNAL.signal(Supply::sample());
}

/// Arms the PVD so a collapsing supply interrupts the CPU.
///
/// # Configuration
///
/// - PVD threshold: [`BROWN_OUT_LEVEL`] (2.9V)
/// - EXTI line 16: rising and falling edge triggers
/// - NVIC: PVD interrupt unmasked
pub fn setup_pvd() {
    let pwr = pac::PWR;
    let exti = pac::EXTI;

    // PWR registers are clocked from APB1
    pac::RCC.apb1enr().modify(|w| w.set_pwren(true));

    // Select the level before enabling, so the comparator never runs at the
    // reset level
    pwr.cr().modify(|w| w.set_pls(BROWN_OUT_LEVEL));
    pwr.cr().modify(|w| w.set_pvde(true));

    // Route the PVD output through EXTI; rising is VDD falling below the
    // level, falling is VDD coming back
    exti.imr(EXTI_BANK).modify(|w| w.set_line(PVD_EXTI_LINE, true));
    exti.rtsr(EXTI_BANK).modify(|w| w.set_line(PVD_EXTI_LINE, true));
    exti.ftsr(EXTI_BANK).modify(|w| w.set_line(PVD_EXTI_LINE, true));

    // Already below the level at boot: save as soon as the task starts
    if Supply::sample() == Supply::Failing {
        SUPPLY_SIGNAL.signal(Supply::Failing);
    }

    // SAFETY: the handler above only touches EXTI, PWR and the signal,
    // none of which is borrowed by a critical section at this point
    unsafe {
        cortex_m::peripheral::NVIC::unmask(embassy_stm32::interrupt::PVD);
    };
}

/// Requests an immediate settings flush whenever VDD drops below
/// [`BROWN_OUT_LEVEL`].
///
/// # Arguments
///
/// * `clock` - Timekeeper whose persist request the main loop services
#[embassy_executor::task]
pub async fn brown_out_task(clock: &'static Timekeeper) {
    loop {
        match SUPPLY_SIGNAL.wait().await {
            Supply::Failing => {
                defmt::warn!("supply below PVD threshold, saving state");
                clock.request_persist();
            }
            Supply::Good => defmt::info!("supply recovered"),
        }
    }
}
