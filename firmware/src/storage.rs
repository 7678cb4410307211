//! Data-EEPROM driver for the settings block.
//!
//! The STM32L031 has 1 KB of byte-addressable data EEPROM mapped at
//! `0x0808_0000`. Reads are plain memory loads. Writes need the PECR lock
//! released with the two-word key sequence; each byte write then stalls
//! the flash interface until `SR.BSY` clears (about 3.2 ms per byte).
//! Registers are accessed through the PAC.

use embassy_stm32::pac;
use embedded_storage::{ReadStorage, Storage};

/// Base address of the data EEPROM.
const EEPROM_BASE: usize = 0x0808_0000;

/// Data EEPROM size on the STM32L031x6.
const EEPROM_SIZE: usize = 1024;

/// PECR unlock key sequence (RM0377 3.3.4).
const PEKEY1: u32 = 0x89AB_CDEF;
const PEKEY2: u32 = 0x0203_0405;

/// Data-EEPROM access failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum EepromError {
    /// Access beyond the end of the EEPROM
    OutOfBounds,
    /// `SR.BSY` did not clear within the spin limit
    Timeout,
    /// The flash interface flagged a programming error
    Program,
}

impl From<EepromError> for alarm_clock::Error {
    fn from(e: EepromError) -> Self {
        match e {
            EepromError::OutOfBounds => alarm_clock::Error::OutOfRange,
            EepromError::Timeout => alarm_clock::Error::StorageTimeout,
            EepromError::Program => alarm_clock::Error::Storage,
        }
    }
}

/// Byte-granular access to the data EEPROM.
pub struct DataEeprom {
    /// Status polls before a busy flash interface counts as hung
    spin_limit: u32,
}

impl DataEeprom {
    pub fn new(spin_limit: u32) -> Self {
        Self { spin_limit }
    }

    /// Validates an access and returns its absolute address.
    fn address(offset: u32, len: usize) -> Result<usize, EepromError> {
        let start = offset as usize;
        match start.checked_add(len) {
            Some(end) if end <= EEPROM_SIZE => Ok(EEPROM_BASE + start),
            _ => Err(EepromError::OutOfBounds),
        }
    }

    fn wait_ready(&self) -> Result<(), EepromError> {
        for _ in 0..self.spin_limit {
            if !pac::FLASH.sr().read().bsy() {
                return Ok(());
            }
        }
        Err(EepromError::Timeout)
    }

    fn unlock(&mut self) -> Result<(), EepromError> {
        self.wait_ready()?;
        if pac::FLASH.pecr().read().pelock() {
            pac::FLASH.pekeyr().write_value(PEKEY1);
            pac::FLASH.pekeyr().write_value(PEKEY2);
        }
        Ok(())
    }

    fn lock(&mut self) {
        pac::FLASH.pecr().modify(|w| w.set_pelock(true));
    }

    /// Checks and clears the programming error flags.
    fn take_errors(&mut self) -> Result<(), EepromError> {
        let sr = pac::FLASH.sr().read();
        if sr.wrperr() || sr.pgaerr() || sr.sizerr() {
            pac::FLASH.sr().write(|w| {
                w.set_wrperr(true);
                w.set_pgaerr(true);
                w.set_sizerr(true);
            });
            return Err(EepromError::Program);
        }
        Ok(())
    }

    fn write_bytes(&mut self, addr: usize, bytes: &[u8]) -> Result<(), EepromError> {
        for (i, &byte) in bytes.iter().enumerate() {
            let cell = (addr + i) as *mut u8;
            // SAFETY: `address` bounded the range to the data EEPROM.
            if unsafe { core::ptr::read_volatile(cell) } == byte {
                continue;
            }
            unsafe { core::ptr::write_volatile(cell, byte) };
            self.wait_ready()?;
            self.take_errors()?;
        }
        Ok(())
    }
}

impl ReadStorage for DataEeprom {
    type Error = EepromError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let addr = Self::address(offset, bytes.len())?;
        self.wait_ready()?;
        for (i, byte) in bytes.iter_mut().enumerate() {
            // SAFETY: `address` bounded the range to the data EEPROM.
            *byte = unsafe { core::ptr::read_volatile((addr + i) as *const u8) };
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        EEPROM_SIZE
    }
}

impl Storage for DataEeprom {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let addr = Self::address(offset, bytes.len())?;
        self.unlock()?;
        let result = self.write_bytes(addr, bytes);
        self.lock();
        if let Err(e) = result {
            defmt::warn!("EEPROM write at {} failed: {}", offset, e);
        }
        result
    }
}
