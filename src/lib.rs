//! Control core for a 4-digit 7-segment alarm clock.
//!
//! # Overview
//!
//! The appliance keeps wall-clock time, multiplexes a 4-digit display
//! through a shift-register chain, reads a 3-button panel, drives an alarm
//! buzzer and persists its settings to a small byte-addressed store.
//!
//! Three timing domains share state in this crate:
//!
//! - the 1 kHz tick ([`clock::Timekeeper::tick`]) advancing the clock,
//! - the faster PWM tick ([`display::Brightness::pwm_tick`]) gating the
//!   display on and off for brightness control,
//! - the cooperative main loop ([`app::Appliance::step`]) doing everything
//!   else.
//!
//! State touched by more than one context lives in `portable-atomic` cells
//! with a single writer per field; there are no locks.
//!
//! # Module Organization
//!
//! - [`clock`] - Wall-clock time keeping and the day-elapsed gate
//! - [`input`] - Button debouncing and short/long/combo classification
//! - [`alarm`] - Alarm time, arming and the ringing state machine
//! - [`mode`] - Mode state machine and the button dispatch table
//! - [`display`] - Segment rendering, multiplexing and brightness PWM
//! - [`persist`] - Fixed-layout persistence of time and alarm settings
//! - [`app`] - Main loop glue tying the components together
//! - [`hw`] - The hardware driver seen by the core
//! - [`config`] - Timing constants

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod alarm;
pub mod app;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod hw;
pub mod input;
pub mod mode;
pub mod persist;

pub use app::Appliance;
pub use error::Error;
