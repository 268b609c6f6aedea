//! Platform-agnostic driver for the Vishay VCNL3020 infrared proximity
//! sensor, built on the [`embedded-hal`](https://crates.io/crates/embedded-hal)
//! blocking traits.
//!
//! The VCNL3020 pairs an IR emitter with a proximity photodiode behind an
//! I2C register interface. The chip free-runs measurements in self-timed
//! mode and latches a "too close" alarm when results stay beyond a
//! programmed threshold for a programmed number of samples; single
//! measurements can be taken on demand at any time.
//!
//! ## Features
//!
//! * Identity-checked bring-up: no handle unless the chip answers as a
//!   VCNL3020 and every configuration write succeeds
//! * On-demand measurements with a bounded data-ready poll, restoring
//!   self-timed mode afterward
//! * Low-threshold alarm read-out and write-1-to-clear acknowledge
//! * A shared handle: all register traffic is serialized through an
//!   internal lock, so measurement and alarm paths can hold `&Vcnl3020`
//!   concurrently
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vcnl3020::{Config, DefaultMutex, Vcnl3020};
//!
//! # let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! # let delay = embedded_hal_mock::eh1::delay::NoopDelay;
//! let config = Config {
//!     proximity_rate: 0x02,
//!     led_current: 0x14,
//!     threshold: 2200,
//!     count_exceed: 0x01,
//! };
//! let sensor = Vcnl3020::<DefaultMutex<_>>::new(i2c, delay, &config).unwrap();
//!
//! let counts = sensor.measure_proximity().unwrap();
//!
//! if sensor.alarm_asserted() {
//!     sensor.clear_alarm().unwrap();
//! }
//! ```
//!
//! ## Cargo features
//!
//! * `std`: makes [`DefaultMutex`] a `std::sync::Mutex`, for sharing the
//!   handle across threads
//! * `defmt`: `defmt::Format` derives and protocol-level logging

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

mod config;
mod driver;
mod error;
mod monitor;
mod mutex;
mod register;

pub use config::Config;
pub use driver::{Bus, DEVICE_ADDRESS, PROD_ID, Vcnl3020};
pub use error::{Error, InitError, InitStep};
pub use monitor::{AlarmAttribute, ProximityChannel};
pub use mutex::{DefaultMutex, IoMutex, NoopMutex};
pub use register::{CommandRegister, InterruptStatus, Register};
