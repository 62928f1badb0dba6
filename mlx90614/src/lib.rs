// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! A pure-Rust library for the Melexis MLX90614 family of infrared thermometers.
//!
//! The MLX90614 measures the temperature of whatever it's pointed at (the *object*) as well as its
//! own die temperature (the *ambient* temperature), and is accessed over SMBus. Dual zone models
//! have a second sensing element, and report a second object temperature.
//!
//! This library uses the [`embedded-hal`][embedded-hal] I²C traits, so it should work on any
//! platform with an `embedded-hal` I²C implementation. It is `no_std` compatible, and doesn't
//! allocate.
//!
//! [embedded-hal]: https://docs.rs/embedded-hal/*/embedded_hal/blocking/i2c/index.html
//!
//! # Example
//! ```no_run
//! use linux_embedded_hal::{Delay, I2cdev};
//! use mlx90614::{Config, Mlx90614};
//!
//! let i2c_bus = I2cdev::new("/dev/i2c-1").expect("/dev/i2c-1 needs to be an I2C controller");
//! // The default address is 0x5A, with packet error checking enabled.
//! let mut sensor = Mlx90614::new(i2c_bus, Delay, Config::default())?;
//! let ambient = sensor.ambient_temperature()?;
//! let object = sensor.object_temperature_1()?;
//! println!("Ambient: {:.2} ℃, object: {:.2} ℃", ambient, object);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//! With the `linux` feature enabled, [`Mlx90614::open`] does the same thing given just the I²C
//! bus number.
//!
//! # Configuration Registers
//! The emissivity and the temperature ranges are stored in the sensor's EEPROM. Changing them
//! takes an erase and a write, each followed by a short wait while the EEPROM settles, so the
//! setters block for a couple dozen milliseconds. The EEPROM has a limited number of write cycles,
//! so avoid setting these values in a loop.
//!
//! # Packet Error Checking
//! SMBus has an optional CRC-8 packet error code (PEC) at the end of each transaction. Many
//! MLX90614s refuse writes without one, so it is enabled by default. It can be switched off in
//! the [`Config`] or at runtime.
//!
//! # Features
//! * `std` (default): use the standard library for floating point math.
//! * `libm`: use [`libm`](https://docs.rs/libm) for floating point math when `std` is not
//!   available. One of `std` or `libm` is required.
//! * `linux`: adds `open` constructors using [`linux-embedded-hal`][linux-embedded-hal].
//! * `defmt`: log through [`defmt`](https://docs.rs/defmt) and implement `defmt::Format` for the
//!   public types.
//!
//! [linux-embedded-hal]: https://docs.rs/linux-embedded-hal

#![no_std]
#![allow(clippy::float_cmp)]

#[cfg(not(any(feature = "std", feature = "libm")))]
compile_error!("Either the 'std' or 'libm' feature must be enabled.");

#[cfg(feature = "std")]
extern crate std;

pub mod calculations;
#[doc(hidden)]
pub mod driver;
#[doc(hidden)]
pub mod error;
mod log;
pub mod register;
pub mod smbus;
#[cfg(test)]
mod test;

#[doc(inline)]
pub use driver::{Config, InitError, Mlx90614, EEPROM_SETTLE_TIME_MS};
#[cfg(feature = "linux")]
#[doc(inline)]
pub use driver::LinuxInitError;
#[doc(inline)]
pub use error::{Error, LibraryError};
pub use register::*;
pub use smbus::SmBus;

/// The error type of the Linux I²C implementation.
#[cfg(feature = "linux")]
pub type LinuxError =
    <linux_embedded_hal::I2cdev as embedded_hal::blocking::i2c::WriteRead>::Error;
