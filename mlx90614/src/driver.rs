// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
#[cfg(feature = "std")]
extern crate std;

use core::fmt;

use embedded_hal::blocking::{delay::DelayMs, i2c};

use crate::calculations::*;
use crate::error::{Error, LibraryError};
use crate::log::{debug, warn};
use crate::register::{Register, Zones, DEFAULT_ADDRESS};
use crate::smbus::SmBus;

/// How long to wait after each EEPROM write, in milliseconds.
///
/// The datasheet gives 5ms for both the erase and the write cycles; this leaves some margin. Some
/// other MLX90614 drivers wait a full 0.5s after each step. Use
/// [`Config::with_settle_time_ms`] to match that if needed.
pub const EEPROM_SETTLE_TIME_MS: u16 = 10;

/// Sensor configuration.
///
/// The defaults match a dual zone sensor at the factory default address with packet error
/// checking enabled.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// The SMBus address of the sensor. 0x00 is answered by every MLX90614 on the bus.
    pub address: u8,

    /// How many object temperature zones the sensor has.
    pub zones: Zones,

    /// Whether to send and check packet error codes.
    pub packet_error_checking: bool,

    /// Check that the sensor reports the address it's being accessed at when created.
    pub verify_address: bool,

    /// The time to wait after erasing or writing an EEPROM cell.
    pub settle_time_ms: u16,
}

impl Config {
    pub fn with_address(self, address: u8) -> Self {
        Self { address, ..self }
    }

    pub fn with_zones(self, zones: Zones) -> Self {
        Self { zones, ..self }
    }

    pub fn with_packet_error_checking(self, packet_error_checking: bool) -> Self {
        Self {
            packet_error_checking,
            ..self
        }
    }

    pub fn with_verify_address(self, verify_address: bool) -> Self {
        Self {
            verify_address,
            ..self
        }
    }

    pub fn with_settle_time_ms(self, settle_time_ms: u16) -> Self {
        Self {
            settle_time_ms,
            ..self
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            zones: Zones::default(),
            packet_error_checking: true,
            verify_address: true,
            settle_time_ms: EEPROM_SETTLE_TIME_MS,
        }
    }
}

/// Driver for the MLX90614 infrared thermometer.
///
/// Each method is an independent request to the sensor; nothing is cached. All temperatures are
/// in degrees Celsius.
///
/// Writes to the configuration (EEPROM) registers follow the sequence required by the sensor:
/// the cell is erased by writing 0, then the new value is written, with a
/// [settle time][Config::settle_time_ms] after each step.
#[derive(Clone, Debug)]
pub struct Mlx90614<I2C, D> {
    bus: SmBus<I2C, D>,

    config: Config,

    /// Set if creating the driver failed. Once set it stays set.
    errored: bool,
}

/// The error returned when a [`Mlx90614`] can't be created.
///
/// If the bus was successfully bound, the driver is returned as well, in an errored state. It can
/// still be used, but the results should not be trusted.
pub struct InitError<I2C, D, E> {
    cause: Error<E>,

    sensor: Option<Mlx90614<I2C, D>>,
}

impl<I2C, D, E> InitError<I2C, D, E> {
    /// Why the driver couldn't be created.
    pub fn cause(&self) -> &Error<E> {
        &self.cause
    }

    /// Take the (errored) driver.
    ///
    /// This is `None` when the bus couldn't be opened or the address couldn't be bound.
    pub fn into_sensor(self) -> Option<Mlx90614<I2C, D>> {
        self.sensor
    }

    /// Split into the cause and the errored driver.
    pub fn into_parts(self) -> (Error<E>, Option<Mlx90614<I2C, D>>) {
        (self.cause, self.sensor)
    }
}

impl<I2C, D, E> From<Error<E>> for InitError<I2C, D, E> {
    fn from(cause: Error<E>) -> Self {
        Self {
            cause,
            sensor: None,
        }
    }
}

// Manual Debug so that the bus and delay types don't need to implement it.
impl<I2C, D, E> fmt::Debug for InitError<I2C, D, E>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitError")
            .field("cause", &self.cause)
            .field("has_sensor", &self.sensor.is_some())
            .finish()
    }
}

impl<I2C, D, E> fmt::Display for InitError<I2C, D, E>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MLX90614 did not initialize: {}", self.cause)
    }
}

#[cfg(feature = "std")]
impl<I2C, D, E> std::error::Error for InitError<I2C, D, E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl<I2C, D, E> Mlx90614<I2C, D>
where
    I2C: i2c::Write<Error = E> + i2c::WriteRead<Error = E>,
    D: DelayMs<u16>,
{
    /// Create a driver for the sensor described by `config`.
    ///
    /// The bus is bound to the configured address and packet error checking is set up. Unless
    /// disabled in the configuration, the sensor's SMBus address register is then read back to
    /// make sure the sensor is present and answering at that address.
    pub fn new(bus: I2C, delay: D, config: Config) -> Result<Self, InitError<I2C, D, E>> {
        let bus = SmBus::new(bus, delay, config.address)?;
        Self::with_smbus(bus, config)
    }

    fn with_smbus(mut bus: SmBus<I2C, D>, config: Config) -> Result<Self, InitError<I2C, D, E>> {
        bus.set_packet_error_checking(config.packet_error_checking);
        let mut sensor = Self {
            bus,
            config,
            errored: false,
        };
        match sensor.verify() {
            Ok(()) => Ok(sensor),
            Err(cause) => {
                warn!("MLX90614 at {=u8:#x} did not initialize", config.address);
                sensor.errored = true;
                Err(InitError {
                    cause,
                    sensor: Some(sensor),
                })
            }
        }
    }

    fn verify(&mut self) -> Result<(), Error<E>> {
        if !self.config.verify_address {
            return Ok(());
        }
        let actual = self.smbus_address()?;
        let expected = self.config.address;
        // Every sensor answers on 0x00, whatever its configured address is.
        if expected != 0 && actual != expected {
            return Err(LibraryError::AddressMismatch { expected, actual }.into());
        }
        Ok(())
    }

    /// Whether creating this driver failed.
    ///
    /// Only drivers taken out of an [`InitError`] will return `true`.
    pub fn error(&self) -> bool {
        self.errored
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Block for the given number of milliseconds.
    pub fn wait(&mut self, milliseconds: u16) {
        self.bus.wait(milliseconds);
    }

    /// Read the raw value of any register.
    pub fn read_register(&mut self, register: Register) -> Result<u16, Error<E>> {
        self.bus.read_word(register.command())
    }

    /// Write a raw value to an EEPROM register.
    ///
    /// The cell is erased first, and the write is only attempted if the erase succeeded. Each step
    /// is followed by the configured settle time. RAM registers are rejected without touching the
    /// bus.
    pub fn write_eeprom(&mut self, register: Register, value: u16) -> Result<(), Error<E>> {
        if !register.is_eeprom() {
            return Err(LibraryError::NotEeprom(register).into());
        }
        let command = register.command();
        let settle_time = self.config.settle_time_ms;
        debug!("writing {=u16:#x} to {}", value, register);
        if let Err(err) = self.bus.write_word(command, 0) {
            warn!("erasing {} failed", register);
            return Err(err);
        }
        self.bus.wait(settle_time);
        if let Err(err) = self.bus.write_word(command, value) {
            warn!("writing {} failed", register);
            return Err(err);
        }
        self.bus.wait(settle_time);
        Ok(())
    }

    fn temperature(&mut self, register: Register) -> Result<f64, Error<E>> {
        Ok(raw_to_celsius(self.read_register(register)?))
    }

    fn check_dual_zone(&self) -> Result<(), Error<E>> {
        match self.config.zones {
            Zones::Dual => Ok(()),
            Zones::Single => Err(LibraryError::Unsupported(
                "single zone sensors only have one object zone",
            )
            .into()),
        }
    }

    /// The temperature of the sensor die.
    pub fn ambient_temperature(&mut self) -> Result<f64, Error<E>> {
        self.temperature(Register::AmbientTemperature)
    }

    /// The object temperature from the first zone.
    ///
    /// On single zone sensors this is the only object temperature.
    pub fn object_temperature_1(&mut self) -> Result<f64, Error<E>> {
        self.temperature(Register::ObjectTemperature1)
    }

    /// The object temperature from the second zone.
    ///
    /// Only available when the sensor is configured as [dual zone][Zones::Dual].
    pub fn object_temperature_2(&mut self) -> Result<f64, Error<E>> {
        self.check_dual_zone()?;
        self.temperature(Register::ObjectTemperature2)
    }

    /// Raw IR data from the first channel.
    pub fn raw_ir_1(&mut self) -> Result<u16, Error<E>> {
        self.read_register(Register::RawIr1)
    }

    pub fn raw_ir_2(&mut self) -> Result<u16, Error<E>> {
        self.check_dual_zone()?;
        self.read_register(Register::RawIr2)
    }

    /// The emissivity the sensor is using to compensate object temperatures.
    ///
    /// This is a value between 0.1 and 1.0 (a perfect black body).
    pub fn object_emissivity_coefficient(&mut self) -> Result<f64, Error<E>> {
        Ok(raw_to_emissivity(self.read_register(Register::Emissivity)?))
    }

    /// Set the emissivity of the object being measured.
    ///
    /// The emissivity depends on the material of the object, and must be between 0.1 and 1.0.
    /// Values outside of that range are rejected without writing anything.
    pub fn set_object_emissivity_coefficient(&mut self, epsilon: f64) -> Result<(), Error<E>> {
        let raw = emissivity_to_raw(epsilon).map_err(|err| {
            debug!("rejecting emissivity {=f64}", epsilon);
            err
        })?;
        self.write_eeprom(Register::Emissivity, raw)
    }

    /// Set the object temperature range.
    ///
    /// The range has to be at least 1 ℃ wide. The sensor itself limits the range to -70 ℃ through
    /// 380 ℃. The minimum is written first, and if that fails the maximum isn't written.
    pub fn set_object_temperature_min_max(
        &mut self,
        min: f64,
        max: f64,
    ) -> Result<(), Error<E>> {
        let (min_raw, max_raw) = object_range_to_raw(min, max)?;
        self.write_eeprom(Register::ObjectTemperatureMin, min_raw)?;
        self.write_eeprom(Register::ObjectTemperatureMax, max_raw)
    }

    pub fn object_temperature_min(&mut self) -> Result<f64, Error<E>> {
        Ok(range_limit_to_celsius(
            self.read_register(Register::ObjectTemperatureMin)?,
        ))
    }

    pub fn object_temperature_max(&mut self) -> Result<f64, Error<E>> {
        Ok(range_limit_to_celsius(
            self.read_register(Register::ObjectTemperatureMax)?,
        ))
    }

    /// Set the ambient temperature range.
    ///
    /// The range has to be at least 1 ℃ wide. The sensor itself limits the range to -40 ℃ through
    /// 125 ℃.
    pub fn set_ambient_temperature_min_max(
        &mut self,
        min: f64,
        max: f64,
    ) -> Result<(), Error<E>> {
        let raw = ambient_range_to_raw(min, max)?;
        self.write_eeprom(Register::AmbientTemperatureRange, raw)
    }

    /// The ambient temperature range as (minimum, maximum).
    pub fn ambient_temperature_min_max(&mut self) -> Result<(f64, f64), Error<E>> {
        Ok(raw_to_ambient_range(
            self.read_register(Register::AmbientTemperatureRange)?,
        ))
    }

    /// Whether packet error codes are being sent and checked.
    pub fn packet_error_checking(&self) -> bool {
        self.bus.packet_error_checking()
    }

    /// Enable SMBus packet error checking (PEC).
    ///
    /// Most MLX90614s need PEC enabled to accept writes. The change is confirmed by reading the
    /// SMBus address register; if that fails, the previous setting is restored.
    pub fn enable_packet_error_checking(&mut self) -> Result<(), Error<E>> {
        self.switch_packet_error_checking(true)
    }

    /// Disable SMBus packet error checking (PEC).
    ///
    /// See [`enable_packet_error_checking`][Mlx90614::enable_packet_error_checking].
    pub fn disable_packet_error_checking(&mut self) -> Result<(), Error<E>> {
        self.switch_packet_error_checking(false)
    }

    fn switch_packet_error_checking(&mut self, enabled: bool) -> Result<(), Error<E>> {
        let previous = self.bus.packet_error_checking();
        self.bus.set_packet_error_checking(enabled);
        if let Err(err) = self.read_register(Register::SmbusAddress) {
            warn!("unable to switch PEC to {=bool}", enabled);
            self.bus.set_packet_error_checking(previous);
            return Err(err);
        }
        Ok(())
    }

    /// The raw power management (PWM control) register.
    pub fn power_management_control(&mut self) -> Result<u16, Error<E>> {
        self.read_register(Register::PowerManagementControl)
    }

    /// The raw configuration register.
    pub fn config_register(&mut self) -> Result<u16, Error<E>> {
        self.read_register(Register::Config)
    }

    /// The SMBus address stored in the sensor's EEPROM.
    pub fn smbus_address(&mut self) -> Result<u8, Error<E>> {
        let raw = self.read_register(Register::SmbusAddress)?;
        Ok((raw & 0x007F) as u8)
    }

    /// The factory-programmed ID number.
    pub fn id(&mut self) -> Result<u64, Error<E>> {
        let mut id = 0u64;
        for register in Register::ID.iter() {
            id = (id << u16::BITS) | u64::from(self.read_register(*register)?);
        }
        Ok(id)
    }
}

impl<I2C, D> Mlx90614<I2C, D> {
    /// Destroy the driver, giving back the bus and delay provider.
    pub fn release(self) -> (I2C, D) {
        self.bus.release()
    }
}

/// The [`InitError`] returned by [`Mlx90614::open`].
#[cfg(feature = "linux")]
pub type LinuxInitError =
    InitError<linux_embedded_hal::I2cdev, linux_embedded_hal::Delay, crate::LinuxError>;

#[cfg(feature = "linux")]
impl Mlx90614<linux_embedded_hal::I2cdev, linux_embedded_hal::Delay> {
    /// Create a driver for a sensor on `/dev/i2c-<bus_number>`.
    ///
    /// If the bus can't be opened the error has no driver in it.
    pub fn open(bus_number: u8, config: Config) -> Result<Self, LinuxInitError> {
        let bus = SmBus::open(bus_number, config.address)?;
        Self::with_smbus(bus, config)
    }
}
