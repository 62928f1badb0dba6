// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! The MLX90614 register map.
//!
//! The sensor exposes two banks of 16-bit words over SMBus. The RAM bank holds the measurement
//! results and is read-only. The EEPROM bank holds the configuration, and is accessed with the
//! EEPROM address ORed with `0x20` as the SMBus command (so EEPROM address `0x04`, the
//! emissivity, is command `0x24`). The values in this module are the SMBus commands.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The default SMBus address for an MLX90614.
pub const DEFAULT_ADDRESS: u8 = 0x5A;

/// The command bit used to select the EEPROM bank.
const EEPROM_ACCESS: u8 = 0x20;

/// Registers (and the matching SMBus commands) on the MLX90614.
#[derive(
    Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// Raw IR data from the first channel.
    RawIr1 = 0x04,

    /// Raw IR data from the second channel (only meaningful on dual zone sensors).
    RawIr2 = 0x05,

    /// Ambient (die) temperature, T<sub>a</sub>.
    AmbientTemperature = 0x06,

    /// Object temperature from the first zone, T<sub>obj1</sub>.
    ObjectTemperature1 = 0x07,

    /// Object temperature from the second zone, T<sub>obj2</sub>.
    ///
    /// On single zone sensors this value is less accurate than the first zone.
    ObjectTemperature2 = 0x08,

    /// Upper limit of the object temperature range (T<sub>o</sub>max).
    ObjectTemperatureMax = 0x20,

    /// Lower limit of the object temperature range (T<sub>o</sub>min).
    ObjectTemperatureMin = 0x21,

    /// PWM/power management control.
    PowerManagementControl = 0x22,

    /// Ambient temperature range, packed as `max << 8 | min`.
    AmbientTemperatureRange = 0x23,

    /// Emissivity, scaled to the full `u16` range.
    Emissivity = 0x24,

    /// Configuration register 1.
    Config = 0x25,

    /// The SMBus address, stored in the low byte.
    SmbusAddress = 0x2E,

    Id1 = 0x3C,

    Id2 = 0x3D,

    Id3 = 0x3E,

    Id4 = 0x3F,
}

impl Register {
    /// The ID registers, most significant word first.
    pub const ID: [Register; 4] = [Register::Id1, Register::Id2, Register::Id3, Register::Id4];

    /// The SMBus command byte used to access this register.
    pub fn command(self) -> u8 {
        self.into()
    }

    /// Whether this register is backed by EEPROM (as opposed to RAM).
    pub fn is_eeprom(self) -> bool {
        self.command() & EEPROM_ACCESS != 0
    }
}

/// The number of object temperature zones a sensor has.
///
/// Single zone models (MLX90614xAx) still respond on the second zone register, but the value isn't
/// usable as an independent measurement.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Zones {
    Single,
    #[default]
    Dual,
}
