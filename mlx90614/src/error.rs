// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
#[cfg(feature = "std")]
extern crate std;

use core::fmt;

use crate::register::Register;

/// Errors that don't involve I²C.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LibraryError {
    /// The requested emissivity is outside of the range the sensor accepts (0.1 to 1.0).
    InvalidEmissivity(f64),

    /// The requested temperature range is narrower than 1 ℃ (or isn't a range at all).
    InvalidRange { min: f64, max: f64 },

    /// The operation isn't available with the current sensor configuration.
    Unsupported(&'static str),

    /// Only EEPROM registers can be written to.
    NotEeprom(Register),

    /// The sensor reported a different SMBus address than the one it's being accessed at.
    AddressMismatch { expected: u8, actual: u8 },
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::InvalidEmissivity(epsilon) => {
                write!(f, "emissivity {} is not between 0.1 and 1.0", epsilon)
            }
            LibraryError::InvalidRange { min, max } => write!(
                f,
                "temperature range {}..{} ℃ must span at least 1 ℃",
                min, max
            ),
            LibraryError::Unsupported(msg) => write!(f, "{}", msg),
            LibraryError::NotEeprom(register) => {
                write!(f, "{:?} is not an EEPROM register", register)
            }
            LibraryError::AddressMismatch { expected, actual } => write!(
                f,
                "sensor reports address {:#04X}, expected {:#04X}",
                actual, expected
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LibraryError {}

/// Errors from the sensor or the bus it's on, generic over the I²C implementation's error type.
#[derive(Clone, PartialEq)]
pub enum Error<E> {
    /// The I²C bus couldn't be opened.
    BusOpen(E),

    /// The given address can't be used as a 7-bit SMBus address.
    AddressBind(u8),

    /// Errors from a plain I²C write.
    I2cWrite(E),

    /// Errors from a combined I²C write-read.
    I2cWriteRead(E),

    /// The packet error code sent by the sensor didn't match the one calculated for the data.
    PacketErrorCheck { expected: u8, actual: u8 },

    /// Errors originating from within this library.
    LibraryError(LibraryError),
}

impl<E> Error<E> {
    /// Whether this error came from a single bus transaction (as opposed to setting up the bus or
    /// rejecting a value before any bus traffic).
    pub fn is_transaction_error(&self) -> bool {
        matches!(
            self,
            Error::I2cWrite(_) | Error::I2cWriteRead(_) | Error::PacketErrorCheck { .. }
        )
    }
}

// Custom Debug implementation so that the I2C error type is only required to be Debug when this
// is used.
impl<E> fmt::Debug for Error<E>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BusOpen(err) => f.debug_tuple("Error::BusOpen").field(err).finish(),
            Error::AddressBind(address) => {
                f.debug_tuple("Error::AddressBind").field(address).finish()
            }
            Error::I2cWrite(err) => f.debug_tuple("Error::I2cWrite").field(err).finish(),
            Error::I2cWriteRead(err) => f.debug_tuple("Error::I2cWriteRead").field(err).finish(),
            Error::PacketErrorCheck { expected, actual } => f
                .debug_struct("Error::PacketErrorCheck")
                .field("expected", expected)
                .field("actual", actual)
                .finish(),
            Error::LibraryError(err) => f.debug_tuple("Error::LibraryError").field(err).finish(),
        }
    }
}

impl<E> fmt::Display for Error<E>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BusOpen(err) => write!(f, "Unable to open I2C bus: {:?}", err),
            Error::AddressBind(address) => {
                write!(f, "{:#04X} is not a usable SMBus address", address)
            }
            Error::I2cWrite(err) => write!(f, "I2C Write Error: {:?}", err),
            Error::I2cWriteRead(err) => write!(f, "I2C Write-Read Error: {:?}", err),
            Error::PacketErrorCheck { expected, actual } => write!(
                f,
                "PEC mismatch: calculated {:#04X}, received {:#04X}",
                expected, actual
            ),
            Error::LibraryError(err) => write!(f, "Library Error: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl<E> std::error::Error for Error<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::BusOpen(err) | Error::I2cWrite(err) | Error::I2cWriteRead(err) => Some(err),
            Error::LibraryError(lib_err) => Some(lib_err),
            Error::AddressBind(_) | Error::PacketErrorCheck { .. } => None,
        }
    }
}

impl<E> From<LibraryError> for Error<E> {
    fn from(lib_err: LibraryError) -> Self {
        Self::LibraryError(lib_err)
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for Error<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::BusOpen(_) => defmt::write!(f, "Error::BusOpen"),
            Error::AddressBind(address) => {
                defmt::write!(f, "Error::AddressBind({=u8:#x})", address)
            }
            Error::I2cWrite(_) => defmt::write!(f, "Error::I2cWrite"),
            Error::I2cWriteRead(_) => defmt::write!(f, "Error::I2cWriteRead"),
            Error::PacketErrorCheck { expected, actual } => defmt::write!(
                f,
                "Error::PacketErrorCheck {{ expected: {=u8:#x}, actual: {=u8:#x} }}",
                expected,
                actual
            ),
            Error::LibraryError(err) => defmt::write!(f, "Error::LibraryError({})", err),
        }
    }
}
