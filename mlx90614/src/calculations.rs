// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! Conversions between raw register values and physical units.
//!
//! Every conversion here is a fixed linear transform, taken from the datasheet. Encoding
//! functions round to the nearest integer (ties away from zero) and then cast, which saturates at
//! the bounds of the destination type. Beyond the explicit range checks, nothing is clamped; the
//! sensor enforces its own absolute limits when the value is written.

// Rounding is not implemented in core, so we use libm to provide it when std isn't available.
#[cfg_attr(feature = "std", allow(unused_imports))]
use num_traits::Float;

use crate::error::LibraryError;

/// Offset between Kelvins and degrees Celsius.
pub const KELVINS_TO_CELSIUS: f64 = 273.15;

/// The resolution of the temperature registers in RAM, in Kelvins per LSB.
pub const TEMPERATURE_RESOLUTION: f64 = 0.02;

/// The full-scale value for the emissivity register.
const EMISSIVITY_SCALE: f64 = 65535.0;

pub const MIN_EMISSIVITY: f64 = 0.1;

pub const MAX_EMISSIVITY: f64 = 1.0;

/// The object range limits are stored in hundredths of a Kelvin.
const RANGE_LIMIT_SCALE: f64 = 100.0;

/// Offset applied to the ambient range limits before scaling.
const AMBIENT_RANGE_OFFSET: f64 = 38.2;

/// Each LSB of the ambient range bytes is 0.64 ℃.
const AMBIENT_RANGE_SCALE: f64 = 100.0 / 64.0;

/// The minimum width of a temperature range.
pub const MIN_RANGE_SPAN: f64 = 1.0;

/// Convert a RAM temperature register (T<sub>a</sub>, T<sub>obj1</sub>, T<sub>obj2</sub>) to ℃.
pub fn raw_to_celsius(raw: u16) -> f64 {
    f64::from(raw) * TEMPERATURE_RESOLUTION - KELVINS_TO_CELSIUS
}

pub fn raw_to_emissivity(raw: u16) -> f64 {
    f64::from(raw) / EMISSIVITY_SCALE
}

/// Encode an emissivity value for the emissivity register.
///
/// Emissivity must be between 0.1 and 1.0 (inclusive).
pub fn emissivity_to_raw(epsilon: f64) -> Result<u16, LibraryError> {
    // Written so that NaN is rejected as well.
    if !(MIN_EMISSIVITY..=MAX_EMISSIVITY).contains(&epsilon) {
        return Err(LibraryError::InvalidEmissivity(epsilon));
    }
    Ok((EMISSIVITY_SCALE * epsilon).round() as u16)
}

/// Decode one of the object temperature range limit registers to ℃.
pub fn range_limit_to_celsius(raw: u16) -> f64 {
    f64::from(raw) / RANGE_LIMIT_SCALE - KELVINS_TO_CELSIUS
}

/// Encode a temperature (in ℃) for one of the object temperature range limit registers.
pub fn celsius_to_range_limit(temperature: f64) -> u16 {
    ((temperature + KELVINS_TO_CELSIUS) * RANGE_LIMIT_SCALE).round() as u16
}

/// Check that `min` and `max` describe a range at least [`MIN_RANGE_SPAN`] wide.
pub fn check_range(min: f64, max: f64) -> Result<(), LibraryError> {
    // Negated comparison so that NaN fails the check.
    if !(max - min >= MIN_RANGE_SPAN) {
        Err(LibraryError::InvalidRange { min, max })
    } else {
        Ok(())
    }
}

/// Encode an object temperature range as the (minimum, maximum) register values.
pub fn object_range_to_raw(min: f64, max: f64) -> Result<(u16, u16), LibraryError> {
    check_range(min, max)?;
    Ok((celsius_to_range_limit(min), celsius_to_range_limit(max)))
}

fn celsius_to_ambient_byte(temperature: f64) -> u8 {
    ((temperature + AMBIENT_RANGE_OFFSET) * AMBIENT_RANGE_SCALE).round() as u8
}

fn ambient_byte_to_celsius(raw: u8) -> f64 {
    f64::from(raw) / AMBIENT_RANGE_SCALE - AMBIENT_RANGE_OFFSET
}

/// Encode an ambient temperature range into the packed ambient range register.
///
/// The maximum is stored in the high byte, the minimum in the low byte.
pub fn ambient_range_to_raw(min: f64, max: f64) -> Result<u16, LibraryError> {
    check_range(min, max)?;
    let min_byte = celsius_to_ambient_byte(min);
    let max_byte = celsius_to_ambient_byte(max);
    Ok(u16::from_be_bytes([max_byte, min_byte]))
}

/// Decode the packed ambient range register into (minimum, maximum) in ℃.
pub fn raw_to_ambient_range(raw: u16) -> (f64, f64) {
    let [max_byte, min_byte] = raw.to_be_bytes();
    (
        ambient_byte_to_celsius(min_byte),
        ambient_byte_to_celsius(max_byte),
    )
}
