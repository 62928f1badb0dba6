// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
//! SMBus transactions on top of the `embedded-hal` I²C traits.
//!
//! This layer knows nothing about what the registers mean. It turns "read word from command
//! `0x07`" into the right I²C transfer, and appends or checks the packet error code (PEC) when
//! packet error checking is enabled. The PEC is a CRC-8 (polynomial `0x07`) calculated over every
//! byte on the wire, including the address bytes, so it is computed here in software instead of
//! relying on the I²C controller.

use arrayvec::ArrayVec;
use crc::{Crc, CRC_8_SMBUS};
use embedded_hal::blocking::{delay::DelayMs, i2c};

use crate::error::Error;
use crate::log::{debug, warn};

const PEC: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// The largest data payload of any transaction this module performs (a word).
const MAX_DATA_LENGTH: usize = 2;

/// The largest SMBus address that fits in 7 bits.
const MAX_ADDRESS: u8 = 0x7F;

/// Calculate the packet error code for a read transaction.
pub fn read_packet_error_code(address: u8, command: u8, data: &[u8]) -> u8 {
    let mut digest = PEC.digest();
    digest.update(&[address << 1, command, (address << 1) | 1]);
    digest.update(data);
    digest.finalize()
}

/// Calculate the packet error code for a write transaction.
pub fn write_packet_error_code(address: u8, command: u8, data: &[u8]) -> u8 {
    let mut digest = PEC.digest();
    digest.update(&[address << 1, command]);
    digest.update(data);
    digest.finalize()
}

/// An SMBus device at a fixed address.
///
/// `SmBus` owns both the I²C bus and a delay provider. Transaction failures are reported to the
/// caller and never affect later transactions; there is no retrying at this level.
#[derive(Clone, Debug)]
pub struct SmBus<I2C, D> {
    bus: I2C,

    delay: D,

    /// The 7-bit address of the device.
    address: u8,

    packet_error_checking: bool,
}

impl<I2C, D, E> SmBus<I2C, D>
where
    I2C: i2c::Write<Error = E> + i2c::WriteRead<Error = E>,
    D: DelayMs<u16>,
{
    /// Bind an I²C bus to the device at the given 7-bit address.
    ///
    /// Packet error checking starts out enabled.
    pub fn new(bus: I2C, delay: D, address: u8) -> Result<Self, Error<E>> {
        if address > MAX_ADDRESS {
            warn!("{=u8:#x} is not a 7-bit address", address);
            return Err(Error::AddressBind(address));
        }
        Ok(Self {
            bus,
            delay,
            address,
            packet_error_checking: true,
        })
    }

    /// The address of the device on the bus.
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn packet_error_checking(&self) -> bool {
        self.packet_error_checking
    }

    /// Send (and check) a packet error code with every following transaction.
    pub fn enable_packet_error_checking(&mut self) {
        self.packet_error_checking = true;
    }

    pub fn disable_packet_error_checking(&mut self) {
        self.packet_error_checking = false;
    }

    pub(crate) fn set_packet_error_checking(&mut self, enabled: bool) {
        self.packet_error_checking = enabled;
    }

    /// Block for the given number of milliseconds.
    pub fn wait(&mut self, milliseconds: u16) {
        self.delay.delay_ms(milliseconds);
    }

    pub fn read_byte(&mut self, command: u8) -> Result<u8, Error<E>> {
        let mut data = [0u8; 1];
        self.read(command, &mut data)?;
        Ok(data[0])
    }

    pub fn write_byte(&mut self, command: u8, value: u8) -> Result<(), Error<E>> {
        self.write(command, &[value])
    }

    /// Read a word. SMBus sends the low byte first.
    pub fn read_word(&mut self, command: u8) -> Result<u16, Error<E>> {
        let mut data = [0u8; 2];
        self.read(command, &mut data)?;
        Ok(u16::from_le_bytes(data))
    }

    pub fn write_word(&mut self, command: u8, value: u16) -> Result<(), Error<E>> {
        self.write(command, &value.to_le_bytes())
    }

    fn read(&mut self, command: u8, data: &mut [u8]) -> Result<(), Error<E>> {
        let mut buffer = [0u8; MAX_DATA_LENGTH + 1];
        let length = data.len() + self.packet_error_checking as usize;
        self.bus
            .write_read(self.address, &[command], &mut buffer[..length])
            .map_err(Error::I2cWriteRead)?;
        let (received, pec) = buffer[..length].split_at(data.len());
        if self.packet_error_checking {
            let expected = read_packet_error_code(self.address, command, received);
            if pec[0] != expected {
                debug!(
                    "PEC mismatch reading {=u8:#x}: {=u8:#x} != {=u8:#x}",
                    command,
                    pec[0],
                    expected
                );
                return Err(Error::PacketErrorCheck {
                    expected,
                    actual: pec[0],
                });
            }
        }
        data.copy_from_slice(received);
        Ok(())
    }

    fn write(&mut self, command: u8, data: &[u8]) -> Result<(), Error<E>> {
        let mut frame: ArrayVec<u8, { MAX_DATA_LENGTH + 2 }> = ArrayVec::new();
        frame.push(command);
        frame.extend(data.iter().copied());
        if self.packet_error_checking {
            frame.push(write_packet_error_code(self.address, command, data));
        }
        self.bus
            .write(self.address, &frame)
            .map_err(Error::I2cWrite)
    }
}

impl<I2C, D> SmBus<I2C, D> {
    /// Give back the bus and delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.bus, self.delay)
    }
}

#[cfg(feature = "linux")]
impl SmBus<linux_embedded_hal::I2cdev, linux_embedded_hal::Delay> {
    /// Open `/dev/i2c-<bus_number>` and bind it to the device at `address`.
    pub fn open(bus_number: u8, address: u8) -> Result<Self, Error<crate::LinuxError>> {
        let path = std::format!("/dev/i2c-{}", bus_number);
        let bus = linux_embedded_hal::I2cdev::new(&path).map_err(|err| {
            warn!("unable to open I2C bus {=u8}", bus_number);
            Error::BusOpen(err)
        })?;
        Self::new(bus, linux_embedded_hal::Delay, address)
    }
}

#[cfg(test)]
mod test {
    use crate::error::Error;
    use crate::test::*;
    use crate::Register;

    use super::SmBus;

    fn create_bus(address: u8) -> (MockSensorBus, SmBus<MockSensorBus, MockDelay>) {
        let mocked = MockSensorBus::new(address);
        let bus = SmBus::new(mocked.clone(), mocked.delay(), address)
            .expect("Binding a 7-bit address should work");
        (mocked, bus)
    }

    #[test]
    fn datasheet_packet_error_codes() {
        // Reading T_obj1 (0x3AD2) from 0x5A
        assert_eq!(
            super::read_packet_error_code(0x5A, 0x07, &[0xD2, 0x3A]),
            0x30
        );
        // Erasing the emissivity at 0x5A
        assert_eq!(
            super::write_packet_error_code(0x5A, 0x24, &[0x00, 0x00]),
            0x28
        );
    }

    #[test]
    fn address_bind() {
        let mocked = MockSensorBus::new(0x5A);
        let res = SmBus::new(mocked.clone(), mocked.delay(), 0x80);
        assert!(matches!(res, Err(Error::AddressBind(0x80))));
    }

    #[test]
    fn read_word_little_endian() {
        // Non-default address, so the PEC covers a different address byte.
        let (mocked, mut bus) = create_bus(0x3B);
        mocked.set_word(Register::ObjectTemperature1, 0x3AD2);
        assert_eq!(bus.read_word(0x07).unwrap(), 0x3AD2);
        assert_eq!(
            mocked.recent_operations().back(),
            Some(&Operation::Read {
                command: 0x07,
                length: 3
            })
        );
    }

    #[test]
    fn write_word_with_pec() {
        let (mocked, mut bus) = create_bus(0x5A);
        mocked.set_word(Register::Emissivity, 0);
        // The mock rejects writes with a bad PEC
        bus.write_word(0x24, 0xFFFF).unwrap();
        assert_eq!(mocked.word(Register::Emissivity), 0xFFFF);
    }

    #[test]
    fn bad_pec() {
        let (mocked, mut bus) = create_bus(0x5A);
        mocked.set_corrupt_pec(true);
        let res = bus.read_word(Register::AmbientTemperature.command());
        assert!(matches!(res, Err(Error::PacketErrorCheck { .. })));
        assert!(res.unwrap_err().is_transaction_error());
    }

    #[test]
    fn pec_disabled() {
        let (mocked, mut bus) = create_bus(0x5A);
        mocked.set_packet_error_checking(false);
        mocked.set_corrupt_pec(true);
        mocked.set_word(Register::AmbientTemperature, 0x3AF7);
        bus.disable_packet_error_checking();
        assert!(!bus.packet_error_checking());
        assert_eq!(bus.read_word(0x06).unwrap(), 0x3AF7);
        assert_eq!(
            mocked.recent_operations().back(),
            Some(&Operation::Read {
                command: 0x06,
                length: 2
            })
        );
    }

    #[test]
    fn bytes() {
        let (mocked, mut bus) = create_bus(0x5A);
        mocked.set_word(Register::SmbusAddress, 0xBE5A);
        assert_eq!(bus.read_byte(0x2E).unwrap(), 0x5A);
        mocked.set_word(Register::Config, 0);
        bus.write_byte(0x25, 0x74).unwrap();
        assert_eq!(mocked.word(Register::Config), 0x0074);
    }

    #[test]
    fn failures_leave_bus_usable() {
        let (mocked, mut bus) = create_bus(0x5A);
        mocked.set_word(Register::AmbientTemperature, 0x3AF7);
        mocked.set_unresponsive(true);
        assert!(matches!(bus.read_word(0x06), Err(Error::I2cWriteRead(_))));
        assert!(matches!(bus.write_word(0x24, 0), Err(Error::I2cWrite(_))));
        mocked.set_unresponsive(false);
        assert_eq!(bus.read_word(0x06).unwrap(), 0x3AF7);
    }

    #[test]
    fn wait() {
        let (mocked, mut bus) = create_bus(0x5A);
        bus.wait(10);
        assert_eq!(mocked.recent_operations().back(), Some(&Operation::Wait(10)));
    }

    #[test]
    fn release() {
        let (_, bus) = create_bus(0x5A);
        let (mocked, _) = bus.release();
        assert_eq!(mocked.address(), 0x5A);
    }
}
