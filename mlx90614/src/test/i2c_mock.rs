// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross
extern crate alloc;

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use core::cell::{Cell, Ref, RefCell};

use embedded_hal::blocking::{delay::DelayMs, i2c};

use crate::register::{Register, DEFAULT_ADDRESS};
use crate::smbus::{read_packet_error_code, write_packet_error_code};

/// The commands cover 0x00 through 0x3F.
const NUM_COMMANDS: usize = 0x40;

const RECENT_OPERATIONS_QUEUE_LENGTH: usize = 32;

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) enum MockError {
    /// An unknown I2C address was given.
    UnknownI2cAddress(u8),

    /// The given command doesn't map to a register.
    UnknownCommand(u8),

    /// The given register can't be written to.
    IllegalWriteAddress(u8),

    /// EEPROM cells have to be erased (written to 0) before a new value can be written.
    NotErased(u8),

    /// The packet error code on a write was wrong.
    PacketErrorCheck { expected: u8, actual: u8 },

    /// The transaction has the wrong shape (wrong number of bytes).
    IllegalOperation,

    /// Injected failure; the sensor did not acknowledge.
    NoAcknowledge,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Operation {
    Write { command: u8, value: u16 },
    Read { command: u8, length: usize },
    Wait(u16),
}

/// A simulated MLX90614 on an SMBus.
///
/// Clones share their state, so a test can keep a clone around to inspect (or break) the bus
/// after handing another clone to the driver.
#[derive(Clone, Debug)]
pub(crate) struct MockSensorBus {
    i2c_address: u8,
    words: Rc<RefCell<[u16; NUM_COMMANDS]>>,
    packet_error_checking: Rc<Cell<bool>>,
    corrupt_pec: Rc<Cell<bool>>,
    unresponsive: Rc<Cell<bool>>,
    /// Fail the write this many writes from now (0 is the next write).
    fail_write_in: Rc<Cell<Option<usize>>>,
    recent_operations: Rc<RefCell<VecDeque<Operation>>>,
}

/// A delay that records each wait onto the operation log of the bus it came from.
#[derive(Clone, Debug)]
pub(crate) struct MockDelay {
    recent_operations: Rc<RefCell<VecDeque<Operation>>>,
}

impl MockSensorBus {
    /// A sensor with plausible register contents at the given address.
    pub(crate) fn new(i2c_address: u8) -> Self {
        let mut words = [0u16; NUM_COMMANDS];
        // 25 ℃ ambient, 30 ℃ and 36.5 ℃ objects
        words[Register::AmbientTemperature.command() as usize] = 14908;
        words[Register::ObjectTemperature1.command() as usize] = 15158;
        words[Register::ObjectTemperature2.command() as usize] = 15483;
        // Factory defaults: -70 ℃ to 380 ℃, emissivity 1.0
        words[Register::ObjectTemperatureMax.command() as usize] = 0xFF23;
        words[Register::ObjectTemperatureMin.command() as usize] = 0x4F5B;
        words[Register::PowerManagementControl.command() as usize] = 0x0201;
        words[Register::AmbientTemperatureRange.command() as usize] = 0xF71C;
        words[Register::Emissivity.command() as usize] = 0xFFFF;
        words[Register::Config.command() as usize] = 0x9FB4;
        words[Register::SmbusAddress.command() as usize] = 0xBE00 | u16::from(i2c_address);
        words[Register::Id1.command() as usize] = 0x1234;
        words[Register::Id2.command() as usize] = 0x5678;
        words[Register::Id3.command() as usize] = 0x9ABC;
        words[Register::Id4.command() as usize] = 0xDEF0;
        Self {
            i2c_address,
            words: Rc::new(RefCell::new(words)),
            packet_error_checking: Rc::new(Cell::new(true)),
            corrupt_pec: Rc::new(Cell::new(false)),
            unresponsive: Rc::new(Cell::new(false)),
            fail_write_in: Rc::new(Cell::new(None)),
            recent_operations: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    pub(crate) fn address(&self) -> u8 {
        self.i2c_address
    }

    pub(crate) fn delay(&self) -> MockDelay {
        MockDelay {
            recent_operations: Rc::clone(&self.recent_operations),
        }
    }

    pub(crate) fn word(&self, register: Register) -> u16 {
        self.words.borrow()[register.command() as usize]
    }

    pub(crate) fn set_word(&self, register: Register, value: u16) {
        self.words.borrow_mut()[register.command() as usize] = value;
    }

    /// Whether the controller is expected to send (and receive) a PEC byte.
    pub(crate) fn set_packet_error_checking(&self, enabled: bool) {
        self.packet_error_checking.set(enabled);
    }

    /// Send a wrong PEC byte on every read.
    pub(crate) fn set_corrupt_pec(&self, corrupt: bool) {
        self.corrupt_pec.set(corrupt);
    }

    /// Fail every transaction.
    pub(crate) fn set_unresponsive(&self, unresponsive: bool) {
        self.unresponsive.set(unresponsive);
    }

    /// Fail the `count`-th write from now, 0 being the very next write.
    pub(crate) fn fail_write_in(&self, count: usize) {
        self.fail_write_in.set(Some(count));
    }

    pub(crate) fn recent_operations(&self) -> Ref<'_, VecDeque<Operation>> {
        self.recent_operations.borrow()
    }

    pub(crate) fn clear_recent_operations(&self) {
        self.recent_operations.borrow_mut().clear()
    }

    /// Just the writes from the recent operations, oldest first.
    pub(crate) fn recent_writes(&self) -> VecDeque<(u8, u16)> {
        self.recent_operations
            .borrow()
            .iter()
            .filter_map(|op| match op {
                Operation::Write { command, value } => Some((*command, *value)),
                _ => None,
            })
            .collect()
    }

    fn check_address(&self, i2c_address: u8) -> Result<(), MockError> {
        if self.unresponsive.get() {
            Err(MockError::NoAcknowledge)
        } else if i2c_address != self.i2c_address {
            Err(MockError::UnknownI2cAddress(i2c_address))
        } else {
            Ok(())
        }
    }

    fn register(command: u8) -> Result<Register, MockError> {
        Register::try_from(command).map_err(|_| MockError::UnknownCommand(command))
    }

    fn set(&self, command: u8, data: &[u8]) -> Result<u16, MockError> {
        let register = Self::register(command)?;
        if !register.is_eeprom() {
            return Err(MockError::IllegalWriteAddress(command));
        }
        let mut words = self.words.borrow_mut();
        let existing = words[command as usize];
        let new_word = match data {
            [low] => (existing & 0xFF00) | u16::from(*low),
            [low, high] => u16::from_le_bytes([*low, *high]),
            _ => return Err(MockError::IllegalOperation),
        };
        if new_word != 0 && existing != 0 {
            return Err(MockError::NotErased(command));
        }
        words[command as usize] = new_word;
        Ok(new_word)
    }

    fn add_operation(&self, operation: Operation) {
        add_operation(&self.recent_operations, operation);
    }
}

fn add_operation(queue: &RefCell<VecDeque<Operation>>, operation: Operation) {
    let mut recent_ops = queue.borrow_mut();
    recent_ops.push_back(operation);
    while recent_ops.len() > RECENT_OPERATIONS_QUEUE_LENGTH {
        recent_ops.pop_front();
    }
}

impl Default for MockSensorBus {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

impl i2c::Write for MockSensorBus {
    type Error = MockError;

    fn write(&mut self, i2c_address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.check_address(i2c_address)?;
        if let Some(remaining) = self.fail_write_in.get() {
            if remaining == 0 {
                self.fail_write_in.set(None);
                return Err(MockError::NoAcknowledge);
            }
            self.fail_write_in.set(Some(remaining - 1));
        }
        let pec_length = self.packet_error_checking.get() as usize;
        if bytes.len() < 2 + pec_length {
            return Err(MockError::IllegalOperation);
        }
        let (command, rest) = (bytes[0], &bytes[1..]);
        let (data, pec) = rest.split_at(rest.len() - pec_length);
        if let Some(actual) = pec.first().copied() {
            let expected = write_packet_error_code(i2c_address, command, data);
            if actual != expected {
                return Err(MockError::PacketErrorCheck { expected, actual });
            }
        }
        let value = self.set(command, data)?;
        self.add_operation(Operation::Write { command, value });
        Ok(())
    }
}

impl i2c::WriteRead for MockSensorBus {
    type Error = MockError;

    fn write_read(
        &mut self,
        i2c_address: u8,
        write_buffer: &[u8],
        out_buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.check_address(i2c_address)?;
        // Write-reads should only be writing the command
        let command = match write_buffer {
            [command] => *command,
            _ => return Err(MockError::IllegalOperation),
        };
        let pec_length = self.packet_error_checking.get() as usize;
        if out_buffer.len() <= pec_length || out_buffer.len() > 2 + pec_length {
            return Err(MockError::IllegalOperation);
        }
        Self::register(command)?;
        self.add_operation(Operation::Read {
            command,
            length: out_buffer.len(),
        });
        let word = self.words.borrow()[command as usize].to_le_bytes();
        let (data, pec) = out_buffer.split_at_mut(out_buffer.len() - pec_length);
        data.copy_from_slice(&word[..data.len()]);
        if let Some(pec) = pec.first_mut() {
            *pec = read_packet_error_code(i2c_address, command, data);
            if self.corrupt_pec.get() {
                *pec ^= 0xFF;
            }
        }
        Ok(())
    }
}

impl DelayMs<u16> for MockDelay {
    fn delay_ms(&mut self, ms: u16) {
        add_operation(&self.recent_operations, Operation::Wait(ms));
    }
}
