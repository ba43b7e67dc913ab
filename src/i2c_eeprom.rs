//! 24C08-style I2C EEPROM: 1 KiB behind a single byte word address, with
//! address bits 8 and 9 carried in the device select byte.

use crate::debugln::*;
use crate::protocol::PAGE_SIZE;
use crate::storage::{EepromStorage, StorageError, EEPROM_SIZE};
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::{Write, WriteRead};

/// Device select byte in 8 bit (R/W bit included) notation.
pub const DEVICE_SELECT_BASE: u8 = 0xA0;
pub const WRITE_CYCLE_MS: u8 = 5;
const ERASE_CHUNK: usize = 8;

pub fn device_select(address: u16) -> u8 {
	DEVICE_SELECT_BASE | ((address & 0x0300) >> 7) as u8
}

pub struct I2cEeprom<I2C, D> {
	i2c: I2C,
	delay: D,
}

impl<I2C, D, E> I2cEeprom<I2C, D>
where
	I2C: Write<Error = E> + WriteRead<Error = E>,
	E: core::fmt::Debug,
	D: DelayMs<u8>,
{
	pub fn new(i2c: I2C, delay: D) -> I2cEeprom<I2C, D> {
		I2cEeprom { i2c, delay }
	}

	pub fn release(self) -> (I2C, D) {
		(self.i2c, self.delay)
	}

	fn write_bytes(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError> {
		if data.len() > PAGE_SIZE || address as usize + data.len() > EEPROM_SIZE {
			return Err(StorageError::OutOfRange);
		}
		let mut frame = [0u8; 1 + PAGE_SIZE];
		frame[0] = address as u8;
		frame[1..1 + data.len()].copy_from_slice(data);

		let result = self.i2c.write(device_select(address) >> 1, &frame[..1 + data.len()]);
		// the part ignores the bus until its write cycle is over
		self.delay.delay_ms(WRITE_CYCLE_MS);
		result.map_err(|e| {
			debugln!("eeprom write at {:#05X} failed: {:?}", address, e);
			StorageError::Bus
		})
	}
}

impl<I2C, D, E> EepromStorage for I2cEeprom<I2C, D>
where
	I2C: Write<Error = E> + WriteRead<Error = E>,
	E: core::fmt::Debug,
	D: DelayMs<u8>,
{
	const SIZE: usize = EEPROM_SIZE;

	fn erase_all(&mut self) -> Result<(), StorageError> {
		let blank = [Self::ERASED_VALUE; ERASE_CHUNK];
		for address in (0..EEPROM_SIZE).step_by(ERASE_CHUNK) {
			self.write_bytes(address as u16, &blank)?;
		}
		Ok(())
	}

	fn write_page(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError> {
		self.write_bytes(address, data)
	}

	fn read_page(&mut self, address: u16, data: &mut [u8]) -> Result<(), StorageError> {
		if data.len() > PAGE_SIZE || address as usize + data.len() > EEPROM_SIZE {
			return Err(StorageError::OutOfRange);
		}
		self.i2c
			.write_read(device_select(address) >> 1, &[address as u8], data)
			.map_err(|e| {
				debugln!("eeprom read at {:#05X} failed: {:?}", address, e);
				StorageError::Bus
			})
	}
}
