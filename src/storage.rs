use crate::protocol::PAGE_SIZE;

pub const EEPROM_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
	OutOfRange,
	/// The device did not acknowledge or the transfer failed.
	Bus,
}

/// Byte addressable non-volatile memory, written and read in pages.
pub trait EepromStorage {
	const SIZE: usize;
	const ERASED_VALUE: u8 = 0xFF;

	fn erase_all(&mut self) -> Result<(), StorageError>;
	fn write_page(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError>;
	fn read_page(&mut self, address: u16, data: &mut [u8]) -> Result<(), StorageError>;
}

/// EEPROM contents kept in RAM.
pub struct MemoryEeprom<const N: usize> {
	data: [u8; N],
}

impl<const N: usize> MemoryEeprom<N> {
	pub fn new() -> MemoryEeprom<N> {
		MemoryEeprom { data: [Self::ERASED_VALUE; N] }
	}

	pub fn contents(&self) -> &[u8; N] {
		&self.data
	}

	fn range(address: u16, len: usize) -> Result<core::ops::Range<usize>, StorageError> {
		let start = address as usize;
		if len > PAGE_SIZE || start + len > N {
			return Err(StorageError::OutOfRange);
		}
		Ok(start..start + len)
	}
}

impl<const N: usize> Default for MemoryEeprom<N> {
	fn default() -> MemoryEeprom<N> {
		MemoryEeprom::new()
	}
}

impl<const N: usize> EepromStorage for MemoryEeprom<N> {
	const SIZE: usize = N;

	fn erase_all(&mut self) -> Result<(), StorageError> {
		self.data = [Self::ERASED_VALUE; N];
		Ok(())
	}

	fn write_page(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError> {
		let range = Self::range(address, data.len())?;
		self.data[range].copy_from_slice(data);
		Ok(())
	}

	fn read_page(&mut self, address: u16, data: &mut [u8]) -> Result<(), StorageError> {
		let range = Self::range(address, data.len())?;
		data.copy_from_slice(&self.data[range]);
		Ok(())
	}
}
