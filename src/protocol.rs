//! Wire format of the EEPROM SysEx commands and their replies.
//!
//! Every request and reply is a complete SysEx message:
//! `F0 <manufacturer id> <command id> <parameters...> F7`. MIDI data bytes
//! only carry 7 bits, so EEPROM contents travel as nibble pairs.

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

/// "Non-commercial / educational" manufacturer id.
pub const MANUFACTURER_ID: u8 = 0x7D;

pub const CMD_DUMP_EEPROM: u8 = 0x01;
pub const CMD_ERASE_EEPROM: u8 = 0x02;
pub const CMD_WRITE_EEPROM: u8 = 0x03;

pub const RSP_DUMP_EEPROM: u8 = 0x11;
pub const RSP_ERASE_EEPROM: u8 = 0x12;
pub const RSP_WRITE_EEPROM: u8 = 0x13;
pub const RSP_ERROR: u8 = 0x1F;

/// Must follow the erase command id, otherwise the erase is ignored.
pub const ERASE_MAGIC: [u8; 2] = [0x42, 0x24];

pub const PAGE_SIZE: usize = 16;
pub const NIBBLES_PER_PAGE: usize = 2 * PAGE_SIZE;

/// Page dump: start, id, command, page, 32 nibbles, end.
pub const MAX_MESSAGE_LENGTH: usize = 4 + NIBBLES_PER_PAGE + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
	pub manufacturer_id: u8,
	/// Send `RSP_ERROR` when a write or erase fails instead of staying silent.
	pub error_replies: bool,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			manufacturer_id: MANUFACTURER_ID,
			error_replies: true,
		}
	}
}

pub fn page_address(page: u8) -> u16 {
	page as u16 * PAGE_SIZE as u16
}

pub fn split_nibbles(byte: u8) -> [u8; 2] {
	[byte >> 4, byte & 0x0F]
}

pub fn join_nibbles(high: u8, low: u8) -> u8 {
	high << 4 | low
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
	/// Not enclosed in `F0 ... F7`.
	Framing,
	ForeignManufacturer(u8),
	UnknownCommand(u8),
	/// Fewer parameter bytes than the command needs.
	Truncated,
	BadEraseMagic([u8; 2]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
	DumpPage { page: u8 },
	EraseAll,
	WritePage { page: u8, data: [u8; PAGE_SIZE] },
}

impl Command {
	pub fn parse(message: &[u8], manufacturer_id: u8) -> Result<Command, ParseError> {
		let body = match message {
			[SYSEX_START, body @ .., SYSEX_END] => body,
			_ => return Err(ParseError::Framing),
		};

		let (command_id, params) = match body {
			[id, command_id, params @ ..] if *id == manufacturer_id => (*command_id, params),
			[id, ..] if *id != manufacturer_id => return Err(ParseError::ForeignManufacturer(*id)),
			_ => return Err(ParseError::Truncated),
		};

		match command_id {
			CMD_DUMP_EEPROM => match params {
				[page, ..] => Ok(Command::DumpPage { page: *page }),
				[] => Err(ParseError::Truncated),
			},
			CMD_ERASE_EEPROM => match params {
				[a, b, ..] if [*a, *b] == ERASE_MAGIC => Ok(Command::EraseAll),
				[a, b, ..] => Err(ParseError::BadEraseMagic([*a, *b])),
				_ => Err(ParseError::Truncated),
			},
			CMD_WRITE_EEPROM => {
				if params.len() < 1 + NIBBLES_PER_PAGE {
					return Err(ParseError::Truncated);
				}
				let mut data = [0; PAGE_SIZE];
				for (byte, pair) in data.iter_mut().zip(params[1..].chunks_exact(2)) {
					*byte = join_nibbles(pair[0], pair[1]);
				}
				Ok(Command::WritePage { page: params[0], data })
			}
			other => Err(ParseError::UnknownCommand(other)),
		}
	}

	pub fn id(&self) -> u8 {
		match self {
			Command::DumpPage { .. } => CMD_DUMP_EEPROM,
			Command::EraseAll => CMD_ERASE_EEPROM,
			Command::WritePage { .. } => CMD_WRITE_EEPROM,
		}
	}

	/// Builds the request message a host sends for this command.
	pub fn serialize(&self, manufacturer_id: u8, buffer: &mut [u8; MAX_MESSAGE_LENGTH]) -> usize {
		buffer[0] = SYSEX_START;
		buffer[1] = manufacturer_id;
		buffer[2] = self.id();
		let len = match self {
			Command::DumpPage { page } => {
				buffer[3] = *page;
				4
			}
			Command::EraseAll => {
				buffer[3..5].copy_from_slice(&ERASE_MAGIC);
				5
			}
			Command::WritePage { page, data } => {
				buffer[3] = *page;
				write_nibbles(data, &mut buffer[4..4 + NIBBLES_PER_PAGE]);
				4 + NIBBLES_PER_PAGE
			}
		};
		buffer[len] = SYSEX_END;
		len + 1
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
	PageDump { page: u8, data: [u8; PAGE_SIZE] },
	Erased,
	Written,
	/// The storage operation behind `command` failed.
	Failed { command: u8 },
}

impl Reply {
	pub fn serialize(&self, manufacturer_id: u8, buffer: &mut [u8; MAX_MESSAGE_LENGTH]) -> usize {
		buffer[0] = SYSEX_START;
		buffer[1] = manufacturer_id;
		let len = match self {
			Reply::PageDump { page, data } => {
				buffer[2] = RSP_DUMP_EEPROM;
				buffer[3] = *page;
				write_nibbles(data, &mut buffer[4..4 + NIBBLES_PER_PAGE]);
				4 + NIBBLES_PER_PAGE
			}
			Reply::Erased => {
				buffer[2] = RSP_ERASE_EEPROM;
				3
			}
			Reply::Written => {
				buffer[2] = RSP_WRITE_EEPROM;
				3
			}
			Reply::Failed { command } => {
				buffer[2] = RSP_ERROR;
				buffer[3] = *command;
				4
			}
		};
		buffer[len] = SYSEX_END;
		len + 1
	}
}

fn write_nibbles(data: &[u8; PAGE_SIZE], out: &mut [u8]) {
	for (byte, pair) in data.iter().zip(out.chunks_exact_mut(2)) {
		pair.copy_from_slice(&split_nibbles(*byte));
	}
}
