use crate::debugln::*;
use crate::protocol::{page_address, Command, Config, ParseError, Reply, MAX_MESSAGE_LENGTH, PAGE_SIZE};
use crate::reassembler::SysexHandler;
use crate::storage::{EepromStorage, StorageError};
use crate::transport::MidiTransport;
use crate::usb_midi::{encode_sysex, GROUP_SIZE};
use heapless::Vec;

/// Room for the longest reply: 37 bytes need 13 groups.
pub const TX_BUFFER_SIZE: usize = (MAX_MESSAGE_LENGTH + 2) / 3 * GROUP_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
	Rejected(ParseError),
	Storage(StorageError),
	TxOverflow,
	Transport,
}

impl From<ParseError> for DispatchError {
	fn from(e: ParseError) -> DispatchError {
		DispatchError::Rejected(e)
	}
}

/// Executes complete SysEx messages against the EEPROM and answers them.
pub struct Dispatcher<S, T> {
	storage: S,
	transport: T,
	config: Config,
}

impl<S: EepromStorage, T: MidiTransport> Dispatcher<S, T> {
	pub fn new(storage: S, transport: T, config: Config) -> Dispatcher<S, T> {
		Dispatcher { storage, transport, config }
	}

	pub fn storage(&self) -> &S {
		&self.storage
	}

	pub fn storage_mut(&mut self) -> &mut S {
		&mut self.storage
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	pub fn transport_mut(&mut self) -> &mut T {
		&mut self.transport
	}

	/// Handles one message and returns the reply that was sent for it.
	pub fn process(&mut self, cable: u8, message: &[u8]) -> Result<Reply, DispatchError> {
		let command = Command::parse(message, self.config.manufacturer_id)?;
		debugln!("sysex command {:?}", command);

		let reply = match self.execute(&command) {
			Ok(reply) => reply,
			Err(e) => {
				debugln!("  -> storage failed: {:?}", e);
				match command {
					Command::DumpPage { .. } => return Err(DispatchError::Storage(e)),
					_ if !self.config.error_replies => return Err(DispatchError::Storage(e)),
					_ => Reply::Failed { command: command.id() },
				}
			}
		};

		self.send(cable, &reply)?;
		Ok(reply)
	}

	fn execute(&mut self, command: &Command) -> Result<Reply, StorageError> {
		match *command {
			Command::DumpPage { page } => {
				let mut data = [0; PAGE_SIZE];
				self.storage.read_page(page_address(page), &mut data)?;
				Ok(Reply::PageDump { page, data })
			}
			Command::EraseAll => {
				self.storage.erase_all()?;
				Ok(Reply::Erased)
			}
			Command::WritePage { page, ref data } => {
				self.storage.write_page(page_address(page), data)?;
				Ok(Reply::Written)
			}
		}
	}

	fn send(&mut self, cable: u8, reply: &Reply) -> Result<(), DispatchError> {
		let mut message = [0; MAX_MESSAGE_LENGTH];
		let len = reply.serialize(self.config.manufacturer_id, &mut message);

		let mut packets: Vec<u8, TX_BUFFER_SIZE> = Vec::new();
		encode_sysex(cable, &message[..len], &mut packets).map_err(|_| DispatchError::TxOverflow)?;
		verboseln!("  -> reply {:02X?}", &packets[..]);

		self.transport.send(&packets).map_err(|e| {
			debugln!("  -> error writing to usb: {:?}", e);
			DispatchError::Transport
		})
	}
}

impl<S: EepromStorage, T: MidiTransport> SysexHandler for Dispatcher<S, T> {
	fn on_sysex(&mut self, cable: u8, message: &[u8]) {
		match self.process(cable, message) {
			Ok(reply) => debugln!("  -> {:?}", reply),
			Err(e) => debugln!("sysex dropped: {:?}", e),
		}
	}
}
