#![no_std]

//! Read, write and erase an EEPROM through MIDI System Exclusive messages
//! carried over USB-MIDI.
//!
//! USB packets from the host go into [`SysexDevice::receive`]. The
//! [`Reassembler`] rebuilds SysEx messages from the 4-byte USB-MIDI groups,
//! the [`Dispatcher`] checks and executes them against an [`EepromStorage`]
//! and sends the reply, cut back into groups, through a [`MidiTransport`].

mod debugln;

pub mod device;
pub mod dispatcher;
pub mod i2c_eeprom;
pub mod protocol;
pub mod reassembler;
pub mod storage;
pub mod transport;
pub mod usb_midi;

pub use device::SysexDevice;
pub use dispatcher::{DispatchError, Dispatcher};
pub use i2c_eeprom::I2cEeprom;
pub use protocol::{Command, Config, ParseError, Reply};
pub use reassembler::{Reassembler, SysexHandler};
pub use storage::{EepromStorage, MemoryEeprom, StorageError};
pub use transport::MidiTransport;
