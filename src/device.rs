use crate::dispatcher::Dispatcher;
use crate::protocol::Config;
use crate::reassembler::{Reassembler, RxState};
use crate::storage::EepromStorage;
use crate::transport::MidiTransport;

pub const RX_BUFFER_SIZE: usize = 64;

/// The device end of the SysEx EEPROM channel.
///
/// Everything runs to completion inside [`SysexDevice::receive`]: the reply to a
/// command has been sent before the call returns. Share it between interrupt
/// contexts only behind a lock, one packet at a time.
pub struct SysexDevice<S, T> {
	reassembler: Reassembler<RX_BUFFER_SIZE>,
	dispatcher: Dispatcher<S, T>,
}

impl<S: EepromStorage, T: MidiTransport> SysexDevice<S, T> {
	pub fn new(storage: S, transport: T, config: Config) -> SysexDevice<S, T> {
		SysexDevice {
			reassembler: Reassembler::new(),
			dispatcher: Dispatcher::new(storage, transport, config),
		}
	}

	/// Feeds one USB packet received on the MIDI OUT endpoint.
	pub fn receive(&mut self, packet: &[u8]) {
		self.reassembler.push_packet(packet, &mut self.dispatcher);
	}

	pub fn rx_state(&self) -> RxState {
		self.reassembler.state()
	}

	pub fn dispatcher(&self) -> &Dispatcher<S, T> {
		&self.dispatcher
	}

	pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<S, T> {
		&mut self.dispatcher
	}
}

#[cfg(feature = "usb")]
mod usb {
	use super::SysexDevice;
	use crate::debugln::*;
	use crate::storage::EepromStorage;
	use usb_device::bus::UsbBus;
	use usb_device::prelude::*;
	use usbd_midi::midi_device::MidiClass;

	impl<'a, B: UsbBus, S: EepromStorage> SysexDevice<S, MidiClass<'a, B>> {
		/// Services the USB device and feeds everything the host sent.
		pub fn usb_poll(&mut self, usb_dev: &mut UsbDevice<'a, B>) {
			if !usb_dev.poll(&mut [self.dispatcher.transport_mut()]) {
				return;
			}

			let mut buffer = [0u8; 64];
			loop {
				let len = match self.dispatcher.transport_mut().read(&mut buffer) {
					Ok(len) => len,
					Err(UsbError::WouldBlock) => break,
					Err(e) => {
						debugln!("error reading from usb: {:?}", e);
						break;
					}
				};
				if len % 4 != 0 {
					debugln!("dropping usb packet of odd length {}", len);
					continue;
				}
				self.receive(&buffer[..len]);
			}
		}
	}

}
