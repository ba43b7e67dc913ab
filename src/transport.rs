/// Outgoing side of the USB-MIDI link.
pub trait MidiTransport {
	type Error: core::fmt::Debug;

	/// Sends a run of complete 4-byte USB-MIDI groups.
	fn send(&mut self, packets: &[u8]) -> Result<(), Self::Error>;
}

#[cfg(feature = "usb")]
mod usb {
	use super::MidiTransport;
	use crate::usb_midi::GROUP_SIZE;
	use core::convert::TryInto;
	use usb_device::bus::UsbBus;
	use usb_device::UsbError;
	use usbd_midi::midi_device::MidiClass;

	impl<B: UsbBus> MidiTransport for MidiClass<'_, B> {
		type Error = UsbError;

		fn send(&mut self, packets: &[u8]) -> Result<(), UsbError> {
			for group in packets.chunks_exact(GROUP_SIZE) {
				let group: [u8; GROUP_SIZE] = group.try_into().map_err(|_| UsbError::BufferOverflow)?;
				self.send_bytes(group)?;
			}
			Ok(())
		}
	}

}
