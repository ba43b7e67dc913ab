use crate::debugln::*;
use crate::usb_midi::{self, CodeIndex};
use heapless::Vec;

/// Receives completed SysEx messages from a [`Reassembler`].
pub trait SysexHandler {
	fn on_sysex(&mut self, cable: u8, message: &[u8]);
}

impl<F: FnMut(u8, &[u8])> SysexHandler for F {
	fn on_sysex(&mut self, cable: u8, message: &[u8]) {
		self(cable, message)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
	Idle,
	/// `cable` is where the first group of the message came from.
	Accumulating { cable: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
	/// A non-SysEx group arrived in the middle of a message.
	UnexpectedCin(u8),
	Overflow,
	/// The packet ended in the middle of a group.
	Truncated,
}

/// Rebuilds SysEx messages from USB-MIDI groups into a buffer of `N` bytes.
///
/// All cables share the one buffer.
pub struct Reassembler<const N: usize> {
	state: RxState,
	buffer: Vec<u8, N>,
}

impl<const N: usize> Reassembler<N> {
	pub fn new() -> Reassembler<N> {
		Reassembler {
			state: RxState::Idle,
			buffer: Vec::new(),
		}
	}

	pub fn state(&self) -> RxState {
		self.state
	}

	/// Number of message bytes collected so far.
	pub fn len(&self) -> usize {
		self.buffer.len()
	}

	pub fn abort(&mut self, reason: AbortReason) {
		if self.state != RxState::Idle {
			debugln!("sysex aborted after {} bytes: {:?}", self.buffer.len(), reason);
		}
		self.reset();
	}

	fn reset(&mut self) {
		self.state = RxState::Idle;
		self.buffer.clear();
	}

	/// Feeds one USB packet, a run of 4-byte groups, calling `handler` for
	/// every message that completes inside it.
	pub fn push_packet(&mut self, packet: &[u8], handler: &mut impl SysexHandler) {
		let mut offset = 0;

		while offset < packet.len() {
			let header = packet[offset];
			let cin = match CodeIndex::from_header(header) {
				Some(cin) => cin,
				None => {
					if let RxState::Accumulating { .. } = self.state {
						self.abort(AbortReason::UnexpectedCin(header & 0x0F));
					}
					// most likely padding; nothing more for us in this packet
					break;
				}
			};

			let len = cin.payload_length();
			let payload = match packet.get(offset + 1..offset + 1 + len) {
				Some(payload) => payload,
				None => {
					self.abort(AbortReason::Truncated);
					break;
				}
			};
			// a short end group only advances past its valid bytes
			offset += if cin.ends_sysex() { 1 + len } else { usb_midi::GROUP_SIZE };

			if self.buffer.extend_from_slice(payload).is_err() {
				self.abort(AbortReason::Overflow);
				continue;
			}

			let cable = match self.state {
				RxState::Idle => usb_midi::cable(header),
				RxState::Accumulating { cable } => cable,
			};
			self.state = RxState::Accumulating { cable };

			if cin.ends_sysex() {
				verboseln!("sysex complete on cable {}: {:02X?}", cable, &self.buffer[..]);
				handler.on_sysex(cable, &self.buffer);
				self.reset();
			}
		}
	}
}

impl<const N: usize> Default for Reassembler<N> {
	fn default() -> Reassembler<N> {
		Reassembler::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::usb_midi::sysex_packets;
	use rand_core::RngCore;
	extern crate std;
	use std::vec::Vec as StdVec;

	#[derive(Default)]
	struct Recorder {
		messages: StdVec<(u8, StdVec<u8>)>,
	}

	impl SysexHandler for Recorder {
		fn on_sysex(&mut self, cable: u8, message: &[u8]) {
			self.messages.push((cable, message.to_vec()));
		}
	}

	fn encode(cable: u8, message: &[u8]) -> StdVec<u8> {
		sysex_packets(cable, message).flatten().collect()
	}

	#[test]
	fn round_trip() {
		let mut rng = rand_pcg::Pcg32::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7);
		for len in 0..=61 {
			let mut message = [0u8; 61];
			for byte in message.iter_mut() {
				*byte = rng.next_u32() as u8;
			}
			let message = &message[..len];

			let mut reassembler = Reassembler::<64>::new();
			let mut recorder = Recorder::default();
			reassembler.push_packet(&encode(0, message), &mut recorder);

			if len == 0 {
				assert!(recorder.messages.is_empty());
			}
			else {
				assert!(recorder.messages == [(0, message.to_vec())], "length {}: got {:02X?}", len, recorder.messages);
			}
			assert!(reassembler.state() == RxState::Idle);
			assert!(reassembler.len() == 0);
		}
	}

	#[test]
	fn message_may_span_packets() {
		let packets = encode(2, &[0xF0, 1, 2, 3, 4, 5, 6, 7, 0xF7]);
		let mut reassembler = Reassembler::<64>::new();
		let mut recorder = Recorder::default();

		reassembler.push_packet(&packets[0..4], &mut recorder);
		assert!(reassembler.state() == RxState::Accumulating { cable: 2 });
		assert!(reassembler.len() == 3);
		reassembler.push_packet(&packets[4..8], &mut recorder);
		assert!(recorder.messages.is_empty());
		reassembler.push_packet(&packets[8..], &mut recorder);

		assert!(recorder.messages == [(2, std::vec![0xF0, 1, 2, 3, 4, 5, 6, 7, 0xF7])]);
	}

	#[test]
	fn several_messages_in_one_packet() {
		let mut packet = encode(0, &[0xF0, 1, 0xF7]);
		packet.extend(encode(1, &[0xF0, 1, 2, 3, 4, 0xF7]));
		let mut reassembler = Reassembler::<64>::new();
		let mut recorder = Recorder::default();

		reassembler.push_packet(&packet, &mut recorder);
		assert!(recorder.messages == [(0, std::vec![0xF0, 1, 0xF7]), (1, std::vec![0xF0, 1, 2, 3, 4, 0xF7])]);
	}

	#[test]
	fn non_sysex_group_aborts_message() {
		let mut reassembler = Reassembler::<64>::new();
		let mut recorder = Recorder::default();

		reassembler.push_packet(&[0x04, 0xF0, 1, 2], &mut recorder);
		assert!(reassembler.len() == 3);
		reassembler.push_packet(&[0x09, 0x90, 60, 100, 0x05, 0xF7, 0xFF, 0xFF], &mut recorder);
		assert!(reassembler.state() == RxState::Idle);
		assert!(reassembler.len() == 0);
		assert!(recorder.messages.is_empty());

		// the stray end group is a message of its own and the dispatcher's problem
		reassembler.push_packet(&[0x05, 0xF7, 0xFF, 0xFF], &mut recorder);
		assert!(recorder.messages == [(0, std::vec![0xF7])]);
	}

	#[test]
	fn padding_ends_packet_while_idle() {
		let mut reassembler = Reassembler::<64>::new();
		let mut recorder = Recorder::default();

		reassembler.push_packet(&[0x00, 0x00, 0x00, 0x00, 0x07, 0xF0, 1, 0xF7], &mut recorder);
		assert!(recorder.messages.is_empty());
		assert!(reassembler.state() == RxState::Idle);
	}

	#[test]
	fn short_end_group_stops_on_padding() {
		let mut packet = encode(0, &[0xF0, 1, 2, 3, 0xF7]);
		packet.extend(encode(0, &[0xF0, 1, 0xF7]));
		let mut reassembler = Reassembler::<64>::new();
		let mut recorder = Recorder::default();

		// the scan lands on the 0xFF pad byte, which is not a SysEx CIN
		reassembler.push_packet(&packet, &mut recorder);
		assert!(recorder.messages == [(0, std::vec![0xF0, 1, 2, 3, 0xF7])]);
	}

	#[test]
	fn overflow_aborts() {
		let mut reassembler = Reassembler::<8>::new();
		let mut recorder = Recorder::default();

		reassembler.push_packet(&[0x04, 0xF0, 1, 2, 0x04, 3, 4, 5], &mut recorder);
		assert!(reassembler.len() == 6);
		reassembler.push_packet(&[0x04, 6, 7, 8], &mut recorder);
		assert!(reassembler.state() == RxState::Idle);
		assert!(reassembler.len() == 0);
		assert!(recorder.messages.is_empty());

		// exactly full is fine
		reassembler.push_packet(&encode(0, &[0xF0, 1, 2, 3, 4, 5, 6, 0xF7]), &mut recorder);
		assert!(recorder.messages == [(0, std::vec![0xF0, 1, 2, 3, 4, 5, 6, 0xF7])]);
	}

	#[test]
	fn truncated_group_aborts() {
		let mut reassembler = Reassembler::<64>::new();
		let mut recorder = Recorder::default();

		reassembler.push_packet(&[0x04, 0xF0, 1, 2, 0x07, 3], &mut recorder);
		assert!(reassembler.state() == RxState::Idle);
		assert!(recorder.messages.is_empty());
	}

	#[test]
	fn closure_handler() {
		let mut reassembler = Reassembler::<64>::new();
		let mut count = 0;
		reassembler.push_packet(&[0x06, 0xF0, 0xF7, 0xFF], &mut |_cable: u8, message: &[u8]| {
			assert!(*message == [0xF0, 0xF7]);
			count += 1;
		});
		assert!(count == 1);
	}

	#[test]
	fn withstands_garbage_input() {
		let mut rng = rand_pcg::Pcg32::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7);
		let mut reassembler = Reassembler::<64>::new();
		let mut recorder = Recorder::default();
		for _ in 0..10000 {
			let mut packet = [0u8; 64];
			let len = rng.next_u32() as usize % packet.len();
			for byte in packet[..len].iter_mut() {
				// bias towards SysEx CINs so that messages actually build up
				*byte = match rng.next_u32() % 3 {
					0 => 0x04,
					_ => rng.next_u32() as u8,
				};
			}
			reassembler.push_packet(&packet[..len], &mut recorder);
			assert!(reassembler.len() <= 64);
		}

		// check if it's recovering: a realtime clock group drops any partial message
		reassembler.push_packet(&[0x0F, 0xF8, 0x00, 0x00], &mut recorder);
		assert!(reassembler.state() == RxState::Idle);
		recorder.messages.clear();
		reassembler.push_packet(&encode(0, &[0xF0, 1, 2, 0xF7]), &mut recorder);
		assert!(recorder.messages == [(0, std::vec![0xF0, 1, 2, 0xF7])]);
	}
}
